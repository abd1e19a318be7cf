pub mod credentials;
pub mod error;
pub mod openai;
pub mod sse;
pub mod traits;

pub use credentials::{CredentialStore, EnvCredentialStore, StaticCredentialStore};
pub use error::GenError;
pub use openai::OpenAiCompatClient;
pub use traits::{
    DisabledSearch, GenDelta, GenerationClient, GenerationRequest, PageContent, SearchClient,
    SearchResult,
};
