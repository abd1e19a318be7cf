pub mod generate;
pub mod router;
pub mod search;
pub mod suggestions;

pub use generate::{GenerateTask, GENERATE_TASK};
pub use router::{RouterTask, ROUTER_TASK};
pub use search::{SearchTask, SEARCH_TASK};
pub use suggestions::{SuggestionsTask, SUGGESTIONS_TASK};
