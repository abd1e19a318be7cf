pub mod batch;
pub mod dbs;
pub mod error;
pub mod local;
pub mod prefs;
pub mod store;

pub use batch::WriteBatcher;
pub use error::StoreError;
pub use local::{LocalStore, MemoryStore};
pub use prefs::{Preferences, PREFERENCES_KEY};
pub use store::{ChatStore, DeleteOutcome};

#[cfg(feature = "mongodb")]
pub use dbs::MongoStore;
