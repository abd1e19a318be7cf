#[cfg(feature = "mongodb")]
pub mod mongo;

#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
