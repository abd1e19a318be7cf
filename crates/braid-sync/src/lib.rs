pub mod channel;
pub mod error;
pub mod http;
pub mod remote;

pub use channel::{
    select_channel, BroadcastChannel, ChangeChannel, ChangeData, ChangeKind, ChangeNote,
    PollingChannel, Subscription,
};
pub use error::RemoteError;
pub use http::HttpRemoteStore;
pub use remote::{RemoteStore, RemoteSync};
