pub mod config;
pub mod errors;
pub mod http;
pub mod models;

pub use config::ClientConfig;
pub use errors::{
    AffinityError,
    BackendError,
    SyncError,
};
pub use models::{
    ImplicitInterests,
    InterestEntry,
    ProfilePayload,
};
