pub mod backend;
pub mod engine;
pub mod http;
pub mod store;


pub use backend::ProfileBackend;
pub use engine::{
    ClearConfirmation,
    ClearScope,
    Outcome,
    ProfileSyncEngine,
    SaveOptions,
    SyncState,
};
pub use http::HttpProfileBackend;
pub use store::{
    ProfileStore,
    IMPLICIT_TOP_N,
};
