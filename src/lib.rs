pub mod core;
pub mod notify;
pub mod persistence;
pub mod profile;
pub mod session;

pub use crate::core::{
    AffinityError,
    BackendError,
    ClientConfig,
    ImplicitInterests,
    InterestEntry,
    ProfilePayload,
    SyncError,
};
pub use notify::{
    LogSink,
    Notification,
    NotificationKind,
    NotificationSink,
    ToastQueue,
};
pub use profile::{
    ClearScope,
    HttpProfileBackend,
    Outcome,
    ProfileBackend,
    ProfileStore,
    ProfileSyncEngine,
    SyncState,
};
pub use session::{
    AuthGrant,
    Session,
    ANONYMOUS_USER_ID,
};
