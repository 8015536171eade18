use std::sync::{
    Arc,
    RwLock,
    RwLockReadGuard,
    RwLockWriteGuard,
};

use tracing::{
    debug,
    info,
    warn,
};

use super::{
    backend::ProfileBackend,
    store::{
        ProfileStore,
        IMPLICIT_TOP_N,
    },
};
use crate::{
    core::{
        models::{
            AddExplicitRequest,
            BulkUpdateRequest,
            KeywordRequest,
            UserRequest,
        },
        BackendError,
        ProfilePayload,
        SyncError,
    },
    notify::{
        Notification,
        NotificationSink,
    },
    session::ANONYMOUS_USER_ID,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unloaded,
    Loading,
    Loaded,
    Saving,
}

impl SyncState {
    /// The state a failed request falls back to.
    fn stable(self) -> SyncState {
        match self {
            SyncState::Unloaded | SyncState::Loading => SyncState::Unloaded,
            SyncState::Loaded | SyncState::Saving => SyncState::Loaded,
        }
    }
}

/// What an operation did. Errors stop at the engine; this is all callers see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The backend answered and the store was reconciled.
    Applied,
    /// Input or local precondition rejected the call before it reached the backend.
    Skipped,
    /// The backend rejected the call or could not be reached. Store unchanged.
    Failed,
    /// The answer arrived after the user changed and was dropped.
    Discarded,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Applied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    Explicit,
    Implicit,
}

/// Proof that the user confirmed a destructive clear. Only valid for the
/// profile it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearConfirmation {
    scope: ClearScope,
    user_id: String,
    generation: u64,
}

impl ClearConfirmation {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    pub notify_success: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { notify_success: true }
    }
}

#[derive(Debug, Clone)]
enum Operation {
    Load { refresh: bool },
    AddExplicit { keyword: String, weight: f64 },
    RemoveExplicit { keyword: String },
    BulkSaveExplicit { notify_success: bool },
    RemoveImplicit { keyword: String },
    UndoExclusion { keyword: String },
    ClearExplicit,
    ClearImplicit,
}

/// A backend call with its request body, captured while the store was locked.
enum Call {
    Fetch(String),
    Add(AddExplicitRequest),
    RemoveExplicit(KeywordRequest),
    BulkUpdate(BulkUpdateRequest),
    ClearExplicit(UserRequest),
    RemoveImplicit(KeywordRequest),
    RemoveExclusion(KeywordRequest),
    ClearImplicit(UserRequest),
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Load { refresh: false } => "load_profile",
            Operation::Load { refresh: true } => "refresh_profile",
            Operation::AddExplicit { .. } => "add_explicit",
            Operation::RemoveExplicit { .. } => "remove_explicit",
            Operation::BulkSaveExplicit { .. } => "bulk_save_explicit",
            Operation::RemoveImplicit { .. } => "remove_implicit",
            Operation::UndoExclusion { .. } => "undo_exclusion",
            Operation::ClearExplicit => "clear_all_explicit",
            Operation::ClearImplicit => "clear_all_implicit",
        }
    }

    /// Explicit edits can change what the server infers, so the whole profile is
    /// fetched again once their own response is applied.
    fn refresh_after(&self) -> bool {
        matches!(
            self,
            Operation::AddExplicit { .. }
                | Operation::RemoveExplicit { .. }
                | Operation::BulkSaveExplicit { .. }
                | Operation::ClearExplicit
        )
    }

    fn in_flight_state(&self) -> SyncState {
        match self {
            Operation::Load { .. } => SyncState::Loading,
            _ => SyncState::Saving,
        }
    }

    fn prepare(&self, user_id: &str, store: &ProfileStore) -> Result<Call, SyncError> {
        let user_id = user_id.to_string();
        let call = match self {
            Operation::Load { .. } => Call::Fetch(user_id),
            Operation::AddExplicit { keyword, weight } => {
                Call::Add(AddExplicitRequest { user_id, keyword: keyword.clone(), weight: *weight })
            }
            Operation::RemoveExplicit { keyword } => {
                if !store.contains_explicit(keyword) {
                    return Err(SyncError::Validation(format!("'{keyword}' is not an explicit interest")));
                }
                Call::RemoveExplicit(KeywordRequest { user_id, keyword: keyword.clone() })
            }
            Operation::BulkSaveExplicit { .. } => {
                Call::BulkUpdate(BulkUpdateRequest { user_id, updates: store.explicit().to_vec() })
            }
            Operation::RemoveImplicit { keyword } => {
                if !store.contains_implicit(keyword) {
                    return Err(SyncError::Validation(format!("'{keyword}' is not an implicit interest")));
                }
                Call::RemoveImplicit(KeywordRequest { user_id, keyword: keyword.clone() })
            }
            Operation::UndoExclusion { keyword } => {
                if !store.is_excluded(keyword) {
                    return Err(SyncError::Validation(format!("'{keyword}' is not excluded")));
                }
                Call::RemoveExclusion(KeywordRequest { user_id, keyword: keyword.clone() })
            }
            Operation::ClearExplicit => {
                if store.explicit().is_empty() {
                    return Err(SyncError::Validation("no explicit interests to clear".to_string()));
                }
                Call::ClearExplicit(UserRequest { user_id })
            }
            Operation::ClearImplicit => {
                if store.implicit().is_empty() {
                    return Err(SyncError::Validation("no implicit interests to clear".to_string()));
                }
                Call::ClearImplicit(UserRequest { user_id })
            }
        };
        Ok(call)
    }

    /// Replace, never merge, the sub-collections this operation owns.
    fn reconcile(&self, store: &mut ProfileStore, mut payload: ProfilePayload) {
        match self {
            Operation::Load { .. } => {
                store.replace_explicit(payload.explicit_interests.take().unwrap_or_default());
                store.replace_implicit_state(
                    payload.take_implicit().unwrap_or_default(),
                    payload.implicit_exclusions.unwrap_or_default(),
                );
            }
            Operation::AddExplicit { .. }
            | Operation::RemoveExplicit { .. }
            | Operation::BulkSaveExplicit { .. }
            | Operation::ClearExplicit => {
                store.replace_explicit(payload.explicit_interests.take().unwrap_or_default());
            }
            Operation::RemoveImplicit { .. }
            | Operation::UndoExclusion { .. }
            | Operation::ClearImplicit => {
                store.replace_implicit_state(
                    payload.take_implicit().unwrap_or_default(),
                    payload.implicit_exclusions.unwrap_or_default(),
                );
            }
        }
    }

    fn success_notification(&self, user_id: &str) -> Option<Notification> {
        let notification = match self {
            Operation::Load { refresh: true } => return None,
            Operation::Load { refresh: false } => {
                Notification::success("Profile loaded", format!("Loaded profile for {user_id}"))
            }
            Operation::AddExplicit { keyword, .. } => {
                Notification::success("Added", format!("\"{keyword}\" added"))
            }
            Operation::RemoveExplicit { keyword } => {
                Notification::success("Removed", format!("\"{keyword}\" removed"))
            }
            Operation::BulkSaveExplicit { notify_success: false } => return None,
            Operation::BulkSaveExplicit { notify_success: true } => {
                Notification::success("Saved", "Interests updated")
            }
            Operation::RemoveImplicit { keyword } => Notification::success(
                "Excluded",
                format!("\"{keyword}\" hidden from implicit interests"),
            ),
            Operation::UndoExclusion { keyword } => {
                Notification::success("Restored", format!("\"{keyword}\" restored"))
            }
            Operation::ClearExplicit => {
                Notification::success("Cleared", "All explicit interests removed")
            }
            Operation::ClearImplicit => {
                Notification::success("Cleared", "All implicit interests hidden")
            }
        };
        Some(notification)
    }

    fn failure_notification(&self, error: &BackendError) -> Notification {
        let (title, fallback) = match self {
            Operation::Load { refresh: false } => ("Load failed", "Could not load profile"),
            Operation::Load { refresh: true } => ("Refresh failed", "Could not refresh profile"),
            Operation::AddExplicit { .. } => ("Add failed", "Could not add interest"),
            Operation::RemoveExplicit { .. } => ("Remove failed", "Could not remove interest"),
            Operation::BulkSaveExplicit { .. } => ("Save failed", "Could not save interests"),
            Operation::RemoveImplicit { .. } => ("Exclude failed", "Could not hide interest"),
            Operation::UndoExclusion { .. } => ("Restore failed", "Could not restore interest"),
            Operation::ClearExplicit | Operation::ClearImplicit => {
                ("Clear failed", "Could not clear interests")
            }
        };
        Notification::error(title, error.detail().unwrap_or(fallback))
    }
}

struct Ticket {
    user_id: String,
    generation: u64,
}

struct Scope {
    user_id: String,
    generation: u64,
    state: SyncState,
    store: ProfileStore,
    // One gate per generation: operations for the current user queue in FIFO
    // order, a user switch starts a fresh queue.
    gate: Arc<tokio::sync::Mutex<()>>,
}

/// Keeps a [`ProfileStore`] in step with the profile service.
///
/// Every operation makes exactly one backend call and then replaces the
/// sub-collections it owns with whatever the server answered. Failures leave the
/// store alone and are reported through the [`NotificationSink`]; nothing is
/// retried.
pub struct ProfileSyncEngine {
    backend: Arc<dyn ProfileBackend>,
    sink: Arc<dyn NotificationSink>,
    scope: RwLock<Scope>,
}

impl ProfileSyncEngine {
    pub fn new(backend: Arc<dyn ProfileBackend>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            backend,
            sink,
            scope: RwLock::new(Scope {
                user_id: ANONYMOUS_USER_ID.to_string(),
                generation: 0,
                state: SyncState::Unloaded,
                store: ProfileStore::with_top_n(IMPLICIT_TOP_N),
                gate: Arc::new(tokio::sync::Mutex::new(())),
            }),
        }
    }

    pub fn with_top_n(self, top_n: usize) -> Self {
        self.write().store = ProfileStore::with_top_n(top_n);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Scope> {
        self.scope.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Scope> {
        self.scope.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the store as of the last reconciliation (plus staged weights).
    pub fn snapshot(&self) -> ProfileStore {
        self.read().store.clone()
    }

    pub fn state(&self) -> SyncState {
        self.read().state
    }

    pub fn user_id(&self) -> String {
        self.read().user_id.clone()
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Point the engine at another user. The old profile is dropped, never merged,
    /// and answers to requests still in flight for it will be discarded.
    pub fn switch_user(&self, user_id: &str) -> bool {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            warn!("Refusing to switch to an empty user id");
            return false;
        }

        let mut scope = self.write();
        if scope.user_id == user_id {
            return true;
        }

        scope.generation += 1;
        scope.user_id = user_id.to_string();
        scope.store.clear();
        scope.state = SyncState::Unloaded;
        scope.gate = Arc::new(tokio::sync::Mutex::new(()));
        info!(user_id, generation = scope.generation, "Switched profile user");
        true
    }

    /// Fetch `user_id`'s profile, switching to that user first if needed.
    pub async fn load_profile(&self, user_id: &str) -> Outcome {
        if !self.switch_user(user_id) {
            return Outcome::Skipped;
        }
        self.run(Operation::Load { refresh: false }).await
    }

    pub async fn add_explicit(&self, keyword: &str, weight: f64) -> Outcome {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            debug!("Ignoring empty keyword");
            return Outcome::Skipped;
        }
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            debug!(keyword, weight, "Ignoring out of range weight");
            return Outcome::Skipped;
        }
        self.run(Operation::AddExplicit { keyword: keyword.to_string(), weight }).await
    }

    pub async fn remove_explicit(&self, keyword: &str) -> Outcome {
        self.run(Operation::RemoveExplicit { keyword: keyword.to_string() }).await
    }

    /// Move a slider. Local only until [`ProfileSyncEngine::bulk_save_explicit`].
    pub fn stage_weight(&self, keyword: &str, weight: f64) -> bool {
        let staged = self.write().store.stage_weight(keyword, weight);
        if !staged {
            debug!(keyword, weight, "Nothing to stage");
        }
        staged
    }

    /// Send every explicit interest with its staged weight. On failure the staged
    /// weights stay in the store, uncommitted.
    pub async fn bulk_save_explicit(&self) -> Outcome {
        self.bulk_save_explicit_with(SaveOptions::default()).await
    }

    pub async fn bulk_save_explicit_with(&self, options: SaveOptions) -> Outcome {
        self.run(Operation::BulkSaveExplicit { notify_success: options.notify_success }).await
    }

    /// Hide an implicit interest. It moves to the exclusions until undone.
    pub async fn remove_implicit(&self, keyword: &str) -> Outcome {
        self.run(Operation::RemoveImplicit { keyword: keyword.to_string() }).await
    }

    pub async fn undo_exclusion(&self, keyword: &str) -> Outcome {
        self.run(Operation::UndoExclusion { keyword: keyword.to_string() }).await
    }

    /// First half of a destructive clear; hand the result to the matching clear call
    /// once the user has said yes.
    pub fn confirm_clear(&self, scope: ClearScope) -> ClearConfirmation {
        let current = self.read();
        ClearConfirmation { scope, user_id: current.user_id.clone(), generation: current.generation }
    }

    pub async fn clear_all_explicit(&self, confirmation: &ClearConfirmation) -> Outcome {
        if !self.accepts(confirmation, ClearScope::Explicit) {
            return Outcome::Skipped;
        }
        self.run(Operation::ClearExplicit).await
    }

    pub async fn clear_all_implicit(&self, confirmation: &ClearConfirmation) -> Outcome {
        if !self.accepts(confirmation, ClearScope::Implicit) {
            return Outcome::Skipped;
        }
        self.run(Operation::ClearImplicit).await
    }

    fn accepts(&self, confirmation: &ClearConfirmation, scope: ClearScope) -> bool {
        let current = self.read();
        let valid = confirmation.scope == scope
            && confirmation.generation == current.generation
            && confirmation.user_id == current.user_id;
        if !valid {
            warn!(
                user_id = %current.user_id,
                confirmed_for = %confirmation.user_id,
                "Clear confirmation does not match the current profile"
            );
        }
        valid
    }

    fn ticket(&self) -> (Ticket, Arc<tokio::sync::Mutex<()>>) {
        let scope = self.read();
        (Ticket { user_id: scope.user_id.clone(), generation: scope.generation }, scope.gate.clone())
    }

    async fn run(&self, operation: Operation) -> Outcome {
        let (ticket, gate) = self.ticket();
        let _turn = gate.lock().await;

        let outcome = self.execute(&ticket, &operation).await;
        if outcome == Outcome::Applied && operation.refresh_after() {
            // A failed refresh is reported on its own; the operation itself succeeded.
            self.execute(&ticket, &Operation::Load { refresh: true }).await;
        }
        outcome
    }

    async fn execute(&self, ticket: &Ticket, operation: &Operation) -> Outcome {
        match self.attempt(ticket, operation).await {
            Ok(()) => {
                info!(
                    user_id = %ticket.user_id,
                    operation = operation.name(),
                    "Profile reconciled"
                );
                if let Some(notification) = operation.success_notification(&ticket.user_id) {
                    self.sink.notify(notification);
                }
                Outcome::Applied
            }
            Err(SyncError::Validation(reason)) => {
                debug!(operation = operation.name(), %reason, "Operation skipped");
                Outcome::Skipped
            }
            Err(SyncError::Backend(error)) => {
                warn!(
                    user_id = %ticket.user_id,
                    operation = operation.name(),
                    error = %error,
                    "Profile operation failed"
                );
                self.sink.notify(operation.failure_notification(&error));
                Outcome::Failed
            }
            Err(stale @ SyncError::Stale { .. }) => {
                warn!(operation = operation.name(), "{stale}");
                Outcome::Discarded
            }
        }
    }

    async fn attempt(&self, ticket: &Ticket, operation: &Operation) -> Result<(), SyncError> {
        let stale =
            || SyncError::Stale { issued_for: ticket.user_id.clone(), generation: ticket.generation };

        let (call, prior) = {
            let mut scope = self.write();
            if scope.generation != ticket.generation {
                return Err(stale());
            }
            let call = operation.prepare(&ticket.user_id, &scope.store)?;
            let prior = scope.state.stable();
            scope.state = operation.in_flight_state();
            (call, prior)
        };

        let response = self.dispatch(&call).await;

        let mut scope = self.write();
        if scope.generation != ticket.generation {
            return Err(stale());
        }

        match response {
            Ok(payload) => {
                operation.reconcile(&mut scope.store, payload);
                scope.state = match operation {
                    Operation::Load { .. } => SyncState::Loaded,
                    _ => prior,
                };
                Ok(())
            }
            Err(error) => {
                if let Operation::Load { refresh: false } = operation {
                    scope.store.clear();
                    scope.state = SyncState::Unloaded;
                } else {
                    scope.state = prior;
                }
                Err(error.into())
            }
        }
    }

    async fn dispatch(&self, call: &Call) -> Result<ProfilePayload, BackendError> {
        match call {
            Call::Fetch(user_id) => self.backend.fetch_profile(user_id).await,
            Call::Add(request) => self.backend.add_explicit(request).await,
            Call::RemoveExplicit(request) => self.backend.remove_explicit(request).await,
            Call::BulkUpdate(request) => self.backend.bulk_update_explicit(request).await,
            Call::ClearExplicit(request) => self.backend.clear_explicit(request).await,
            Call::RemoveImplicit(request) => self.backend.remove_implicit(request).await,
            Call::RemoveExclusion(request) => self.backend.remove_exclusion(request).await,
            Call::ClearImplicit(request) => self.backend.clear_implicit(request).await,
        }
    }
}
