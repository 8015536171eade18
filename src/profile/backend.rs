use async_trait::async_trait;

use crate::core::{
    models::{
        AddExplicitRequest,
        BulkUpdateRequest,
        KeywordRequest,
        UserRequest,
    },
    BackendError,
    ProfilePayload,
};

/// The remote profile service. One method per route.
///
/// Timeouts belong to the implementation; they come back as
/// [`BackendError::Transport`].
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    /// `GET /profiles/{user_id}`
    async fn fetch_profile(&self, user_id: &str) -> Result<ProfilePayload, BackendError>;

    /// `POST /profiles/explicit/add`
    async fn add_explicit(&self, request: &AddExplicitRequest) -> Result<ProfilePayload, BackendError>;

    /// `DELETE /profiles/explicit/remove`
    async fn remove_explicit(&self, request: &KeywordRequest) -> Result<ProfilePayload, BackendError>;

    /// `PUT /profiles/explicit/bulk_update`
    async fn bulk_update_explicit(
        &self,
        request: &BulkUpdateRequest,
    ) -> Result<ProfilePayload, BackendError>;

    /// `POST /profiles/explicit/clear`
    async fn clear_explicit(&self, request: &UserRequest) -> Result<ProfilePayload, BackendError>;

    /// `DELETE /profiles/implicit/remove`
    async fn remove_implicit(&self, request: &KeywordRequest) -> Result<ProfilePayload, BackendError>;

    /// `DELETE /profiles/implicit/exclusion/remove`
    async fn remove_exclusion(&self, request: &KeywordRequest) -> Result<ProfilePayload, BackendError>;

    /// `POST /profiles/implicit/clear`
    async fn clear_implicit(&self, request: &UserRequest) -> Result<ProfilePayload, BackendError>;
}
