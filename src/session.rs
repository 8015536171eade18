use std::sync::Arc;

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    core::AffinityError,
    persistence::KeyValueStore,
};

/// User id used when nobody is signed in.
pub const ANONYMOUS_USER_ID: &str = "guest";

const ACCESS_TOKEN_KEY: &str = "access_token";
const USER_ID_KEY: &str = "user_id";

/// What the auth service hands back on login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthGrant {
    pub access_token: String,
    pub user_id: String,
}

/// Who the current user is, remembered across restarts.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save_auth(&self, grant: &AuthGrant) -> Result<(), AffinityError> {
        self.store.set(ACCESS_TOKEN_KEY, &grant.access_token)?;
        self.store.set(USER_ID_KEY, &grant.user_id)
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn current_user_id(&self) -> String {
        self.store
            .get(USER_ID_KEY)
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER_ID.to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        self.current_user_id() == ANONYMOUS_USER_ID
    }

    /// Value for the `Authorization` header, if a token is stored.
    pub fn authorization(&self) -> Option<String> {
        self.access_token().map(|token| format!("Bearer {token}"))
    }

    pub fn clear(&self) -> Result<(), AffinityError> {
        self.store.remove(USER_ID_KEY)?;
        self.store.remove(ACCESS_TOKEN_KEY)
    }
}
