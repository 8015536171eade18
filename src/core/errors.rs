use thiserror::Error;

#[derive(Error, Debug)]
pub enum AffinityError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Invalid API url: {0}")]
    InvalidUrl(String),
}

impl From<std::io::Error> for AffinityError {
    fn from(error: std::io::Error) -> Self {
        AffinityError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for AffinityError {
    fn from(error: reqwest::Error) -> Self {
        AffinityError::Reqwest(Box::new(error))
    }
}

/// Failure reported by a profile backend call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Non-2xx response. `detail` is the server's human-readable message.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    /// Network failure, timeout or an undecodable response body.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn rejected(status: u16, detail: impl Into<String>) -> Self {
        BackendError::Rejected { status, detail: detail.into() }
    }

    /// The server's `detail`, when there is one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            BackendError::Rejected { detail, .. } => Some(detail),
            BackendError::Transport(_) => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        BackendError::Transport(error.to_string())
    }
}

/// Why a sync operation did not reconcile the store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("response for '{issued_for}' (generation {generation}) arrived after the profile changed")]
    Stale { issued_for: String, generation: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reqwest_errors_convert() {
        let error = reqwest::Client::new().get("not a url").build().unwrap_err();
        assert!(matches!(AffinityError::from(error), AffinityError::Reqwest(_)));

        let error = reqwest::Client::new().get("::").build().unwrap_err();
        assert!(matches!(BackendError::from(error), BackendError::Transport(_)));
    }

    #[test]
    fn test_rejection_displays_detail() {
        let error = BackendError::rejected(400, "Keyword already exists");
        assert_eq!(error.to_string(), "Keyword already exists");
        assert_eq!(error.detail(), Some("Keyword already exists"));
        assert_eq!(BackendError::Transport("timed out".to_string()).detail(), None);
    }
}
