use async_trait::async_trait;
use reqwest::{
    header::AUTHORIZATION,
    Client,
    Method,
    RequestBuilder,
    Url,
};
use serde::Serialize;
use tracing::{
    debug,
    warn,
};

use super::backend::ProfileBackend;
use crate::{
    core::{
        http::{
            error_detail,
            http_client,
        },
        models::{
            AddExplicitRequest,
            BulkUpdateRequest,
            KeywordRequest,
            UserRequest,
        },
        AffinityError,
        BackendError,
        ClientConfig,
        ProfilePayload,
    },
    session::Session,
};

/// [`ProfileBackend`] over the profile service's JSON HTTP API.
pub struct HttpProfileBackend {
    client: Client,
    base_url: Url,
    session: Option<Session>,
}

impl HttpProfileBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, AffinityError> {
        let base_url = parse_base_url(&config.api_url)?;
        let client = http_client(config.request_timeout())?;
        Ok(Self { client, base_url, session: None })
    }

    /// Send `Authorization: Bearer <token>` from this session on every request.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match self.session.as_ref().and_then(Session::authorization) {
            Some(bearer) => request.header(AUTHORIZATION, bearer),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder, route: &str) -> Result<ProfilePayload, BackendError> {
        let response = request.send().await.map_err(|e| {
            warn!(route, error = %e, "Profile request failed");
            BackendError::Transport(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!(route, status = status.as_u16(), "Profile response");

        if !status.is_success() {
            return Err(BackendError::rejected(status.as_u16(), error_detail(status, &body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| BackendError::Transport(format!("Failed to parse profile response: {e}")))
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<ProfilePayload, BackendError> {
        let route = segments.join("/");
        let request = self.request(method, self.endpoint(segments)).json(body);
        self.execute(request, &route).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, AffinityError> {
    let url = Url::parse(raw.trim()).map_err(|e| AffinityError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(AffinityError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

#[async_trait]
impl ProfileBackend for HttpProfileBackend {
    async fn fetch_profile(&self, user_id: &str) -> Result<ProfilePayload, BackendError> {
        let request = self.request(Method::GET, self.endpoint(&["profiles", user_id]));
        self.execute(request, "profiles/{user_id}").await
    }

    async fn add_explicit(&self, request: &AddExplicitRequest) -> Result<ProfilePayload, BackendError> {
        self.send_json(Method::POST, &["profiles", "explicit", "add"], request).await
    }

    async fn remove_explicit(&self, request: &KeywordRequest) -> Result<ProfilePayload, BackendError> {
        self.send_json(Method::DELETE, &["profiles", "explicit", "remove"], request).await
    }

    async fn bulk_update_explicit(
        &self,
        request: &BulkUpdateRequest,
    ) -> Result<ProfilePayload, BackendError> {
        self.send_json(Method::PUT, &["profiles", "explicit", "bulk_update"], request).await
    }

    async fn clear_explicit(&self, request: &UserRequest) -> Result<ProfilePayload, BackendError> {
        self.send_json(Method::POST, &["profiles", "explicit", "clear"], request).await
    }

    async fn remove_implicit(&self, request: &KeywordRequest) -> Result<ProfilePayload, BackendError> {
        self.send_json(Method::DELETE, &["profiles", "implicit", "remove"], request).await
    }

    async fn remove_exclusion(&self, request: &KeywordRequest) -> Result<ProfilePayload, BackendError> {
        self.send_json(Method::DELETE, &["profiles", "implicit", "exclusion", "remove"], request)
            .await
    }

    async fn clear_implicit(&self, request: &UserRequest) -> Result<ProfilePayload, BackendError> {
        self.send_json(Method::POST, &["profiles", "implicit", "clear"], request).await
    }
}
