//! HTTP client for the hosted platform.
//!
//! One [`PlatformClient`] implements every collaborator contract the
//! workflow needs: auth, object storage, AI image modification and plain
//! result fetching. Failures are classified by HTTP status into
//! [`ServiceError`] variants at the call site.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result, ServiceError};
use crate::result::ResultFetcher;
use crate::session::{AuthCallback, AuthProvider, AuthState, AuthStateCell, SubscriptionId, User};
use crate::storage::{ObjectStorage, StoredObject, UploadOptions};
use crate::transform::{ImageTransformer, ModifyImageRequest, ModifyImageResponse};

/// reqwest-backed client for auth, storage and AI endpoints.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: Client,
    base_url: String,
    api_key: String,
    bucket: String,
    auth: AuthStateCell,
}

impl PlatformClient {
    /// Build a client from configuration. No request is made yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            bucket: config.bucket.clone(),
            auth: AuthStateCell::default(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

fn transport(e: &reqwest::Error) -> ServiceError {
    if e.is_decode() {
        ServiceError::Decode(e.to_string())
    } else {
        ServiceError::Transport(e.to_string())
    }
}

/// Pass through 2xx responses, classify everything else.
async fn check(resp: Response) -> std::result::Result<Response, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        body
    };
    Err(ServiceError::from_status(status.as_u16(), message))
}

#[async_trait]
impl AuthProvider for PlatformClient {
    fn current(&self) -> AuthState {
        self.auth.get()
    }

    fn subscribe(&self, callback: AuthCallback) -> SubscriptionId {
        self.auth.subscribe(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.auth.unsubscribe(id);
    }

    async fn login(&self) -> std::result::Result<AuthState, ServiceError> {
        self.auth.set(AuthState {
            user: None,
            is_loading: true,
        });

        let outcome = async {
            let resp = self
                .http
                .get(self.endpoint("auth/v1/user"))
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(|e| transport(&e))?;
            check(resp)
                .await?
                .json::<User>()
                .await
                .map_err(|e| transport(&e))
        }
        .await;

        match outcome {
            Ok(user) => {
                debug!(user_id = %user.id, "signed in");
                let state = AuthState {
                    user: Some(user),
                    is_loading: false,
                };
                self.auth.set(state.clone());
                Ok(state)
            }
            Err(e) => {
                self.auth.set(AuthState::default());
                Err(e)
            }
        }
    }

    async fn logout(&self) -> std::result::Result<(), ServiceError> {
        let sent = self
            .http
            .post(self.endpoint("auth/v1/logout"))
            .bearer_auth(&self.api_key)
            .send()
            .await;
        // The local session ends even if the server call fails.
        self.auth.set(AuthState::default());
        check(sent.map_err(|e| transport(&e))?).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for PlatformClient {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        key: &str,
        options: UploadOptions,
    ) -> std::result::Result<StoredObject, ServiceError> {
        let url = self.endpoint(&format!("storage/v1/object/{}/{key}", self.bucket));
        debug!(%url, size = bytes.len(), "PUT object");
        let resp = self
            .http
            .put(url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, options.content_type)
            .header("x-upsert", if options.upsert { "true" } else { "false" })
            .body(bytes)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        check(resp)
            .await?
            .json::<StoredObject>()
            .await
            .map_err(|e| transport(&e))
    }
}

#[async_trait]
impl ImageTransformer for PlatformClient {
    async fn modify_image(
        &self,
        request: ModifyImageRequest,
    ) -> std::result::Result<ModifyImageResponse, ServiceError> {
        debug!(images = request.images.len(), n = request.n, "POST modify image");
        let resp = self
            .http
            .post(self.endpoint("ai/v1/images/modify"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        check(resp)
            .await?
            .json::<ModifyImageResponse>()
            .await
            .map_err(|e| transport(&e))
    }
}

#[async_trait]
impl ResultFetcher for PlatformClient {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, ServiceError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport(&e))?;
        let bytes = check(resp)
            .await?
            .bytes()
            .await
            .map_err(|e| transport(&e))?;
        Ok(bytes.to_vec())
    }
}
