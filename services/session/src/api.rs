//! HTTP client for the YESS Go backend
//!
//! Thin request/response glue around the remote REST backend. The client
//! attaches the stored bearer token to outgoing requests and, on an
//! authentication-rejected response, ends the local session so callers
//! can route the user back to the login entry point.

use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::UserRecord;
use crate::synchronizer::{SessionSynchronizer, TOKEN_KEY};
use crate::validation;

/// Custom error type for backend calls
#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend rejected our credentials; the session has been ended
    /// and the caller should redirect to login
    #[error("Authentication rejected by the backend")]
    AuthRejected,

    /// Client-side input validation failed
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Transport-level failure
    #[error("Backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Backend returned status: {0}")]
    Status(StatusCode),
}

/// Type alias for backend call results
pub type ApiResult<T> = Result<T, ApiError>;

/// Configuration for the backend client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the YESS Go backend
    pub base_url: String,
    /// Request timeout in seconds
    pub request_timeout: u64,
}

impl ApiConfig {
    /// Create a new ApiConfig from environment variables
    ///
    /// # Environment Variables
    /// - `YESSGO_API_BASE_URL`: backend base URL (default: "https://api.yess.kg")
    /// - `YESSGO_API_TIMEOUT_SECONDS`: request timeout in seconds (default: 30)
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("YESSGO_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.yess.kg".to_string());

        let request_timeout = std::env::var("YESSGO_API_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        Ok(ApiConfig {
            base_url,
            request_timeout,
        })
    }
}

/// Request for user login
#[derive(Serialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

/// Request for user registration
#[derive(Serialize)]
pub struct RegisterRequest {
    pub phone: String,
    pub password: String,
    pub name: String,
    pub referral_code: Option<String>,
}

/// Request for profile updates
#[derive(Serialize, Default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Response for login and registration
#[derive(Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserRecord,
}

/// Client for the YESS Go backend
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    synchronizer: SessionSynchronizer,
}

impl ApiClient {
    /// Create a new backend client bound to a session synchronizer
    pub fn new(config: &ApiConfig, synchronizer: SessionSynchronizer) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(ApiClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            synchronizer,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Option<String> {
        self.synchronizer
            .context()
            .get(TOKEN_KEY)
            .filter(|t| !t.is_empty())
    }

    /// Send a request with the stored bearer token attached
    ///
    /// The token is read from storage at call time, not cached, so a
    /// session ended elsewhere is never reused. An authentication-
    /// rejected response ends the session before the error is returned.
    async fn execute(&self, request: RequestBuilder) -> ApiResult<Response> {
        let request = match self.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Backend rejected authentication, ending session");
            self.synchronizer.end_session();
            return Err(ApiError::AuthRejected);
        }

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        Ok(response)
    }

    /// Log in with phone and password, establishing a local session
    pub async fn login(&self, phone: &str, password: &str) -> ApiResult<UserRecord> {
        validation::validate_phone(phone).map_err(ApiError::Validation)?;
        validation::validate_password(password).map_err(ApiError::Validation)?;

        info!("Login attempt for phone: {}", phone);

        let payload = LoginRequest {
            phone: phone.to_string(),
            password: password.to_string(),
        };
        let response = self
            .execute(self.http.post(self.url("/auth/login")).json(&payload))
            .await?;

        let auth: AuthResponse = response.json().await?;
        self.synchronizer.begin_session(&auth.token, auth.user.clone());
        Ok(auth.user)
    }

    /// Register a new account, establishing a local session
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<UserRecord> {
        validation::validate_phone(&request.phone).map_err(ApiError::Validation)?;
        validation::validate_password(&request.password).map_err(ApiError::Validation)?;
        validation::validate_name(&request.name).map_err(ApiError::Validation)?;
        if let Some(code) = &request.referral_code {
            validation::validate_referral_code(code).map_err(ApiError::Validation)?;
        }

        info!("Registration attempt for phone: {}", request.phone);

        let response = self
            .execute(self.http.post(self.url("/auth/register")).json(&request))
            .await?;

        let auth: AuthResponse = response.json().await?;
        self.synchronizer.begin_session(&auth.token, auth.user.clone());
        Ok(auth.user)
    }

    /// Fetch the current profile and mirror it into the session
    pub async fn fetch_profile(&self) -> ApiResult<UserRecord> {
        let response = self.execute(self.http.get(self.url("/users/me"))).await?;
        let user: UserRecord = response.json().await?;
        self.synchronizer.commit_user(user.clone());
        Ok(user)
    }

    /// Update the current profile and mirror the result into the session
    ///
    /// The token is left untouched; only the user record is replaced.
    pub async fn update_profile(&self, request: UpdateProfileRequest) -> ApiResult<UserRecord> {
        if let Some(name) = &request.name {
            validation::validate_name(name).map_err(ApiError::Validation)?;
        }

        let response = self
            .execute(self.http.put(self.url("/users/me")).json(&request))
            .await?;

        let user: UserRecord = response.json().await?;
        self.synchronizer.commit_user(user.clone());
        Ok(user)
    }

    /// Log out, ending the local session whatever the backend says
    pub async fn logout(&self) -> ApiResult<()> {
        let result = self.execute(self.http.post(self.url("/auth/logout"))).await;
        self.synchronizer.end_session();

        match result {
            Ok(_) | Err(ApiError::AuthRejected) => Ok(()),
            Err(e) => {
                warn!("Backend logout failed, session ended locally anyway: {}", e);
                Ok(())
            }
        }
    }
}
