//! Session client with FSM-tracked status and single refresh-and-retry.
//!
//! The client owns the session (tokens plus the current user) and its own
//! `reqwest::Client`. Every authenticated call goes through
//! [`SessionClient::send_authorized`]: on a `401` the client refreshes the
//! access token once and replays the request. Login, registration and the
//! refresh call itself are sent directly and never trigger a refresh.

use crate::auth_fsm::{SessionInput, SessionMachine, SessionStatus, StatusChangedPayload};
use crate::request::{api_error, error_message, ApiRequest, MultipartBody};
use crate::{ProfileUpdate, SessionError, SessionResult, UserProfile};
use devconnect_config::Config;
use devconnect_storage::TokenVault;
use parking_lot::Mutex;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const TOKEN_PATH: &str = "token/";
const REFRESH_PATH: &str = "token/refresh/";
const REGISTER_PATH: &str = "users/register/";
const ME_PATH: &str = "users/me/";

const LOGIN_FALLBACK: &str = "Invalid credentials";
const REGISTER_FALLBACK: &str = "An error occurred during registration. Please try again.";
const PROFILE_FALLBACK: &str = "Failed to update profile";
const REQUEST_FALLBACK: &str = "Request failed";

/// Token pair returned by the login endpoint. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct TokenPair {
    access: String,
    refresh: String,
}

/// Refresh response. `refresh` is present when the server rotates refresh tokens.
#[derive(Debug, Deserialize)]
struct RefreshedToken {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Registration response: `{"user": {...}, "message": "..."}`, or a bare
/// profile from servers that skip the envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Registered {
    Envelope {
        user: UserProfile,
        #[serde(default)]
        message: Option<String>,
    },
    Bare(UserProfile),
}

impl Registered {
    fn into_user(self) -> UserProfile {
        match self {
            Registered::Envelope { user, .. } | Registered::Bare(user) => user,
        }
    }
}

/// Callback type for status change notifications.
pub type StatusCallback = Box<dyn Fn(StatusChangedPayload) + Send + Sync>;

/// Read-only view of the session for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub current_user: Option<UserProfile>,
    pub has_access_token: bool,
}

/// In-memory session. Guarded by one mutex so status and tokens change together.
struct SessionState {
    machine: SessionMachine,
    access_token: Option<String>,
    refresh_token: Option<String>,
    current_user: Option<UserProfile>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            machine: SessionMachine::new(),
            access_token: None,
            refresh_token: None,
            current_user: None,
        }
    }

    fn status(&self) -> SessionStatus {
        SessionStatus::from(self.machine.state())
    }

    fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.current_user = None;
    }

    fn payload(&self) -> StatusChangedPayload {
        StatusChangedPayload {
            status: self.status(),
            user_id: self.current_user.as_ref().map(|u| u.id),
            username: self.current_user.as_ref().map(|u| u.username.clone()),
        }
    }
}

/// Authenticated API client and session manager.
///
/// `SessionClient` is `Send + Sync`; share it by reference or `Arc`.
pub struct SessionClient {
    http: Client,
    base_url: Url,
    vault: TokenVault,
    state: Mutex<SessionState>,
    /// Serialises refreshes so concurrent `401`s share one refresh call.
    refresh_gate: tokio::sync::Mutex<()>,
    status_callback: Mutex<Option<Arc<dyn Fn(StatusChangedPayload) + Send + Sync>>>,
}

impl SessionClient {
    /// Create a client with the default request timeout. No session is loaded;
    /// call [`restore`](Self::restore) to pick up stored tokens.
    pub fn new(base_url: Url, vault: TokenVault) -> SessionResult<Self> {
        Self::with_timeout(
            base_url,
            vault,
            Duration::from_secs(devconnect_config::DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(base_url: Url, vault: TokenVault, timeout: Duration) -> SessionResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("devconnect/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: normalize_base_url(base_url),
            vault,
            state: Mutex::new(SessionState::new()),
            refresh_gate: tokio::sync::Mutex::new(()),
            status_callback: Mutex::new(None),
        })
    }

    pub fn from_config(config: &Config, vault: TokenVault) -> SessionResult<Self> {
        Self::with_timeout(config.api_base_url()?, vault, config.request_timeout())
    }

    /// Build a client from configuration and restore any stored session.
    ///
    /// A stored session that cannot be validated is discarded; the client is
    /// still returned, unauthenticated.
    pub async fn create(config: &Config, vault: TokenVault) -> SessionResult<Self> {
        let client = Self::from_config(config, vault)?;
        if let Err(e) = client.restore().await {
            warn!(error = %e, "Could not restore stored session");
        }
        Ok(client)
    }

    /// Tear down the client. In-memory state and the status callback are
    /// dropped; persisted tokens are left for the next [`create`](Self::create).
    pub fn destroy(self) {
        self.status_callback.lock().take();
        debug!(status = %self.status(), "Session client destroyed");
    }

    /// Set a callback to be notified of status changes.
    pub fn set_status_callback(&self, callback: StatusCallback) {
        *self.status_callback.lock() = Some(Arc::from(callback));
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.lock().current_user.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            status: state.status(),
            current_user: state.current_user.clone(),
            has_access_token: state.access_token.is_some(),
        }
    }

    /// Current access token, if any. Never triggers a refresh.
    pub fn get_access_token(&self) -> Option<String> {
        self.state.lock().access_token.clone()
    }

    /// Apply an FSM input and mutate the session under the same lock.
    ///
    /// The mutation only runs if the transition is valid. The callback is
    /// notified after the lock is released.
    fn update(
        &self,
        input: &SessionInput,
        mutate: impl FnOnce(&mut SessionState),
    ) -> SessionResult<SessionStatus> {
        let mut state = self.state.lock();
        let old_status = state.status();

        state.machine.consume(input).map_err(|_| {
            SessionError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                state.machine.state()
            ))
        })?;
        mutate(&mut *state);

        let new_status = state.status();
        let payload = state.payload();
        drop(state);

        if old_status != new_status {
            debug!(
                old_status = %old_status,
                new_status = %new_status,
                "Session status transition"
            );
            self.notify_status_change(payload);
        }

        Ok(new_status)
    }

    /// Runs the callback outside the slot lock, so it may replace itself.
    fn notify_status_change(&self, payload: StatusChangedPayload) {
        let callback = self.status_callback.lock().clone();
        if let Some(callback) = callback {
            callback(payload);
        }
    }

    /// End the session in memory and in the store.
    ///
    /// Falls back to `Logout` when `input` is not valid in the current state,
    /// so this always lands in `Unauthenticated`.
    fn end_session(&self, input: SessionInput) {
        if self.update(&input, SessionState::clear).is_err() {
            let _ = self.update(&SessionInput::Logout, SessionState::clear);
        }
        if let Err(e) = self.vault.clear() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
    }

    /// Send one attempt without any refresh handling.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> SessionResult<Response> {
        let builder = request.build(&self.http, &self.base_url, access_token)?;
        debug!(
            method = %request.method,
            path = %request.path,
            retried = request.retried,
            "API request"
        );
        builder.send().await.map_err(SessionError::from_send)
    }

    /// Send an authenticated request, refreshing and replaying once on `401`.
    ///
    /// The returned response may still be a non-success status; a replayed
    /// request that is rejected again is returned as-is.
    pub(crate) async fn send_authorized(&self, mut request: ApiRequest) -> SessionResult<Response> {
        loop {
            let token = self.get_access_token().ok_or(SessionError::NotLoggedIn)?;
            let response = self.dispatch(&request, Some(&token)).await?;

            if response.status() != StatusCode::UNAUTHORIZED || request.retried {
                return Ok(response);
            }

            debug!(path = %request.path, "Access token rejected, refreshing");
            request.retried = true;
            self.refresh_after_rejection(&token).await?;
        }
    }

    /// Send an authenticated request and require a success status.
    pub(crate) async fn execute(&self, request: ApiRequest) -> SessionResult<Response> {
        let path = request.path.clone();
        let response = self.send_authorized(request).await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, path = %path, body = %body, "API request failed");
        Err(api_error(status, &body, REQUEST_FALLBACK))
    }

    /// [`execute`](Self::execute) and decode the JSON body.
    pub(crate) async fn execute_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> SessionResult<T> {
        let response = self.execute(request).await?;
        Ok(response.json().await?)
    }

    /// Refresh after `rejected` came back with `401`.
    ///
    /// If another caller replaced the token while this one waited on the
    /// gate, the new token is reused and no refresh call is made.
    async fn refresh_after_rejection(&self, rejected: &str) -> SessionResult<()> {
        let _gate = self.refresh_gate.lock().await;

        match self.get_access_token() {
            Some(current) if current != rejected => {
                debug!("Access token already refreshed by a concurrent request");
                Ok(())
            }
            Some(_) => self.refresh_locked().await.map(|_| ()),
            // The session ended while this request was in flight
            None => Err(SessionError::AuthExpired),
        }
    }

    /// Mint a new access token from the refresh token.
    ///
    /// From `Unauthenticated` the stored refresh token is used and the
    /// current user is loaded to establish a session. Any failure ends the
    /// session and returns [`SessionError::AuthExpired`].
    pub async fn refresh(&self) -> SessionResult<String> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> SessionResult<String> {
        let (status, refresh_token) = {
            let state = self.state.lock();
            (state.status(), state.refresh_token.clone())
        };
        let from_idle = status == SessionStatus::Unauthenticated;

        let refresh_token = match refresh_token {
            Some(token) => token,
            None if from_idle => self.vault.refresh_token()?.ok_or(SessionError::NotLoggedIn)?,
            None => {
                warn!("No refresh token available, ending session");
                self.end_session(SessionInput::RefreshFailed);
                return Err(SessionError::AuthExpired);
            }
        };

        if from_idle {
            let stored = refresh_token.clone();
            self.update(&SessionInput::RefreshAttempt, move |state| {
                state.refresh_token = Some(stored);
            })?;
        }

        let request = ApiRequest::post(REFRESH_PATH).json(json!({ "refresh": refresh_token }));
        let refreshed = match self.request_refresh(&request).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.end_session(SessionInput::RefreshFailed);
                return Err(SessionError::AuthExpired);
            }
        };

        let access = refreshed.access.clone();
        let rotated = refreshed.refresh.clone();
        self.update(&SessionInput::TokenRefreshed, |state| {
            state.access_token = Some(refreshed.access);
            if let Some(refresh) = refreshed.refresh {
                state.refresh_token = Some(refresh);
            }
        })
        .map_err(|_| SessionError::AuthExpired)?;

        // The in-memory session is already usable; a store failure only costs persistence
        if let Err(e) = self.persist_refreshed(&access, rotated.as_deref()) {
            warn!(error = %e, "Failed to persist refreshed token");
        }
        info!(rotated = rotated.is_some(), "Access token refreshed");

        if from_idle {
            let user = match self.load_user(&access).await {
                Ok(user) => user,
                Err(e) => {
                    self.end_session(SessionInput::AttemptFailed);
                    return Err(e);
                }
            };
            self.establish_user(user)?;
        }

        Ok(access)
    }

    async fn request_refresh(&self, request: &ApiRequest) -> SessionResult<RefreshedToken> {
        let response = self.dispatch(request, None).await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Token refresh rejected");
            return Err(api_error(status, &body, "Token refresh failed"));
        }
        Ok(response.json().await?)
    }

    fn persist_refreshed(&self, access: &str, rotated: Option<&str>) -> SessionResult<()> {
        self.vault.set_access_token(access)?;
        if let Some(refresh) = rotated {
            self.vault.set_refresh_token(refresh)?;
        }
        Ok(())
    }

    /// Fetch `users/me/` with a token that was just issued.
    async fn load_user(&self, access_token: &str) -> SessionResult<UserProfile> {
        let response = self
            .dispatch(&ApiRequest::get(ME_PATH), Some(access_token))
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Failed to load current user");
            return Err(api_error(status, &body, REQUEST_FALLBACK));
        }
        Ok(response.json().await?)
    }

    /// Store a freshly fetched user: completes a pending attempt or replaces
    /// the current user.
    fn establish_user(&self, user: UserProfile) -> SessionResult<SessionStatus> {
        let input = match self.status() {
            SessionStatus::Authenticating => SessionInput::SessionEstablished,
            _ => SessionInput::UserReloaded,
        };
        self.update(&input, move |state| state.current_user = Some(user))
    }

    /// Log in with username and password.
    ///
    /// Any existing session is discarded first. On failure the client is
    /// left `Unauthenticated`.
    pub async fn login(&self, username: &str, password: &str) -> SessionResult<UserProfile> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        self.update(&SessionInput::LoginAttempt, SessionState::clear)?;
        debug!(username = %username, "Attempting login");

        let request = ApiRequest::post(TOKEN_PATH).json(json!({
            "username": username,
            "password": password,
        }));

        let tokens = match self.request_tokens(&request).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(username = %username, error = %e, "Login failed");
                self.end_session(SessionInput::AttemptFailed);
                return Err(e);
            }
        };

        self.hold_tokens(&tokens)?;
        if let Err(e) = self.vault.store_tokens(&tokens.access, &tokens.refresh) {
            self.end_session(SessionInput::AttemptFailed);
            return Err(e.into());
        }

        let user = match self.load_user(&tokens.access).await {
            Ok(user) => user,
            Err(e) => {
                warn!(username = %username, error = %e, "Login succeeded but user fetch failed");
                self.end_session(SessionInput::AttemptFailed);
                return Err(e);
            }
        };

        self.update(&SessionInput::SessionEstablished, |state| {
            state.current_user = Some(user.clone());
        })?;
        info!(username = %user.username, user_id = user.id, "Login successful");

        Ok(user)
    }

    async fn request_tokens(&self, request: &ApiRequest) -> SessionResult<TokenPair> {
        let response = self.dispatch(request, None).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, "Token request rejected");
        if status.is_client_error() {
            Err(SessionError::Credential(
                error_message(&body).unwrap_or_else(|| LOGIN_FALLBACK.to_string()),
            ))
        } else {
            Err(api_error(status, &body, REQUEST_FALLBACK))
        }
    }

    /// Keep tokens in memory for an attempt that is still in progress.
    fn hold_tokens(&self, tokens: &TokenPair) -> SessionResult<()> {
        let mut state = self.state.lock();
        if state.status() != SessionStatus::Authenticating {
            return Err(SessionError::InvalidStateTransition(
                "Session ended while logging in".to_string(),
            ));
        }
        state.access_token = Some(tokens.access.clone());
        state.refresh_token = Some(tokens.refresh.clone());
        Ok(())
    }

    /// Register a new account. Does not log in.
    ///
    /// Returns the created profile when the server includes one.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> SessionResult<Option<UserProfile>> {
        if password != confirm_password {
            return Err(SessionError::Validation(
                "Passwords do not match".to_string(),
            ));
        }

        let request = ApiRequest::post(REGISTER_PATH).json(json!({
            "username": username.trim(),
            "email": email.trim(),
            "password": password,
            "confirm_password": confirm_password,
        }));

        let response = self.dispatch(&request, None).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, username = %username, body = %body, "Registration failed");
            let message = error_message(&body).unwrap_or_else(|| REGISTER_FALLBACK.to_string());
            return Err(if status.is_client_error() {
                SessionError::Credential(message)
            } else {
                SessionError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let body = response.text().await.unwrap_or_default();
        let registered = serde_json::from_str::<Registered>(&body).ok();
        let message = match &registered {
            Some(Registered::Envelope { message, .. }) => message.as_deref(),
            _ => None,
        };
        info!(username = %username, message = ?message, "Registration successful");
        Ok(registered.map(Registered::into_user))
    }

    /// Log out. Clears tokens in memory and in the store. Never fails.
    pub fn logout(&self) {
        let _ = self.update(&SessionInput::Logout, SessionState::clear);
        if let Err(e) = self.vault.clear() {
            warn!(error = %e, "Failed to clear stored tokens on logout");
        }
        info!("Logged out");
    }

    /// Fetch the current user.
    ///
    /// A `401` goes through the refresh protocol. Any other failure ends the
    /// session.
    pub async fn fetch_current_user(&self) -> SessionResult<UserProfile> {
        let user = match self.execute_json::<UserProfile>(ApiRequest::get(ME_PATH)).await {
            Ok(user) => user,
            Err(SessionError::NotLoggedIn) => return Err(SessionError::NotLoggedIn),
            // Refresh failure already ended the session
            Err(SessionError::AuthExpired) => return Err(SessionError::AuthExpired),
            Err(e) => {
                warn!(error = %e, "Failed to fetch current user, ending session");
                self.end_session(SessionInput::AttemptFailed);
                return Err(e);
            }
        };

        self.establish_user(user.clone())?;
        debug!(username = %user.username, "Current user loaded");
        Ok(user)
    }

    /// Update bio and/or profile picture. On failure the current user is
    /// left unchanged.
    pub async fn update_profile(&self, update: ProfileUpdate) -> SessionResult<UserProfile> {
        if update.is_empty() {
            return Err(SessionError::Validation("Nothing to update".to_string()));
        }

        let mut body = MultipartBody::default();
        if let Some(bio) = update.bio {
            body = body.text("bio", bio);
        }
        if let Some(image) = update.image {
            image.validate()?;
            body = body.file("profile_picture", image);
        }

        let response = self
            .send_authorized(ApiRequest::patch(ME_PATH).multipart(body))
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Profile update failed");
            return Err(api_error(status, &body, PROFILE_FALLBACK));
        }

        let user: UserProfile = response.json().await?;
        self.establish_user(user.clone())?;
        info!(username = %user.username, "Profile updated");

        Ok(user)
    }

    /// Validate tokens left in the store by a previous run.
    ///
    /// Returns `Ok(false)` if there is no complete stored session; a partial
    /// one is cleared.
    pub async fn restore(&self) -> SessionResult<bool> {
        let access = self.vault.access_token()?;
        let refresh = self.vault.refresh_token()?;

        let (Some(access), Some(refresh)) = (access, refresh) else {
            info!("No stored session found");
            self.vault.clear()?;
            return Ok(false);
        };

        self.update(&SessionInput::RestoreAttempt, move |state| {
            state.access_token = Some(access);
            state.refresh_token = Some(refresh);
        })?;
        info!("Restoring stored session");

        let user = self.fetch_current_user().await?;
        info!(username = %user.username, "Session restored");
        Ok(true)
    }

    /// Patch the current user's counts after a follow round-trip.
    pub fn patch_counts(&self, followers_count: Option<u64>, following_count: Option<u64>) {
        let mut state = self.state.lock();
        if let Some(user) = state.current_user.as_mut() {
            if let Some(count) = followers_count {
                user.followers_count = count;
            }
            if let Some(count) = following_count {
                user.following_count = count;
            }
        }
    }
}

/// Make sure relative endpoint paths join under the base path instead of
/// replacing its last segment.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use devconnect_storage::{MemoryStorage, StorageKeys};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_test_client() -> SessionClient {
        let vault = TokenVault::new(Box::new(MemoryStorage::new()));
        SessionClient::new(Url::parse("http://localhost:8000/api").unwrap(), vault).unwrap()
    }

    fn test_user() -> UserProfile {
        serde_json::from_value(json!({ "id": 1, "username": "alice" })).unwrap()
    }

    #[test]
    fn test_normalize_base_url() {
        let url = normalize_base_url(Url::parse("http://localhost:8000/api").unwrap());
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
        assert_eq!(url.join("users/me/").unwrap().path(), "/api/users/me/");

        let url = normalize_base_url(Url::parse("https://example.com/api/").unwrap());
        assert_eq!(url.as_str(), "https://example.com/api/");

        let url = normalize_base_url(Url::parse("https://example.com").unwrap());
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_initial_state() {
        let client = create_test_client();
        assert_eq!(client.status(), SessionStatus::Unauthenticated);
        assert!(client.get_access_token().is_none());
        assert!(client.current_user().is_none());
        assert!(!client.snapshot().has_access_token);
    }

    #[test]
    fn test_update_rejects_invalid_transition_without_mutating() {
        let client = create_test_client();
        let result = client.update(&SessionInput::SessionEstablished, |state| {
            state.current_user = Some(test_user());
        });

        assert!(matches!(result, Err(SessionError::InvalidStateTransition(_))));
        assert!(client.current_user().is_none());
        assert_eq!(client.status(), SessionStatus::Unauthenticated);
    }

    #[test]
    fn test_end_session_falls_back_to_logout() {
        let client = create_test_client();
        client
            .update(&SessionInput::LoginAttempt, |state| {
                state.access_token = Some("A1".to_string());
            })
            .unwrap();
        client
            .update(&SessionInput::SessionEstablished, |state| {
                state.current_user = Some(test_user());
            })
            .unwrap();

        // AttemptFailed is not valid from Authenticated
        client.end_session(SessionInput::AttemptFailed);
        assert_eq!(client.status(), SessionStatus::Unauthenticated);
        assert!(client.get_access_token().is_none());
        assert!(client.current_user().is_none());
    }

    #[test]
    fn test_logout_is_idempotent_and_clears_store() {
        let vault = TokenVault::new(Box::new(MemoryStorage::with_entries([
            (StorageKeys::ACCESS_TOKEN, "A1"),
            (StorageKeys::REFRESH_TOKEN, "R1"),
        ])));
        let client =
            SessionClient::new(Url::parse("http://localhost:8000/api").unwrap(), vault).unwrap();

        client.logout();
        client.logout();

        assert_eq!(client.status(), SessionStatus::Unauthenticated);
        assert!(!client.vault.has_session().unwrap());
    }

    #[test]
    fn test_patch_counts_only_touches_counts() {
        let client = create_test_client();
        // Without a user this is a no-op
        client.patch_counts(Some(1), Some(2));

        client.update(&SessionInput::LoginAttempt, |_| {}).unwrap();
        client
            .update(&SessionInput::SessionEstablished, |state| {
                state.current_user = Some(test_user());
            })
            .unwrap();

        client.patch_counts(None, Some(9));
        let user = client.current_user().unwrap();
        assert_eq!(user.following_count, 9);
        assert_eq!(user.followers_count, 0);
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn test_status_callback_invoked_on_change_only() {
        let client = create_test_client();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        client.set_status_callback(Box::new(move |_payload| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        client.update(&SessionInput::LoginAttempt, |_| {}).unwrap();
        client.update(&SessionInput::TokenRefreshed, |_| {}).unwrap();
        client.update(&SessionInput::AttemptFailed, |_| {}).unwrap();

        // TokenRefreshed keeps the status, so only two notifications
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_status_callback_may_replace_itself() {
        let client = Arc::new(create_test_client());
        let calls = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&client);
        let calls_clone = calls.clone();
        client.set_status_callback(Box::new(move |_payload| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(client) = weak.upgrade() {
                let calls_inner = calls_clone.clone();
                client.set_status_callback(Box::new(move |_payload| {
                    calls_inner.fetch_add(10, Ordering::SeqCst);
                }));
            }
        }));

        client.update(&SessionInput::LoginAttempt, |_| {}).unwrap();
        client.update(&SessionInput::AttemptFailed, |_| {}).unwrap();

        // First change ran the original, second the replacement
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_update_profile_while_authenticating_establishes_session() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/users/me/"))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "username": "alice",
                "bio": "hello"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vault = TokenVault::new(Box::new(MemoryStorage::new()));
        let base_url = Url::parse(&format!("{}/api", server.uri())).unwrap();
        let client = SessionClient::new(base_url, vault).unwrap();
        client
            .update(&SessionInput::LoginAttempt, |state| {
                state.access_token = Some("A1".to_string());
            })
            .unwrap();

        let user = client
            .update_profile(ProfileUpdate::default().with_bio("hello"))
            .await
            .unwrap();

        assert_eq!(user.bio.as_deref(), Some("hello"));
        assert_eq!(client.status(), SessionStatus::Authenticated);
        assert_eq!(client.current_user().unwrap().bio.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_register_password_mismatch_is_local() {
        // Port 9 is never contacted; the mismatch is caught first
        let vault = TokenVault::new(Box::new(MemoryStorage::new()));
        let client =
            SessionClient::new(Url::parse("http://127.0.0.1:9/api").unwrap(), vault).unwrap();

        let err = client
            .register("alice", "alice@example.com", "p1", "p2")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(ref m) if m == "Passwords do not match"));
    }

    #[tokio::test]
    async fn test_authorized_request_without_session() {
        let client = create_test_client();
        let err = client.fetch_current_user().await.unwrap_err();
        assert!(matches!(err, SessionError::NotLoggedIn));
        assert_eq!(client.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_refresh_without_any_token() {
        let client = create_test_client();
        assert!(matches!(
            client.refresh().await,
            Err(SessionError::NotLoggedIn)
        ));
    }
}
