//! Spark Auth client for Rust
//!
//! This crate talks to the GoTrue-compatible auth endpoints of the Spark
//! backend: account creation, password sign in / sign out, session retrieval
//! and refresh, account updates, and auth state change notifications.

mod storage;

use chrono::Utc;
use log::{debug, warn};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;

pub use storage::{MemoryStorage, SessionStorage};

/// Key under which the token session is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "spark.auth.token";

/// Sessions are treated as expired this many seconds before the server would.
const EXPIRY_MARGIN_SECS: i64 = 10;

/// エラー型
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing session")]
    MissingSession,

    #[error("Session storage error: {0}")]
    StorageError(#[from] std::io::Error),
}

/// ユーザー情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub app_metadata: serde_json::Value,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl User {
    /// The `username` stored in the account metadata, if any.
    pub fn username(&self) -> Option<&str> {
        self.user_metadata
            .get("username")
            .and_then(serde_json::Value::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// セッション情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unix timestamp; filled in from `expires_in` when the server omits it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub token_type: String,
    pub user: User,
}

impl Session {
    fn stamped(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(Utc::now().timestamp() + self.expires_in);
        }
        self
    }

    /// Check if the session has expired (or is about to)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now().timestamp() + EXPIRY_MARGIN_SECS >= expires_at,
            None => false,
        }
    }
}

/// Result of an account creation.
///
/// When the backend requires email confirmation only the user comes back and
/// `session` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: Option<User>,
    pub session: Option<Session>,
}

impl SignUpResponse {
    pub fn confirmation_required(&self) -> bool {
        self.user.is_some() && self.session.is_none()
    }
}

/// Account fields accepted by [`Auth::update_user`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Merged into the user metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Auth state transitions, delivered to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    UserUpdated,
    TokenRefreshed,
}

/// クライアントオプション
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub auto_refresh_token: bool,
    pub persist_session: bool,
    pub storage_key: String,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Error payloads vary between GoTrue versions.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ApiErrorBody {
    fn is_invalid_grant(&self) -> bool {
        self.error.as_deref() == Some("invalid_grant")
    }

    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

async fn error_from_response(response: Response) -> AuthError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ApiErrorBody>(&text).unwrap_or_default();
    let invalid_grant = body.is_invalid_grant();
    let message = body.into_message().unwrap_or(text);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AuthError::AuthenticationError(message),
        StatusCode::BAD_REQUEST if invalid_grant => AuthError::AuthenticationError(message),
        _ => AuthError::ApiError(format!("{} (Status: {})", message, status)),
    }
}

/// Auth クライアント
pub struct Auth {
    url: String,
    key: String,
    http_client: Client,
    options: AuthOptions,
    current_session: Arc<RwLock<Option<Session>>>,
    storage: Arc<dyn SessionStorage>,
    events: broadcast::Sender<AuthChangeEvent>,
}

impl Auth {
    /// 新しい Auth クライアントを作成
    pub fn new(url: &str, key: &str, http_client: Client, options: AuthOptions) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            http_client,
            options,
            current_session: Arc::new(RwLock::new(None)),
            storage: Arc::new(MemoryStorage::new()),
            events,
        }
    }

    /// Use `storage` for the persisted session and restore whatever it holds.
    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = storage;
        if self.options.persist_session {
            match self.load_persisted() {
                Ok(Some(session)) => {
                    debug!("Restored persisted session for user {}", session.user.id);
                    *self.current_session.write().unwrap_or_else(PoisonError::into_inner) =
                        Some(session);
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring unreadable persisted session: {}", e),
            }
        }
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn load_persisted(&self) -> Result<Option<Session>, AuthError> {
        match self.storage.get_item(&self.options.storage_key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn persist(&self, session: Option<&Session>) {
        if !self.options.persist_session {
            return;
        }
        let result = match session {
            Some(session) => serde_json::to_string(session)
                .map_err(AuthError::from)
                .and_then(|raw| {
                    self.storage
                        .set_item(&self.options.storage_key, &raw)
                        .map_err(AuthError::from)
                }),
            None => self
                .storage
                .remove_item(&self.options.storage_key)
                .map_err(AuthError::from),
        };
        if let Err(e) = result {
            warn!("Failed to persist session: {}", e);
        }
    }

    fn store_session(&self, session: Option<Session>) {
        self.persist(session.as_ref());
        *self.current_session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Subscribe to auth state changes.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthChangeEvent> {
        self.events.subscribe()
    }

    /// Publish a state change observed elsewhere (another process sharing the
    /// same storage, for example) to every subscriber.
    pub fn emit(&self, event: AuthChangeEvent) {
        debug!("Auth state change: {:?}", event);
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// ユーザー登録
    ///
    /// `data` is stored as user metadata on the new account.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        data: Option<serde_json::Value>,
    ) -> Result<SignUpResponse, AuthError> {
        let url = self.endpoint("/signup");

        let mut payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        if let Some(data) = data {
            payload["data"] = data;
        }

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        // Autoconfirming backends answer with a session, the rest with the bare user.
        let body: serde_json::Value = response.json().await?;
        let result = if body.get("access_token").is_some() {
            let session = serde_json::from_value::<Session>(body)?.stamped();
            SignUpResponse {
                user: Some(session.user.clone()),
                session: Some(session),
            }
        } else if body.get("id").is_some() {
            SignUpResponse {
                user: Some(serde_json::from_value(body)?),
                session: None,
            }
        } else {
            SignUpResponse {
                user: None,
                session: None,
            }
        };

        if let Some(session) = &result.session {
            self.store_session(Some(session.clone()));
            self.emit(AuthChangeEvent::SignedIn);
        }

        Ok(result)
    }

    /// メール・パスワードでログイン
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = self.endpoint("/token?grant_type=password");

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let session = response.json::<Session>().await?.stamped();

        self.store_session(Some(session.clone()));
        self.emit(AuthChangeEvent::SignedIn);

        Ok(session)
    }

    /// 現在のセッションを取得 (no network)
    pub fn get_session(&self) -> Option<Session> {
        self.current_session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the stored session without notifying subscribers.
    pub fn set_session(&self, session: Session) {
        self.store_session(Some(session.stamped()));
    }

    /// Forget the local session, persisted copy included, without calling
    /// the server or notifying subscribers.
    ///
    /// For sign-outs that already happened elsewhere.
    pub fn clear_session(&self) {
        self.store_session(None);
    }

    /// The current session, refreshed first when it has expired and
    /// auto refresh is enabled.
    pub async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        match self.get_session() {
            Some(session) if session.is_expired() && self.options.auto_refresh_token => {
                debug!("Session for user {} expired, refreshing", session.user.id);
                self.refresh_session().await.map(Some)
            }
            other => Ok(other),
        }
    }

    /// 現在のユーザーを取得 (verified with the server)
    pub async fn get_user(&self) -> Result<User, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;

        let response = self
            .http_client
            .get(self.endpoint("/user"))
            .header("apikey", &self.key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json::<User>().await?)
    }

    /// Update the signed-in account
    pub async fn update_user(&self, attributes: UserAttributes) -> Result<User, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;

        let response = self
            .http_client
            .put(self.endpoint("/user"))
            .header("apikey", &self.key)
            .bearer_auth(&session.access_token)
            .json(&attributes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let user: User = response.json().await?;

        self.store_session(Some(Session {
            user: user.clone(),
            ..session
        }));
        self.emit(AuthChangeEvent::UserUpdated);

        Ok(user)
    }

    /// セッションをリフレッシュ
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;

        let payload = serde_json::json!({
            "refresh_token": session.refresh_token,
        });

        let response = self
            .http_client
            .post(self.endpoint("/token?grant_type=refresh_token"))
            .header("apikey", &self.key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let new_session = response.json::<Session>().await?.stamped();

        self.store_session(Some(new_session.clone()));
        self.emit(AuthChangeEvent::TokenRefreshed);

        Ok(new_session)
    }

    /// サインアウト
    ///
    /// The local session is only dropped once the server has accepted the
    /// logout.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.get_session().ok_or(AuthError::MissingSession)?;

        let response = self
            .http_client
            .post(self.endpoint("/logout"))
            .header("apikey", &self.key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        self.store_session(None);
        self.emit(AuthChangeEvent::SignedOut);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_body(access_token: &str) -> serde_json::Value {
        serde_json::json!({
            "access_token": access_token,
            "refresh_token": "test_refresh_token",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {
                "id": "test_user_id",
                "email": "test@example.com",
                "app_metadata": {},
                "user_metadata": { "username": "tester" },
                "created_at": "2021-01-01T00:00:00Z",
                "updated_at": "2021-01-01T00:00:00Z"
            }
        })
    }

    fn auth_for(server: &MockServer) -> Auth {
        Auth::new(&server.uri(), "test_key", Client::new(), AuthOptions::default())
    }

    fn seeded_session(expires_at: i64) -> Session {
        serde_json::from_value::<Session>(serde_json::json!({
            "access_token": "old_access_token",
            "refresh_token": "old_refresh_token",
            "expires_in": 3600,
            "expires_at": expires_at,
            "token_type": "bearer",
            "user": { "id": "test_user_id", "email": "test@example.com" }
        }))
        .unwrap()
    }

    #[test]
    fn test_sign_up_requiring_confirmation() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/auth/v1/signup"))
                .and(body_json(serde_json::json!({
                    "email": "alice@x.com",
                    "password": "secret1",
                    "data": { "username": "alice" }
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": "alice_id",
                    "email": "alice@x.com",
                    "user_metadata": { "username": "alice" },
                    "confirmation_sent_at": "2024-01-01T00:00:00Z"
                })))
                .mount(&mock_server)
                .await;

            let auth = auth_for(&mock_server);
            let mut events = auth.on_auth_state_change();

            let result = auth
                .sign_up(
                    "alice@x.com",
                    "secret1",
                    Some(serde_json::json!({ "username": "alice" })),
                )
                .await
                .unwrap();

            assert!(result.confirmation_required());
            assert_eq!(result.user.unwrap().username(), Some("alice"));
            assert!(auth.get_session().is_none());
            assert!(events.try_recv().is_err());
        });
    }

    #[tokio::test]
    async fn test_sign_up_with_autoconfirm_stores_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("signup_token")))
            .mount(&mock_server)
            .await;

        let auth = auth_for(&mock_server);
        let mut events = auth.on_auth_state_change();

        let result = auth.sign_up("test@example.com", "password123", None).await.unwrap();

        assert!(!result.confirmation_required());
        assert_eq!(auth.get_session().unwrap().access_token, "signup_token");
        assert_eq!(events.recv().await.unwrap(), AuthChangeEvent::SignedIn);
    }

    #[tokio::test]
    async fn test_sign_in_with_password() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("test_access_token")))
            .mount(&mock_server)
            .await;

        let storage = Arc::new(MemoryStorage::new());
        let auth = auth_for(&mock_server).with_storage(storage.clone());
        let mut events = auth.on_auth_state_change();

        let session = auth
            .sign_in_with_password("test@example.com", "password123")
            .await
            .unwrap();

        assert_eq!(session.access_token, "test_access_token");
        assert_eq!(session.user.username(), Some("tester"));
        assert!(session.expires_at.is_some());
        assert!(storage.get_item(DEFAULT_STORAGE_KEY).unwrap().is_some());
        assert_eq!(events.recv().await.unwrap(), AuthChangeEvent::SignedIn);
    }

    #[tokio::test]
    async fn test_sign_in_with_bad_credentials() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&mock_server)
            .await;

        let auth = auth_for(&mock_server);
        let result = auth.sign_in_with_password("test@example.com", "wrong").await;

        match result {
            Err(AuthError::AuthenticationError(message)) => {
                assert_eq!(message, "Invalid login credentials")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(auth.get_session().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_and_storage() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer old_access_token"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let storage = Arc::new(MemoryStorage::new());
        let auth = auth_for(&mock_server).with_storage(storage.clone());
        auth.set_session(seeded_session(Utc::now().timestamp() + 3600));
        let mut events = auth.on_auth_state_change();

        auth.sign_out().await.unwrap();

        assert!(auth.get_session().is_none());
        assert!(storage.get_item(DEFAULT_STORAGE_KEY).unwrap().is_none());
        assert_eq!(events.recv().await.unwrap(), AuthChangeEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_failed_sign_out_keeps_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let auth = auth_for(&mock_server);
        auth.set_session(seeded_session(Utc::now().timestamp() + 3600));

        assert!(matches!(auth.sign_out().await, Err(AuthError::ApiError(_))));
        assert!(auth.get_session().is_some());
    }

    #[tokio::test]
    async fn test_current_session_refreshes_expired_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_json(serde_json::json!({ "refresh_token": "old_refresh_token" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("new_access_token")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let auth = auth_for(&mock_server);
        auth.set_session(seeded_session(Utc::now().timestamp() - 60));

        let session = auth.current_session().await.unwrap().unwrap();
        assert_eq!(session.access_token, "new_access_token");
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn test_clear_session_drops_persisted_copy_silently() {
        let server = MockServer::start().await;
        let storage = Arc::new(MemoryStorage::new());
        let auth = auth_for(&server).with_storage(storage.clone());
        auth.set_session(seeded_session(Utc::now().timestamp() + 3600));
        assert!(storage.get_item(DEFAULT_STORAGE_KEY).unwrap().is_some());
        let mut events = auth.on_auth_state_change();

        auth.clear_session();

        assert!(auth.get_session().is_none());
        assert_eq!(storage.get_item(DEFAULT_STORAGE_KEY).unwrap(), None);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_user_emits_user_updated() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/auth/v1/user"))
            .and(body_json(serde_json::json!({ "data": { "username": "renamed" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "test_user_id",
                "email": "test@example.com",
                "user_metadata": { "username": "renamed" }
            })))
            .mount(&mock_server)
            .await;

        let auth = auth_for(&mock_server);
        auth.set_session(seeded_session(Utc::now().timestamp() + 3600));
        let mut events = auth.on_auth_state_change();

        let user = auth
            .update_user(UserAttributes {
                data: Some(serde_json::json!({ "username": "renamed" })),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(user.username(), Some("renamed"));
        assert_eq!(auth.get_session().unwrap().user.username(), Some("renamed"));
        assert_eq!(events.recv().await.unwrap(), AuthChangeEvent::UserUpdated);
    }

    #[test]
    fn test_with_storage_restores_persisted_session() {
        let storage = Arc::new(MemoryStorage::new());
        let session = seeded_session(Utc::now().timestamp() + 3600);
        storage
            .set_item(DEFAULT_STORAGE_KEY, &serde_json::to_string(&session).unwrap())
            .unwrap();

        let auth = Auth::new(
            "https://example.supabase.co",
            "test-key",
            Client::new(),
            AuthOptions::default(),
        )
        .with_storage(storage);

        assert_eq!(auth.get_session(), Some(session));
    }

    #[tokio::test]
    async fn test_get_user_without_session() {
        let auth = Auth::new(
            "https://example.supabase.co",
            "test-key",
            Client::new(),
            AuthOptions::default(),
        );
        assert!(matches!(auth.get_user().await, Err(AuthError::MissingSession)));
    }
}
