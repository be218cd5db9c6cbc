//! Shared harness for session client integration tests.
//!
//! Provides:
//! - TestApi: a wiremock server standing in for the DevConnect API, plus a
//!   temporary token file the client persists into
//! - JSON builders for the server's user and post shapes

#![allow(dead_code)]

use devconnect_session::SessionClient;
use devconnect_storage::{FileStorage, StorageKeys, TokenStore, TokenVault};
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestApi {
    pub server: MockServer,
    tokens_path: PathBuf,
    _dir: TempDir,
}

impl TestApi {
    pub async fn start() -> Self {
        let dir = TempDir::new().unwrap();
        Self {
            server: MockServer::start().await,
            tokens_path: dir.path().join("tokens.json"),
            _dir: dir,
        }
    }

    /// API base as configured by users, without a trailing slash.
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("{}/api", self.server.uri())).unwrap()
    }

    pub fn vault(&self) -> TokenVault {
        TokenVault::new(Box::new(FileStorage::open(&self.tokens_path).unwrap()))
    }

    pub fn client(&self) -> SessionClient {
        SessionClient::new(self.base_url(), self.vault()).unwrap()
    }

    /// Write tokens to the store as a previous run would have.
    pub fn seed_tokens(&self, access: Option<&str>, refresh: Option<&str>) {
        let storage = FileStorage::open(&self.tokens_path).unwrap();
        if let Some(access) = access {
            storage.set(StorageKeys::ACCESS_TOKEN, access).unwrap();
        }
        if let Some(refresh) = refresh {
            storage.set(StorageKeys::REFRESH_TOKEN, refresh).unwrap();
        }
    }

    /// Tokens currently persisted, read back from disk.
    pub fn stored_tokens(&self) -> (Option<String>, Option<String>) {
        let vault = self.vault();
        (vault.access_token().unwrap(), vault.refresh_token().unwrap())
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    pub async fn mount_login(&self, username: &str, password: &str, access: &str, refresh: &str) {
        Mock::given(method("POST"))
            .and(path("/api/token/"))
            .and(body_json(json!({ "username": username, "password": password })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access": access,
                "refresh": refresh,
                "user": user_json(1, username),
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_me(&self, access: &str, user: Value) {
        Mock::given(method("GET"))
            .and(path("/api/users/me/"))
            .and(header("Authorization", format!("Bearer {}", access).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(user))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_refresh(&self, refresh: &str, response: ResponseTemplate, times: u64) {
        Mock::given(method("POST"))
            .and(path("/api/token/refresh/"))
            .and(body_json(json!({ "refresh": refresh })))
            .respond_with(response)
            .expect(times)
            .named("token refresh")
            .mount(&self.server)
            .await;
    }

    /// A client logged in as alice (id 1) with tokens A1/R1.
    pub async fn logged_in_client(&self) -> SessionClient {
        self.mount_login("alice", "secret", "A1", "R1").await;
        self.mount_me("A1", user_json(1, "alice")).await;

        let client = self.client();
        client.login("alice", "secret").await.unwrap();
        client
    }
}

pub fn user_json(id: u64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{}@example.com", username),
        "bio": null,
        "profile_picture": null,
        "location": null,
        "birth_date": null,
        "followers_count": 0,
        "following_count": 0,
        "is_followed": false
    })
}

pub fn post_json(id: u64, author: &str, content: &str) -> Value {
    json!({
        "id": id,
        "author": author,
        "content": content,
        "image": null,
        "created_at": "2024-05-01T10:00:00.000000Z",
        "updated_at": "2024-05-01T10:00:00.000000Z"
    })
}
