use crate::error::{ApiError, AuthError};
use crate::models::{
    CreateUserProfile, CreateVlanProfile, LoginRequest, LoginResponse, Page, ResourceKind,
    UserProfile, VlanProfile,
};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Calls the bulk workflows make against the profile endpoints.
pub trait ProfileApi {
    fn create_vlan_profile(&self, request: &CreateVlanProfile) -> Result<VlanProfile, ApiError>;
    fn create_user_profile(&self, request: &CreateUserProfile) -> Result<(), ApiError>;
    fn list_vlan_profiles(&self, page: u32, limit: u32) -> Result<Page<VlanProfile>, ApiError>;
    fn list_user_profiles(&self, page: u32, limit: u32) -> Result<Page<UserProfile>, ApiError>;
    fn delete_vlan_profile(&self, id: u64) -> Result<(), ApiError>;
    fn delete_user_profile(&self, id: u64) -> Result<(), ApiError>;
}

/// Unauthenticated handle on the API; `login` turns it into a [`Session`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut parsed = Url::parse(base_url).context("parsing base URL")?;
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(HeaderValue::from_static("xiqctl/0.1"))
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            base_url: parsed,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Exchange credentials for a bearer token. One attempt, no retry.
    pub fn login(self, credentials: &Credentials) -> Result<Session, AuthError> {
        let body = LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
        };
        let text = self.send(Method::POST, "login", &[], Some(&body), None)?;
        let response: LoginResponse =
            serde_json::from_str(&text).map_err(|_| AuthError::MissingToken)?;
        let token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        info!(username = %credentials.username, "logged in to ExtremeCloud IQ");
        Ok(Session {
            client: self,
            token,
        })
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let normalized = path.trim_start_matches('/');
        self.base_url
            .join(normalized)
            .map_err(|e| ApiError::InvalidResponse {
                url: format!("{}{}", self.base_url, normalized),
                message: format!("joining path `{}` to base URL: {}", path, e),
            })
    }

    fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<String, ApiError> {
        let url = self.url_for(path)?;
        debug!(%method, %url, "sending request");

        let mut request = self.http.request(method, url.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().map_err(|source| ApiError::NoResponse {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let text = response.text().map_err(|source| ApiError::NoResponse {
            url: url.to_string(),
            source,
        })?;

        if status != StatusCode::OK {
            debug!(%url, status = status.as_u16(), "request rejected");
            return Err(ApiError::from_status(url.as_str(), status, &text));
        }
        Ok(text)
    }
}

/// Logged-in API handle. Every call carries the bearer token obtained at login.
pub struct Session {
    client: ApiClient,
    token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.client.base_url.as_str())
            .field("token", &"***")
            .finish()
    }
}

impl Session {
    pub fn base_url(&self) -> &Url {
        self.client.base_url()
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let text = self
            .client
            .send(Method::GET, path, query, Option::<&()>::None, Some(&self.token))?;
        decode(&self.client, path, &text)
    }

    fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String, ApiError> {
        self.client
            .send(Method::POST, path, &[], Some(body), Some(&self.token))
    }

    fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.client
            .send(Method::DELETE, path, &[], Option::<&()>::None, Some(&self.token))
            .map(|_| ())
    }

    fn list<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        page: u32,
        limit: u32,
    ) -> Result<Page<T>, ApiError> {
        self.get_json(
            kind.path(),
            &[("page", page.to_string()), ("limit", limit.to_string())],
        )
    }
}

impl ProfileApi for Session {
    fn create_vlan_profile(&self, request: &CreateVlanProfile) -> Result<VlanProfile, ApiError> {
        let path = ResourceKind::VlanProfile.path();
        let text = self.post_json(path, request)?;
        decode(&self.client, path, &text)
    }

    fn create_user_profile(&self, request: &CreateUserProfile) -> Result<(), ApiError> {
        self.post_json(ResourceKind::UserProfile.path(), request)
            .map(|_| ())
    }

    fn list_vlan_profiles(&self, page: u32, limit: u32) -> Result<Page<VlanProfile>, ApiError> {
        self.list(ResourceKind::VlanProfile, page, limit)
    }

    fn list_user_profiles(&self, page: u32, limit: u32) -> Result<Page<UserProfile>, ApiError> {
        self.list(ResourceKind::UserProfile, page, limit)
    }

    fn delete_vlan_profile(&self, id: u64) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", ResourceKind::VlanProfile.path(), id))
    }

    fn delete_user_profile(&self, id: u64) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", ResourceKind::UserProfile.path(), id))
    }
}

fn decode<T: DeserializeOwned>(client: &ApiClient, path: &str, text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::InvalidResponse {
        url: client
            .url_for(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| path.to_string()),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn creds() -> Credentials {
        Credentials {
            username: "admin@example.test".into(),
            password: "secret".into(),
        }
    }

    fn logged_in(server: &MockServer) -> Session {
        server.mock(|when, then| {
            when.method(POST).path("/login");
            then.status(200).json_body(json!({"access_token": "tok-123"}));
        });
        ApiClient::new(&server.base_url())
            .unwrap()
            .login(&creds())
            .unwrap()
    }

    #[test]
    fn login_posts_credentials_and_keeps_token() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/login")
                .header("Accept", "application/json")
                .header("Content-Type", "application/json")
                .json_body(json!({"username": "admin@example.test", "password": "secret"}));
            then.status(200)
                .json_body(json!({"access_token": "tok-123", "token_type": "Bearer"}));
        });
        let list = server.mock(|when, then| {
            when.method(GET)
                .path("/vlan-profiles")
                .query_param("page", "1")
                .query_param("limit", "100")
                .header("Authorization", "Bearer tok-123");
            then.status(200)
                .json_body(json!({"data": [], "page": 1, "total_pages": 0}));
        });

        let session = ApiClient::new(&server.base_url())
            .unwrap()
            .login(&creds())
            .unwrap();
        let page = session.list_vlan_profiles(1, 100).unwrap();

        login.assert();
        list.assert();
        assert!(page.data.is_empty());
    }

    #[test]
    fn login_rejects_non_200() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/login");
            then.status(401).json_body(json!({"error_message": "bad credentials"}));
        });

        let err = ApiClient::new(&server.base_url())
            .unwrap()
            .login(&creds())
            .unwrap_err();
        assert!(matches!(err, AuthError::Status(StatusCode::UNAUTHORIZED)));
    }

    #[test]
    fn login_without_access_token_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/login");
            then.status(200).json_body(json!({"token_type": "Bearer"}));
        });

        let err = ApiClient::new(&server.base_url())
            .unwrap()
            .login(&creds())
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[test]
    fn login_without_server_reports_no_response() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = ApiClient::new(&format!("http://127.0.0.1:{port}"))
            .unwrap()
            .login(&creds())
            .unwrap_err();
        assert!(matches!(err, AuthError::NoResponse(_)));
    }

    #[test]
    fn creates_vlan_profile_and_reads_id() {
        let server = MockServer::start();
        let session = logged_in(&server);
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/vlan-profiles")
                .header("Authorization", "Bearer tok-123")
                .json_body(
                    json!({"name": "42", "default_vlan_id": 42, "enable_classification": false}),
                );
            then.status(200)
                .json_body(json!({"id": 9001, "name": "42", "default_vlan_id": 42}));
        });

        let created = session
            .create_vlan_profile(&CreateVlanProfile::for_vlan(42))
            .unwrap();

        create.assert();
        assert_eq!(created.id, 9001);
        assert_eq!(created.default_vlan_id, Some(42));
    }

    #[test]
    fn creates_user_profile_referencing_vlan() {
        let server = MockServer::start();
        let session = logged_in(&server);
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/user-profiles")
                .json_body(json!({"name": "42", "vlan_profile_id": 9001}));
            then.status(200).json_body(json!({"id": 5}));
        });

        session
            .create_user_profile(&CreateUserProfile {
                name: "42".into(),
                vlan_profile_id: 9001,
            })
            .unwrap();
        create.assert();
    }

    #[test]
    fn delete_surfaces_status() {
        let server = MockServer::start();
        let session = logged_in(&server);
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/vlan-profiles/77");
            then.status(400).body("VLAN profile is in use");
        });

        let err = session.delete_vlan_profile(77).unwrap_err();
        delete.assert();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn only_200_counts_as_success() {
        let server = MockServer::start();
        let session = logged_in(&server);
        server.mock(|when, then| {
            when.method(DELETE).path("/user-profiles/3");
            then.status(204);
        });

        let err = session.delete_user_profile(3).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NO_CONTENT));
    }

    #[test]
    fn base_url_with_path_keeps_prefix() {
        let client = ApiClient::new("https://gw.example.test/xapi").unwrap();
        let url = client.url_for("/vlan-profiles").unwrap();
        assert_eq!(url.as_str(), "https://gw.example.test/xapi/vlan-profiles");
    }

    #[test]
    fn fetch_all_requests_each_page_once() {
        let server = MockServer::start();
        let session = logged_in(&server);
        let pages: Vec<_> = (1..=3u32)
            .map(|n| {
                server.mock(|when, then| {
                    when.method(GET)
                        .path("/user-profiles")
                        .query_param("page", n.to_string())
                        .query_param("limit", "100")
                        .header("Authorization", "Bearer tok-123");
                    then.status(200).json_body(json!({
                        "data": [{"id": 100 + n, "name": format!("profile-{n}")}],
                        "page": n,
                        "total_pages": 3
                    }));
                })
            })
            .collect();

        let profiles = crate::fetch::fetch_all(
            ResourceKind::UserProfile,
            |page, limit| session.list_user_profiles(page, limit),
            |_, _| Ok::<_, crate::error::FetchError>(()),
        )
        .unwrap();

        for mock in &pages {
            mock.assert_hits(1);
        }
        let ids: Vec<u64> = profiles.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![101, 102, 103]);
    }
}
