//! Delegated identity service client.

use crate::config::IdentityConfig;
use crate::error::{GigError, GigResult};
use crate::models::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// What the identity service asserts about a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// A successful sign-in: bearer token plus identity
#[derive(Debug, Clone, PartialEq)]
pub struct AuthGrant {
    pub token: String,
    pub identity: Identity,
}

/// Trait for identity services to allow mocking and abstraction
pub trait IdentityProvider {
    fn sign_up(&self, name: &str, email: &str, password: &str) -> GigResult<AuthGrant>;
    fn sign_in(&self, email: &str, password: &str) -> GigResult<AuthGrant>;
    fn sign_out(&self, token: &str) -> GigResult<()>;
    fn update_identity(
        &self,
        token: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> GigResult<Identity>;
}

/// User object as the REST backend returns it
#[derive(Debug, Deserialize)]
struct WireUser {
    #[serde(alias = "uid")]
    id: Value,
    email: String,
    #[serde(default, alias = "displayName")]
    name: Option<String>,
    #[serde(default, alias = "photoURL", alias = "photoUrl", alias = "avatarUrl")]
    avatar: Option<String>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    role: Option<Role>,
}

impl WireUser {
    fn into_identity(self) -> Identity {
        let uid = match self.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Identity {
            uid,
            email: self.email,
            display_name: self.name,
            photo_url: self.avatar,
            created_at: self.created_at,
            role: self.role,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GrantBody {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<WireUser>,
}

/// REST identity backend: `POST /login`, `POST /register`, `POST /profile`.
///
/// Success bodies are `{ token, user }`; failures carry `{ message }`.
/// Every failure, including timeouts, becomes [`GigError::AuthProvider`].
pub struct HttpIdentityProvider {
    base_url: String,
    login_path: String,
    register_path: String,
    profile_path: String,
    agent: ureq::Agent,
    debug: bool,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_path: config.login_path.clone(),
            register_path: config.register_path.clone(),
            profile_path: config.profile_path.clone(),
            agent,
            debug: false,
        }
    }

    /// Print transport failure details to stderr
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn post(&self, path: &str, token: Option<&str>, body: Value, fallback: &str) -> GigResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.agent.post(&url).set("Content-Type", "application/json");
        if let Some(token) = token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        match request.send_json(body) {
            Ok(resp) => resp
                .into_json::<Value>()
                .map_err(|_| GigError::AuthProvider("Unexpected server response.".to_string())),
            Err(ureq::Error::Status(code, resp)) => {
                let message = resp
                    .into_json::<Value>()
                    .ok()
                    .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                    .unwrap_or_else(|| format!("{} (status {})", fallback, code));
                Err(GigError::AuthProvider(message))
            }
            Err(e) => {
                if self.debug {
                    eprintln!("[DEBUG] Identity request failed: {}", e);
                }
                Err(GigError::AuthProvider(
                    "Cannot reach identity service.".to_string(),
                ))
            }
        }
    }

    fn grant_from(body: Value) -> GigResult<Option<AuthGrant>> {
        let body: GrantBody = serde_json::from_value(body)
            .map_err(|_| GigError::AuthProvider("Unexpected server response.".to_string()))?;
        match (body.token, body.user) {
            (Some(token), Some(user)) => Ok(Some(AuthGrant {
                token,
                identity: user.into_identity(),
            })),
            _ => Ok(None),
        }
    }
}

impl IdentityProvider for HttpIdentityProvider {
    fn sign_up(&self, name: &str, email: &str, password: &str) -> GigResult<AuthGrant> {
        let body = self.post(
            &self.register_path,
            None,
            json!({ "name": name, "email": email, "password": password }),
            "Registration failed.",
        )?;
        match Self::grant_from(body)? {
            Some(grant) => Ok(grant),
            // Backends that only create the account expect a separate login
            None => self.sign_in(email, password),
        }
    }

    fn sign_in(&self, email: &str, password: &str) -> GigResult<AuthGrant> {
        let body = self.post(
            &self.login_path,
            None,
            json!({ "email": email, "password": password }),
            "Invalid email or password.",
        )?;
        Self::grant_from(body)?
            .ok_or_else(|| GigError::AuthProvider("Unexpected server response.".to_string()))
    }

    /// The backend keeps no server-side session; dropping the token is enough
    fn sign_out(&self, _token: &str) -> GigResult<()> {
        Ok(())
    }

    fn update_identity(
        &self,
        token: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> GigResult<Identity> {
        let body = self.post(
            &self.profile_path,
            Some(token),
            json!({ "name": display_name, "avatarUrl": photo_url }),
            "Profile update failed.",
        )?;
        let user = body.get("user").cloned().unwrap_or(body);
        let user: WireUser = serde_json::from_value(user)
            .map_err(|_| GigError::AuthProvider("Unexpected server response.".to_string()))?;
        Ok(user.into_identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// A request as the test server saw it
    struct Captured {
        head: String,
        body: String,
    }

    /// Answer one connection per canned `(status, body)` pair, in order
    fn serve(responses: Vec<(&str, &str)>) -> (String, thread::JoinHandle<Vec<Captured>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let responses: Vec<(String, String)> = responses
            .into_iter()
            .map(|(status, body)| (status.to_string(), body.to_string()))
            .collect();

        let handle = thread::spawn(move || {
            let mut captured = Vec::new();
            for (status, body) in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut head = String::new();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let trimmed = line.trim_end();
                    if trimmed.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = trimmed.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap();
                        }
                    }
                    head.push_str(&line);
                }
                let mut request_body = vec![0u8; content_length];
                reader.read_exact(&mut request_body).unwrap();

                let mut stream = stream;
                write!(
                    stream,
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                )
                .unwrap();
                stream.flush().unwrap();
                captured.push(Captured {
                    head,
                    body: String::from_utf8(request_body).unwrap(),
                });
            }
            captured
        });

        (format!("http://{}", addr), handle)
    }

    fn serve_once(status: &str, body: &str) -> (String, thread::JoinHandle<Vec<Captured>>) {
        serve(vec![(status, body)])
    }

    fn provider(base_url: &str) -> HttpIdentityProvider {
        HttpIdentityProvider::new(&IdentityConfig {
            base_url: base_url.to_string(),
            timeout_ms: 2_000,
            ..Default::default()
        })
    }

    #[test]
    fn test_sign_in_parses_token_and_user() {
        let (url, handle) = serve_once(
            "200 OK",
            r#"{"token":"tok-1","user":{"id":42,"email":"maya@x.com","name":"Maya"}}"#,
        );
        let grant = provider(&url).sign_in("maya@x.com", "pw1234").unwrap();
        let sent: Value = serde_json::from_str(&handle.join().unwrap()[0].body).unwrap();

        assert_eq!(sent["email"], "maya@x.com");
        assert_eq!(grant.token, "tok-1");
        assert_eq!(grant.identity.uid, "42");
        assert_eq!(grant.identity.display_name.as_deref(), Some("Maya"));
    }

    #[test]
    fn test_error_status_uses_server_message() {
        let (url, handle) = serve_once("401 Unauthorized", r#"{"message":"Wrong password"}"#);
        let err = provider(&url).sign_in("maya@x.com", "nope").unwrap_err();
        handle.join().unwrap();
        match err {
            GigError::AuthProvider(msg) => assert_eq!(msg, "Wrong password"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_status_without_message() {
        let (url, handle) = serve_once("500 Internal Server Error", "oops");
        let err = provider(&url).sign_in("maya@x.com", "pw").unwrap_err();
        handle.join().unwrap();
        match err {
            GigError::AuthProvider(msg) => {
                assert!(msg.starts_with("Invalid email or password."));
                assert!(msg.contains("500"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_token_is_unexpected_response() {
        let (url, handle) = serve_once("200 OK", r#"{"ok":true}"#);
        let err = provider(&url).sign_in("maya@x.com", "pw").unwrap_err();
        handle.join().unwrap();
        assert!(matches!(err, GigError::AuthProvider(m) if m == "Unexpected server response."));
    }

    #[test]
    fn test_unreachable_service_is_provider_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = provider(&format!("http://{}", addr))
            .sign_in("maya@x.com", "pw")
            .unwrap_err();
        match err {
            GigError::AuthProvider(msg) => {
                assert_eq!(msg, "Cannot reach identity service.");
                assert!(!msg.contains(&addr.to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(1_500));
            drop(stream);
        });

        let provider = HttpIdentityProvider::new(&IdentityConfig {
            base_url: format!("http://{}", addr),
            timeout_ms: 200,
            ..Default::default()
        });
        let started = std::time::Instant::now();
        let err = provider.sign_in("maya@x.com", "pw").unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(1_200));
        assert!(matches!(err, GigError::AuthProvider(_)));
        handle.join().unwrap();
    }

    #[test]
    fn test_update_identity_sends_bearer_token() {
        let (url, handle) = serve_once(
            "200 OK",
            r#"{"user":{"id":"u-7","email":"maya@x.com","name":"Maya Rahman","avatarUrl":"https://img/p.png"}}"#,
        );
        let identity = provider(&url)
            .update_identity("tok-9", Some("Maya Rahman"), Some("https://img/p.png"))
            .unwrap();
        let captured = handle.join().unwrap();

        assert!(captured[0].head.starts_with("POST /profile "));
        assert!(captured[0]
            .head
            .lines()
            .any(|l| l.eq_ignore_ascii_case("authorization: Bearer tok-9")));
        let sent: Value = serde_json::from_str(&captured[0].body).unwrap();
        assert_eq!(sent["name"], "Maya Rahman");
        assert_eq!(sent["avatarUrl"], "https://img/p.png");
        assert_eq!(identity.uid, "u-7");
        assert_eq!(identity.photo_url.as_deref(), Some("https://img/p.png"));
    }

    #[test]
    fn test_sign_up_without_grant_signs_in() {
        let (url, handle) = serve(vec![
            ("201 Created", "{}"),
            (
                "200 OK",
                r#"{"token":"tok-2","user":{"id":"u-2","email":"maya@x.com","name":"Maya"}}"#,
            ),
        ]);
        let grant = provider(&url).sign_up("Maya", "maya@x.com", "pw1234").unwrap();
        let captured = handle.join().unwrap();

        assert!(captured[0].head.starts_with("POST /register "));
        assert!(captured[1].head.starts_with("POST /login "));
        let login: Value = serde_json::from_str(&captured[1].body).unwrap();
        assert_eq!(login["email"], "maya@x.com");
        assert!(login.get("name").is_none());
        assert_eq!(grant.token, "tok-2");
        assert_eq!(grant.identity.uid, "u-2");
    }

    #[test]
    fn test_identity_round_trips_through_json() {
        let identity = Identity {
            uid: "u".to_string(),
            email: "e@x.com".to_string(),
            display_name: Some("E".to_string()),
            photo_url: None,
            created_at: None,
            role: Some(Role::JobProvider),
        };
        let json = serde_json::to_string(&identity).unwrap();
        assert!(json.contains("displayName"));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }
}
