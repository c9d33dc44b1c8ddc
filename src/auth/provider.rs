//! Identity provider — trait and GoTrue-compatible HTTP implementation.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::{broadcast, RwLock};

use crate::error::AuthError;

use super::model::{AuthEvent, AuthSession, FederatedProvider, SignUpOutcome, UserIdentity};

/// Capacity of the auth event channel. Events are tiny and consumers are
/// few; lagged receivers just skip stale events.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Authenticates users and publishes auth lifecycle events.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account. May return a session immediately or signal that
    /// email confirmation is pending.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    /// Password sign-in.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// URL to redirect the user to for federated sign-in.
    fn federated_sign_in_url(
        &self,
        provider: FederatedProvider,
        redirect_to: &str,
    ) -> Result<String, AuthError>;

    /// Establish a session from the access token delivered by a federated
    /// redirect callback. Publishes `AuthEvent::SignedIn` on success.
    async fn complete_federated(&self, access_token: &str) -> Result<AuthSession, AuthError>;

    /// The currently authenticated identity, if any.
    async fn current_user(&self) -> Result<Option<UserIdentity>, AuthError>;

    /// End the current session. Publishes `AuthEvent::SignedOut`.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Subscribe to auth lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// GoTrue-style REST identity provider.
///
/// Speaks the `/auth/v1` surface: `signup`, password-grant `token`, `user`,
/// `logout`, and `authorize` URL construction for federated providers.
pub struct HttpIdentityProvider {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
    session: RwLock<Option<AuthSession>>,
    events: broadcast::Sender<AuthEvent>,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            client: reqwest::Client::new(),
            session: RwLock::new(None),
            events,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    async fn store_session(&self, session: AuthSession) {
        let identity = session.user.clone();
        *self.session.write().await = Some(session);
        // Send fails only when nobody is subscribed, which is fine.
        let _ = self.events.send(AuthEvent::SignedIn(identity));
    }

    /// Build an `AuthSession` from a token-bearing response body.
    fn session_from_body(body: &serde_json::Value) -> Result<AuthSession, AuthError> {
        let access_token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AuthError::InvalidResponse {
                reason: "missing access_token".to_string(),
            })?
            .to_string();

        let user: UserIdentity = body
            .get("user")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AuthError::InvalidResponse {
                reason: format!("malformed user object: {e}"),
            })?
            .ok_or_else(|| AuthError::InvalidResponse {
                reason: "missing user object".to_string(),
            })?;

        let expires_at = body
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));

        Ok(AuthSession {
            access_token,
            refresh_token: body
                .get("refresh_token")
                .and_then(|v| v.as_str())
                .map(String::from),
            expires_at,
            user,
        })
    }
}

/// Pull a human-readable message out of an identity service error body.
fn service_message(status: reqwest::StatusCode, body: &serde_json::Value) -> String {
    for key in ["error_description", "msg", "message", "error"] {
        if let Some(msg) = body.get(key).and_then(|v| v.as_str()) {
            return msg.to_string();
        }
    }
    format!("identity service returned {status}")
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                message: service_message(status, &body),
            });
        }

        // A token-less success means the account exists but needs email
        // confirmation before a session can be established.
        if body.get("access_token").and_then(|v| v.as_str()).is_none() {
            let email = body
                .get("email")
                .or_else(|| body.get("user").and_then(|u| u.get("email")))
                .and_then(|v| v.as_str())
                .unwrap_or(email)
                .to_string();
            return Ok(SignUpOutcome::ConfirmationPending { email });
        }

        let session = Self::session_from_body(&body)?;
        self.store_session(session.clone()).await;
        Ok(SignUpOutcome::Session(session))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                message: service_message(status, &body),
            });
        }

        let session = Self::session_from_body(&body)?;
        self.store_session(session.clone()).await;
        Ok(session)
    }

    fn federated_sign_in_url(
        &self,
        provider: FederatedProvider,
        redirect_to: &str,
    ) -> Result<String, AuthError> {
        let mut url = reqwest::Url::parse(&self.endpoint("authorize")).map_err(|e| {
            AuthError::InvalidResponse {
                reason: format!("bad identity service URL: {e}"),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("provider", provider.wire_name())
            .append_pair("redirect_to", redirect_to);
        Ok(url.to_string())
    }

    async fn complete_federated(&self, access_token: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                message: service_message(status, &body),
            });
        }

        let user: UserIdentity =
            serde_json::from_value(body).map_err(|e| AuthError::InvalidResponse {
                reason: format!("malformed user object: {e}"),
            })?;

        let session = AuthSession {
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at: None,
            user,
        };
        self.store_session(session.clone()).await;
        Ok(session)
    }

    async fn current_user(&self) -> Result<Option<UserIdentity>, AuthError> {
        let Some(token) = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
        else {
            return Ok(None);
        };

        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            // Stale token; drop the dead session.
            *self.session.write().await = None;
            return Ok(None);
        }

        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                message: service_message(status, &body),
            });
        }

        let user: UserIdentity =
            serde_json::from_value(body).map_err(|e| AuthError::InvalidResponse {
                reason: format!("malformed user object: {e}"),
            })?;
        Ok(Some(user))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self
            .session
            .write()
            .await
            .take()
            .map(|s| s.access_token);

        if let Some(token) = token {
            // Best effort: the local session is already gone.
            if let Err(e) = self
                .client
                .post(self.endpoint("logout"))
                .header("apikey", &self.anon_key)
                .bearer_auth(&token)
                .send()
                .await
            {
                tracing::warn!(error = %e, "Sign-out request failed");
            }
            let _ = self.events.send(AuthEvent::SignedOut);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn federated_url_encodes_redirect() {
        let provider = HttpIdentityProvider::new("https://id.example.com/", "anon");
        let url = provider
            .federated_sign_in_url(FederatedProvider::Google, "/conversation?from=signup")
            .unwrap();
        assert!(url.starts_with("https://id.example.com/auth/v1/authorize?"));
        assert!(url.contains("provider=google"));
        assert!(url.contains("redirect_to=%2Fconversation%3Ffrom%3Dsignup"));
    }

    #[test]
    fn federated_url_uses_azure_for_microsoft() {
        let provider = HttpIdentityProvider::new("https://id.example.com", "anon");
        let url = provider
            .federated_sign_in_url(FederatedProvider::Microsoft, "/conversation")
            .unwrap();
        assert!(url.contains("provider=azure"));
    }

    #[test]
    fn session_from_body_reads_expiry_and_user() {
        let body = serde_json::json!({
            "access_token": "tok",
            "refresh_token": "ref",
            "expires_in": 3600,
            "user": { "id": "9f1c7dd0-8f7e-4f8e-a7df-0a150f9a2f6c", "email": "a@b.co" }
        });
        let session = HttpIdentityProvider::session_from_body(&body).unwrap();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.refresh_token.as_deref(), Some("ref"));
        assert!(session.expires_at.is_some());
        assert_eq!(session.user.email, "a@b.co");
    }

    #[test]
    fn session_from_body_requires_user() {
        let body = serde_json::json!({ "access_token": "tok" });
        assert!(HttpIdentityProvider::session_from_body(&body).is_err());
    }

    #[test]
    fn service_message_prefers_description() {
        let body = serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        });
        assert_eq!(
            service_message(reqwest::StatusCode::BAD_REQUEST, &body),
            "Invalid login credentials"
        );
        assert!(
            service_message(reqwest::StatusCode::BAD_GATEWAY, &serde_json::json!({}))
                .contains("502")
        );
    }

    #[tokio::test]
    async fn current_user_without_session_is_none_without_network() {
        let provider = HttpIdentityProvider::new("https://id.example.invalid", "anon");
        assert!(provider.current_user().await.unwrap().is_none());
    }
}
