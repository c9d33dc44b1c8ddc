//! Identity and session types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated user as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    /// When the email was confirmed, if it has been.
    #[serde(
        default,
        alias = "email_confirmed_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// An established session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: UserIdentity,
}

/// Result of a sign-up attempt.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The account was created and a session established immediately.
    Session(AuthSession),
    /// The account needs email confirmation before a session exists.
    ConfirmationPending { email: String },
}

/// Federated sign-in providers offered on the signup surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederatedProvider {
    Google,
    Microsoft,
}

impl FederatedProvider {
    /// Parse the user-facing provider name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "google" => Some(Self::Google),
            "microsoft" => Some(Self::Microsoft),
            _ => None,
        }
    }

    /// Provider name on the identity service's wire. Microsoft accounts go
    /// through the service's "azure" provider.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Microsoft => "azure",
        }
    }
}

impl std::fmt::Display for FederatedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Microsoft => write!(f, "microsoft"),
        }
    }
}

/// Auth lifecycle events published by the identity provider.
///
/// The flow controller subscribes to these to observe asynchronous
/// federated-redirect completions as well as direct credential sign-ins.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(UserIdentity),
    SignedOut,
}
