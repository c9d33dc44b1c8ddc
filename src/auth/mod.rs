//! Authentication — delegated to an external identity service.
//!
//! The flow never implements auth protocol internals; it consumes the
//! `IdentityProvider` trait and observes session changes through the
//! `AuthEvent` broadcast channel.

pub mod model;
pub mod provider;

pub use model::{AuthEvent, AuthSession, FederatedProvider, SignUpOutcome, UserIdentity};
pub use provider::{HttpIdentityProvider, IdentityProvider};
