//! Identity provider adapters: the account admin REST client and the
//! session token verifier.

mod client;
mod tokens;

pub use client::{DisabledIdentityProvider, IdentityToolkitClient};
pub use tokens::{DisabledSessions, JwtSessionVerifier, SessionClaims};
