use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::identity::{Session, SessionError, SessionVerifier};
use crate::config::{SessionKey, SessionSettings};
use crate::infra::error::InfraError;

/// Claims read from a provider-issued session token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub admin: bool,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl From<SessionClaims> for Session {
    fn from(claims: SessionClaims) -> Self {
        Session {
            uid: claims.sub,
            email: claims.email,
            is_admin: claims.admin,
        }
    }
}

/// Verifies bearer JWTs signed with a shared secret or an RSA key.
pub struct JwtSessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtSessionVerifier {
    pub fn new(key: DecodingKey, algorithm: Algorithm, settings: &SessionSettings) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.leeway = settings.leeway.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        if let Some(issuer) = settings.issuer.as_ref() {
            validation.set_issuer(&[issuer]);
        }
        match settings.audience.as_ref() {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        Self { key, validation }
    }

    /// `None` when no signing key is configured.
    pub fn from_settings(settings: &SessionSettings) -> Result<Option<Self>, InfraError> {
        let Some(key) = settings.key.as_ref() else {
            return Ok(None);
        };

        let verifier = match key {
            SessionKey::Hs256Secret(secret) => Self::new(
                DecodingKey::from_secret(secret.as_bytes()),
                Algorithm::HS256,
                settings,
            ),
            SessionKey::Rs256PublicKeyPem(path) => {
                let pem = std::fs::read(path).map_err(|err| {
                    InfraError::configuration(format!(
                        "failed to read session public key `{}`: {err}",
                        path.display()
                    ))
                })?;
                let key = DecodingKey::from_rsa_pem(&pem).map_err(|err| {
                    InfraError::configuration(format!("invalid session public key: {err}"))
                })?;
                Self::new(key, Algorithm::RS256, settings)
            }
        };
        Ok(Some(verifier))
    }
}

impl SessionVerifier for JwtSessionVerifier {
    fn verify(&self, token: &str) -> Result<Session, SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::Missing);
        }

        match jsonwebtoken::decode::<SessionClaims>(token, &self.key, &self.validation) {
            Ok(data) => Ok(data.claims.into()),
            Err(error) => match error.kind() {
                ErrorKind::ExpiredSignature => Err(SessionError::Expired),
                kind => {
                    debug!(?kind, "session token rejected");
                    Err(SessionError::Invalid)
                }
            },
        }
    }
}

/// Verifier used when sessions are not configured; every token is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSessions;

impl SessionVerifier for DisabledSessions {
    fn verify(&self, _token: &str) -> Result<Session, SessionError> {
        Err(SessionError::NotConfigured)
    }
}
