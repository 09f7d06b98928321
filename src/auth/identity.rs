use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use super::claims::IdentityClaims;
use crate::config::IdentityConfig;

/// Token accepted without a provider round-trip when demo login is on.
pub const DEMO_TOKEN: &str = "demo_user_123";

/// A person vouched for by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid identity token: {0}")]
    InvalidToken(String),

    #[error("identity token carries an invalid email")]
    InvalidEmail,

    #[error("no identity provider configured")]
    NotConfigured,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn demo_identity() -> VerifiedIdentity {
    VerifiedIdentity {
        subject: DEMO_TOKEN.into(),
        email: "demo@samarthan.com".into(),
        name: Some("Demo User".into()),
        picture: Some("https://via.placeholder.com/150".into()),
        email_verified: true,
    }
}

/// Verifies HS256 ID tokens against the configured issuer and client id,
/// and optionally accepts the demo token.
pub struct TokenIdentityProvider {
    decoding: Option<DecodingKey>,
    issuer: String,
    client_id: Option<String>,
    demo_login: bool,
}

impl TokenIdentityProvider {
    pub fn new(cfg: &IdentityConfig) -> Self {
        Self {
            decoding: cfg
                .secret
                .as_ref()
                .map(|s| DecodingKey::from_secret(s.as_bytes())),
            issuer: cfg.issuer.clone(),
            client_id: cfg.client_id.clone(),
            demo_login: cfg.demo_login,
        }
    }
}

#[async_trait]
impl IdentityProvider for TokenIdentityProvider {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        if self.demo_login && id_token == DEMO_TOKEN {
            debug!("demo login");
            return Ok(demo_identity());
        }

        let decoding = self.decoding.as_ref().ok_or(IdentityError::NotConfigured)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        match &self.client_id {
            Some(aud) => validation.set_audience(std::slice::from_ref(aud)),
            None => validation.validate_aud = false,
        }

        let claims = decode::<IdentityClaims>(id_token, decoding, &validation)
            .map_err(|e| {
                warn!(error = %e, "identity token rejected");
                IdentityError::InvalidToken(e.to_string())
            })?
            .claims;

        let email = claims.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }

        Ok(VerifiedIdentity {
            subject: claims.sub,
            email,
            name: claims.name,
            picture: claims.picture,
            email_verified: claims.email_verified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use time::OffsetDateTime;

    fn config(secret: Option<&str>, demo_login: bool) -> IdentityConfig {
        IdentityConfig {
            client_id: Some("client-1".into()),
            issuer: "https://idp.test".into(),
            secret: secret.map(Into::into),
            demo_login,
        }
    }

    fn id_token(secret: &str, aud: &str, email: &str) -> String {
        let exp = OffsetDateTime::now_utc().unix_timestamp() + 600;
        let claims = json!({
            "sub": "idp-42",
            "email": email,
            "name": "Asha",
            "email_verified": true,
            "iss": "https://idp.test",
            "aud": aud,
            "exp": exp,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[tokio::test]
    async fn demo_token_only_when_enabled() {
        let on = TokenIdentityProvider::new(&config(None, true));
        assert_eq!(on.verify(DEMO_TOKEN).await.unwrap().subject, DEMO_TOKEN);

        let off = TokenIdentityProvider::new(&config(None, false));
        assert!(matches!(
            off.verify(DEMO_TOKEN).await.unwrap_err(),
            IdentityError::NotConfigured
        ));
    }

    #[tokio::test]
    async fn verifies_signed_id_token() {
        let provider = TokenIdentityProvider::new(&config(Some("idp-secret"), false));
        let token = id_token("idp-secret", "client-1", "Asha@Example.com");
        let identity = provider.verify(&token).await.unwrap();
        assert_eq!(identity.subject, "idp-42");
        assert_eq!(identity.email, "asha@example.com");
        assert!(identity.email_verified);
    }

    #[tokio::test]
    async fn rejects_foreign_audience_and_bad_email() {
        let provider = TokenIdentityProvider::new(&config(Some("idp-secret"), false));

        let token = id_token("idp-secret", "someone-else", "a@b.co");
        assert!(matches!(
            provider.verify(&token).await.unwrap_err(),
            IdentityError::InvalidToken(_)
        ));

        let token = id_token("idp-secret", "client-1", "not-an-email");
        assert!(matches!(
            provider.verify(&token).await.unwrap_err(),
            IdentityError::InvalidEmail
        ));
    }
}
