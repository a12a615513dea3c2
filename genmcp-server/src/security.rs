//! JWT validation against a JWKS document
//!
//! Token issuance is someone else's job; this module only validates.
//! The JWKS document is fetched once at startup from the configured URI,
//! keys are indexed by `kid`, and every request must present a bearer
//! token signed by one of those keys and issued by one of the configured
//! authorization servers.

use crate::error::{ServerError, ServerResult};
use genmcp_config::AuthConfig;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Claims this server cares about
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,

    /// Subject
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiration, seconds since the epoch
    pub exp: i64,

    /// Space-separated OAuth scopes
    #[serde(default)]
    pub scope: Option<String>,
}

impl Claims {
    /// The scopes granted by this token
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Validates bearer tokens against a fetched JWKS
pub struct JwksAuth {
    /// Decoding keys indexed by key id
    keys: HashMap<String, (DecodingKey, Algorithm)>,

    /// Issuers accepted during validation
    issuers: Vec<String>,
}

impl JwksAuth {
    /// Fetch the JWKS document and index its keys
    pub async fn from_config(config: &AuthConfig, client: &reqwest::Client) -> ServerResult<Self> {
        let jwks: JwkSet = client
            .get(&config.jwks_uri)
            .send()
            .await
            .map_err(|e| ServerError::AuthSetup(format!("JWKS fetch failed: {}", e)))?
            .json()
            .await
            .map_err(|e| ServerError::AuthSetup(format!("JWKS parse failed: {}", e)))?;

        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };

            let algorithm = match &jwk.algorithm {
                AlgorithmParameters::RSA(_) => Algorithm::RS256,
                AlgorithmParameters::EllipticCurve(_) => Algorithm::ES256,
                _ => {
                    debug!(kid, "skipping JWKS key with unsupported algorithm");
                    continue;
                }
            };

            let key = DecodingKey::from_jwk(jwk)
                .map_err(|e| ServerError::AuthSetup(format!("invalid JWK '{}': {}", kid, e)))?;
            keys.insert(kid, (key, algorithm));
        }

        if keys.is_empty() {
            return Err(ServerError::AuthSetup("JWKS document contains no usable keys".to_string()));
        }

        Ok(Self {
            keys,
            issuers: config.authorization_servers.clone(),
        })
    }

    /// Build directly from indexed keys; used by tests
    pub fn from_keys(keys: HashMap<String, (DecodingKey, Algorithm)>, issuers: Vec<String>) -> Self {
        Self { keys, issuers }
    }

    /// Extract and validate the bearer token from an Authorization header
    pub fn validate_bearer(&self, authorization: Option<&str>) -> Result<Claims, String> {
        let header_value = authorization.ok_or("missing Authorization header")?;
        let token = header_value
            .strip_prefix("Bearer ")
            .or_else(|| header_value.strip_prefix("bearer "))
            .ok_or("Authorization header is not a bearer token")?;

        self.validate_token(token)
    }

    /// Validate a raw JWT
    pub fn validate_token(&self, token: &str) -> Result<Claims, String> {
        let header = decode_header(token).map_err(|e| {
            warn!(error = %e, "token header rejected");
            "invalid token".to_string()
        })?;

        let kid = header.kid.ok_or("token has no key id")?;
        let (key, algorithm) = self
            .keys
            .get(&kid)
            .ok_or("token signed by an unknown key")?;

        let mut validation = Validation::new(*algorithm);
        validation.set_issuer(&self.issuers);
        validation.validate_aud = false;

        let data = decode::<Claims>(token, key, &validation).map_err(|e| {
            warn!(error = %e, "token rejected");
            "invalid token".to_string()
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        iss: String,
        exp: i64,
        scope: String,
    }

    // HS256 stands in for RSA here; key indexing and issuer checks are
    // identical across algorithms
    fn auth_with_secret(secret: &[u8], issuer: &str) -> JwksAuth {
        let mut keys = HashMap::new();
        keys.insert(
            "test-key".to_string(),
            (DecodingKey::from_secret(secret), Algorithm::HS256),
        );
        JwksAuth::from_keys(keys, vec![issuer.to_string()])
    }

    fn sign(secret: &[u8], kid: Option<&str>, issuer: &str, exp_offset: i64) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(|s| s.to_string());
        let claims = TestClaims {
            iss: issuer.to_string(),
            exp: chrono_like_now() + exp_offset,
            scope: "read:all write:none".to_string(),
        };
        encode(&header, &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn chrono_like_now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    #[test]
    fn test_valid_token_passes() {
        let auth = auth_with_secret(b"secret", "https://auth.example.com");
        let token = sign(b"secret", Some("test-key"), "https://auth.example.com", 3600);

        let claims = auth
            .validate_bearer(Some(&format!("Bearer {}", token)))
            .unwrap();
        assert_eq!(claims.iss, "https://auth.example.com");
        assert_eq!(claims.scopes(), vec!["read:all", "write:none"]);
    }

    #[test]
    fn test_missing_header_rejected() {
        let auth = auth_with_secret(b"secret", "https://auth.example.com");
        assert!(auth.validate_bearer(None).is_err());
        assert!(auth.validate_bearer(Some("Basic dXNlcg==")).is_err());
    }

    #[test]
    fn test_unknown_kid_rejected() {
        let auth = auth_with_secret(b"secret", "https://auth.example.com");
        let token = sign(b"secret", Some("other-key"), "https://auth.example.com", 3600);
        assert!(auth.validate_bearer(Some(&format!("Bearer {}", token))).is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let auth = auth_with_secret(b"secret", "https://auth.example.com");
        let token = sign(b"secret", Some("test-key"), "https://rogue.example.com", 3600);
        assert!(auth.validate_bearer(Some(&format!("Bearer {}", token))).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = auth_with_secret(b"secret", "https://auth.example.com");
        let token = sign(b"secret", Some("test-key"), "https://auth.example.com", -3600);
        assert!(auth.validate_bearer(Some(&format!("Bearer {}", token))).is_err());
    }

    #[test]
    fn test_wrong_signature_rejected() {
        let auth = auth_with_secret(b"secret", "https://auth.example.com");
        let token = sign(b"other", Some("test-key"), "https://auth.example.com", 3600);
        assert!(auth.validate_bearer(Some(&format!("Bearer {}", token))).is_err());
    }
}
