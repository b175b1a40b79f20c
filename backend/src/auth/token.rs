use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Identity token validity window.
const TOKEN_TTL_DAYS: i64 = 7;

/// Recommended minimum signing secret length in bytes.
const MIN_SECRET_LEN: usize = 32;

/// Identity token claims: the internal user id plus standard timestamps.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: i64,
    iat: i64,
    exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    SigningFailed(String),
}

/// Signs and verifies the compact identity tokens handed to the browser.
///
/// Tokens are HS256 JWTs carrying only the user id. They are stateless:
/// nothing is stored server-side, and an expired or forged token simply
/// fails verification.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        if secret.len() < MIN_SECRET_LEN {
            tracing::warn!(
                "JWT_SECRET is shorter than {} bytes; a longer secret is strongly recommended",
                MIN_SECRET_LEN
            );
        }
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a signed token for a user id, valid for 7 days.
    pub fn issue(&self, subject_id: i64) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            id: subject_id,
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::SigningFailed(e.to_string()))
    }

    /// Verify a token and return the embedded user id.
    ///
    /// Bad signature, malformed payload and expiry all come back as `None`;
    /// callers treat the request as anonymous.
    pub fn verify(&self, token: &str) -> Option<i64> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .ok()
            .map(|data| data.claims.id)
    }
}
