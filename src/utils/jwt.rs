use std::collections::{BTreeSet, HashSet};

use jsonwebtoken::{
    decode, encode, errors::Error, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;

use crate::routes::auth::claims::Claims;

pub const MIN_SECRET_BYTES: usize = 32;
const MIN_DISTINCT_SECRET_BYTES: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JwtSecretError {
    #[error("JWT_SECRET is not set")]
    Missing,
    #[error("JWT_SECRET has {0} bytes; at least {MIN_SECRET_BYTES} are required")]
    TooShort(usize),
    #[error(
        "JWT_SECRET uses only {0} distinct bytes; at least {MIN_DISTINCT_SECRET_BYTES} are required"
    )]
    LowEntropy(usize),
}

/// HS256 session tokens bound to one issuer and audience.
///
/// Tokens are minted by the login service; this side verifies them and only
/// signs for tests and tooling.
#[derive(Clone)]
pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    validation: Validation,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl SessionTokens {
    pub fn from_env(issuer: &str, audience: &str) -> Result<Self, JwtSecretError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| JwtSecretError::Missing)?;
        Self::new(secret.as_bytes(), issuer, audience)
    }

    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Result<Self, JwtSecretError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(JwtSecretError::TooShort(secret.len()));
        }
        let distinct = secret.iter().collect::<BTreeSet<_>>().len();
        if distinct < MIN_DISTINCT_SECRET_BYTES {
            return Err(JwtSecretError::LowEntropy(distinct));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.iss = Some(HashSet::from([issuer.to_string()]));
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            validation,
        })
    }

    /// Stamps `claims` with this issuer and audience and signs them.
    pub fn sign(&self, mut claims: Claims) -> Result<String, Error> {
        claims.iss = self.issuer.clone();
        claims.aud = self.audience.clone();
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}
