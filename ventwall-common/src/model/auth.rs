use crate::{
    model::{Id, user::UserMarker},
    util::PositiveDuration,
};
use argon2::{Argon2, Params, PasswordHasher, PasswordVerifier, password_hash};
use base64::{
    DecodeError, Engine, display::Base64Display, prelude::BASE64_URL_SAFE_NO_PAD,
};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::UtcDateTime;

pub const TOKEN_SECRET_LEN: usize = 32;
pub const TOKEN_SALT_LEN: usize = 16;
pub const TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

/// A bearer token as handed to a client: the owning user id plus random
/// secret and salt. Only its argon2 hash is stored server-side.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub user_id: Id<UserMarker>,
    secret: [u8; TOKEN_SECRET_LEN],
    salt: [u8; TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthTokenHash(pub Box<[u8; TOKEN_HASH_LEN]>);

/// The stored authentication record a bearer token is checked against.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Authentication {
    pub user: Id<UserMarker>,
    pub token_hash: AuthTokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing auth token failed: {0}")]
pub struct AuthTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AuthTokenDecodeError {
    #[error("Not enough parts separated by '.'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the secret part is incorrect")]
    InvalidSecretLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

impl AuthToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        Self {
            user_id,
            secret: rand::random(),
            salt: rand::random(),
        }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let secret = Base64Display::new(&self.secret, &BASE64_URL_SAFE_NO_PAD);
        let salt = Base64Display::new(&self.salt, &BASE64_URL_SAFE_NO_PAD);

        format!("{user_id}.{secret}.{salt}")
    }

    pub fn hash(&self) -> Result<AuthTokenHash, AuthTokenHashError> {
        let mut hash = Box::new([0; TOKEN_HASH_LEN]);
        Argon2::default()
            .hash_password_into(&self.secret, &self.salt, &mut *hash)
            .map_err(AuthTokenHashError)?;

        Ok(AuthTokenHash(hash))
    }
}

impl FromStr for AuthToken {
    type Err = AuthTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '.');
        let mut next_part = || parts.next().ok_or(Self::Err::NotEnoughParts);

        let user_id = u64::from_str(next_part()?)
            .map_err(Self::Err::InvalidUserId)?
            .into();
        let secret = BASE64_URL_SAFE_NO_PAD
            .decode(next_part()?)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSecretLength)?;
        let salt = BASE64_URL_SAFE_NO_PAD
            .decode(next_part()?)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            secret,
            salt,
        })
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("user_id", &self.user_id)
            .field("secret", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for AuthTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthTokenHash").field(&"[redacted]").finish()
    }
}

impl AuthTokenHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &*self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The auth token hash had an invalid length")]
pub struct InvalidAuthTokenHashError;

impl TryFrom<Box<[u8]>> for AuthTokenHash {
    type Error = InvalidAuthTokenHashError;

    fn try_from(value: Box<[u8]>) -> Result<Self, Self::Error> {
        Ok(Self(
            value.try_into().map_err(|_| InvalidAuthTokenHashError)?,
        ))
    }
}

impl Authentication {
    /// Whether this record is past its expiry at the given instant. A record
    /// without `expires_after` never expires.
    #[must_use]
    pub fn expired_at(&self, now: UtcDateTime) -> bool {
        self.expires_after
            .is_some_and(|ttl| self.created_at + ttl.get() < now)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct CredentialHashError(password_hash::Error);

/// Hashes a raw password into a PHC string for storage.
pub fn hash_password(password: &str) -> Result<String, CredentialHashError> {
    let salt = password_hash::SaltString::generate(&mut password_hash::rand_core::OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(CredentialHashError)
}

/// Verifies a raw password against a stored PHC string. A mismatch is
/// `Ok(false)`, only a malformed stored hash is an error.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CredentialHashError> {
    let parsed = password_hash::PasswordHash::new(stored).map_err(CredentialHashError)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(CredentialHashError(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthToken, AuthTokenDecodeError, hash_password, verify_password};
    use crate::{model::Id, util::PositiveDuration};
    use std::str::FromStr;
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn token_str_round_trip() {
        let token = AuthToken::generate_random(Id::from(42u64));
        let parsed = AuthToken::from_str(&token.as_token_str()).unwrap();

        assert_eq!(parsed, token);
        assert_eq!(parsed.user_id, Id::from(42u64));
    }

    #[test]
    fn token_hash_is_stable() {
        let token = AuthToken::generate_random(Id::from(1u64));
        assert_eq!(token.hash().unwrap(), token.hash().unwrap());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(
            AuthToken::from_str("1.onlytwoparts"),
            Err(AuthTokenDecodeError::NotEnoughParts)
        );
        assert!(matches!(
            AuthToken::from_str("notanumber.YQ.YQ"),
            Err(AuthTokenDecodeError::InvalidUserId(_))
        ));
        assert_eq!(
            AuthToken::from_str("1.YQ.YQ"),
            Err(AuthTokenDecodeError::InvalidSecretLength)
        );
    }

    #[test]
    fn expiry_check() {
        let token = AuthToken::generate_random(Id::from(7u64));
        let auth = super::Authentication {
            user: token.user_id,
            token_hash: token.hash().unwrap(),
            created_at: utc_datetime!(2025-06-01 00:00),
            expires_after: Some(PositiveDuration::new_unchecked(Duration::hours(1))),
        };

        assert!(!auth.expired_at(utc_datetime!(2025-06-01 00:30)));
        assert!(auth.expired_at(utc_datetime!(2025-06-01 02:00)));

        let eternal = super::Authentication {
            expires_after: None,
            ..auth
        };
        assert!(!eternal.expired_at(utc_datetime!(2030-01-01 00:00)));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();

        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }
}
