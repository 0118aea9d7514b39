use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::UtcDateTime;

pub const ANONYMOUS_NAME_MIN_LEN: usize = 3;
pub const ANONYMOUS_NAME_MAX_LEN: usize = 30;
pub const PASSWORD_MIN_LEN: usize = 6;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct User {
    pub id: Id<UserMarker>,
    pub anonymous_name: AnonymousName,
    pub password_hash: String,
    pub tokens: i64,
    pub role: Role,
    pub is_active: bool,
    pub created_at: UtcDateTime,
}

/// The user data exposed over the API. Never carries the credential hash.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Profile {
    pub id: Id<UserMarker>,
    pub anonymous_name: AnonymousName,
    pub tokens: i64,
    pub role: Role,
    pub is_active: bool,
    pub created_at: UtcDateTime,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            anonymous_name: user.anonymous_name,
            tokens: user.tokens,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown role: {0}")]
pub struct InvalidRoleError(String);

impl Role {
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, InvalidRoleError> {
        match tag {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            other => Err(InvalidRoleError(other.to_owned())),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct AnonymousName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The anonymous name is invalid: {0}")]
pub struct InvalidAnonymousNameError(String);

impl AnonymousName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidAnonymousNameError> {
        let name = name.into();
        let trimmed = name.trim();
        let len = trimmed.chars().count();

        if (ANONYMOUS_NAME_MIN_LEN..=ANONYMOUS_NAME_MAX_LEN).contains(&len) {
            Ok(AnonymousName(trimmed.to_owned()))
        } else {
            Err(InvalidAnonymousNameError(name))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for AnonymousName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        AnonymousName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"AnonymousName"))
    }
}

/// A raw password as submitted by a client. Validated for minimum length,
/// never logged or serialized.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Password(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The password is shorter than {PASSWORD_MIN_LEN} characters")]
pub struct InvalidPasswordError;

impl Password {
    pub fn new(password: impl Into<String>) -> Result<Self, InvalidPasswordError> {
        let password = password.into();
        if password.chars().count() >= PASSWORD_MIN_LEN {
            Ok(Password(password))
        } else {
            Err(InvalidPasswordError)
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Password::new(inner).map_err(|_| {
            Error::invalid_value(Unexpected::Str("[redacted]"), &"a longer password")
        })
    }
}
