use crate::utils::AppError;
use serde::{Deserialize, Serialize};

/// Registration candidate as it arrives on the wire. Every field may be absent.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile_no: Option<String>,
    pub password: Option<String>,
}

/// A user identity whose four fields are all present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    pub mobile_no: String,
    pub password: String,
}

/// A persisted [`UserRecord`] together with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(flatten)]
    pub record: UserRecord,
}

/// Partial update of a user. Fields left out are kept as they are.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile_no: Option<String>,
    pub password: Option<String>,
}

/// Public projection of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile_no: String,
}

impl UserRecord {
    /// Accepts a candidate only if name, email, mobile_no and password are all
    /// present and non-blank, reporting the first offending field in that order.
    ///
    /// Email uniqueness is a store concern and is checked by the repository.
    pub fn validate(candidate: &NewUser) -> Result<Self, AppError> {
        Ok(Self {
            name: required("name", &candidate.name)?,
            email: required("email", &candidate.email)?,
            mobile_no: required("mobile_no", &candidate.mobile_no)?,
            password: required("password", &candidate.password)?,
        })
    }
}

impl UserPatch {
    /// Normalises the patch: provided fields are trimmed and must not be blank.
    pub fn validate(&self) -> Result<Self, AppError> {
        Ok(Self {
            name: provided("name", &self.name)?,
            email: provided("email", &self.email)?,
            mobile_no: provided("mobile_no", &self.mobile_no)?,
            password: provided("password", &self.password)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.mobile_no.is_none()
            && self.password.is_none()
    }
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.record.name.clone(),
            email: user.record.email.clone(),
            mobile_no: user.record.mobile_no.clone(),
        }
    }
}

fn required(field: &'static str, value: &Option<String>) -> Result<String, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(AppError::MissingField(field))
}

fn provided(field: &'static str, value: &Option<String>) -> Result<Option<String>, AppError> {
    match value {
        Some(_) => required(field, value).map(Some),
        None => Ok(None),
    }
}
