use crate::utils::try_respond;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::SqliteConnection;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json};
use serde::Serialize;
use std::collections::HashMap;
use tracing::error;

pub trait Validate
where
    Self: Sized,
{
    type Error;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, Self::Error>;
}

#[derive(Debug)]
pub enum ApiError {
    Diesel(DieselError),
    Validation(ValidationError),
    NotFound(&'static str),
    Internal(String),
    Unauthorized(&'static str),
    Credentials,
    Forbidden,
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> ApiError {
        ApiError::Diesel(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> ApiError {
        ApiError::Validation(err)
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize, Default, PartialEq)]
pub struct ValidationError(HashMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        self.0.entry(key.into()).or_default().push(val.into());
    }

    pub fn from<K: Into<String>, V: Into<String>>(key: K, val: V) -> Self {
        let mut error = ValidationError::default();
        error.add_error(key, val);
        error
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (key, errors) in other.0.into_iter() {
            self.0.entry(key).or_default().extend(errors);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn messages(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(value)` when nothing was collected, the collected errors otherwise.
    pub fn or_ok<T>(self, value: T) -> Result<T, ValidationError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Diesel(DieselError::NotFound) | ApiError::NotFound(_) => Status::NotFound,
            ApiError::Diesel(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Status::UnprocessableEntity
            }
            ApiError::Diesel(_) | ApiError::Internal(_) => Status::InternalServerError,
            ApiError::Validation(_) => Status::UnprocessableEntity,
            ApiError::Unauthorized(_) | ApiError::Credentials => Status::Unauthorized,
            ApiError::Forbidden => Status::Forbidden,
        }
    }
}

/// The column a unique constraint failed on. SQLite only reports it in the
/// message, as `UNIQUE constraint failed: users.email`.
fn unique_violation_field<'a>(column: Option<&'a str>, message: &'a str) -> &'a str {
    column
        .or_else(|| {
            message
                .rsplit(": ")
                .next()
                .and_then(|columns| columns.split(", ").next())
                .and_then(|column| column.rsplit('.').next())
                .filter(|column| !column.is_empty() && !column.contains(' '))
        })
        .unwrap_or("record")
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let body = match self {
            ApiError::Diesel(DieselError::NotFound) => json!({ "errors": { "entity": ["not found"] } }),
            ApiError::NotFound(entity) => json!({ "errors": { entity: ["not found"] } }),
            ApiError::Diesel(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
                let field = unique_violation_field(info.column_name(), info.message());
                json!({ "errors": { field: ["has already been taken"] } })
            }
            ApiError::Diesel(error) => {
                error!(%error, "database error");
                json!({ "errors": { "server": ["internal error"] } })
            }
            ApiError::Internal(reason) => {
                error!(%reason, "internal error");
                json!({ "errors": { "server": ["internal error"] } })
            }
            ApiError::Validation(error) => json!({ "errors": error }),
            ApiError::Unauthorized(reason) => json!({ "errors": { "token": [reason] } }),
            ApiError::Credentials => json!({ "errors": { "email or password": ["is invalid"] } }),
            ApiError::Forbidden => json!({ "errors": { "user": ["is not allowed to do this"] } }),
        };
        try_respond(req, body, status)
    }
}

impl<T> Validate for Json<T>
where
    T: Validate,
{
    type Error = <T as Validate>::Error;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, Self::Error> {
        let inner = self.into_inner();
        let validated = inner.validate(connection)?;
        Ok(Json(validated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_appends_messages_per_field() {
        let mut errors = ValidationError::from("email", "Invalid email: x");
        let mut other = ValidationError::from("email", "Email already exists");
        other.add_error("password", "Password too short");
        errors.merge(other);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.messages("email").len(), 2);
        assert_eq!(errors.messages("password"), ["Password too short".to_owned()]);
        assert!(errors.messages("username").is_empty());
    }

    #[test]
    fn or_ok_only_passes_when_empty() {
        assert_eq!(ValidationError::default().or_ok(3), Ok(3));
        assert!(ValidationError::from("body", "empty body").or_ok(3).is_err());
    }

    #[test]
    fn unique_violations_name_the_column() {
        assert_eq!(
            unique_violation_field(None, "UNIQUE constraint failed: users.email"),
            "email"
        );
        assert_eq!(
            unique_violation_field(None, "UNIQUE constraint failed: follows.follower_id, follows.followed_id"),
            "follower_id"
        );
        assert_eq!(unique_violation_field(Some("slug"), "duplicate key"), "slug");
        assert_eq!(unique_violation_field(None, "constraint failed"), "record");
    }

    #[test]
    fn statuses() {
        assert_eq!(ApiError::Diesel(DieselError::NotFound).status(), Status::NotFound);
        assert_eq!(ApiError::NotFound("article").status(), Status::NotFound);
        assert_eq!(ApiError::Credentials.status(), Status::Unauthorized);
        assert_eq!(ApiError::Forbidden.status(), Status::Forbidden);
        assert_eq!(
            ApiError::Validation(ValidationError::default()).status(),
            Status::UnprocessableEntity
        );
        assert_eq!(
            ApiError::Diesel(DieselError::RollbackTransaction).status(),
            Status::InternalServerError
        );
    }
}
