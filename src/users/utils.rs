use crate::db::schema::users;
use crate::types::{ApiError, ValidationError};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::select;
use regex::Regex;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 5;

lazy_static! {
    static ref EMAIL_RE: Regex = {
        let pattern = r"\A[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\z";
        Regex::new(pattern).unwrap()
    };
    static ref URL_RE: Regex = Regex::new(r"\Ahttps?://[^\s/$.?#][^\s]*\z").unwrap();
}

pub fn validate_email_re(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email) {
        Err(ValidationError::from(
            "email",
            format!("Invalid email: {}", email),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_username_re(username: &str) -> Result<(), ValidationError> {
    if username.chars().count() < MIN_USERNAME_LENGTH {
        Err(ValidationError::from(
            "username",
            format!("username too short: {}", username),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        Err(ValidationError::from("password", "Password too short"))
    } else {
        Ok(())
    }
}

pub fn validate_image_url(image: &str) -> Result<(), ValidationError> {
    if !URL_RE.is_match(image) {
        Err(ValidationError::from(
            "image",
            format!("Invalid url: {}", image),
        ))
    } else {
        Ok(())
    }
}

/// Collects format and uniqueness errors for an email. `except` excludes the
/// user being updated from the uniqueness check.
pub fn validate_email(
    email_to_validate: &str,
    except: Option<i32>,
    connection: &mut SqliteConnection,
) -> Result<(), ApiError> {
    let mut errors = ValidationError::default();
    if let Err(e) = validate_email_re(email_to_validate) {
        errors.merge(e);
    }

    let query = users::table
        .filter(users::email.eq(email_to_validate))
        .filter(users::id.ne(except.unwrap_or(-1)));
    if select(exists(query)).get_result::<bool>(connection)? {
        errors.add_error("email", "Email already exists");
    }
    errors.or_ok(()).map_err(ApiError::from)
}

pub fn validate_username(
    username_to_validate: &str,
    except: Option<i32>,
    connection: &mut SqliteConnection,
) -> Result<(), ApiError> {
    let mut errors = ValidationError::default();
    if let Err(e) = validate_username_re(username_to_validate) {
        errors.merge(e);
    }

    let query = users::table
        .filter(users::username.eq(username_to_validate))
        .filter(users::id.ne(except.unwrap_or(-1)));
    if select(exists(query)).get_result::<bool>(connection)? {
        errors.add_error("username", "Username already exists");
    }
    errors.or_ok(()).map_err(ApiError::from)
}

/// Folds validation failures into `errors`, passing any other error through.
pub fn collect(errors: &mut ValidationError, result: Result<(), ApiError>) -> Result<(), ApiError> {
    match result {
        Ok(()) => Ok(()),
        Err(ApiError::Validation(e)) => {
            errors.merge(e);
            Ok(())
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(validate_email_re("jake@jake.jake").is_ok());
        assert!(validate_email_re("first.last+tag@example.co.uk").is_ok());
        assert!(validate_email_re("jake").is_err());
        assert!(validate_email_re("jake@").is_err());
        assert!(validate_email_re("jake@@jake.jake").is_err());
    }

    #[test]
    fn usernames_and_passwords() {
        assert!(validate_username_re("ab").is_err());
        assert!(validate_username_re("abc").is_ok());
        assert!(validate_password("1234").is_err());
        assert!(validate_password("12345").is_ok());
    }

    #[test]
    fn image_urls() {
        assert!(validate_image_url("https://example.com/me.png").is_ok());
        assert!(validate_image_url("http://example.com").is_ok());
        assert!(validate_image_url("ftp://example.com/me.png").is_err());
        assert!(validate_image_url("not a url").is_err());
    }

    #[test]
    fn collect_keeps_non_validation_errors() {
        let mut errors = ValidationError::default();
        assert!(collect(&mut errors, Err(ValidationError::from("email", "taken").into())).is_ok());
        assert_eq!(errors.messages("email").len(), 1);
        assert!(collect(&mut errors, Err(ApiError::Forbidden)).is_err());
    }
}
