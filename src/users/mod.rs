use crate::config::Config;
use crate::db::schema::users;
use crate::db::DbConnection;
use crate::types::{ApiError, ApiResult, Validate, ValidationError};
use diesel::insert_into;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use rocket::serde::json::Json;
use rocket::{get, post, put, State};
use serde::Deserialize;
use tracing::{debug, info};

pub mod models;
mod utils;

use self::models::{NewUser, User, UserResponse, DEFAULT_IMAGE};
use self::utils::*;

pub type CurrentUser = Result<Auth, ApiError>;

#[derive(Debug, Deserialize)]
pub struct RegistrationDetails {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    user: RegistrationDetails,
}

impl Validate for Registration {
    type Error = ApiError;
    fn validate(mut self, connection: &mut SqliteConnection) -> Result<Self, Self::Error> {
        let mut errors = ValidationError::default();
        self.user.username = self.user.username.trim().to_owned();
        self.user.email = self.user.email.trim().to_lowercase();

        collect(&mut errors, validate_email(&self.user.email, None, connection))?;
        collect(&mut errors, validate_username(&self.user.username, None, connection))?;
        if let Err(e) = validate_password(&self.user.password) {
            errors.merge(e);
        }

        Ok(errors.or_ok(self)?)
    }
}

fn respond_with_user(user: User, config: &Config) -> ApiResult<UserResponse> {
    let token = user.token(&config.jwt_secret, config.token_ttl_hours)?;
    Ok(Json(user.into_auth(token)))
}

#[post("/", format = "json", data = "<registration>")]
pub fn register(
    mut connection: DbConnection,
    config: &State<Config>,
    registration: Json<Registration>,
) -> ApiResult<UserResponse> {
    let registration = registration.validate(&mut connection)?.into_inner();
    let new_user = NewUser {
        username: &registration.user.username,
        email: &registration.user.email,
        password_hash: User::make_password(&registration.user.password)?,
        image: Some(DEFAULT_IMAGE),
    };

    let user = insert_into(users::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(&mut *connection)?;
    info!(user_id = user.id, username = %user.username, "registered user");
    respond_with_user(user, config)
}

#[derive(Debug, Deserialize)]
pub struct LoginDetails {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct Login {
    user: LoginDetails,
}

impl Validate for Login {
    type Error = ValidationError;
    fn validate(mut self, _connection: &mut SqliteConnection) -> Result<Self, Self::Error> {
        let mut errors = ValidationError::default();
        self.user.email = self.user.email.trim().to_lowercase();
        if self.user.email.is_empty() {
            errors.add_error("email", "can't be blank");
        }
        if self.user.password.is_empty() {
            errors.add_error("password", "can't be blank");
        }
        errors.or_ok(self)
    }
}

/// Accepts both `Token <jwt>` and `Bearer <jwt>`.
pub fn token_from_header(header: &str) -> Option<&str> {
    let mut parts = header.trim().splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some("Token"), Some(token)) | (Some("Bearer"), Some(token)) if !token.trim().is_empty() => {
            Some(token.trim())
        }
        _ => None,
    }
}

/// The identity carried by a valid token. Only the claims are checked here;
/// handlers load the user on the connection they already hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Auth {
    pub id: i32,
}

impl Auth {
    /// The user behind the token. A user deleted since the token was issued
    /// is treated like a bad token.
    pub fn user(self, connection: &mut SqliteConnection) -> Result<User, ApiError> {
        match User::load_by_id(self.id, connection) {
            Ok(user) => Ok(user),
            Err(DieselError::NotFound) => Err(ApiError::Unauthorized("User not found")),
            Err(e) => Err(e.into()),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Auth {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match request.headers().get_one("Authorization") {
            Some(header) => match token_from_header(header) {
                Some(token) => token,
                None => {
                    let e = ApiError::Unauthorized("Invalid authorization header");
                    return Outcome::Error((Status::Unauthorized, e));
                }
            },
            None => {
                let e = ApiError::Unauthorized("Missing authorization token");
                return Outcome::Error((Status::Unauthorized, e));
            }
        };

        let config = match request.rocket().state::<Config>() {
            Some(config) => config,
            None => {
                let e = ApiError::Internal("configuration is not managed".to_owned());
                return Outcome::Error((Status::InternalServerError, e));
            }
        };

        match models::Claims::decode(token, &config.jwt_secret) {
            Ok(claims) => Outcome::Success(Auth { id: claims.id }),
            Err(e) => {
                debug!("rejected jwt token");
                Outcome::Error((Status::Unauthorized, e))
            }
        }
    }
}

#[post("/login", format = "json", data = "<login>")]
pub fn login(
    mut connection: DbConnection,
    config: &State<Config>,
    login: Json<Login>,
) -> ApiResult<UserResponse> {
    let login = login.validate(&mut connection)?.into_inner();
    let user = User::load_by_email(&login.user.email, &mut connection)?
        .ok_or(ApiError::Credentials)?;
    if !user.verify_password(&login.user.password)? {
        debug!(user_id = user.id, "password mismatch");
        return Err(ApiError::Credentials);
    }
    respond_with_user(user, config)
}

#[get("/user")]
pub fn current(
    current_user: CurrentUser,
    mut connection: DbConnection,
    config: &State<Config>,
) -> ApiResult<UserResponse> {
    let user = current_user?.user(&mut connection)?;
    respond_with_user(user, config)
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub user: UpdateUser,
}

/// Applies `update` to `user`, collecting every validation failure.
fn apply_update(
    user: &mut User,
    update: UpdateUser,
    connection: &mut SqliteConnection,
) -> Result<(), ApiError> {
    let mut errors = ValidationError::default();

    if let Some(bio) = update.bio {
        user.bio = Some(bio);
    }

    match update.image.as_deref().map(str::trim) {
        None => {}
        Some("") => user.image = None,
        Some(image) => match validate_image_url(image) {
            Ok(_) => user.image = Some(image.to_owned()),
            Err(e) => errors.merge(e),
        },
    }

    if let Some(new_email) = update.email.map(|e| e.trim().to_lowercase()) {
        if !new_email.is_empty() {
            collect(&mut errors, validate_email(&new_email, Some(user.id), connection))?;
            user.email = new_email;
        }
    }

    if let Some(new_username) = update.username.map(|u| u.trim().to_owned()) {
        if !new_username.is_empty() {
            collect(
                &mut errors,
                validate_username(&new_username, Some(user.id), connection),
            )?;
            user.username = new_username;
        }
    }

    if let Some(new_password) = update.password.filter(|p| !p.is_empty()) {
        match validate_password(&new_password) {
            Err(e) => errors.merge(e),
            Ok(_) => user.new_password(&new_password)?,
        }
    }

    Ok(errors.or_ok(())?)
}

#[put("/user", format = "json", data = "<update>")]
pub fn update(
    current_user: CurrentUser,
    mut connection: DbConnection,
    config: &State<Config>,
    update: Json<Update>,
) -> ApiResult<UserResponse> {
    let mut user = current_user?.user(&mut connection)?;
    apply_update(&mut user, update.into_inner().user, &mut connection)?;

    diesel::update(&user).set(&user).execute(&mut *connection)?;
    info!(user_id = user.id, "updated user");
    respond_with_user(user, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_schemes() {
        assert_eq!(token_from_header("Token abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(token_from_header("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(token_from_header("Token "), None);
        assert_eq!(token_from_header("Basic dXNlcjpwYXNz"), None);
        assert_eq!(token_from_header("abc.def.ghi"), None);
    }
}
