use crate::db::schema::users;
use crate::profile::Profile;
use crate::types::ApiError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const DEFAULT_IMAGE: &str = "https://api.realworld.io/images/smiley-cyrus.jpeg";

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, AsChangeset, PartialEq)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// The `user` object returned by the authentication endpoints.
#[derive(Debug, Serialize)]
pub struct AuthUser {
    pub email: String,
    pub token: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: AuthUser,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub id: i32,
    pub exp: i64,
}

impl Claims {
    pub fn decode(token: &str, secret: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized("Invalid jwt token"))
    }
}

impl User {
    pub fn make_password(password: &str) -> Result<String, ApiError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
    }

    pub fn new_password(&mut self, password: &str) -> Result<(), ApiError> {
        self.password_hash = User::make_password(password)?;
        Ok(())
    }

    pub fn verify_password(&self, password_to_verify: &str) -> Result<bool, ApiError> {
        let parsed = PasswordHash::new(&self.password_hash)
            .map_err(|e| ApiError::Internal(format!("invalid password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password_to_verify.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn token(&self, secret: &str, ttl_hours: i64) -> Result<String, ApiError> {
        let claims = Claims {
            id: self.id,
            exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))
    }

    pub fn into_auth(self, token: String) -> UserResponse {
        UserResponse {
            user: AuthUser {
                email: self.email,
                token,
                username: self.username,
                bio: self.bio,
                image: self.image,
            },
        }
    }

    pub fn profile(&self, following: bool) -> Profile<'_> {
        Profile {
            username: Cow::Borrowed(self.username.as_str()),
            bio: self.bio.as_deref().map(Cow::Borrowed),
            image: self.image.as_deref().map(Cow::Borrowed),
            following,
        }
    }

    pub fn into_profile(self, following: bool) -> Profile<'static> {
        Profile {
            username: Cow::Owned(self.username),
            bio: self.bio.map(Cow::Owned),
            image: self.image.map(Cow::Owned),
            following,
        }
    }

    pub fn load_by_id(user_id: i32, connection: &mut SqliteConnection) -> QueryResult<User> {
        users::table
            .find(user_id)
            .select(User::as_select())
            .first(connection)
    }

    pub fn load_by_name(name: &str, connection: &mut SqliteConnection) -> Result<User, ApiError> {
        users::table
            .filter(users::username.eq(name))
            .select(User::as_select())
            .first(connection)
            .optional()?
            .ok_or(ApiError::NotFound("profile"))
    }

    pub fn load_by_email(email: &str, connection: &mut SqliteConnection) -> QueryResult<Option<User>> {
        users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(connection)
            .optional()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: String,
    pub image: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: "jake@jake.jake".to_owned(),
            username: "jake".to_owned(),
            password_hash: User::make_password("jakejake").unwrap(),
            bio: None,
            image: Some(DEFAULT_IMAGE.to_owned()),
        }
    }

    #[test]
    fn password_round_trip() {
        let mut user = user();
        assert!(user.verify_password("jakejake").unwrap());
        assert!(!user.verify_password("jakejak").unwrap());

        user.new_password("another").unwrap();
        assert!(user.verify_password("another").unwrap());
        assert!(!user.verify_password("jakejake").unwrap());
    }

    #[test]
    fn token_carries_the_user_id() {
        let token = user().token("secret", 1).unwrap();
        let claims = Claims::decode(&token, "secret").unwrap();
        assert_eq!(claims.id, 7);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = user().token("secret", 1).unwrap();
        assert!(Claims::decode(&token, "other").is_err());
        assert!(Claims::decode("not-a-token", "secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = user().token("secret", -2).unwrap();
        assert!(Claims::decode(&token, "secret").is_err());
    }

    #[test]
    fn profile_borrows_user_fields() {
        let user = user();
        let profile = user.profile(true);
        assert_eq!(profile.username, "jake");
        assert_eq!(profile.image.as_deref(), Some(DEFAULT_IMAGE));
        assert!(profile.following);
    }
}
