use crate::db::schema::follows;
use crate::db::DbConnection;
use crate::types::*;
use crate::users::models::User;
use crate::users::{Auth, CurrentUser};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::{delete as diesel_delete, insert_or_ignore_into, select};
use rocket::serde::json::Json;
use rocket::{delete, get, post};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ProfileResponse<'a> {
    profile: Profile<'a>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Profile<'a> {
    pub username: Cow<'a, str>,
    pub bio: Option<Cow<'a, str>>,
    pub image: Option<Cow<'a, str>>,
    pub following: bool,
}

pub fn is_following(
    follower: i32,
    followed: i32,
    connection: &mut SqliteConnection,
) -> QueryResult<bool> {
    select(exists(
        follows::table
            .filter(follows::follower_id.eq(follower))
            .filter(follows::followed_id.eq(followed)),
    ))
    .get_result(connection)
}

/// Which of `authors` the viewer follows. Anonymous viewers follow nobody.
pub fn followed_among(
    viewer: Option<i32>,
    authors: &[i32],
    connection: &mut SqliteConnection,
) -> QueryResult<HashSet<i32>> {
    let viewer = match viewer {
        Some(viewer) if !authors.is_empty() => viewer,
        _ => return Ok(HashSet::new()),
    };
    let followed = follows::table
        .filter(follows::follower_id.eq(viewer))
        .filter(follows::followed_id.eq_any(authors))
        .select(follows::followed_id)
        .load::<i32>(connection)?;
    Ok(followed.into_iter().collect())
}

#[get("/profiles/<name>")]
pub fn profile(
    mut connection: DbConnection,
    current_user: Option<Auth>,
    name: &str,
) -> ApiResult<ProfileResponse<'static>> {
    let user = User::load_by_name(name, &mut connection)?;
    let following = match current_user {
        Some(current) => is_following(current.id, user.id, &mut connection)?,
        None => false,
    };

    Ok(Json(ProfileResponse {
        profile: user.into_profile(following),
    }))
}

#[post("/profiles/<name>/follow")]
pub fn follow(
    mut connection: DbConnection,
    current_user: CurrentUser,
    name: &str,
) -> ApiResult<ProfileResponse<'static>> {
    let current = current_user?.user(&mut connection)?;
    let followed = User::load_by_name(name, &mut connection)?;
    insert_or_ignore_into(follows::table)
        .values((
            follows::follower_id.eq(current.id),
            follows::followed_id.eq(followed.id),
        ))
        .execute(&mut *connection)?;
    info!(follower = current.id, followed = followed.id, "followed user");

    Ok(Json(ProfileResponse {
        profile: followed.into_profile(true),
    }))
}

#[delete("/profiles/<name>/follow")]
pub fn unfollow(
    mut connection: DbConnection,
    current_user: CurrentUser,
    name: &str,
) -> ApiResult<ProfileResponse<'static>> {
    let current = current_user?.user(&mut connection)?;
    let followed = User::load_by_name(name, &mut connection)?;
    diesel_delete(
        follows::table
            .filter(follows::follower_id.eq(current.id))
            .filter(follows::followed_id.eq(followed.id)),
    )
    .execute(&mut *connection)?;
    info!(follower = current.id, followed = followed.id, "unfollowed user");

    Ok(Json(ProfileResponse {
        profile: followed.into_profile(false),
    }))
}
