use crate::article::models::Article;
use crate::db::schema::{comments, users};
use crate::db::DbConnection;
use crate::profile::{followed_among, Profile};
use crate::types::{ApiError, ApiResult, Validate, ValidationError};
use crate::users::models::User;
use crate::users::{Auth, CurrentUser};
use crate::utils::{now, serialize_date};
use chrono::NaiveDateTime;
use diesel::insert_into;
use diesel::prelude::*;
use diesel::delete as diesel_delete;
use rocket::serde::json::{json, Json, Value};
use rocket::{delete, get, post};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Queryable, Selectable, Identifiable, Associations, PartialEq)]
#[diesel(belongs_to(Article))]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Comment {
    pub id: i32,
    pub article_id: i32,
    pub author_id: i32,
    pub body: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentView<'r> {
    id: i32,
    #[serde(serialize_with = "serialize_date")]
    created_at: NaiveDateTime,
    #[serde(serialize_with = "serialize_date")]
    updated_at: NaiveDateTime,
    body: String,
    author: Profile<'r>,
}

impl<'r> From<(Comment, Profile<'r>)> for CommentView<'r> {
    fn from((comment, author): (Comment, Profile<'r>)) -> Self {
        CommentView {
            id: comment.id,
            author,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            body: comment.body,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment<'a> {
    article_id: i32,
    author_id: i32,
    body: &'a str,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentBody {
    body: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentContainer<T> {
    comment: T,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentsContainer<T> {
    comments: T,
}

impl Validate for CommentContainer<CommentBody> {
    type Error = ValidationError;
    fn validate(self, _connection: &mut SqliteConnection) -> Result<Self, ValidationError> {
        if self.comment.body.trim().is_empty() {
            Err(ValidationError::from("body", "can't be blank"))
        } else {
            Ok(self)
        }
    }
}

#[post("/<slug>/comments", data = "<details>", format = "json")]
pub fn add(
    mut conn: DbConnection,
    user: CurrentUser,
    slug: &str,
    details: Json<CommentContainer<CommentBody>>,
) -> ApiResult<CommentContainer<CommentView<'static>>> {
    let user = user?.user(&mut conn)?;
    let details = details.validate(&mut conn)?.into_inner();
    let article = Article::load_by_slug(slug, &mut conn)?;
    let created = now();
    let new_comment = NewComment {
        article_id: article.id,
        author_id: user.id,
        body: details.comment.body.trim(),
        created_at: created,
        updated_at: created,
    };

    let comment = insert_into(comments::table)
        .values(&new_comment)
        .returning(Comment::as_returning())
        .get_result(&mut *conn)?;
    info!(comment_id = comment.id, article_id = article.id, author = user.id, "added comment");

    let follows_self = followed_among(Some(user.id), &[user.id], &mut conn)?.contains(&user.id);
    let profile = user.into_profile(follows_self);

    Ok(Json(CommentContainer {
        comment: (comment, profile).into(),
    }))
}

#[get("/<slug>/comments")]
pub fn list(
    mut conn: DbConnection,
    user: Option<Auth>,
    slug: &str,
) -> ApiResult<CommentsContainer<Vec<CommentView<'static>>>> {
    let article = Article::load_by_slug(slug, &mut conn)?;
    let data = Comment::belonging_to(&article)
        .inner_join(users::table)
        .order((comments::created_at.asc(), comments::id.asc()))
        .select((Comment::as_select(), User::as_select()))
        .load::<(Comment, User)>(&mut *conn)?;

    let authors = data.iter().map(|(_, author)| author.id).collect::<Vec<i32>>();
    let follows = followed_among(user.map(|u| u.id), &authors, &mut conn)?;

    let comments = data
        .into_iter()
        .map(|(comment, author)| {
            let following = follows.contains(&author.id);
            CommentView::from((comment, author.into_profile(following)))
        })
        .collect::<Vec<_>>();
    Ok(Json(CommentsContainer { comments }))
}

#[delete("/<slug>/comments/<id>")]
pub fn delete(mut conn: DbConnection, user: CurrentUser, slug: &str, id: i32) -> ApiResult<Value> {
    let user = user?.user(&mut conn)?;
    let article = Article::load_by_slug(slug, &mut conn)?;
    let comment = Comment::belonging_to(&article)
        .filter(comments::id.eq(id))
        .select(Comment::as_select())
        .first(&mut *conn)
        .optional()?
        .ok_or(ApiError::NotFound("comment"))?;
    if comment.author_id != user.id {
        return Err(ApiError::Forbidden);
    }
    diesel_delete(&comment).execute(&mut *conn)?;
    info!(comment_id = comment.id, article_id = article.id, "deleted comment");
    Ok(Json(json!({})))
}
