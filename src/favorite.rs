use crate::article::models::{Article, ArticleResponse, ArticleView};
use crate::db::schema::favorites;
use crate::db::DbConnection;
use crate::types::ApiResult;
use crate::users::CurrentUser;
use diesel::prelude::*;
use diesel::{delete as diesel_delete, insert_or_ignore_into};
use rocket::serde::json::Json;
use rocket::{delete, post};
use tracing::info;

#[post("/<slug>/favorite")]
pub fn favorite(
    slug: &str,
    mut connection: DbConnection,
    current_user: CurrentUser,
) -> ApiResult<ArticleResponse> {
    let user = current_user?.user(&mut connection)?;
    let article = Article::load_by_slug(slug, &mut connection)?;
    insert_or_ignore_into(favorites::table)
        .values((
            favorites::user_id.eq(user.id),
            favorites::article_id.eq(article.id),
        ))
        .execute(&mut *connection)?;
    info!(user_id = user.id, article_id = article.id, "favorited article");

    Ok(Json(ArticleResponse {
        article: ArticleView::load(article, Some(user.id), &mut connection)?,
    }))
}

#[delete("/<slug>/favorite")]
pub fn unfavorite(
    slug: &str,
    mut connection: DbConnection,
    current_user: CurrentUser,
) -> ApiResult<ArticleResponse> {
    let user = current_user?.user(&mut connection)?;
    let article = Article::load_by_slug(slug, &mut connection)?;
    diesel_delete(
        favorites::table
            .filter(favorites::user_id.eq(user.id))
            .filter(favorites::article_id.eq(article.id)),
    )
    .execute(&mut *connection)?;
    info!(user_id = user.id, article_id = article.id, "unfavorited article");

    Ok(Json(ArticleResponse {
        article: ArticleView::load(article, Some(user.id), &mut connection)?,
    }))
}
