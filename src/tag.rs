use crate::db::schema::{article_tags, tags};
use crate::db::DbConnection;
use crate::types::ApiResult;
use diesel::insert_or_ignore_into;
use diesel::prelude::*;
use rocket::get;
use rocket::serde::json::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    tags: Vec<String>,
}

/// Links `values` to the article, creating tags that don't exist yet.
pub fn attach_tags(
    article_id: i32,
    values: &[String],
    connection: &mut SqliteConnection,
) -> QueryResult<()> {
    for value in values {
        insert_or_ignore_into(tags::table)
            .values(tags::value.eq(value))
            .execute(connection)?;
        let tag_id = tags::table
            .filter(tags::value.eq(value))
            .select(tags::id)
            .first::<i32>(connection)?;
        insert_or_ignore_into(article_tags::table)
            .values((
                article_tags::article_id.eq(article_id),
                article_tags::tag_id.eq(tag_id),
            ))
            .execute(connection)?;
    }
    Ok(())
}

pub fn all_tags(connection: &mut SqliteConnection) -> QueryResult<Vec<String>> {
    tags::table
        .select(tags::value)
        .order(tags::value.asc())
        .load(connection)
}

#[get("/tags")]
pub fn list(mut connection: DbConnection) -> ApiResult<TagsResponse> {
    Ok(Json(TagsResponse {
        tags: all_tags(&mut connection)?,
    }))
}
