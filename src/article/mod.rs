use crate::db::schema::articles;
use crate::db::DbConnection;
use crate::tag::attach_tags;
use crate::types::*;
use crate::users::models::User;
use crate::users::{Auth, CurrentUser};
use crate::utils::now;
use diesel::prelude::*;
use diesel::{delete as diesel_delete, insert_into};
use rocket::serde::json::{json, Json, Value};
use rocket::{delete, get, post, put, FromForm};
use serde::Deserialize;
use tracing::info;

pub mod models;
pub mod utils;

use self::models::{Article, ArticleFilter, ArticleResponse, ArticleView, ArticlesResponse, NewArticle};
use self::utils::{normalize_tags, unique_slug, Page};

#[derive(Debug, Default, FromForm)]
pub struct ListParams {
    tag: Option<String>,
    author: Option<String>,
    favorited: Option<String>,
    offset: Option<i64>,
    limit: Option<i64>,
}

#[derive(Debug, Default, FromForm)]
pub struct PageParams {
    offset: Option<i64>,
    limit: Option<i64>,
}

#[get("/?<params..>")]
pub fn list(
    mut connection: DbConnection,
    current_user: Option<Auth>,
    params: ListParams,
) -> ApiResult<ArticlesResponse> {
    let page = Page::new(params.offset, params.limit);
    let filter = ArticleFilter {
        tag: params.tag.filter(|t| !t.is_empty()),
        author: params.author.filter(|a| !a.is_empty()),
        favorited: params.favorited.filter(|f| !f.is_empty()),
        followed_by: None,
    };
    let viewer = current_user.map(|user| user.id);
    Ok(Json(filter.load_page(page.limit, page.offset, viewer, &mut connection)?))
}

#[get("/feed?<params..>")]
pub fn feed(
    mut connection: DbConnection,
    current_user: CurrentUser,
    params: PageParams,
) -> ApiResult<ArticlesResponse> {
    let user = current_user?.user(&mut connection)?;
    let page = Page::new(params.offset, params.limit);
    let filter = ArticleFilter {
        followed_by: Some(user.id),
        ..ArticleFilter::default()
    };
    Ok(Json(filter.load_page(page.limit, page.offset, Some(user.id), &mut connection)?))
}

#[get("/<slug>")]
pub fn get(
    slug: &str,
    mut connection: DbConnection,
    current_user: Option<Auth>,
) -> ApiResult<ArticleResponse> {
    let article = Article::load_by_slug(slug, &mut connection)?;
    let viewer = current_user.map(|user| user.id);
    Ok(Json(ArticleResponse {
        article: ArticleView::load(article, viewer, &mut connection)?,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetails {
    title: String,
    description: String,
    body: String,
    #[serde(default)]
    tag_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateArticle {
    article: ArticleDetails,
}

impl Validate for CreateArticle {
    type Error = ValidationError;
    fn validate(self, _connection: &mut SqliteConnection) -> Result<Self, ValidationError> {
        let mut error = ValidationError::default();
        if self.article.body.trim().is_empty() {
            error.add_error("body", "can't be blank");
        }

        if self.article.title.trim().is_empty() {
            error.add_error("title", "can't be blank");
        }

        if self.article.description.trim().is_empty() {
            error.add_error("description", "can't be blank");
        }

        error.or_ok(self)
    }
}

#[post("/", format = "json", data = "<create>")]
pub fn create(
    mut connection: DbConnection,
    user: CurrentUser,
    create: Json<CreateArticle>,
) -> ApiResult<ArticleResponse> {
    let user = user?.user(&mut connection)?;
    let create = create.validate(&mut connection)?.into_inner().article;
    let created = now();
    let tags = normalize_tags(create.tag_list);

    let article = connection.transaction::<_, ApiError, _>(|conn| {
        let slug = unique_slug(&create.title, conn)?;
        let new_article = NewArticle {
            author_id: user.id,
            slug: &slug,
            title: &create.title,
            description: &create.description,
            body: &create.body,
            created_at: created,
            updated_at: created,
        };
        let article = insert_into(articles::table)
            .values(&new_article)
            .returning(Article::as_returning())
            .get_result(conn)?;
        attach_tags(article.id, &tags, conn)?;
        Ok(article)
    })?;
    info!(article_id = article.id, slug = %article.slug, author = user.id, "created article");

    Ok(Json(ArticleResponse {
        article: ArticleView::load(article, Some(user.id), &mut connection)?,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDetails {
    title: Option<String>,
    description: Option<String>,
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticle {
    article: UpdateDetails,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Loads the article behind `slug`, failing unless `user` wrote it.
fn load_owned(slug: &str, user: &User, connection: &mut SqliteConnection) -> Result<Article, ApiError> {
    let article = Article::load_by_slug(slug, connection)?;
    if article.author_id != user.id {
        return Err(ApiError::Forbidden);
    }
    Ok(article)
}

#[put("/<slug>", format = "json", data = "<update>")]
pub fn update(
    slug: &str,
    mut connection: DbConnection,
    current_user: CurrentUser,
    update: Json<UpdateArticle>,
) -> ApiResult<ArticleResponse> {
    let user = current_user?.user(&mut connection)?;
    let changes = update.into_inner().article;

    let article = connection.transaction::<_, ApiError, _>(|conn| {
        let mut article = load_owned(slug, &user, conn)?;
        if let Some(title) = non_blank(changes.title) {
            article.slug = unique_slug(&title, conn)?;
            article.title = title;
        }
        if let Some(description) = non_blank(changes.description) {
            article.description = description;
        }
        if let Some(body) = non_blank(changes.body) {
            article.body = body;
        }
        article.updated_at = now();
        diesel::update(&article).set(&article).execute(conn)?;
        Ok(article)
    })?;
    info!(article_id = article.id, slug = %article.slug, "updated article");

    Ok(Json(ArticleResponse {
        article: ArticleView::load(article, Some(user.id), &mut connection)?,
    }))
}

#[delete("/<slug>")]
pub fn delete(
    slug: &str,
    mut connection: DbConnection,
    current_user: CurrentUser,
) -> ApiResult<Value> {
    let user = current_user?.user(&mut connection)?;
    let article = load_owned(slug, &user, &mut connection)?;
    diesel_delete(&article).execute(&mut *connection)?;
    info!(article_id = article.id, slug = %article.slug, "deleted article");
    Ok(Json(json!({})))
}
