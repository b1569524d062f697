use crate::db::schema::{article_tags, articles, favorites, follows, tags, users};
use crate::profile::{followed_among, Profile};
use crate::types::ApiError;
use crate::users::models::User;
use crate::utils::serialize_date;
use super::utils::contains_pattern;
use chrono::NaiveDateTime;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sqlite::Sqlite;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, AsChangeset, PartialEq)]
#[diesel(belongs_to(User, foreign_key = author_id))]
#[diesel(table_name = articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Article {
    pub id: i32,
    pub author_id: i32,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Article {
    pub fn load_by_slug(slug: &str, connection: &mut SqliteConnection) -> Result<Article, ApiError> {
        articles::table
            .filter(articles::slug.eq(slug))
            .select(Article::as_select())
            .first(connection)
            .optional()?
            .ok_or(ApiError::NotFound("article"))
    }

    pub fn slug_taken(slug: &str, connection: &mut SqliteConnection) -> QueryResult<bool> {
        diesel::select(diesel::dsl::exists(articles::table.filter(articles::slug.eq(slug))))
            .get_result(connection)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = articles)]
pub struct NewArticle<'a> {
    pub author_id: i32,
    pub slug: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub body: &'a str,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// An article as seen by one viewer: tags, favorite count and the
/// viewer-relative `favorited`/`following` flags resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: NaiveDateTime,
    #[serde(serialize_with = "serialize_date")]
    pub updated_at: NaiveDateTime,
    pub favorited: bool,
    pub favorites_count: i64,
    pub author: Profile<'static>,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub article: ArticleView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesResponse {
    pub articles: Vec<ArticleView>,
    pub articles_count: i64,
}

impl ArticleView {
    pub fn load(
        article: Article,
        viewer: Option<i32>,
        connection: &mut SqliteConnection,
    ) -> QueryResult<ArticleView> {
        ArticleView::load_many(vec![article], viewer, connection)?
            .pop()
            .ok_or(DieselError::NotFound)
    }

    /// Resolves a page of articles with a fixed number of queries, keeping
    /// the order of `articles`.
    pub fn load_many(
        articles: Vec<Article>,
        viewer: Option<i32>,
        connection: &mut SqliteConnection,
    ) -> QueryResult<Vec<ArticleView>> {
        if articles.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = articles.iter().map(|a| a.id).collect();
        let mut author_ids: Vec<i32> = articles.iter().map(|a| a.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<i32, User> = users::table
            .filter(users::id.eq_any(&author_ids))
            .select(User::as_select())
            .load(connection)?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        let mut tag_lists: HashMap<i32, Vec<String>> = HashMap::new();
        let tagged = article_tags::table
            .inner_join(tags::table)
            .filter(article_tags::article_id.eq_any(&ids))
            .order(tags::value.asc())
            .select((article_tags::article_id, tags::value))
            .load::<(i32, String)>(connection)?;
        for (article_id, value) in tagged {
            tag_lists.entry(article_id).or_default().push(value);
        }

        let counts: HashMap<i32, i64> = favorites::table
            .filter(favorites::article_id.eq_any(&ids))
            .group_by(favorites::article_id)
            .select((favorites::article_id, count_star()))
            .load::<(i32, i64)>(connection)?
            .into_iter()
            .collect();

        let favorited: HashSet<i32> = match viewer {
            Some(viewer) => favorites::table
                .filter(favorites::user_id.eq(viewer))
                .filter(favorites::article_id.eq_any(&ids))
                .select(favorites::article_id)
                .load::<i32>(connection)?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        let following = followed_among(viewer, &author_ids, connection)?;

        articles
            .into_iter()
            .map(|article| -> QueryResult<ArticleView> {
                let author = authors.get(&article.author_id).ok_or(DieselError::NotFound)?;
                Ok(ArticleView {
                    tag_list: tag_lists.remove(&article.id).unwrap_or_default(),
                    favorited: favorited.contains(&article.id),
                    favorites_count: counts.get(&article.id).copied().unwrap_or(0),
                    author: author
                        .clone()
                        .into_profile(following.contains(&article.author_id)),
                    slug: article.slug,
                    title: article.title,
                    description: article.description,
                    body: article.body,
                    created_at: article.created_at,
                    updated_at: article.updated_at,
                })
            })
            .collect()
    }
}

/// Filters shared by the global list and the feed. All set filters must hold.
#[derive(Debug, Default, Clone)]
pub struct ArticleFilter {
    pub tag: Option<String>,
    pub author: Option<String>,
    pub favorited: Option<String>,
    pub followed_by: Option<i32>,
}

impl ArticleFilter {
    pub fn query(&self) -> articles::BoxedQuery<'static, Sqlite> {
        let mut query: articles::BoxedQuery<'static, Sqlite> = articles::table.into_boxed();

        if let Some(tag) = &self.tag {
            let matching_tags = tags::table
                .filter(tags::value.like(contains_pattern(tag)).escape('\\'))
                .select(tags::id);
            let tagged = article_tags::table
                .filter(article_tags::tag_id.eq_any(matching_tags))
                .select(article_tags::article_id);
            query = query.filter(articles::id.eq_any(tagged));
        }

        if let Some(author) = &self.author {
            let author_ids = users::table
                .filter(users::username.eq(author.clone()))
                .select(users::id);
            query = query.filter(articles::author_id.eq_any(author_ids));
        }

        if let Some(favorited_by) = &self.favorited {
            let fans = users::table
                .filter(users::username.eq(favorited_by.clone()))
                .select(users::id);
            let favorited = favorites::table
                .filter(favorites::user_id.eq_any(fans))
                .select(favorites::article_id);
            query = query.filter(articles::id.eq_any(favorited));
        }

        if let Some(follower) = self.followed_by {
            let followed = follows::table
                .filter(follows::follower_id.eq(follower))
                .select(follows::followed_id);
            query = query.filter(articles::author_id.eq_any(followed));
        }

        query
    }

    /// One page of matching articles, newest first, with the total match count.
    pub fn load_page(
        &self,
        limit: i64,
        offset: i64,
        viewer: Option<i32>,
        connection: &mut SqliteConnection,
    ) -> QueryResult<ArticlesResponse> {
        let articles_count = self.query().count().get_result::<i64>(connection)?;
        let page = self
            .query()
            .order((articles::created_at.desc(), articles::id.desc()))
            .limit(limit)
            .offset(offset)
            .select(Article::as_select())
            .load(connection)?;

        Ok(ArticlesResponse {
            articles: ArticleView::load_many(page, viewer, connection)?,
            articles_count,
        })
    }
}
