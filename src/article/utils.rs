use super::models::Article;
use crate::db::schema::articles;
use diesel::prelude::*;
use slug::slugify;

pub const DEFAULT_LIMIT: i64 = 5;
pub const MAX_LIMIT: i64 = 100;

/// Rows to take and skip for a 1-based page number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Page {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let skipped_pages = page.unwrap_or(1).saturating_sub(1).max(0);
        Page {
            limit,
            offset: skipped_pages.saturating_mul(limit),
        }
    }
}

pub fn slug_base(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        "article".to_owned()
    } else {
        slug
    }
}

/// `<slug>-<n>` where `n` starts one past the number of slugs already sharing
/// the prefix and moves on until a free one is found.
pub fn unique_slug(title: &str, connection: &mut SqliteConnection) -> QueryResult<String> {
    let base = slug_base(title);
    let similar = articles::table
        .filter(articles::slug.like(format!("{}-%", base)))
        .count()
        .get_result::<i64>(connection)?;

    let mut suffix = similar + 1;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !Article::slug_taken(&candidate, connection)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

/// A LIKE pattern matching values that contain `needle` literally. Pair with
/// `.escape('\\')`.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Trimmed, non-blank, first occurrence kept.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_owned());
        }
    }
    normalized
}
