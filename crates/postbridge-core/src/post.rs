//! Blog post submissions

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::slug::slugify;
use crate::{Error, Result};

/// Maximum title length accepted from submissions
pub const MAX_TITLE_LENGTH: usize = 200;

/// Date format used in frontmatter
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// chrono accepts unpadded fields, frontmatter dates must sort as strings
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// A blog post as submitted over the API or stored as ingested JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default = "today")]
    pub date: String,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(alias = "body")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Explicit identity, only honoured for ingested JSON posts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

fn today() -> String {
    Utc::now().format(DATE_FORMAT).to_string()
}

fn default_published() -> bool {
    true
}

impl BlogPost {
    /// Create a post with defaults for everything but title and body
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            author: String::new(),
            date: today(),
            published: true,
            content: content.into(),
            tags: Vec::new(),
            slug: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Slug derived from the title
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }

    /// Identity used by the content catalog: explicit slug first, then the title slug
    pub fn identity(&self) -> String {
        match &self.slug {
            Some(slug) if !slug.trim().is_empty() => slug.trim().to_string(),
            _ => self.slug(),
        }
    }

    /// Validate the shape of a submitted post
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Title cannot be empty".to_string()));
        }

        if self.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(Error::Validation(format!(
                "Title exceeds maximum length of {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        if self.content.trim().is_empty() {
            return Err(Error::Validation("Content cannot be empty".to_string()));
        }

        if !DATE_SHAPE.is_match(&self.date)
            || NaiveDate::parse_from_str(&self.date, DATE_FORMAT).is_err()
        {
            return Err(Error::Validation(format!(
                "Invalid date '{}', expected YYYY-MM-DD",
                self.date
            )));
        }

        if self.slug().is_empty() {
            return Err(Error::Validation(format!(
                "Title '{}' does not produce a usable slug",
                self.title
            )));
        }

        Ok(())
    }
}
