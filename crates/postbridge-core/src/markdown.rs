//! Markdown documents with YAML frontmatter
//!
//! Rendering writes the frontmatter keys in a fixed order
//! (`title`, `description`, `author`, `date`, `published`, then `tags` when
//! present) followed by the raw post body. Parsing accepts the same layout so
//! a rendered document reads back into the same metadata.

use serde::{Deserialize, Serialize};

use crate::post::BlogPost;
use crate::{Error, Result};

const FENCE: &str = "---";

/// Frontmatter metadata of a Markdown post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: String,
    pub description: String,
    pub author: String,
    pub date: String,
    pub published: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl Default for FrontMatter {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            author: String::new(),
            date: String::new(),
            published: true,
            tags: Vec::new(),
            slug: None,
        }
    }
}

impl From<&BlogPost> for FrontMatter {
    fn from(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            description: post.description.clone(),
            author: post.author.clone(),
            date: post.date.clone(),
            published: post.published,
            tags: post.tags.clone(),
            slug: None,
        }
    }
}

/// Render a post as a Markdown document
pub fn render_document(post: &BlogPost) -> Result<String> {
    let yaml = serde_yaml::to_string(&FrontMatter::from(post))?;

    let mut doc = String::with_capacity(yaml.len() + post.content.len() + 16);
    doc.push_str(FENCE);
    doc.push('\n');
    doc.push_str(&yaml);
    doc.push_str(FENCE);
    doc.push_str("\n\n");
    doc.push_str(&post.content);
    if !post.content.ends_with('\n') {
        doc.push('\n');
    }

    Ok(doc)
}

/// Split a Markdown document into frontmatter and body.
///
/// A document without a leading `---` block yields default frontmatter and
/// the whole text as body. An opening fence without a closing one is an error.
pub fn parse_document(document: &str) -> Result<(FrontMatter, &str)> {
    let document = document.trim_start_matches('\u{feff}');

    let Some(rest) = document.strip_prefix(FENCE) else {
        return Ok((FrontMatter::default(), document));
    };

    // The opening fence must be alone on its line
    let Some(rest) = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
    else {
        return Ok((FrontMatter::default(), document));
    };

    let (yaml, remaining) = if let Some(after) = rest.strip_prefix(FENCE) {
        ("", after)
    } else {
        let end = rest
            .find("\n---")
            .ok_or_else(|| Error::Validation("Unterminated frontmatter block".to_string()))?;
        (&rest[..end], &rest[end + 1 + FENCE.len()..])
    };

    // End of the closing fence line, then the blank separator line
    let body = strip_line_break(strip_line_break(remaining));

    if yaml.trim().is_empty() {
        return Ok((FrontMatter::default(), body));
    }

    let front_matter: FrontMatter = serde_yaml::from_str(yaml)?;
    Ok((front_matter, body))
}

fn strip_line_break(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}

/// Repository path of a post inside the content directory
pub fn post_path(content_dir: &str, slug: &str) -> String {
    let dir = content_dir.trim_matches('/');
    if dir.is_empty() {
        format!("{}.md", slug)
    } else {
        format!("{}/{}.md", dir, slug)
    }
}
