//! Content catalog across static Markdown files and ingested JSON posts
//!
//! Both sources describe the same kind of post, so the catalog keys them by
//! identity (slug) and keeps one entry per identity. Static Markdown wins a
//! collision with an ingested JSON post; the loser is recorded as a
//! duplicate. Identity is best effort: it is derived from slugs, which
//! collide for near-identical titles.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::markdown::parse_document;
use crate::post::BlogPost;
use crate::slug::{is_valid_slug, slugify};
use crate::Result;

/// Where a catalog entry was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// Markdown file with frontmatter
    Markdown,
    /// JSON post ingested through the API
    Json,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Markdown => "markdown",
            ContentSource::Json => "json",
        }
    }

    fn priority(&self) -> u8 {
        match self {
            ContentSource::Markdown => 0,
            ContentSource::Json => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub author: String,
    pub published: bool,
    pub source: ContentSource,
    pub path: PathBuf,
}

/// An entry dropped because another entry already claimed its identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Duplicate {
    pub slug: String,
    pub kept: PathBuf,
    pub dropped: PathBuf,
    pub dropped_source: ContentSource,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    duplicates: Vec<Duplicate>,
}

impl Catalog {
    /// Build a catalog from a Markdown directory and a JSON posts directory.
    ///
    /// Missing directories contribute nothing.
    pub fn load(markdown_dir: Option<&Path>, json_dir: Option<&Path>) -> Self {
        let mut candidates = Vec::new();

        if let Some(dir) = markdown_dir {
            for path in collect_files(dir, "md") {
                match read_markdown_entry(&path) {
                    Ok(Some(entry)) => candidates.push(entry),
                    Ok(None) => debug!(path = %path.display(), "Skipping Markdown file without identity"),
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable Markdown file"),
                }
            }
        }

        if let Some(dir) = json_dir {
            for path in collect_files(dir, "json") {
                match read_json_entry(&path) {
                    Ok(Some(entry)) => candidates.push(entry),
                    Ok(None) => debug!(path = %path.display(), "Skipping JSON post without identity"),
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable JSON post"),
                }
            }
        }

        Self::from_entries(candidates)
    }

    /// Merge candidate entries, keeping one per slug
    pub fn from_entries(mut candidates: Vec<CatalogEntry>) -> Self {
        // Markdown before JSON, then path order, so the first claim wins
        candidates.sort_by(|a, b| {
            a.source
                .priority()
                .cmp(&b.source.priority())
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut by_slug: HashMap<String, usize> = HashMap::new();
        let mut entries: Vec<CatalogEntry> = Vec::with_capacity(candidates.len());
        let mut duplicates = Vec::new();

        for candidate in candidates {
            match by_slug.get(&candidate.slug) {
                Some(&index) => {
                    let kept = &entries[index];
                    debug!(
                        slug = %candidate.slug,
                        kept = %kept.path.display(),
                        dropped = %candidate.path.display(),
                        "Duplicate content identity"
                    );
                    duplicates.push(Duplicate {
                        slug: candidate.slug.clone(),
                        kept: kept.path.clone(),
                        dropped: candidate.path,
                        dropped_source: candidate.source,
                    });
                }
                None => {
                    by_slug.insert(candidate.slug.clone(), entries.len());
                    entries.push(candidate);
                }
            }
        }

        entries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));

        Self {
            entries,
            duplicates,
        }
    }

    /// All entries, newest first
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries not marked as drafts
    pub fn published(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.published)
    }

    pub fn duplicates(&self) -> &[Duplicate] {
        &self.duplicates
    }

    pub fn get(&self, slug: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.slug == slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.get(slug).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn collect_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "Content directory does not exist");
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some(extension))
        .collect();
    files.sort();
    files
}

fn read_markdown_entry(path: &Path) -> Result<Option<CatalogEntry>> {
    let document = std::fs::read_to_string(path)?;
    let (front_matter, _) = parse_document(&document)?;

    let slug = match front_matter.slug.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => explicit.to_string(),
        _ => {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            if is_valid_slug(stem) {
                stem.to_string()
            } else {
                slugify(stem)
            }
        }
    };

    if slug.is_empty() {
        return Ok(None);
    }

    let title = if front_matter.title.is_empty() {
        slug.clone()
    } else {
        front_matter.title
    };

    Ok(Some(CatalogEntry {
        slug,
        title,
        date: front_matter.date,
        author: front_matter.author,
        published: front_matter.published,
        source: ContentSource::Markdown,
        path: path.to_path_buf(),
    }))
}

fn read_json_entry(path: &Path) -> Result<Option<CatalogEntry>> {
    let content = std::fs::read_to_string(path)?;
    let post: BlogPost = serde_json::from_str(&content)?;

    let slug = post.identity();
    if slug.is_empty() {
        return Ok(None);
    }

    Ok(Some(CatalogEntry {
        slug,
        title: post.title,
        date: post.date,
        author: post.author,
        published: post.published,
        source: ContentSource::Json,
        path: path.to_path_buf(),
    }))
}
