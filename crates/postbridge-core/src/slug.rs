//! Slug generation
//!
//! Slugs are derived from post titles and used as file names and branch
//! names. The transform is deterministic and lossy, so near-duplicate titles
//! collide.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_\s-]").unwrap());
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").unwrap());

/// Convert a title into a lowercase, hyphen-separated slug.
///
/// Returns an empty string when the title has no ASCII word characters.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    let hyphenated = SEPARATORS.replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}

/// Check that a string is already a lowercase kebab-case slug
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Rust 1.75 Released"), "rust-175-released");
    }

    #[test]
    fn test_slugify_strips_punctuation() {
        assert_eq!(slugify("What's new in Axum?"), "whats-new-in-axum");
        assert_eq!(slugify("C++ & Rust: a comparison"), "c-rust-a-comparison");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  many   spaces\tand\ttabs "), "many-spaces-and-tabs");
        assert_eq!(slugify("snake_case__title"), "snake-case-title");
        assert_eq!(slugify("--already--hyphenated--"), "already-hyphenated");
    }

    #[test]
    fn test_slugify_non_ascii_is_dropped() {
        assert_eq!(slugify("Café crème"), "caf-crme");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn test_slugify_is_deterministic() {
        let title = "Deterministic Output, Every Time";
        assert_eq!(slugify(title), slugify(title));
    }

    #[test]
    fn test_slugify_near_duplicates_collide() {
        assert_eq!(slugify("Hello, World!"), slugify("hello world"));
        assert_eq!(slugify("Hello_World"), slugify("Hello - World"));
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("hello-world"));
        assert!(is_valid_slug("post-42"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug("double--hyphen"));
        assert!(!is_valid_slug("Upper-Case"));
        assert!(!is_valid_slug("under_score"));
    }

    #[test]
    fn test_slugify_output_is_valid_slug() {
        for title in ["Hello World", "What's new?", "  a_b-c  ", "Version 2.0"] {
            assert!(is_valid_slug(&slugify(title)), "{title}");
        }
    }
}
