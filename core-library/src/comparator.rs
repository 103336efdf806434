//! # Font Comparator
//!
//! Classifies how an incoming font relates to a stored one. The comparison is
//! pure and total: titles and URLs are trimmed and lower-cased, empty strings
//! compare equal to each other, and nothing here can fail.
//!
//! Title equality is evaluated before URL equality. When both match, category
//! membership alone decides the outcome:
//!
//! | title | url | categories                         | result                     |
//! |-------|-----|------------------------------------|----------------------------|
//! | =     | =   | same (any category)                | `IdenticalSameCategory`    |
//! | =     | =   | exactly one in Recycle Bin         | `IdenticalOneInRecycleBin` |
//! | =     | =   | different, neither Recycle Bin     | `NoMatch`                  |
//! | =     | ≠   | -                                  | `SameTitleDifferentUrl`    |
//! | ≠     | =   | -                                  | `DifferentTitleSameUrl`    |
//! | ≠     | ≠   | -                                  | `NoMatch`                  |

use crate::models::{CategoryId, Font, NewFont};
use serde::{Deserialize, Serialize};

/// Relationship between a candidate font and an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relationship {
    /// Same title and URL, both in the same category
    IdenticalSameCategory,
    /// Same title and URL, exactly one of the two in the Recycle Bin
    IdenticalOneInRecycleBin,
    SameTitleDifferentUrl,
    DifferentTitleSameUrl,
    NoMatch,
}

/// The fields of a font that take part in a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontKey<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub category_id: CategoryId,
}

impl<'a> FontKey<'a> {
    pub fn new(title: &'a str, url: &'a str, category_id: CategoryId) -> Self {
        Self {
            title,
            url,
            category_id,
        }
    }

    /// Key of a font that is about to be stored in `category_id`
    pub fn incoming(font: &'a NewFont, category_id: CategoryId) -> Self {
        Self::new(&font.title, &font.url, category_id)
    }
}

impl<'a> From<&'a Font> for FontKey<'a> {
    fn from(font: &'a Font) -> Self {
        Self::new(&font.title, &font.url, font.category_id)
    }
}

/// Compare `candidate` against `existing`
pub fn compare(
    candidate: FontKey<'_>,
    existing: FontKey<'_>,
    recycle_bin: CategoryId,
) -> Relationship {
    let same_title = NewFont::normalize(candidate.title) == NewFont::normalize(existing.title);
    let same_url = NewFont::normalize(candidate.url) == NewFont::normalize(existing.url);

    match (same_title, same_url) {
        (true, true) => {
            let candidate_recycled = candidate.category_id == recycle_bin;
            let existing_recycled = existing.category_id == recycle_bin;

            if candidate.category_id == existing.category_id {
                Relationship::IdenticalSameCategory
            } else if candidate_recycled != existing_recycled {
                Relationship::IdenticalOneInRecycleBin
            } else {
                Relationship::NoMatch
            }
        }
        (true, false) => Relationship::SameTitleDifferentUrl,
        (false, true) => Relationship::DifferentTitleSameUrl,
        (false, false) => Relationship::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAVORITES: CategoryId = CategoryId(1);
    const RECYCLE_BIN: CategoryId = CategoryId(2);
    const OTHER: CategoryId = CategoryId(3);

    fn key<'a>(title: &'a str, url: &'a str, category: CategoryId) -> FontKey<'a> {
        FontKey::new(title, url, category)
    }

    #[test]
    fn test_identical_same_category() {
        for category in [FAVORITES, RECYCLE_BIN, OTHER] {
            let result = compare(
                key("Roboto", "u1", category),
                key("Roboto", "u1", category),
                RECYCLE_BIN,
            );
            assert_eq!(result, Relationship::IdenticalSameCategory);
        }
    }

    #[test]
    fn test_normalization_ignores_case_and_whitespace() {
        let result = compare(
            key("Roboto", "URL", FAVORITES),
            key(" roboto ", "url", FAVORITES),
            RECYCLE_BIN,
        );
        assert_eq!(result, Relationship::IdenticalSameCategory);
    }

    #[test]
    fn test_identical_one_in_recycle_bin() {
        let result = compare(
            key("Roboto", "u1", FAVORITES),
            key("Roboto", "u1", RECYCLE_BIN),
            RECYCLE_BIN,
        );
        assert_eq!(result, Relationship::IdenticalOneInRecycleBin);

        let result = compare(
            key("Roboto", "u1", RECYCLE_BIN),
            key("Roboto", "u1", OTHER),
            RECYCLE_BIN,
        );
        assert_eq!(result, Relationship::IdenticalOneInRecycleBin);
    }

    #[test]
    fn test_identical_in_unrelated_categories_is_no_match() {
        let result = compare(
            key("Roboto", "u1", FAVORITES),
            key("Roboto", "u1", OTHER),
            RECYCLE_BIN,
        );
        assert_eq!(result, Relationship::NoMatch);
    }

    #[test]
    fn test_partial_matches() {
        assert_eq!(
            compare(
                key("Roboto", "u1", FAVORITES),
                key("ROBOTO", "u2", FAVORITES),
                RECYCLE_BIN
            ),
            Relationship::SameTitleDifferentUrl
        );
        assert_eq!(
            compare(
                key("Roboto", "u1", FAVORITES),
                key("Lato", " U1 ", RECYCLE_BIN),
                RECYCLE_BIN
            ),
            Relationship::DifferentTitleSameUrl
        );
        assert_eq!(
            compare(
                key("Roboto", "u1", FAVORITES),
                key("Lato", "u2", FAVORITES),
                RECYCLE_BIN
            ),
            Relationship::NoMatch
        );
    }

    #[test]
    fn test_empty_strings_compare_equal() {
        let result = compare(key("", " ", OTHER), key("  ", "", OTHER), RECYCLE_BIN);
        assert_eq!(result, Relationship::IdenticalSameCategory);
    }

    #[test]
    fn test_key_from_stored_font() {
        let font = Font {
            id: crate::models::FontId(7),
            title: "Inter".to_string(),
            normalized_title: "inter".to_string(),
            url: "u7".to_string(),
            category_id: RECYCLE_BIN,
            deletion_timestamp: Some(10),
            created_at: 0,
        };
        let incoming = NewFont::new("inter ", "U7");

        let result = compare(
            FontKey::incoming(&incoming, FAVORITES),
            FontKey::from(&font),
            RECYCLE_BIN,
        );
        assert_eq!(result, Relationship::IdenticalOneInRecycleBin);
    }
}
