//! Parser for the parent-summary labelling convention.
//!
//! Parent tasks are titled `{Category} | {Project}` (e.g. "Billable | Apollo").
//! Older parents carry a bracketed tag instead, such as "[Product] Roadmap" or
//! "Onboarding (Internal)". Both the categorizer and the project rollup read
//! this one parsed form rather than re-inspecting the raw text.

use super::Category;
use serde::{Deserialize, Serialize};

/// Result of parsing a parent-summary text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLabel {
    /// Effort category (always set)
    pub category: Category,

    /// Project segment after the first `|`, when present and non-empty
    pub project: Option<String>,

    /// True when the `|`-delimited convention was found
    pub matched: bool,
}

impl ParentLabel {
    /// Parse a parent summary. Total: every input yields a label.
    pub fn parse(text: Option<&str>) -> Self {
        let text = text.map(str::trim).unwrap_or_default();
        if text.is_empty() || text.eq_ignore_ascii_case("nan") {
            return Self::unmatched(Category::Other);
        }

        if text.contains('|') {
            let mut parts = text.split('|');
            let head = parts.next().unwrap_or_default().trim().to_lowercase();
            let project = parts
                .next()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string);

            return Self {
                category: category_from_head(&head),
                project,
                matched: true,
            };
        }

        Self::unmatched(category_from_tags(text))
    }

    fn unmatched(category: Category) -> Self {
        Self {
            category,
            project: None,
            matched: false,
        }
    }
}

/// Categorize a parent-summary text.
pub fn categorize(text: Option<&str>) -> Category {
    ParentLabel::parse(text).category
}

fn category_from_head(head: &str) -> Category {
    if head.contains("billable") {
        Category::Billable
    } else if head.contains("product") {
        Category::Product
    } else if head.contains("internal") {
        Category::Internal
    } else {
        Category::Other
    }
}

fn category_from_tags(text: &str) -> Category {
    [Category::Billable, Category::Product, Category::Internal]
        .into_iter()
        .find(|category| {
            let name = category.as_str();
            text.contains(&format!("[{}]", name)) || text.contains(&format!("({})", name))
        })
        .unwrap_or(Category::Other)
}
