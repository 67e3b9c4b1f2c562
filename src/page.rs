//! The page model shared by every stage of the migration.
//!
//! A [`Page`] is built once per run by a page-tree source and never mutated
//! afterwards. Branch pages (with children) become directories in the output
//! tree; leaf pages become a single document.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// One node of the Confluence page tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Display label, index-prefixed by the export parser (e.g. `"1. Root"`).
    pub name: String,
    /// Stable Confluence page id; names the attachment folder and the download.
    pub id: String,
    /// Export-relative locator, usually an HTML filename such as `Root_1.html`.
    pub file: String,
    /// Ordered child pages. Empty for a leaf.
    pub children: Vec<Page>,
}

static RE_UNSAFE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/\\\x00]").unwrap());

impl Page {
    /// Create a leaf page.
    pub fn new(name: impl Into<String>, id: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            file: file.into(),
            children: Vec::new(),
        }
    }

    /// Builder-style helper to attach children.
    pub fn with_children(mut self, children: Vec<Page>) -> Self {
        self.children = children;
        self
    }

    /// `true` when the page has children and therefore owns a directory.
    pub fn is_branch(&self) -> bool {
        !self.children.is_empty()
    }

    /// The page name made safe for use as a single path component.
    ///
    /// Separators and NUL are replaced by `-`. Blank names and the `.`/`..`
    /// components become `_`, so a page never escapes its parent directory.
    /// Sibling collisions are not resolved.
    pub fn output_name(&self) -> String {
        let name = RE_UNSAFE_NAME.replace_all(&self.name, "-");
        match name.trim() {
            "" | "." | ".." => "_".to_string(),
            _ => name.into_owned(),
        }
    }

    /// `file` without its final extension (`Page_111.html` → `Page_111`).
    pub fn file_base_name(&self) -> &str {
        match self.file.rsplit_once('.') {
            Some((base, _)) => base,
            None => &self.file,
        }
    }

    /// Number of pages in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Page::subtree_len).sum::<usize>()
    }
}

/// Derive a page id from an export link: the last `_` segment, cut at its first `.`.
///
/// `"Child_222.html"` → `"222"`. A link without `_` yields its own stem.
pub fn extract_page_id(href: &str) -> String {
    let last = href.rsplit('_').next().unwrap_or(href);
    last.split('.').next().unwrap_or(last).to_string()
}

/// Total number of pages in a forest.
pub fn count_pages(pages: &[Page]) -> usize {
    pages.iter().map(Page::subtree_len).sum()
}

/// Render a forest as an indented bullet list, one page per line.
pub fn format_page_tree(pages: &[Page]) -> String {
    let mut lines = Vec::new();
    push_tree_lines(pages, 0, &mut lines);
    lines.join("\n")
}

fn push_tree_lines(pages: &[Page], depth: usize, lines: &mut Vec<String>) {
    for page in pages {
        lines.push(format!("{}- {}", "  ".repeat(depth), page.name));
        push_tree_lines(&page.children, depth + 1, lines);
    }
}
