//! Drive query-string construction.
//!
//! Predicates are joined with `and`. The folder predicate constrains a single
//! level only; depth comes from the crawler walking subfolders.

use crate::types::drive::{FOLDER_MIME, FileTypeFilter, PDF_MIME};

/// Single character every text-bearing document is expected to contain.
pub const PROBE_TERM: &str = "a";

const NOT_TRASHED: &str = "trashed = false";
const ORDER_BY_NAME: &str = "name";

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<'a> {
    pub folder_scope: Option<&'a str>,
    pub text_query: Option<&'a str>,
    pub file_type: Option<FileTypeFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub q: String,
    /// `Some("name")` for browse queries; text searches keep backend relevance order.
    pub order_by: Option<&'static str>,
    /// Whether a non-blank text predicate was emitted.
    pub text_used: bool,
}

/// Escape a term for use inside a single-quoted Drive query literal.
pub fn escape(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    for ch in term.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            other => out.push(other),
        }
    }
    out
}

pub fn build(params: QueryParams<'_>) -> BuiltQuery {
    let mut parts = vec![NOT_TRASHED.to_string()];

    if let Some(folder) = params.folder_scope {
        parts.push(in_parents(folder));
    }

    let text = params.text_query.map(str::trim).filter(|t| !t.is_empty());
    if let Some(term) = text {
        let escaped = escape(term);
        parts.push(format!(
            "(name contains '{escaped}' or fullText contains '{escaped}')"
        ));
    }

    // Browsing without a term narrows to PDFs: the corpus is PDF documents.
    if params.file_type == Some(FileTypeFilter::Pdf) || text.is_none() {
        parts.push(format!("mimeType = '{PDF_MIME}'"));
    }

    BuiltQuery {
        q: parts.join(" and "),
        order_by: text.is_none().then_some(ORDER_BY_NAME),
        text_used: text.is_some(),
    }
}

/// Direct subfolders of `folder_id`.
pub fn subfolders(folder_id: &str) -> String {
    format!(
        "{NOT_TRASHED} and {} and mimeType = '{FOLDER_MIME}'",
        in_parents(folder_id)
    )
}

/// Files named exactly `name` whose indexed text contains the probe term.
pub fn legibility_probe(name: &str) -> String {
    format!(
        "{NOT_TRASHED} and name = '{}' and fullText contains '{PROBE_TERM}'",
        escape(name)
    )
}

fn in_parents(folder_id: &str) -> String {
    format!("'{}' in parents", escape(folder_id))
}
