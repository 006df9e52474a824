use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PDF_MIME: &str = "application/pdf";
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Fields requested for file listings.
pub const FILE_LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, parents, webViewLink, description, thumbnailLink, hasThumbnail, iconLink)";
/// Fields requested for subfolder listings.
pub const FOLDER_LIST_FIELDS: &str = "nextPageToken, files(id, name)";
/// Fields requested for legibility probes; only existence matters.
pub const PROBE_FIELDS: &str = "files(id)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileTypeFilter {
    Pdf,
    Any,
}

impl FromStr for FileTypeFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "any" | "" => Ok(Self::Any),
            other => Err(ValidationError::new(
                "file_type",
                format!("unsupported file type `{other}` (expected pdf or any)"),
            )),
        }
    }
}

impl fmt::Display for FileTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::Any => f.write_str("any"),
        }
    }
}

/// A search intent as handed over by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub text_query: Option<String>,
    #[serde(default)]
    pub folder_scope: Option<String>,
    #[serde(default)]
    pub file_type: Option<FileTypeFilter>,
    pub page_size: u32,
    #[serde(default)]
    pub illegible_only: bool,
}

impl SearchRequest {
    pub fn new(page_size: u32) -> Self {
        Self {
            text_query: None,
            folder_scope: None,
            file_type: None,
            page_size,
            illegible_only: false,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_query = Some(text.into());
        self
    }

    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_scope = Some(folder_id.into());
        self
    }

    pub fn with_file_type(mut self, filter: FileTypeFilter) -> Self {
        self.file_type = Some(filter);
        self
    }

    pub fn illegible_only(mut self, on: bool) -> Self {
        self.illegible_only = on;
        self
    }

    /// The text term, trimmed; `None` when absent or blank.
    pub fn effective_text(&self) -> Option<&str> {
        self.text_query
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn effective_folder(&self) -> Option<&str> {
        self.folder_scope
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page_size == 0 {
            return Err(ValidationError::new("page_size", "must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    pub has_thumbnail: bool,
    pub thumbnail_link: Option<String>,
    pub icon_link: Option<String>,
}

/// One search result, annotated with its legibility classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parent_ids: Vec<String>,
    pub view_link: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Thumbnail,
    pub size: Option<u64>,
    pub has_readable_text: bool,
    pub is_scanned: bool,
    pub matched_query: String,
}

impl FileEntry {
    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME
    }

    pub fn set_readable(&mut self, readable: bool) {
        self.has_readable_text = readable;
        self.is_scanned = !readable;
    }
}

/// `files` resource as returned by the Drive v3 API; only the fields we request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
    pub web_view_link: Option<String>,
    pub description: Option<String>,
    pub thumbnail_link: Option<String>,
    #[serde(default)]
    pub has_thumbnail: bool,
    pub icon_link: Option<String>,
    /// Int64 values are JSON strings in Drive responses.
    pub size: Option<String>,
}

impl DriveFile {
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn into_entry(self, matched_query: &str) -> FileEntry {
        let size = self.size_bytes();
        FileEntry {
            id: self.id,
            name: self.name,
            mime_type: self.mime_type,
            parent_ids: self.parents,
            view_link: self.web_view_link,
            description: self.description,
            thumbnail: Thumbnail {
                has_thumbnail: self.has_thumbnail,
                thumbnail_link: self.thumbnail_link,
                icon_link: self.icon_link,
            },
            size,
            has_readable_text: false,
            is_scanned: true,
            matched_query: matched_query.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_no_text() {
        let req = SearchRequest::new(10).with_text("   ");
        assert_eq!(req.effective_text(), None);
        let req = SearchRequest::new(10).with_text("  report ");
        assert_eq!(req.effective_text(), Some("report"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = SearchRequest::new(0).validate().unwrap_err();
        assert_eq!(err.field, "page_size");
    }

    #[test]
    fn file_type_parses_case_insensitively() {
        assert_eq!("PDF".parse::<FileTypeFilter>().unwrap(), FileTypeFilter::Pdf);
        assert_eq!("any".parse::<FileTypeFilter>().unwrap(), FileTypeFilter::Any);
        assert!("docx".parse::<FileTypeFilter>().is_err());
    }

    #[test]
    fn drive_file_decodes_string_sizes() {
        let raw = r#"{"id":"1","name":"a.pdf","mimeType":"application/pdf","parents":["F"],"size":"10000"}"#;
        let file: DriveFile = serde_json::from_str(raw).unwrap();
        let entry = file.into_entry("");
        assert_eq!(entry.size, Some(10000));
        assert!(entry.is_pdf());
        assert_eq!(entry.parent_ids, vec!["F".to_string()]);
    }
}
