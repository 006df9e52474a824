//! In-memory `DriveApi` for unit tests. Understands the queries the crate emits.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::api::{DriveApi, ListRequest};
use crate::error::{BackendError, BackendErrorKind};
use crate::service::query_builder::PROBE_TERM;
use crate::types::drive::{DriveFile, DriveFileList, FOLDER_MIME, PDF_MIME};

#[derive(Clone)]
struct Node {
    id: String,
    name: String,
    mime: String,
    parents: Vec<String>,
    size: Option<u64>,
}

#[derive(Default)]
pub(crate) struct FakeDrive {
    nodes: Vec<Node>,
    indexed: HashSet<String>,
    failing_folders: HashSet<String>,
    failing_sizes: HashSet<String>,
    failing_probes: bool,
    list_calls: AtomicUsize,
    size_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl FakeDrive {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn folder(mut self, id: &str, parents: &[&str]) -> Self {
        self.nodes.push(Node {
            id: id.to_string(),
            name: id.to_string(),
            mime: FOLDER_MIME.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            size: None,
        });
        self
    }

    pub(crate) fn file(mut self, id: &str, name: &str, mime: &str, parents: &[&str], size: Option<u64>) -> Self {
        self.nodes.push(Node {
            id: id.to_string(),
            name: name.to_string(),
            mime: mime.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            size,
        });
        self
    }

    pub(crate) fn pdf(self, id: &str, name: &str, parents: &[&str], size: u64) -> Self {
        self.file(id, name, PDF_MIME, parents, Some(size))
    }

    /// Mark a file name as carrying indexed text, so probes for it hit.
    pub(crate) fn indexed(mut self, name: &str) -> Self {
        self.indexed.insert(name.to_string());
        self
    }

    pub(crate) fn fail_listing(mut self, folder_id: &str) -> Self {
        self.failing_folders.insert(folder_id.to_string());
        self
    }

    pub(crate) fn fail_size(mut self, file_id: &str) -> Self {
        self.failing_sizes.insert(file_id.to_string());
        self
    }

    pub(crate) fn fail_probes(mut self) -> Self {
        self.failing_probes = true;
        self
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn size_calls(&self) -> usize {
        self.size_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    fn unavailable(op: &'static str) -> BackendError {
        BackendError::new(
            op,
            BackendErrorKind::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                message: "fake outage".to_string(),
            },
        )
    }

    fn probe(&self, q: &str) -> Result<DriveFileList, BackendError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_probes {
            return Err(Self::unavailable("drive.files.list"));
        }
        let name = quoted_after(q, "name = '").unwrap_or_default();
        let files = self
            .nodes
            .iter()
            .filter(|n| n.name == name && self.indexed.contains(&n.name))
            .take(1)
            .map(to_wire)
            .collect();
        Ok(DriveFileList {
            files,
            next_page_token: None,
        })
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn list_files(&self, request: &ListRequest) -> Result<DriveFileList, BackendError> {
        let q = request.query.as_str();
        if q.contains(&format!("fullText contains '{PROBE_TERM}'")) && q.contains("name = '") {
            return self.probe(q);
        }
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let parent = parent_of(q);
        if let Some(p) = parent.as_deref()
            && self.failing_folders.contains(p)
        {
            return Err(Self::unavailable("drive.files.list"));
        }
        let want_folders = q.contains(FOLDER_MIME);
        let want_pdf = q.contains(&format!("mimeType = '{PDF_MIME}'"));
        let term = quoted_after(q, "name contains '");

        let matching: Vec<&Node> = self
            .nodes
            .iter()
            .filter(|n| parent.as_ref().is_none_or(|p| n.parents.contains(p)))
            .filter(|n| (n.mime == FOLDER_MIME) == want_folders)
            .filter(|n| !want_pdf || n.mime == PDF_MIME)
            .filter(|n| term.as_ref().is_none_or(|t| n.name.contains(t.as_str())))
            .collect();

        let offset: usize = request
            .page_token
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        let size = request.page_size.max(1) as usize;
        let end = (offset + size).min(matching.len());
        let files = matching[offset.min(end)..end].iter().map(|n| to_wire(n)).collect();
        Ok(DriveFileList {
            files,
            next_page_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn file_size(&self, file_id: &str) -> Result<Option<u64>, BackendError> {
        self.size_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_sizes.contains(file_id) {
            return Err(Self::unavailable("drive.files.get"));
        }
        Ok(self.nodes.iter().find(|n| n.id == file_id).and_then(|n| n.size))
    }
}

fn to_wire(node: &Node) -> DriveFile {
    DriveFile {
        id: node.id.clone(),
        name: node.name.clone(),
        mime_type: node.mime.clone(),
        parents: node.parents.clone(),
        web_view_link: Some(format!("https://drive.example/{}", node.id)),
        description: None,
        thumbnail_link: None,
        has_thumbnail: false,
        icon_link: None,
        size: None,
    }
}

/// Unescaped literal that follows `marker`, up to the closing quote.
fn quoted_after(q: &str, marker: &str) -> Option<String> {
    let start = q.find(marker)? + marker.len();
    let mut out = String::new();
    let mut chars = q[start..].chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.extend(chars.next()),
            '\'' => return Some(out),
            other => out.push(other),
        }
    }
    None
}

fn parent_of(q: &str) -> Option<String> {
    let end = q.find("' in parents")?;
    let start = q[..end].rfind("and '")? + "and '".len();
    Some(q[start..end].to_string())
}
