use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::api::{DriveApi, ListRequest};
use crate::error::BackendError;
use crate::service::query_builder::{self, QueryParams};
use crate::types::FileEntry;
use crate::types::drive::{DriveFile, FILE_LIST_FIELDS, FOLDER_LIST_FIELDS, FileTypeFilter};

/// Safety bounds for one crawl. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlBudget {
    pub max_folders: Option<usize>,
    pub max_elapsed: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
pub struct CrawlOptions<'a> {
    pub text_query: Option<&'a str>,
    pub file_type: Option<FileTypeFilter>,
    pub page_size: u32,
    pub folder_page_size: u32,
    pub budget: CrawlBudget,
}

/// Folder ids interned once each; the arena doubles as the visited set.
#[derive(Default)]
struct FolderArena {
    ids: Vec<String>,
    slots: HashMap<String, usize>,
}

impl FolderArena {
    /// Slot of a newly seen folder, or `None` if it was already interned.
    fn intern(&mut self, id: &str) -> Option<usize> {
        if self.slots.contains_key(id) {
            return None;
        }
        let slot = self.ids.len();
        self.ids.push(id.to_string());
        self.slots.insert(id.to_string(), slot);
        Some(slot)
    }

    fn id(&self, slot: usize) -> &str {
        &self.ids[slot]
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Files keyed by id; first discovery wins and discovery order is kept.
#[derive(Default)]
struct SeenFiles {
    ids: HashSet<String>,
    entries: Vec<FileEntry>,
}

impl SeenFiles {
    fn insert(&mut self, file: DriveFile, matched_query: &str) -> bool {
        if !self.ids.insert(file.id.clone()) {
            return false;
        }
        self.entries.push(file.into_entry(matched_query));
        true
    }
}

/// Follow continuation tokens until the listing is exhausted.
pub(crate) async fn for_each_page<D, F>(
    drive: &D,
    first: ListRequest,
    mut on_file: F,
) -> Result<(), BackendError>
where
    D: DriveApi + ?Sized,
    F: FnMut(DriveFile),
{
    let mut request = first;
    loop {
        let page = drive.list_files(&request).await?;
        page.files.into_iter().for_each(&mut on_file);
        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => request = request.next_page(token),
            None => return Ok(()),
        }
    }
}

/// Breadth-first walk of the folder graph under `root_folder_id`.
///
/// Folders reachable through several parents (or through a cycle) are visited
/// once. Any listing failure aborts the whole crawl.
pub async fn crawl<D>(
    drive: &D,
    root_folder_id: &str,
    opts: &CrawlOptions<'_>,
) -> Result<Vec<FileEntry>, BackendError>
where
    D: DriveApi + ?Sized,
{
    let started = Instant::now();
    let matched_query = opts.text_query.map(str::trim).unwrap_or_default();

    let mut arena = FolderArena::default();
    let mut queue = VecDeque::new();
    let mut seen = SeenFiles::default();
    let mut visited = 0usize;

    if let Some(root) = arena.intern(root_folder_id) {
        queue.push_back(root);
    }

    while let Some(slot) = queue.pop_front() {
        if let Some(limit) = opts.budget.max_folders
            && visited >= limit
        {
            warn!(
                root = root_folder_id,
                visited,
                pending = queue.len() + 1,
                "crawl folder budget exhausted; returning partial results"
            );
            break;
        }
        if let Some(limit) = opts.budget.max_elapsed
            && started.elapsed() >= limit
        {
            warn!(
                root = root_folder_id,
                visited,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "crawl time budget exhausted; returning partial results"
            );
            break;
        }
        visited += 1;

        let folder_id = arena.id(slot).to_string();
        let built = query_builder::build(QueryParams {
            folder_scope: Some(&folder_id),
            text_query: opts.text_query,
            file_type: opts.file_type,
        });

        let mut added = 0usize;
        let files = ListRequest::new(built.q, FILE_LIST_FIELDS, opts.page_size)
            .ordered_by(built.order_by);
        for_each_page(drive, files, |file| {
            if seen.insert(file, matched_query) {
                added += 1;
            }
        })
        .await?;

        let mut subfolders = Vec::new();
        let folders = ListRequest::new(
            query_builder::subfolders(&folder_id),
            FOLDER_LIST_FIELDS,
            opts.folder_page_size,
        );
        for_each_page(drive, folders, |folder| subfolders.push(folder.id)).await?;

        let mut enqueued = 0usize;
        for id in subfolders {
            if let Some(child) = arena.intern(&id) {
                queue.push_back(child);
                enqueued += 1;
            }
        }

        debug!(
            folder_id = %folder_id,
            files_added = added,
            subfolders_enqueued = enqueued,
            "folder crawled"
        );
    }

    info!(
        root = root_folder_id,
        folders = visited,
        known_folders = arena.len(),
        files = seen.entries.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "crawl finished"
    );
    Ok(seen.entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fake_drive::FakeDrive;

    fn opts(page_size: u32) -> CrawlOptions<'static> {
        CrawlOptions {
            text_query: None,
            file_type: None,
            page_size,
            folder_page_size: 100,
            budget: CrawlBudget::default(),
        }
    }

    fn ids(files: &[FileEntry]) -> Vec<&str> {
        let mut out: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
        out.sort_unstable();
        out
    }

    #[tokio::test]
    async fn shared_file_is_returned_once() {
        let drive = FakeDrive::new()
            .folder("R", &[])
            .folder("X", &["R"])
            .folder("Y", &["R"])
            .pdf("shared", "shared.pdf", &["X", "Y"], 9000)
            .pdf("own", "own.pdf", &["Y"], 9000);

        let files = crawl(&drive, "R", &opts(10)).await.unwrap();
        assert_eq!(ids(&files), vec!["own", "shared"]);
    }

    #[tokio::test]
    async fn cyclic_folders_terminate() {
        let drive = FakeDrive::new()
            .folder("A", &["C"])
            .folder("B", &["A"])
            .folder("C", &["B"])
            .pdf("f", "f.pdf", &["C"], 9000);

        let files = crawl(&drive, "A", &opts(10)).await.unwrap();
        assert_eq!(ids(&files), vec!["f"]);
        // Each of the three folders is listed once for files and once for subfolders.
        assert_eq!(drive.list_calls(), 6);
    }

    #[tokio::test]
    async fn multi_parent_folder_is_visited_once() {
        let drive = FakeDrive::new()
            .folder("R", &[])
            .folder("X", &["R"])
            .folder("Y", &["R"])
            .folder("Z", &["X", "Y"])
            .pdf("z1", "z1.pdf", &["Z"], 9000);

        let files = crawl(&drive, "R", &opts(10)).await.unwrap();
        assert_eq!(ids(&files), vec!["z1"]);
        assert_eq!(drive.list_calls(), 8);
    }

    #[tokio::test]
    async fn pagination_is_followed() {
        let mut drive = FakeDrive::new().folder("R", &[]);
        for i in 0..7 {
            drive = drive.pdf(&format!("f{i}"), &format!("f{i}.pdf"), &["R"], 9000);
        }
        let files = crawl(&drive, "R", &opts(3)).await.unwrap();
        assert_eq!(files.len(), 7);
        // 3 file pages + 1 subfolder page.
        assert_eq!(drive.list_calls(), 4);
    }

    #[tokio::test]
    async fn listing_failure_aborts_crawl() {
        let drive = FakeDrive::new()
            .folder("R", &[])
            .folder("bad", &["R"])
            .pdf("ok", "ok.pdf", &["R"], 9000)
            .fail_listing("bad");

        let err = crawl(&drive, "R", &opts(10)).await.unwrap_err();
        assert_eq!(err.operation, "drive.files.list");
    }

    #[tokio::test]
    async fn folder_budget_stops_early() {
        let drive = FakeDrive::new()
            .folder("R", &[])
            .folder("X", &["R"])
            .pdf("top", "top.pdf", &["R"], 9000)
            .pdf("deep", "deep.pdf", &["X"], 9000);

        let mut bounded = opts(10);
        bounded.budget.max_folders = Some(1);
        let files = crawl(&drive, "R", &bounded).await.unwrap();
        assert_eq!(ids(&files), vec!["top"]);
    }

    #[tokio::test]
    async fn elapsed_budget_stops_before_first_folder() {
        let drive = FakeDrive::new()
            .folder("R", &[])
            .pdf("top", "top.pdf", &["R"], 9000);

        let mut bounded = opts(10);
        bounded.budget.max_elapsed = Some(Duration::ZERO);
        let files = crawl(&drive, "R", &bounded).await.unwrap();
        assert!(files.is_empty());
        assert_eq!(drive.list_calls(), 0);
    }

    #[tokio::test]
    async fn text_query_is_recorded_on_entries() {
        let drive = FakeDrive::new()
            .folder("R", &[])
            .pdf("a", "annual report.pdf", &["R"], 9000)
            .pdf("b", "minutes.pdf", &["R"], 9000);

        let mut with_text = opts(10);
        with_text.text_query = Some(" report ");
        let files = crawl(&drive, "R", &with_text).await.unwrap();
        assert_eq!(ids(&files), vec!["a"]);
        assert_eq!(files[0].matched_query, "report");
    }
}
