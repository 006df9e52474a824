use tracing::info;

use crate::api::{DriveApi, ListRequest};
use crate::config::SearchConfig;
use crate::error::FolioError;
use crate::service::classifier::LegibilityClassifier;
use crate::service::folder_crawler::{self, CrawlBudget, CrawlOptions};
use crate::service::query_builder::{self, QueryParams};
use crate::types::drive::FILE_LIST_FIELDS;
use crate::types::{FileEntry, SearchRequest};

/// Knobs the search pipeline takes from configuration.
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub folder_page_size: u32,
    pub budget: CrawlBudget,
}

impl From<&SearchConfig> for SearchSettings {
    fn from(cfg: &SearchConfig) -> Self {
        Self {
            folder_page_size: cfg.folder_page_size.max(1),
            budget: CrawlBudget {
                max_folders: cfg.max_folders,
                max_elapsed: cfg.max_crawl_time(),
            },
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        (&SearchConfig::default()).into()
    }
}

/// List, classify and filter.
///
/// A folder scope triggers a recursive crawl; otherwise a single flat listing
/// of `page_size` results is issued.
pub async fn run_search<D>(
    drive: &D,
    request: &SearchRequest,
    settings: &SearchSettings,
    classifier: &LegibilityClassifier,
) -> Result<Vec<FileEntry>, FolioError>
where
    D: DriveApi + ?Sized,
{
    request.validate()?;
    run_validated(drive, request, settings, classifier).await
}

/// [`run_search`] for a request the caller has already validated.
pub(crate) async fn run_validated<D>(
    drive: &D,
    request: &SearchRequest,
    settings: &SearchSettings,
    classifier: &LegibilityClassifier,
) -> Result<Vec<FileEntry>, FolioError>
where
    D: DriveApi + ?Sized,
{
    let text = request.effective_text();
    let matched_query = text.unwrap_or_default();

    let (files, text_used) = match request.effective_folder() {
        Some(root) => {
            let opts = CrawlOptions {
                text_query: text,
                file_type: request.file_type,
                page_size: request.page_size,
                folder_page_size: settings.folder_page_size,
                budget: settings.budget,
            };
            let files = folder_crawler::crawl(drive, root, &opts).await?;
            (files, text.is_some())
        }
        None => {
            let built = query_builder::build(QueryParams {
                folder_scope: None,
                text_query: text,
                file_type: request.file_type,
            });
            let listing = ListRequest::new(built.q, FILE_LIST_FIELDS, request.page_size)
                .ordered_by(built.order_by);
            let page = drive.list_files(&listing).await?;
            let files = page
                .files
                .into_iter()
                .map(|f| f.into_entry(matched_query))
                .collect();
            (files, built.text_used)
        }
    };

    let total = files.len();
    let mut annotated = classifier.annotate(drive, files, text_used).await;
    if request.illegible_only {
        annotated.retain(|f| f.is_scanned);
    }

    info!(
        folder = request.effective_folder().unwrap_or("-"),
        text_used,
        candidates = total,
        returned = annotated.len(),
        "search completed"
    );
    Ok(annotated)
}
