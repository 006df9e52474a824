use futures::stream::{self, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::{DriveApi, ListRequest};
use crate::config::SearchConfig;
use crate::service::query_builder;
use crate::types::FileEntry;
use crate::types::drive::PROBE_FIELDS;

/// PDFs at or below this size cannot hold a meaningful text layer.
pub const MIN_TEXT_BEARING_BYTES: u64 = 1024;
/// Size heuristic used when the text probe itself fails.
pub const FALLBACK_READABLE_BYTES: u64 = 5 * 1024;

/// How a single file was classified; logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    NotPdf,
    MatchedText,
    SizeUnavailable,
    TooSmall,
    ProbeHit,
    ProbeMiss,
    FallbackBySize,
}

impl Verdict {
    fn readable(self, size: Option<u64>) -> bool {
        match self {
            Verdict::NotPdf | Verdict::MatchedText | Verdict::ProbeHit => true,
            Verdict::SizeUnavailable | Verdict::TooSmall | Verdict::ProbeMiss => false,
            Verdict::FallbackBySize => size.is_some_and(|s| s > FALLBACK_READABLE_BYTES),
        }
    }
}

/// Decides for each search result whether its content has a text layer.
///
/// Files are classified concurrently up to `concurrency`; output order always
/// matches input order. Classification never fails the search: backend errors
/// are contained to the file they concern.
#[derive(Clone)]
pub struct LegibilityClassifier {
    concurrency: usize,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl Default for LegibilityClassifier {
    fn default() -> Self {
        Self::new(8, None)
    }
}

impl LegibilityClassifier {
    pub fn new(concurrency: usize, rate_per_second: Option<NonZeroU32>) -> Self {
        Self {
            concurrency: concurrency.max(1),
            limiter: rate_per_second
                .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate)))),
        }
    }

    pub fn from_config(cfg: &SearchConfig) -> Self {
        Self::new(
            cfg.probe_concurrency,
            cfg.probe_rate_per_second.and_then(NonZeroU32::new),
        )
    }

    /// Set `has_readable_text`/`is_scanned` on every entry.
    ///
    /// `text_used` tells whether the listing that produced `files` carried a
    /// non-blank text predicate; a PDF returned by such a listing matched on
    /// indexed text and needs no probing.
    pub async fn annotate<D>(&self, drive: &D, files: Vec<FileEntry>, text_used: bool) -> Vec<FileEntry>
    where
        D: DriveApi + ?Sized,
    {
        stream::iter(files)
            .map(|mut file| async move {
                let (verdict, size) = self.classify(drive, &file, text_used).await;
                if file.size.is_none() {
                    file.size = size;
                }
                file.set_readable(verdict.readable(size));
                debug!(file_id = %file.id, ?verdict, readable = file.has_readable_text, "classified");
                file
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn classify<D>(&self, drive: &D, file: &FileEntry, text_used: bool) -> (Verdict, Option<u64>)
    where
        D: DriveApi + ?Sized,
    {
        if !file.is_pdf() {
            return (Verdict::NotPdf, file.size);
        }
        if text_used {
            return (Verdict::MatchedText, file.size);
        }

        self.throttle().await;
        let size = match drive.file_size(&file.id).await {
            Ok(size) => size,
            Err(e) => {
                warn!(file_id = %file.id, error = %e, "size lookup failed; treating file as scanned");
                return (Verdict::SizeUnavailable, file.size);
            }
        };
        if size.is_some_and(|s| s <= MIN_TEXT_BEARING_BYTES) {
            return (Verdict::TooSmall, size);
        }

        self.throttle().await;
        let probe = ListRequest::new(query_builder::legibility_probe(&file.name), PROBE_FIELDS, 1);
        match drive.list_files(&probe).await {
            Ok(page) if !page.files.is_empty() => (Verdict::ProbeHit, size),
            Ok(_) => (Verdict::ProbeMiss, size),
            Err(e) => {
                warn!(file_id = %file.id, error = %e, "text probe failed; falling back to size");
                (Verdict::FallbackBySize, size)
            }
        }
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fake_drive::FakeDrive;
    use crate::types::drive::{DriveFile, PDF_MIME};

    fn entry(id: &str, name: &str, mime: &str) -> FileEntry {
        DriveFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime.to_string(),
            parents: vec!["F".to_string()],
            web_view_link: None,
            description: None,
            thumbnail_link: None,
            has_thumbnail: false,
            icon_link: None,
            size: None,
        }
        .into_entry("")
    }

    fn pdf(id: &str) -> FileEntry {
        entry(id, &format!("{id}.pdf"), PDF_MIME)
    }

    #[tokio::test]
    async fn non_pdf_is_readable_without_backend_calls() {
        let drive = FakeDrive::new();
        let out = LegibilityClassifier::default()
            .annotate(&drive, vec![entry("d", "notes.txt", "text/plain")], false)
            .await;
        assert!(out[0].has_readable_text);
        assert!(!out[0].is_scanned);
        assert_eq!(drive.size_calls() + drive.probe_calls(), 0);
    }

    #[tokio::test]
    async fn text_match_short_circuits_pdfs() {
        let drive = FakeDrive::new().pdf("a", "a.pdf", &["F"], 100);
        let out = LegibilityClassifier::default()
            .annotate(&drive, vec![pdf("a")], true)
            .await;
        assert!(out[0].has_readable_text);
        assert_eq!(drive.size_calls() + drive.probe_calls(), 0);
    }

    #[tokio::test]
    async fn tiny_pdf_is_scanned_without_probe() {
        let drive = FakeDrive::new().pdf("a", "a.pdf", &["F"], 500).indexed("a.pdf");
        let out = LegibilityClassifier::default()
            .annotate(&drive, vec![pdf("a")], false)
            .await;
        assert!(out[0].is_scanned);
        assert_eq!(out[0].size, Some(500));
        assert_eq!(drive.size_calls(), 1);
        assert_eq!(drive.probe_calls(), 0);
    }

    #[tokio::test]
    async fn probe_decides_for_large_pdfs() {
        let drive = FakeDrive::new()
            .pdf("hit", "hit.pdf", &["F"], 10_000)
            .pdf("miss", "miss.pdf", &["F"], 10_000)
            .indexed("hit.pdf");
        let out = LegibilityClassifier::default()
            .annotate(&drive, vec![pdf("hit"), pdf("miss")], false)
            .await;
        assert_eq!(out[0].id, "hit");
        assert!(out[0].has_readable_text);
        assert_eq!(out[1].id, "miss");
        assert!(out[1].is_scanned);
        assert_eq!(drive.probe_calls(), 2);
    }

    #[tokio::test]
    async fn probe_failure_falls_back_to_size() {
        let drive = FakeDrive::new()
            .pdf("big", "big.pdf", &["F"], 6000)
            .pdf("mid", "mid.pdf", &["F"], 3000)
            .fail_probes();
        let out = LegibilityClassifier::default()
            .annotate(&drive, vec![pdf("big"), pdf("mid")], false)
            .await;
        assert!(out[0].has_readable_text);
        assert!(out[1].is_scanned);
    }

    #[tokio::test]
    async fn size_failure_is_contained_to_one_file() {
        let drive = FakeDrive::new()
            .pdf("broken", "broken.pdf", &["F"], 10_000)
            .pdf("fine", "fine.pdf", &["F"], 10_000)
            .indexed("broken.pdf")
            .indexed("fine.pdf")
            .fail_size("broken");
        let out = LegibilityClassifier::new(2, None)
            .annotate(&drive, vec![pdf("broken"), pdf("fine")], false)
            .await;
        assert!(out[0].is_scanned);
        assert!(out[1].has_readable_text);
        assert_eq!(drive.probe_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_size_skips_gate_and_probes() {
        let drive = FakeDrive::new()
            .file("g", "g.pdf", PDF_MIME, &["F"], None)
            .indexed("g.pdf");
        let out = LegibilityClassifier::default()
            .annotate(&drive, vec![pdf("g")], false)
            .await;
        assert!(out[0].has_readable_text);
        assert_eq!(out[0].size, None);
    }

    #[tokio::test]
    async fn rate_limited_checks_complete_in_order() {
        let drive = FakeDrive::new()
            .pdf("a", "a.pdf", &["F"], 10_000)
            .pdf("b", "b.pdf", &["F"], 10_000)
            .pdf("c", "c.pdf", &["F"], 10_000)
            .indexed("a.pdf")
            .indexed("c.pdf");
        // Six backend calls against a burst of four forces the limiter to wait.
        let classifier = LegibilityClassifier::new(3, NonZeroU32::new(4));
        let started = std::time::Instant::now();
        let out = classifier
            .annotate(&drive, vec![pdf("a"), pdf("b"), pdf("c")], false)
            .await;

        let ids: Vec<&str> = out.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(out[0].has_readable_text);
        assert!(out[1].is_scanned);
        assert!(out[2].has_readable_text);
        assert_eq!(drive.size_calls(), 3);
        assert_eq!(drive.probe_calls(), 3);
        assert!(started.elapsed() >= std::time::Duration::from_millis(200));
    }

    #[test]
    fn fallback_threshold_is_strict() {
        assert!(!Verdict::FallbackBySize.readable(Some(FALLBACK_READABLE_BYTES)));
        assert!(Verdict::FallbackBySize.readable(Some(FALLBACK_READABLE_BYTES + 1)));
        assert!(!Verdict::FallbackBySize.readable(None));
    }
}
