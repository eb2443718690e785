//! Batch ingestion of a directory of page exports.
//!
//! Pages are independent, so they are ingested in parallel on a dedicated
//! rayon pool of at most `threads` workers. Results are joined and then
//! aggregated in input order, which keeps reports and manifests stable no
//! matter how the work was scheduled.
//!
//! ## Failure policy
//!
//! A failure is always fatal for its own page. What it means for the batch
//! depends on [`ErrorPolicy`]:
//!
//! - `Skip`: the page is left out, the failure is recorded in the
//!   [`BatchReport`] and logged, and the batch continues.
//! - `Abort`: the batch fails with the first failure in input order.

use crate::block::{PageLoadError, PageTree};
use crate::ingest::{self, Collaborators, IngestError};
use crate::types::Document;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    #[default]
    Skip,
    Abort,
}

/// Why one page produced no document.
#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Load(#[from] PageLoadError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Failed to read content directory: {0}")]
    Discover(#[from] walkdir::Error),
    #[error("Aborted at {path}: {source}")]
    Aborted { path: PathBuf, source: PageError },
}

#[derive(Debug)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: PageError,
}

/// Outcome of a batch: ingested documents and skipped pages, both in input
/// order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub documents: Vec<Document>,
    pub failures: Vec<BatchFailure>,
}

/// All `*.json` page exports under `dir`, sorted by path.
pub fn discover_pages(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|e| e == "json") {
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}

fn ingest_path(path: &Path, collaborators: Collaborators<'_>) -> Result<Document, PageError> {
    let page = PageTree::load(path)?;
    let ingestion = ingest::ingest(&page, collaborators)?;
    Ok(ingestion.document)
}

/// Ingest every page in `paths` on a pool of `threads` workers.
pub fn ingest_all(
    paths: &[PathBuf],
    collaborators: Collaborators<'_>,
    threads: usize,
    policy: ErrorPolicy,
) -> Result<BatchReport, BatchError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()?;

    let results: Vec<Result<Document, PageError>> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| ingest_path(path, collaborators))
            .collect()
    });

    let mut report = BatchReport::default();
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(document) => report.documents.push(document),
            Err(error) if policy == ErrorPolicy::Abort => {
                return Err(BatchError::Aborted {
                    path: path.clone(),
                    source: error,
                });
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "page skipped");
                report.failures.push(BatchFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }

    info!(
        ingested = report.documents.len(),
        skipped = report.failures.len(),
        threads,
        "batch ingestion done"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockFetcher, image, no_assets, page, text};
    use std::fs;
    use tempfile::TempDir;

    fn write_page(dir: &Path, name: &str, page: &PageTree) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string(page).unwrap()).unwrap();
        path
    }

    fn good(title: &str) -> PageTree {
        let mut p = page(vec![text("t", "tags: go"), image("i", "https://x/a.png")]);
        p.id = format!("id-{title}");
        p.title = title.to_string();
        p
    }

    fn bad() -> PageTree {
        let mut p = page(vec![text("t", "date: someday")]);
        p.id = "bad-page".to_string();
        p
    }

    // =========================================================================
    // discover_pages()
    // =========================================================================

    #[test]
    fn discover_finds_json_recursively_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("b.json"), "{}").unwrap();
        fs::write(tmp.path().join("a.json"), "{}").unwrap();
        fs::write(tmp.path().join("notes.txt"), "").unwrap();
        fs::write(tmp.path().join("sub/c.json"), "{}").unwrap();

        let names: Vec<String> = discover_pages(tmp.path())
            .unwrap()
            .iter()
            .map(|p| {
                p.strip_prefix(tmp.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, vec!["a.json", "b.json", "sub/c.json"]);
    }

    #[test]
    fn discover_missing_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            discover_pages(&tmp.path().join("nope")),
            Err(BatchError::Discover(_))
        ));
    }

    // =========================================================================
    // ingest_all()
    // =========================================================================

    #[test]
    fn ingests_in_input_order() {
        let tmp = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = ["c", "a", "b"]
            .iter()
            .map(|t| write_page(tmp.path(), &format!("{t}.json"), &good(t)))
            .collect();
        let fetcher = MockFetcher::new();
        let assets = no_assets();
        let collab = Collaborators {
            fetcher: &fetcher,
            assets: &assets,
        };

        let report = ingest_all(&paths, collab, 4, ErrorPolicy::Skip).unwrap();
        let titles: Vec<&str> = report.documents.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
        assert!(report.failures.is_empty());
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[test]
    fn skip_policy_records_failures() {
        let tmp = TempDir::new().unwrap();
        let paths = vec![
            write_page(tmp.path(), "1.json", &good("one")),
            write_page(tmp.path(), "2.json", &bad()),
            tmp.path().join("missing.json"),
            write_page(tmp.path(), "3.json", &good("three")),
        ];
        let fetcher = MockFetcher::new();
        let assets = no_assets();
        let collab = Collaborators {
            fetcher: &fetcher,
            assets: &assets,
        };

        let report = ingest_all(&paths, collab, 2, ErrorPolicy::Skip).unwrap();
        assert_eq!(report.documents.len(), 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].path, paths[1]);
        assert!(matches!(
            report.failures[0].error,
            PageError::Ingest(IngestError::Metadata { .. })
        ));
        assert!(matches!(report.failures[1].error, PageError::Load(_)));
    }

    #[test]
    fn abort_policy_returns_first_failure_in_input_order() {
        let tmp = TempDir::new().unwrap();
        let paths = vec![
            write_page(tmp.path(), "1.json", &good("one")),
            write_page(tmp.path(), "2.json", &bad()),
            tmp.path().join("missing.json"),
        ];
        let fetcher = MockFetcher::new();
        let assets = no_assets();
        let collab = Collaborators {
            fetcher: &fetcher,
            assets: &assets,
        };

        match ingest_all(&paths, collab, 3, ErrorPolicy::Abort) {
            Err(BatchError::Aborted { path, source }) => {
                assert_eq!(path, paths[1]);
                assert!(matches!(source, PageError::Ingest(_)));
            }
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[test]
    fn fetch_failure_skips_only_that_page() {
        let tmp = TempDir::new().unwrap();
        let mut broken = good("broken");
        broken.blocks.push(image("j", "https://x/broken.png"));
        let paths = vec![
            write_page(tmp.path(), "1.json", &broken),
            write_page(tmp.path(), "2.json", &good("fine")),
        ];
        let fetcher = MockFetcher::failing_on(&["https://x/broken.png"]);
        let assets = no_assets();
        let collab = Collaborators {
            fetcher: &fetcher,
            assets: &assets,
        };

        let report = ingest_all(&paths, collab, 1, ErrorPolicy::Skip).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].title, "fine");
        assert_eq!(
            report.failures[0].error.to_string(),
            "document id-broken: media 'https://x/broken.png' of block j: \
             Fetching 'https://x/broken.png' failed: mock failure"
        );
    }

    #[test]
    fn error_policy_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrap {
            on_error: ErrorPolicy,
        }
        let w: Wrap = toml::from_str(r#"on_error = "abort""#).unwrap();
        assert_eq!(w.on_error, ErrorPolicy::Abort);
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::Skip);
    }
}
