//! Offline ingestion: parse PDFs, save Markdown, optionally index.

pub mod chunker;
pub mod indexer;
pub mod llama_parse;
pub mod markdown;
pub mod parser;

use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};

pub use chunker::{Chunker, TextChunk};
pub use indexer::Indexer;
pub use llama_parse::LlamaParseClient;
pub use parser::{DocumentParser, ParsedPage};

use crate::core::errors::ApiError;

/// A parsed input file.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub path: PathBuf,
    pub pages: Vec<ParsedPage>,
}

impl ParsedDocument {
    /// File name used as the `source` of every chunk.
    pub fn source(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Parses `paths` with at most `num_workers` jobs in flight, keeping input order.
pub async fn parse_all(
    parser: &dyn DocumentParser,
    paths: &[PathBuf],
    partition_pages: Option<u32>,
    num_workers: usize,
) -> Result<Vec<ParsedDocument>, ApiError> {
    stream::iter(paths.iter().cloned())
        .map(|path| async move {
            tracing::info!(path = %path.display(), ?partition_pages, "Parsing document");
            let pages = parser.parse(&path, partition_pages).await?;
            tracing::info!(path = %path.display(), pages = pages.len(), "Finished parsing");
            Ok::<_, ApiError>(ParsedDocument { path, pages })
        })
        .buffered(num_workers.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect()
}

/// Fails early with a readable message when an input file is missing.
pub fn ensure_exists(path: &Path) -> Result<(), ApiError> {
    if path.is_file() {
        return Ok(());
    }
    let cwd = std::env::current_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    Err(ApiError::BadRequest(format!(
        "The file '{}' does not exist (working directory: {})",
        path.display(),
        cwd
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowParser {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl DocumentParser for SlowParser {
        async fn parse(
            &self,
            path: &Path,
            _partition_pages: Option<u32>,
        ) -> Result<Vec<ParsedPage>, ApiError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![ParsedPage {
                page: 1,
                text: path.display().to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn parse_all_bounds_concurrency_and_keeps_order() {
        let parser = SlowParser {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let paths: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("doc{}.pdf", i))).collect();

        let docs = parse_all(&parser, &paths, None, 2).await.expect("parse all");

        assert_eq!(docs.len(), 5);
        assert_eq!(docs[3].pages[0].text, "doc3.pdf");
        assert_eq!(docs[3].source(), "doc3.pdf");
        assert!(parser.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn ensure_exists_reports_missing_file() {
        let err = ensure_exists(Path::new("Data/missing.pdf")).unwrap_err();
        assert!(err.to_string().contains("Data/missing.pdf"));
    }
}
