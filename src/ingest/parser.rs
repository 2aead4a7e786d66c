use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// One page (or parser-defined chunk) of a parsed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedPage {
    /// 1-based position in the document.
    pub page: u32,
    pub text: String,
}

/// Turns a document on disk into ordered page records.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// `partition_pages` splits the document into jobs of at most that many pages.
    async fn parse(
        &self,
        path: &Path,
        partition_pages: Option<u32>,
    ) -> Result<Vec<ParsedPage>, ApiError>;
}
