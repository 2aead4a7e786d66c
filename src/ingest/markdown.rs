use std::path::Path;

use crate::core::errors::ApiError;
use super::parser::ParsedPage;

/// `# Page N` sections separated by horizontal rules.
pub fn render_pages(pages: &[ParsedPage]) -> String {
    let mut out = String::new();
    for page in pages {
        out.push_str(&format!("# Page {}\n\n", page.page));
        out.push_str(&page.text);
        out.push_str("\n\n");
        out.push_str("---\n\n");
    }
    out
}

pub async fn write_pages(path: &Path, pages: &[ParsedPage]) -> Result<(), ApiError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(ApiError::internal)?;
    }
    tokio::fs::write(path, render_pages(pages))
        .await
        .map_err(|e| ApiError::Internal(format!("cannot write {}: {}", path.display(), e)))
}
