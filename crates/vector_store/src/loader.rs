use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::models::SourcePage;

/// Lists the `*.pdf` files directly inside `dir`, sorted by name.
pub async fn discover_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read dataset directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .context("Failed to read directory entry")?
    {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf && entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Extracts the text of every page of a PDF. Pages without text are dropped.
pub async fn load_pdf(path: &Path) -> Result<Vec<SourcePage>> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid filename for: {:?}", path))?
        .to_string();

    let owned = path.to_path_buf();
    // pdf-extract can panic on malformed input; the blocking task contains it.
    let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&owned))
        .await
        .with_context(|| format!("PDF extraction aborted for {file_name}"))?
        .map_err(|e| anyhow::anyhow!("Failed to extract text from {file_name}: {e}"))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| SourcePage::new(file_name.clone(), index + 1, text))
        .collect())
}

/// Loads every readable PDF in `dir`. Files that fail to parse are logged and skipped.
pub async fn load_pdf_directory(dir: &Path) -> Result<Vec<SourcePage>> {
    let files = discover_pdf_files(dir).await?;
    let mut pages = Vec::new();

    for path in files {
        match load_pdf(&path).await {
            Ok(file_pages) => {
                tracing::info!(
                    file = %path.display(),
                    pages = file_pages.len(),
                    "loaded PDF"
                );
                pages.extend(file_pages);
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable PDF");
            }
        }
    }

    Ok(pages)
}
