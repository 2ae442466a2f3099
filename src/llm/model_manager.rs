//! Model management — locate and download catalog GGUF files.
//!
//! Models are stored flat in the models directory (`models/` relative to the
//! working directory unless `MODELS_DIR` says otherwise), which is also where
//! the server looks for them. Downloads stream into `<filename>.partial` and
//! are renamed into place only once complete, so a half-written file never
//! carries the `.gguf` extension.

use super::model_registry::ModelInfo;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Default models directory, shared with the server's auto-scan.
pub const DEFAULT_MODELS_DIR: &str = "models";

const MB: f64 = 1024.0 * 1024.0;

/// Base directory for downloaded models.
pub fn models_dir() -> PathBuf {
    std::env::var("MODELS_DIR")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR))
}

/// Full path for a model's GGUF file under `dir`.
pub fn model_path(dir: &Path, model: &ModelInfo) -> PathBuf {
    dir.join(model.filename)
}

fn partial_path(dir: &Path, model: &ModelInfo) -> PathBuf {
    dir.join(format!("{}.partial", model.filename))
}

/// Result of [`fetch_model`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    /// Destination existed and the overwrite was declined.
    Cancelled { path: PathBuf },
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Download failed: HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Download incomplete: got {got} bytes, expected {expected}")]
    Incomplete { got: u64, expected: u64 },
}

/// Download a catalog model into `dir`.
///
/// If the destination already exists, `confirm_overwrite` decides whether to
/// continue; declining returns `Cancelled` before any network I/O.
/// `progress` is called after every chunk with the bytes received so far and
/// the remote-declared total, if any. Failures are not retried and leave no
/// partial file behind.
pub async fn fetch_model(
    client: &reqwest::Client,
    model: &ModelInfo,
    dir: &Path,
    confirm_overwrite: impl FnOnce(&Path) -> bool,
    progress: impl FnMut(u64, Option<u64>),
) -> Result<FetchOutcome, DownloadError> {
    tokio::fs::create_dir_all(dir).await?;

    let dest = model_path(dir, model);
    if tokio::fs::try_exists(&dest).await? && !confirm_overwrite(&dest) {
        log::info!("[MODEL] Keeping existing {}", dest.display());
        return Ok(FetchOutcome::Cancelled { path: dest });
    }

    let partial = partial_path(dir, model);
    log::info!("[MODEL] Downloading {} from {}", model.id, model.url);

    match stream_to_file(client, model.url, &partial, progress).await {
        Ok(bytes) => {
            tokio::fs::rename(&partial, &dest).await?;
            log::info!("[MODEL] Download complete: {} ({} bytes)", dest.display(), bytes);
            Ok(FetchOutcome::Downloaded { path: dest, bytes })
        }
        Err(e) => {
            log::error!("[MODEL] Download of {} failed: {}", model.id, e);
            let _ = tokio::fs::remove_file(&partial).await;
            Err(e)
        }
    }
}

/// Stream `url` into `path`, truncating any previous content.
async fn stream_to_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    mut progress: impl FnMut(u64, Option<u64>),
) -> Result<u64, DownloadError> {
    let mut resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(DownloadError::Status(resp.status()));
    }

    let total = resp.content_length();
    let mut file = tokio::fs::File::create(path).await?;
    let mut downloaded = 0u64;

    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        progress(downloaded, total);
    }
    file.flush().await?;

    if let Some(expected) = total {
        if downloaded != expected {
            return Err(DownloadError::Incomplete {
                got: downloaded,
                expected,
            });
        }
    }

    Ok(downloaded)
}

/// Progress line: `"45.2% (12.3MB / 27.2MB)"`, or just `"12.3MB"` when the
/// total is unknown.
pub fn format_progress(downloaded: u64, total: Option<u64>) -> String {
    let done_mb = downloaded as f64 / MB;
    match total {
        Some(total) if total > 0 => {
            let percent = downloaded as f64 / total as f64 * 100.0;
            format!("{:.1}% ({:.1}MB / {:.1}MB)", percent, done_mb, total as f64 / MB)
        }
        _ => format!("{:.1}MB", done_mb),
    }
}

/// Human-readable size for catalog listings.
pub fn format_size(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes < 1024.0 {
        format!("{} B", bytes as u64)
    } else if bytes < MB {
        format!("{:.1} KB", bytes / 1024.0)
    } else if bytes < MB * 1024.0 {
        format!("{:.1} MB", bytes / MB)
    } else {
        format!("{:.1} GB", bytes / (MB * 1024.0))
    }
}
