//! Model file discovery for server startup.
//!
//! An explicit `MODEL_PATH` wins when it exists. Otherwise the models
//! directory is scanned for the first `.gguf` file by name. A configured
//! path that is missing is reported separately from an unset one so that
//! misconfiguration shows up in the logs.

use std::fs;
use std::path::{Path, PathBuf};

/// File extension recognized as a model artifact.
pub const MODEL_EXTENSION: &str = "gguf";

/// Where the resolved model file came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// `MODEL_PATH` pointed at an existing file.
    Configured,
    /// Found by scanning the models directory. `configured` holds a
    /// `MODEL_PATH` that was set but was not a usable file.
    Discovered { configured: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelLocation {
    pub path: PathBuf,
    pub source: ModelSource,
}

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error(
        "No .gguf model found in {} ({}). Download one with `fetch-model` or set MODEL_PATH",
        .models_dir.display(),
        describe_configured(.configured)
    )]
    NotFound {
        configured: Option<PathBuf>,
        models_dir: PathBuf,
    },

    #[error("Failed to scan models dir {}: {source}", .models_dir.display())]
    ScanFailed {
        models_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_configured(configured: &Option<PathBuf>) -> String {
    match configured {
        Some(p) => format!("MODEL_PATH={} {}", p.display(), configured_problem(p)),
        None => "MODEL_PATH not set".to_string(),
    }
}

fn configured_problem(path: &Path) -> &'static str {
    if path.exists() {
        "is not a regular file"
    } else {
        "does not exist"
    }
}

/// Resolve the model file to load.
pub fn locate_model(
    configured: Option<&Path>,
    models_dir: &Path,
) -> Result<ModelLocation, LocateError> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(ModelLocation {
                path: path.to_path_buf(),
                source: ModelSource::Configured,
            });
        }
        log::warn!(
            "[MODEL] MODEL_PATH={} {}, scanning {}",
            path.display(),
            configured_problem(path),
            models_dir.display()
        );
    } else {
        log::info!("[MODEL] MODEL_PATH not set, scanning {}", models_dir.display());
    }

    let configured = configured.map(Path::to_path_buf);
    match find_model_file(models_dir)? {
        Some(path) => {
            log::info!("[MODEL] Found model file: {}", path.display());
            Ok(ModelLocation {
                path,
                source: ModelSource::Discovered { configured },
            })
        }
        None => Err(LocateError::NotFound {
            configured,
            models_dir: models_dir.to_path_buf(),
        }),
    }
}

/// First regular `.gguf` file in `dir`, by file name. A missing directory
/// yields `None`.
pub fn find_model_file(dir: &Path) -> Result<Option<PathBuf>, LocateError> {
    let scan_err = |source| LocateError::ScanFailed {
        models_dir: dir.to_path_buf(),
        source,
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(scan_err(e)),
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry.map_err(scan_err)?.path();
        let is_model = path.extension().and_then(|e| e.to_str()) == Some(MODEL_EXTENSION);
        if is_model && path.is_file() {
            candidates.push(path);
        }
    }

    candidates.sort();
    Ok(candidates.into_iter().next())
}
