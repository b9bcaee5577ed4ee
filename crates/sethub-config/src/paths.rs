//! Project directory layout resolution.
//!
//! The content folders of a Sethub deployment live at fixed locations under
//! the project root. They are resolved once at startup and never recomputed.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the application code folder under the project root.
const APP_FOLDER: &str = "app";

/// Name of the uploaded-media folder under the project root.
const MEDIA_FOLDER: &str = "media";

/// Static assets served to clients, under the project root.
const STATIC_FOLDER: &str = "frontend/static";

/// HTML templates, under the project root.
const TEMPLATES_FOLDER: &str = "frontend/templates";

/// Filesystem layout of a Sethub deployment.
///
/// Constructed once via [`ProjectPaths::resolve`]; there is no mutating API,
/// so the paths stay fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Canonicalized project root; every other path lives under it.
    pub root: PathBuf,

    /// Application code folder.
    pub app_dir: PathBuf,

    /// Uploaded media folder.
    pub media_dir: PathBuf,

    /// Static assets folder.
    pub static_dir: PathBuf,

    /// HTML templates folder.
    pub templates_dir: PathBuf,
}

/// Errors that can occur while resolving the project layout.
#[derive(Debug, Error)]
pub enum PathsError {
    /// The project root could not be canonicalized (missing or unreadable).
    #[error("failed to resolve project root '{root}': {source}")]
    RootResolution {
        /// The root path as given.
        root: String,
        /// The underlying filesystem error.
        source: std::io::Error,
    },
}

impl ProjectPaths {
    /// Resolves the full layout from the given project root.
    ///
    /// The root is canonicalized so that later working-directory changes
    /// cannot shift where the content folders point.
    ///
    /// # Errors
    ///
    /// Returns [`PathsError::RootResolution`] if the root does not exist or
    /// cannot be resolved.
    pub fn resolve(root: &Path) -> Result<Self, PathsError> {
        let root = root
            .canonicalize()
            .map_err(|source| PathsError::RootResolution {
                root: root.display().to_string(),
                source,
            })?;

        Ok(Self {
            app_dir: root.join(APP_FOLDER),
            media_dir: root.join(MEDIA_FOLDER),
            static_dir: root.join(STATIC_FOLDER),
            templates_dir: root.join(TEMPLATES_FOLDER),
            root,
        })
    }
}
