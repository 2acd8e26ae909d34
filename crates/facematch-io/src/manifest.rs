//! Gallery manifests: the main photo and the gallery it is compared against.
//!
//! A bundled demo manifest is embedded at compile time from
//! `contrib/gallery.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const EMBEDDED_MANIFEST: &str = include_str!("../../../contrib/gallery.toml");

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("cannot read manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad manifest TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("manifest has no main image")]
    MissingMain,
}

/// One main image reference and N gallery references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub main: String,
    #[serde(default)]
    pub gallery: Vec<String>,
    /// Directory that web-style references (`/imgs/a.jpg`) are served from.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl Manifest {
    pub fn parse(src: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(src)?;
        if manifest.main.trim().is_empty() {
            return Err(ManifestError::MissingMain);
        }
        Ok(manifest)
    }

    /// Read a manifest file. A relative `root` is taken relative to the file.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::parse(&raw)?;
        if let (Some(root), Some(parent)) = (manifest.root.as_ref(), path.parent()) {
            if root.is_relative() {
                manifest.root = Some(parent.join(root));
            }
        }
        tracing::debug!(
            path = %path.display(),
            gallery = manifest.gallery.len(),
            "manifest loaded"
        );
        Ok(manifest)
    }

    /// The demo manifest bundled with the binary.
    pub fn embedded() -> Result<Self, ManifestError> {
        Self::parse(EMBEDDED_MANIFEST)
    }

    pub fn embedded_source() -> &'static str {
        EMBEDDED_MANIFEST
    }
}
