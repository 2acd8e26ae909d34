//! facematch-io: photo acquisition for face comparison.
//!
//! Loads local or remote image references into RGB bitmaps and reads the
//! gallery manifests that list them.

pub mod loader;
pub mod manifest;

pub use loader::{ImageLoader, ImageSource, LoadError};
pub use manifest::{Manifest, ManifestError};
