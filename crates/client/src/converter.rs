//! Hand-off point for formats the client cannot open directly.
//!
//! Visio, Gliffy and PNG files are fetched and converted by the host editor;
//! the client only recognises them and passes along where to fetch them from.

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::models::{FileFlavor, RemoteFile};

const CONVERTED_EXTENSIONS: [&str; 3] = [".vsdx", ".gliffy", ".png"];

/// Returns true if `path` names a file that must go through a [`FileConverter`].
pub fn needs_conversion(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    CONVERTED_EXTENSIONS
        .iter()
        .any(|extension| lower.ends_with(extension))
}

#[derive(Debug, Clone)]
pub struct ConversionSource {
    /// Contents endpoint of the file, including the `ref` query.
    pub url: Url,
    /// Bearer token for fetching `url`.
    pub token: String,
    /// File name shown to the user.
    pub name: String,
    /// Extension for the converted result.
    pub extension: String,
    pub flavor: FileFlavor,
}

#[async_trait]
pub trait FileConverter: Send + Sync {
    async fn convert(&self, source: ConversionSource) -> Result<RemoteFile>;
}
