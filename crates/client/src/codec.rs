//! Base64 transcoding for the contents API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Result;

pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes provider content, which is wrapped at 60 columns with `\n`.
pub fn decode(content: &str) -> Result<Vec<u8>> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}
