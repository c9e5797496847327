//! Template Digests
//!
//! Two templates with the same entries and header produce the same digest,
//! regardless of map iteration order.

use sha2::{Digest, Sha256};

use crate::templates::Template;

/// SHA-256 of the template document, lowercase hex.
///
/// The document lists entries sorted by position and its header fields in
/// declaration order, with materials in a `BTreeMap`. Its compact JSON
/// form is therefore already canonical and is streamed straight into the
/// hasher.
pub fn template_digest(template: &Template) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut hasher, &template.to_document())?;
    Ok(format!("{:x}", hasher.finalize()))
}
