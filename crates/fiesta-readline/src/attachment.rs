//! Image attachments for `/image`.

use anyhow::{Context as _, Result, bail};
use fiesta_core::ImagePayload;
use std::path::Path;

/// Infers the MIME type from the file extension using `mime_guess`.
fn infer_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Reads `path` as an image attachment. Files that are not `image/*` by
/// extension are refused.
pub fn load_image(path: &Path) -> Result<ImagePayload> {
    let mime_type = infer_mime_type(path);
    if !mime_type.starts_with("image/") {
        bail!("{} is not an image ({})", path.display(), mime_type);
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ImagePayload::from_bytes(mime_type, &bytes))
}
