//! Upload checks run before and after the image bytes are read.
//!
//! Both functions are pure: guard clauses evaluated in order, first failure
//! wins.

use std::path::Path;

use crate::error::ExtractError;

/// 10 MiB.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg"];
pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg"];

/// Check the declared media type and the filename extension of an upload.
///
/// The media type is client-supplied and can be spoofed, so the extension is
/// checked independently. Neither is a check of the actual bytes.
pub fn validate_upload(content_type: &str, filename: &str) -> Result<(), ExtractError> {
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(ExtractError::InvalidFormat(content_type.to_string()));
    }

    if filename.is_empty() {
        return Err(ExtractError::MissingFilename);
    }

    let extension = file_extension(filename);
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ExtractError::InvalidExtension(extension));
    }

    Ok(())
}

/// Check the length of the bytes actually read, not any header claim.
pub fn check_size(len: usize) -> Result<(), ExtractError> {
    if len > MAX_FILE_SIZE {
        return Err(ExtractError::PayloadTooLarge);
    }

    if len == 0 {
        return Err(ExtractError::EmptyFile);
    }

    Ok(())
}

/// Lower-cased extension including the leading dot, or `""` if there is none.
/// Dot-files such as `.jpg` have no extension.
fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
