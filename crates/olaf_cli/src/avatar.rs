//! Avatar images stored as `data:` URLs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

/// Largest avatar accepted, in bytes.
pub const MAX_AVATAR_BYTES: u64 = 2 * 1024 * 1024;

const ACCEPTED: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
];

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("unsupported image type for {path}; use jpeg, png, gif, webp or avif")]
    UnsupportedType { path: PathBuf },

    #[error("{path} is larger than {MAX_AVATAR_BYTES} bytes")]
    TooLarge { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// MIME type for an accepted image file, judged by extension.
#[must_use]
pub fn mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    ACCEPTED
        .iter()
        .find(|(accepted, _)| *accepted == extension)
        .map(|(_, mime)| *mime)
}

/// Reads `path` and encodes it as a base64 `data:` URL.
pub fn data_url_from_file(path: &Path) -> Result<String, AvatarError> {
    let mime = mime_type(path).ok_or_else(|| AvatarError::UnsupportedType {
        path: path.to_path_buf(),
    })?;
    let read_error = |source| AvatarError::Read {
        path: path.to_path_buf(),
        source,
    };

    let size = fs::metadata(path).map_err(read_error)?.len();
    if size > MAX_AVATAR_BYTES {
        return Err(AvatarError::TooLarge {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(read_error)?;
    Ok(encode_data_url(mime, &bytes))
}

#[must_use]
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
