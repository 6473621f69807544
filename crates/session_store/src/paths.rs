use std::fmt::Write as _;

/// File extension used for stored entries.
pub const ENTRY_EXTENSION: &str = "entry";

const TEMP_PREFIX: char = '.';

fn is_plain_key_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_')
}

/// Encodes a key into a file name, percent-escaping bytes outside `[A-Za-z0-9_-]`.
#[must_use]
pub fn entry_file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + ENTRY_EXTENSION.len() + 1);
    for byte in key.bytes() {
        if is_plain_key_byte(byte) {
            name.push(char::from(byte));
        } else {
            let _ = write!(name, "%{byte:02X}");
        }
    }
    name.push('.');
    name.push_str(ENTRY_EXTENSION);
    name
}

/// Recovers the key from an entry file name.
///
/// Returns `None` for temporary files, foreign extensions, and malformed escapes.
#[must_use]
pub fn decode_key(file_name: &str) -> Option<String> {
    if file_name.starts_with(TEMP_PREFIX) {
        return None;
    }

    let stem = file_name.strip_suffix(ENTRY_EXTENSION)?.strip_suffix('.')?;
    if stem.is_empty() {
        return None;
    }

    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'%' => {
                let hex = stem.get(index + 1..index + 3)?;
                decoded.push(u8::from_str_radix(hex, 16).ok()?);
                index += 3;
            }
            byte if is_plain_key_byte(byte) => {
                decoded.push(byte);
                index += 1;
            }
            _ => return None,
        }
    }

    String::from_utf8(decoded).ok()
}

pub(crate) fn temp_file_name(key: &str) -> String {
    format!("{TEMP_PREFIX}{}.tmp", entry_file_name(key))
}
