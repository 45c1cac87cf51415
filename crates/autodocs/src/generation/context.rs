//! Bounded project context extraction from an upload.

use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

use crate::error::StorageError;
use crate::storage::FileStorage;

/// Archive entries sampled for context.
pub const MAX_ENTRIES: usize = 7;
/// Characters kept from each archive entry.
pub const ENTRY_PREVIEW_CHARS: usize = 800;
/// Characters of context ever forwarded to the provider.
pub const CONTEXT_CHAR_CAP: usize = 4000;

/// Longest UTF-8 encoding of one char. Reads are capped at `chars * 4`
/// bytes so a huge entry is never fully inflated.
///
/// The cap applies before invalid bytes are dropped, so an entry that opens
/// with a long run of invalid UTF-8 yields fewer than the preview's chars
/// instead of skipping past the garbage.
const MAX_UTF8_BYTES: u64 = 4;

/// Reads a preview of the upload for use as prompt context.
///
/// Zip archives contribute their first [`MAX_ENTRIES`] readable files, each
/// rendered as `# File: <name>\n<preview>`. Anything that is not a zip is
/// treated as raw text. Invalid UTF-8 is dropped, never an error.
pub fn extract_context(storage: &FileStorage, upload: &Path) -> Result<String, StorageError> {
    let file = storage.open_upload(upload)?;

    match ZipArchive::new(file) {
        Ok(mut archive) => Ok(archive_context(&mut archive)),
        Err(e) => {
            log::debug!("Upload is not a zip archive ({}), using raw text", e);
            let file = storage.open_upload(upload)?;
            raw_context(file).map_err(|e| StorageError::ReadFile {
                path: upload.to_path_buf(),
                source: e,
            })
        }
    }
}

fn archive_context<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> String {
    let mut snippets: Vec<String> = Vec::with_capacity(MAX_ENTRIES);

    for index in 0..archive.len() {
        if snippets.len() >= MAX_ENTRIES {
            break;
        }

        let entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable archive entry {}: {}", index, e);
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let mut bytes = Vec::new();
        if let Err(e) = entry
            .take(ENTRY_PREVIEW_CHARS as u64 * MAX_UTF8_BYTES)
            .read_to_end(&mut bytes)
        {
            log::debug!("Skipping archive entry {}: {}", name, e);
            continue;
        }

        let preview = truncate_chars(&decode_lossy(&bytes), ENTRY_PREVIEW_CHARS);
        snippets.push(format!("# File: {}\n{}", name, preview));
    }

    truncate_chars(&snippets.join("\n\n"), CONTEXT_CHAR_CAP)
}

fn raw_context<R: Read>(reader: R) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    reader
        .take(CONTEXT_CHAR_CAP as u64 * MAX_UTF8_BYTES)
        .read_to_end(&mut bytes)?;
    Ok(truncate_chars(&decode_lossy(&bytes), CONTEXT_CHAR_CAP))
}

/// UTF-8 decoding that drops invalid sequences instead of replacing them.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// First `max` chars of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}
