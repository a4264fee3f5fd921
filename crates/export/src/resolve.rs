//! Output file naming
//!
//! `<prefix><layer name>[-NNN]<.ext>`, sanitised, with the first free
//! numeric suffix when the plain name is taken.

use crate::{ExportError, ExportResult};
use std::path::{Path, PathBuf};

/// Highest collision suffix tried before giving up on a name
pub const NAME_SUFFIX_LIMIT: u32 = 99;

const FORBIDDEN: &[char] = &['\\', '*', '/', '?', ':', '"', '|', '<', '>'];
const FALLBACK_NAME: &str = "Layer";

/// Strip characters file systems reject and replace spaces with underscores.
pub fn sanitize(name: &str) -> String {
    let clean: String = name
        .chars()
        .filter(|c| !FORBIDDEN.contains(c))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    if clean.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        clean
    }
}

/// Pick a free path for a layer inside `folder`.
pub fn resolve(folder: &Path, prefix: &str, name: &str, extension: &str) -> ExportResult<PathBuf> {
    resolve_with_limit(folder, prefix, name, extension, NAME_SUFFIX_LIMIT)
}

/// [`resolve`] with an explicit bound on the suffix scan
pub fn resolve_with_limit(
    folder: &Path,
    prefix: &str,
    name: &str,
    extension: &str,
    limit: u32,
) -> ExportResult<PathBuf> {
    let base = sanitize(&format!("{prefix}{name}"));
    let extension = extension.to_lowercase();

    let candidate = folder.join(format!("{base}{extension}"));
    if !candidate.exists() {
        return Ok(candidate);
    }

    for suffix in 1..=limit {
        let candidate = folder.join(format!("{base}-{suffix:03}{extension}"));
        if !candidate.exists() {
            log::debug!("{}{} taken, using suffix {:03}", base, extension, suffix);
            return Ok(candidate);
        }
    }

    Err(ExportError::NameExhausted { base })
}
