//! Sanitizer - クライアントのファイル名を安全な保存キーに変換
//!
//! Pure function, no I/O. Uniqueness is not its job: two uploads named
//! `report.pdf` sanitize to the same key and the store disambiguates.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::key::{StorageKey, is_safe_char};

/// Longest key the sanitizer produces. Leaves room for a collision suffix.
pub const SANITIZED_MAX_LEN: usize = 200;

/// Whitespace runs collapse into this.
const SEPARATOR: char = '_';

/// Turn a client-supplied file name into a storage key.
///
/// 1. NFD-decompose and drop combining marks (`é` -> `e`)
/// 2. collapse whitespace runs into `_`
/// 3. drop everything outside `[A-Za-z0-9._-]`
/// 4. collapse dot runs (`..` never survives)
/// 5. bound the length, keeping the extension
///
/// Returns `None` when nothing usable is left (`""`, `"."`, `"★★★"`); the
/// caller substitutes a generated name.
pub fn sanitize(raw: &str) -> Option<StorageKey> {
    let mut out = String::with_capacity(raw.len());
    let mut in_whitespace = false;

    for c in raw.nfd() {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_whitespace() {
            if !in_whitespace {
                out.push(SEPARATOR);
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if !is_safe_char(c) {
            continue;
        }
        if c == '.' && out.ends_with('.') {
            continue;
        }
        out.push(c);
    }

    let out = truncate(out);
    StorageKey::parse(&out).ok()
}

/// [`sanitize`], falling back to `fallback()` when the name is unusable.
pub fn sanitize_or_else<F>(raw: &str, fallback: F) -> StorageKey
where
    F: FnOnce() -> StorageKey,
{
    sanitize(raw).unwrap_or_else(fallback)
}

fn truncate(name: String) -> String {
    if name.len() <= SANITIZED_MAX_LEN {
        return name;
    }

    // ASCII only at this point, so byte offsets are char boundaries.
    let ext = match name.rfind('.') {
        Some(idx) if idx > 0 && name.len() - idx <= SANITIZED_MAX_LEN / 4 => &name[idx..],
        _ => "",
    };
    let stem_len = SANITIZED_MAX_LEN - ext.len();
    let stem = name[..stem_len].trim_end_matches('.');
    format!("{stem}{ext}")
}
