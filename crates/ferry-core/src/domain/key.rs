//! StorageKey - 検証済みの保存キー
//!
//! A `StorageKey` is the only name under which an object can be reached.
//! It can only be built through [`StorageKey::parse`] (or the sanitizer),
//! so every value in circulation is already known to be safe to use as a
//! single file name under the upload root.

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::errors::StoreError;

/// Upper bound accepted by [`StorageKey::parse`] (common filesystem name limit).
pub const MAX_KEY_LEN: usize = 255;

/// Is `c` part of the key alphabet `[A-Za-z0-9._-]`?
pub fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Sanitized, validated object key.
///
/// # 不変条件
/// - non-empty, at most [`MAX_KEY_LEN`] bytes
/// - only `[A-Za-z0-9._-]`
/// - never `.` and never contains `..`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey(String);

impl StorageKey {
    /// Validate `raw` as a key without rewriting it.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        if raw.is_empty() || raw.len() > MAX_KEY_LEN {
            return Err(StoreError::InvalidName(raw.to_string()));
        }
        if !raw.chars().all(is_safe_char) || raw == "." || raw.contains("..") {
            return Err(StoreError::InvalidName(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// `prefix` + lowercase ULID. ULIDs are alphanumeric, so the result is
    /// a key whenever `prefix` is made of key characters.
    pub(crate) fn generated(prefix: &str, id: Ulid) -> Self {
        debug_assert!(prefix.chars().all(is_safe_char) && !prefix.contains(".."));
        Self(format!("{prefix}{}", id.to_string().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(stem, extension)`; the extension keeps its leading dot.
    ///
    /// A leading dot (`.env`) is part of the stem, not an extension.
    pub fn split_extension(&self) -> (&str, &str) {
        match self.0.rfind('.') {
            Some(idx) if idx > 0 => self.0.split_at(idx),
            _ => (self.0.as_str(), ""),
        }
    }

    /// `report.pdf` + 2 -> `report-2.pdf`.
    ///
    /// Used to disambiguate colliding uploads. The result stays inside the
    /// key alphabet; the stem is shortened if the result would exceed
    /// [`MAX_KEY_LEN`].
    pub(crate) fn with_suffix(&self, n: u32) -> StorageKey {
        let (stem, ext) = self.split_extension();
        let suffix = format!("-{n}");
        let budget = MAX_KEY_LEN.saturating_sub(suffix.len() + ext.len());
        let stem = &stem[..stem.len().min(budget)];
        StorageKey(format!("{stem}{suffix}{ext}"))
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StorageKey {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("report.pdf")]
    #[case("a")]
    #[case(".env")]
    #[case("archive.tar.gz")]
    #[case("my_file-v2")]
    fn accepts_safe_names(#[case] raw: &str) {
        let key = StorageKey::parse(raw).unwrap();
        assert_eq!(key.as_str(), raw);
    }

    #[rstest]
    #[case::empty("")]
    #[case::dot(".")]
    #[case::parent("..")]
    #[case::traversal("../etc/passwd")]
    #[case::absolute("/etc/passwd")]
    #[case::backslash("..\\boot.ini")]
    #[case::embedded_parent("a..b")]
    #[case::space("my file")]
    #[case::non_ascii("résumé.pdf")]
    fn rejects_unsafe_names(#[case] raw: &str) {
        assert!(matches!(
            StorageKey::parse(raw),
            Err(StoreError::InvalidName(_))
        ));
    }

    #[test]
    fn rejects_overlong_names() {
        let raw = "a".repeat(MAX_KEY_LEN + 1);
        assert!(StorageKey::parse(&raw).is_err());
        assert!(StorageKey::parse(&raw[..MAX_KEY_LEN]).is_ok());
    }

    #[rstest]
    #[case("report.pdf", 1, "report-1.pdf")]
    #[case("archive.tar.gz", 3, "archive.tar-3.gz")]
    #[case("README", 2, "README-2")]
    #[case(".env", 1, ".env-1")]
    fn suffix_goes_before_extension(#[case] raw: &str, #[case] n: u32, #[case] expected: &str) {
        let key = StorageKey::parse(raw).unwrap();
        assert_eq!(key.with_suffix(n).as_str(), expected);
    }

    #[test]
    fn suffixed_key_stays_within_limit() {
        let raw = format!("{}.bin", "x".repeat(MAX_KEY_LEN - 4));
        let key = StorageKey::parse(&raw).unwrap();
        let suffixed = key.with_suffix(12);
        assert!(suffixed.as_str().len() <= MAX_KEY_LEN);
        assert!(suffixed.as_str().ends_with("-12.bin"));
        assert!(StorageKey::parse(suffixed.as_str()).is_ok());
    }

    #[test]
    fn deserialize_validates() {
        let ok: StorageKey = serde_json::from_str("\"notes.txt\"").unwrap();
        assert_eq!(ok.as_str(), "notes.txt");

        let bad = serde_json::from_str::<StorageKey>("\"../notes.txt\"");
        assert!(bad.is_err());
    }
}
