// src/models/course.rs

//! Course data structures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable course identifier (the course code, e.g. `MATH301`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-system safe form of the code, used for record file names.
    ///
    /// ASCII alphanumerics and `-` are kept; every other byte, `_`
    /// included, becomes `_XX` (uppercase hex), so distinct codes never
    /// share a key.
    pub fn storage_key(&self) -> String {
        let mut key = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                key.push(byte as char);
            } else {
                key.push_str(&format!("_{byte:02X}"));
            }
        }
        key
    }

    /// Inverse of [`storage_key`](Self::storage_key); `None` for keys it
    /// could not have produced.
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let raw = key.as_bytes();
        let mut bytes = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            match raw[i] {
                b'_' => {
                    let hex = std::str::from_utf8(raw.get(i + 1..i + 3)?).ok()?;
                    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                        return None;
                    }
                    bytes.push(u8::from_str_radix(hex, 16).ok()?);
                    i += 3;
                }
                b if b.is_ascii_alphanumeric() || b == b'-' => {
                    bytes.push(b);
                    i += 1;
                }
                _ => return None,
            }
        }
        String::from_utf8(bytes).ok().map(Self)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourseId {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// A course discovered from the portal's course list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Course code, the key for version records
    pub code: CourseId,

    /// Course display name
    pub name: String,

    /// Portal-internal numeric course id
    pub id: u32,

    /// Portal-internal season id
    pub season_id: u32,
}

impl Course {
    /// Expand a page URL template.
    ///
    /// Supported placeholders: `{id}`, `{season}`, `{code}`.
    pub fn page_url(&self, template: &str) -> String {
        template
            .replace("{id}", &self.id.to_string())
            .replace("{season}", &self.season_id.to_string())
            .replace("{code}", self.code.as_str())
    }

    /// `(CODE) Name` label used in logs.
    pub fn label(&self) -> String {
        format!("({}) {}", self.code, self.name)
    }
}

/// A file listed on a course page.
///
/// Identity is `id`; the other fields are descriptive only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub display_name: String,
    pub category: String,
}

/// Result of one fetch + extract pass over a course page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSnapshot {
    pub course_id: CourseId,
    pub course_name: String,

    /// Normalized description text; empty when the page has none
    pub description: String,

    /// Files in page order
    pub files: Vec<FileEntry>,
}
