//! Patch file names.
//!
//! A patch file is named `<ordinal>-<description>.patch`. The ordinal only
//! decides the initial order; tags are keyed on everything after the
//! `<ordinal>-` prefix so that renumbered patches keep their tags.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static PATCH_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-(.+)\.patch$").expect("patch name pattern is valid"));

/// A patch file name split into its ordinal and lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchName {
    /// Full file name, e.g. `0005-Add-API.patch`
    pub file_name: String,
    /// Leading integer, e.g. `5`
    pub ordinal: u32,
    /// File name without the ordinal prefix, e.g. `Add-API.patch`
    pub key: String,
}

impl PatchName {
    /// Parse a file name.
    ///
    /// Returns `None` when the name does not look like a patch file or when
    /// its ordinal does not fit in a `u32`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let captures = PATCH_NAME_RE.captures(file_name)?;
        let digits = captures.get(1)?.as_str();
        let ordinal = digits.parse::<u32>().ok()?;
        let key = file_name[digits.len() + 1..].to_string();
        Some(Self {
            file_name: file_name.to_string(),
            ordinal,
            key,
        })
    }
}

impl fmt::Display for PatchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name)
    }
}

/// Strip a leading `<digits>-` prefix, if present.
pub fn strip_ordinal(name: &str) -> &str {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && name.as_bytes().get(digits) == Some(&b'-') {
        &name[digits + 1..]
    } else {
        name
    }
}
