use crate::{UrlError, UrlResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use url::Url;

/// Identifier of a remote directory: a non-empty string of ASCII digits
///
/// The id doubles as the URL path segment and as the inventory key. Ids
/// order numerically, so `"9"` sorts before `"10"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DirectoryId(String);

impl DirectoryId {
    /// Parses a directory id, returning None for anything that isn't all digits
    ///
    /// # Examples
    ///
    /// ```
    /// use index_harvester::DirectoryId;
    ///
    /// assert!(DirectoryId::parse("42").is_some());
    /// assert!(DirectoryId::parse("src").is_none());
    /// assert!(DirectoryId::parse("").is_none());
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        if is_directory_id(name) {
            Some(Self(name.to_string()))
        } else {
            None
        }
    }

    /// Builds the id for a namespace integer
    pub fn from_number(n: u64) -> Self {
        Self(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digits with leading zeros removed, used for numeric ordering
    fn significant(&self) -> &str {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() {
            "0"
        } else {
            trimmed
        }
    }
}

impl Ord for DirectoryId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.significant(), other.significant());
        a.len()
            .cmp(&b.len())
            .then_with(|| a.cmp(b))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for DirectoryId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DirectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DirectoryId {
    type Error = UrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_directory_id(&value) {
            Ok(Self(value))
        } else {
            Err(UrlError::InvalidDirectoryId(value))
        }
    }
}

impl From<DirectoryId> for String {
    fn from(id: DirectoryId) -> Self {
        id.0
    }
}

/// Returns true if `name` is a non-empty string of ASCII decimal digits
pub fn is_directory_id(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a base URL and makes sure its path ends with a separator
///
/// Relative joins against `http://host/pub` would replace `pub`, so the
/// trailing slash is added before any directory URL is built.
pub fn parse_base_url(base: &str) -> UrlResult<Url> {
    let mut url = Url::parse(base.trim()).map_err(|e| UrlError::Parse(format!("{base}: {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Builds `{base}/{n}/` for a namespace integer
pub fn directory_url(base: &Url, n: u64) -> UrlResult<Url> {
    base.join(&format!("{n}/"))
        .map_err(|e| UrlError::Parse(format!("{base} + {n}/: {e}")))
}

/// Extracts the trailing digit segment of a directory URL
///
/// Returns None when the last non-empty path segment is not a directory id.
pub fn directory_id_from_url(url: &Url) -> Option<DirectoryId> {
    url.path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(DirectoryId::parse)
}
