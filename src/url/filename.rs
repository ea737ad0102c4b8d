use crate::{UrlError, UrlResult};
use url::Url;

/// Characters that are not allowed in local file names on common filesystems
const ILLEGAL_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Replaces filesystem-illegal characters with an underscore
///
/// # Examples
///
/// ```
/// use index_harvester::url::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("a:b?.txt"), "a_b_.txt");
/// assert_eq!(sanitize_file_name("plain.zip"), "plain.zip");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Decodes percent-escapes, keeping the raw text if it isn't valid UTF-8
pub fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Derives the local file name for a download from the URL's final path segment
///
/// The segment is percent-decoded and sanitized. URLs whose path ends with a
/// separator have no file name.
pub fn file_name_from_url(url: &Url) -> UrlResult<String> {
    let last = url
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or("");

    let name = sanitize_file_name(&decode_component(last));
    if name.is_empty() || name == "." || name == ".." {
        return Err(UrlError::MissingFileName(url.to_string()));
    }

    Ok(name)
}
