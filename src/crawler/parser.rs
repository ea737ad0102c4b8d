//! Directory-listing parser
//!
//! This module turns one auto-generated index page (Apache/IIS style) into
//! typed entries:
//! - numbered subfolders (`42/`)
//! - files, with optional size and date text from the table cells that
//!   follow the link

use crate::url::{decode_component, is_directory_id, sanitize_file_name};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Query markers used by listing software for column-sort links
const SORT_MARKERS: [&str; 4] = ["C=N", "C=M", "C=S", "C=D"];

/// Kind of a listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    File,
}

/// One item found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,

    /// Digit name for folders, sanitized name for files
    pub name: String,

    /// Absolute URL resolved against the page URL
    pub url: Url,

    /// Raw size text (files only, may be empty)
    pub size: String,

    /// Raw modification date text (files only, may be empty)
    pub modified: String,
}

impl Entry {
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Parses a directory-listing page into entries, in document order
///
/// # Classification Rules
///
/// **Folder:** href ends with `/` and the href without trailing separators
/// is all decimal digits. Parent links (`../`), sort links and non-numeric
/// subdirectories are dropped.
///
/// **File:** href does not end with `/`, is not empty, does not start with
/// `?`, is not `../` or `./`, and carries no column-sort marker.
///
/// Malformed markup never fails; unusable anchors are skipped.
///
/// # Example
///
/// ```
/// use index_harvester::crawler::{parse_listing, EntryKind};
/// use url::Url;
///
/// let html = r#"<a href="../">Parent</a><a href="42/">42/</a><a href="a.txt">a.txt</a>"#;
/// let page = Url::parse("http://example.com/pub/").unwrap();
/// let entries = parse_listing(html, &page);
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].kind, EntryKind::Folder);
/// assert_eq!(entries[1].url.as_str(), "http://example.com/pub/a.txt");
/// ```
pub fn parse_listing(html: &str, page_url: &Url) -> Vec<Entry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return entries;
    };

    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        if href.ends_with('/') {
            if let Some(entry) = folder_entry(href, page_url) {
                entries.push(entry);
            }
        } else if is_file_href(href) {
            if let Some(entry) = file_entry(href, anchor, page_url) {
                entries.push(entry);
            }
        }
    }

    entries
}

/// Returns just the file URLs found on a listing page
pub fn extract_file_urls(html: &str, page_url: &Url) -> Vec<Url> {
    parse_listing(html, page_url)
        .into_iter()
        .filter(Entry::is_file)
        .map(|entry| entry.url)
        .collect()
}

fn folder_entry(href: &str, page_url: &Url) -> Option<Entry> {
    let name = href.trim_end_matches('/');
    if !is_directory_id(name) {
        return None;
    }

    let url = resolve_link(href, page_url)?;
    Some(Entry {
        kind: EntryKind::Folder,
        name: name.to_string(),
        url,
        size: String::new(),
        modified: String::new(),
    })
}

fn file_entry(href: &str, anchor: ElementRef<'_>, page_url: &Url) -> Option<Entry> {
    let url = resolve_link(href, page_url)?;
    let name = sanitize_file_name(&decode_component(href));
    let (size, modified) = extract_cells(anchor);

    Some(Entry {
        kind: EntryKind::File,
        name,
        url,
        size,
        modified,
    })
}

/// Checks whether an href names a file rather than navigation
fn is_file_href(href: &str) -> bool {
    if href.is_empty() || href.starts_with('?') || href.starts_with('#') {
        return false;
    }

    if href == "../" || href == "./" || href == ".." || href == "." {
        return false;
    }

    !SORT_MARKERS.iter().any(|marker| href.contains(marker))
}

/// Reads the size and date cells that follow a link
///
/// The first table cell after the link is the size and the one after it is
/// the date. When the link is itself wrapped in a cell, the cells after
/// the wrapping cell are used.
fn extract_cells(anchor: ElementRef<'_>) -> (String, String) {
    let mut cells = following_cells(anchor);

    if cells.is_empty() {
        let wrapping_cell = anchor
            .parent()
            .and_then(ElementRef::wrap)
            .filter(|parent| parent.value().name() == "td");
        if let Some(cell) = wrapping_cell {
            cells = following_cells(cell);
        }
    }

    let mut texts = cells.into_iter().map(cell_text);
    let size = texts.next().unwrap_or_default();
    let modified = texts.next().unwrap_or_default();
    (size, modified)
}

/// The run of `<td>` siblings immediately after an element (at most two)
fn following_cells(element: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|sibling| sibling.value().name() == "td")
        .take(2)
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for special schemes and hrefs that fail to resolve.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url)
        }
        _ => None,
    }
}
