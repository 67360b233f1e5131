//! Regex extraction from listing pages.
//!
//! Only the `<table id="list">` is looked at, so navigation links elsewhere on
//! the page never become builds or files.

use std::sync::OnceLock;

use regex::Regex;

/// A file row: link target and the raw text of the size column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub href: String,
    pub size_text: String,
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|e| panic!("bad listing regex: {}", e)))
}

fn list_table(html: &str) -> Option<&str> {
    static TABLE: OnceLock<Regex> = OnceLock::new();
    regex(
        &TABLE,
        r#"(?is)<table[^>]*\bid\s*=\s*["']?list["']?[^>]*>(.*?)</table>"#,
    )
    .captures(html)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str())
}

fn rows(table: &str) -> impl Iterator<Item = &str> {
    static ROW: OnceLock<Regex> = OnceLock::new();
    regex(&ROW, r"(?is)<tr[^>]*>(.*?)</tr>")
        .captures_iter(table)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
}

fn cells(row: &str) -> Vec<&str> {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"(?is)<td[^>]*>(.*?)</td>")
        .captures_iter(row)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

fn first_href(fragment: &str) -> Option<String> {
    static HREF: OnceLock<Regex> = OnceLock::new();
    regex(&HREF, r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["']"#)
        .captures(fragment)
        .and_then(|c| c.get(1))
        .map(|m| unescape(m.as_str()))
}

fn text(fragment: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let stripped = regex(&TAG, r"(?s)<[^>]*>").replace_all(fragment, "");
    unescape(stripped.trim())
}

fn unescape(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Build directories: first link of each row, kept when it starts with
/// `prefix` and ends with `suffix`.
pub fn parse_build_dirs(html: &str, prefix: &str, suffix: &str) -> Vec<String> {
    let Some(table) = list_table(html) else {
        return Vec::new();
    };
    rows(table)
        .filter_map(first_href)
        .filter(|href| href.starts_with(prefix) && href.ends_with(suffix))
        .collect()
}

/// File rows whose first cell links a name ending in `extension`; the size
/// text comes from the second cell.
pub fn parse_file_rows(html: &str, extension: &str) -> Vec<FileRow> {
    let Some(table) = list_table(html) else {
        return Vec::new();
    };
    rows(table)
        .filter_map(|row| {
            let cells = cells(row);
            if cells.len() < 2 {
                return None;
            }
            let href = first_href(cells[0])?;
            if !href.ends_with(extension) {
                return None;
            }
            Some(FileRow {
                href,
                size_text: text(cells[1]),
            })
        })
        .collect()
}

/// Wheel names carry the interpreter tag between dashes (`-cp39-`).
pub fn matches_python_version(name: &str, tag: &str) -> bool {
    name.contains(&format!("-{}-", tag))
}
