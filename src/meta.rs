use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ExtractError, Result};

static ROUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"第[一二三四五六七八九十]+").unwrap());

/// Identity attached to every row extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaInfo {
    /// Disclosure venue, e.g. "szse".
    pub source: String,
    /// Company short name.
    pub company: String,
    pub filename: String,
    pub round: u32,
}

/// Correspondence round from the file path.
///
/// Filings only ever carry first or second rounds; an unmarked path is a
/// first-round letter.
pub fn round_of(path: &str) -> u32 {
    match ROUND_RE.find(path) {
        None => 1,
        Some(m) if m.as_str().contains("第一") => 1,
        Some(_) => 2,
    }
}

/// Derive meta info from the `source/company/document.pdf` nesting.
pub fn meta_of(path: &Path) -> Result<MetaInfo> {
    let dir_name = |p: Option<&Path>| -> Option<String> {
        p.and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    };
    let company_dir = path.parent();
    let source_dir = company_dir.and_then(Path::parent);
    let company = dir_name(company_dir);
    let source = dir_name(source_dir);
    match (source, company) {
        (Some(source), Some(company)) if !source.is_empty() && !company.is_empty() => {
            Ok(MetaInfo {
                source,
                company,
                filename: path.to_string_lossy().into_owned(),
                round: round_of(&path.to_string_lossy()),
            })
        }
        _ => Err(ExtractError::BadPathLayout(path.to_path_buf())),
    }
}
