use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::Result;

/// Raw dialect patterns as they appear in a pattern file.
///
/// Filings from different disclosure venues format their contents pages and
/// reply headings differently; swapping these four strings retargets the
/// whole pipeline without a code change.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternSet {
    /// Heading of the contents page itself.
    pub toc_header: String,
    /// One contents line: label text followed by a dotted page leader.
    pub toc_entry: String,
    /// Reply marker separating a question's prose from its answer.
    pub reply: String,
    /// Numbered/lettered sub-answer heading.
    pub subtitle: String,
}

impl Default for PatternSet {
    /// SZSE inquiry-letter dialect.
    fn default() -> Self {
        PatternSet {
            toc_header: r"目录[ ]*\n".to_string(),
            toc_entry: r".*[一二三四五六七八九十0-9]+.*[\n ]*\.{2,}".to_string(),
            reply: r"(?m)^[ \t]*[【\[]?回复[ ]*[】\]]?[ \n:：]*\n".to_string(),
            subtitle: concat!(
                r"[A-Za-z0-9一二三四五六七八九十]{1,2}、[^\n]*\n",
                r"|[(（]+[A-Za-z0-9一二三四五六七八九十]{1,2}[)）]+[^\n]*\n",
            )
            .to_string(),
        }
    }
}

impl PatternSet {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn compile(&self) -> Result<PatternRegistry> {
        Ok(PatternRegistry {
            toc_header: Regex::new(&self.toc_header)?,
            toc_entry: Regex::new(&self.toc_entry)?,
            reply: Regex::new(&self.reply)?,
            subtitle: Regex::new(&self.subtitle)?,
        })
    }
}

/// Compiled dialect patterns, passed explicitly into each pipeline stage.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    pub toc_header: Regex,
    pub toc_entry: Regex,
    pub reply: Regex,
    pub subtitle: Regex,
}

impl PatternRegistry {
    pub fn default_dialect() -> Self {
        PatternSet::default()
            .compile()
            .expect("default dialect patterns must compile")
    }
}

/// Tunable extraction heuristics.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Characters captured after a sub-answer heading offset (multi-line
    /// subtitles spill past the heading line, so a fixed window is taken).
    pub snippet_window: usize,
    /// Exclude the final page of an entry's range from answer segmentation so
    /// the next entry's leading heading is never captured as a sub-answer.
    pub skip_last_answer_page: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            snippet_window: 100,
            skip_last_answer_page: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dialect_compiles() {
        PatternSet::default().compile().unwrap();
    }

    #[test]
    fn reply_matches_own_line_marker() {
        let re = PatternRegistry::default_dialect().reply;
        let page = "发行人主要从事软件开发。\n回复：\n一、收入确认\n";
        let m = re.find(page).unwrap();
        assert_eq!(m.as_str(), "回复：\n");
    }

    #[test]
    fn reply_matches_bracketed_marker() {
        let re = PatternRegistry::default_dialect().reply;
        assert!(re.is_match("问题描述。\n【回复】\n正文\n"));
    }

    #[test]
    fn reply_requires_line_start() {
        let re = PatternRegistry::default_dialect().reply;
        // Inline mention inside a sentence is not a boundary.
        assert!(!re.is_match("请参见问题一的回复：略。"));
    }

    #[test]
    fn toc_entry_matches_dotted_leader() {
        let re = PatternRegistry::default_dialect().toc_entry;
        assert!(re.is_match("一、关于营业收入.............3"));
        assert!(!re.is_match("普通正文，没有页码引导线"));
    }

    #[test]
    fn subtitle_matches_both_numbering_styles() {
        let re = PatternRegistry::default_dialect().subtitle;
        assert!(re.is_match("一、发行人说明\n"));
        assert!(re.is_match("（二）中介机构核查意见\n"));
        assert!(re.is_match("(3)补充披露情况\n"));
    }

    #[test]
    fn pattern_set_round_trips_through_json() {
        let json = r#"{
            "toc_header": "^Contents$",
            "toc_entry": "^.+\\.{3,}\\d+$",
            "reply": "(?m)^Reply:\\n",
            "subtitle": "(?m)^\\d+\\)[^\\n]*\\n"
        }"#;
        let set: PatternSet = serde_json::from_str(json).unwrap();
        let compiled = set.compile().unwrap();
        assert!(compiled.reply.is_match("Reply:\n"));
    }
}
