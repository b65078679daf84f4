use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the extraction pipeline and the store.
///
/// Components fail fast on the first structural anomaly; `batch::run` is the
/// only place these are caught, logged against the document path, and skipped.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no table of contents found")]
    TocNotFound,

    #[error("contents page {page}: {labels} entry labels but {links} page links")]
    TocLinkMismatch {
        page: usize,
        labels: usize,
        links: usize,
    },

    #[error("no reply marker in pages {start}..={end} for {question:?}")]
    ReplyNotFound {
        question: String,
        start: usize,
        end: usize,
    },

    #[error("no stored question for {source_name}/{company} round {round} question {question_num}")]
    QuestionNotFound {
        source_name: String,
        company: String,
        round: u32,
        question_num: usize,
    },

    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("path {0:?} is not nested as source/company/document")]
    BadPathLayout(PathBuf),

    #[error("pdf: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("bad glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("pattern file: {0}")]
    PatternFile(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
