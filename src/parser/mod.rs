pub mod contents;
pub mod qa;

use crate::document::Document;
use crate::error::Result;
use crate::patterns::{ExtractOptions, PatternRegistry};
use qa::QaRecord;

/// Two-pass pipeline: contents entries → segmented Q&A records.
pub fn extract_document(
    doc: &dyn Document,
    patterns: &PatternRegistry,
    opts: &ExtractOptions,
) -> Result<Vec<QaRecord>> {
    let entries = contents::locate_contents(doc, patterns)?;
    qa::segment(doc, &entries, patterns, opts)
}
