use tracing::debug;

use crate::document::Document;
use crate::error::{ExtractError, Result};
use crate::parser::contents::ContentEntry;
use crate::patterns::{ExtractOptions, PatternRegistry};

/// One detected sub-answer: the heading's page and a fixed-size text window
/// starting at the heading offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEntry {
    pub page: usize,
    pub snippet: String,
}

/// A fully segmented question: contents label, inclusive page range, the
/// question prose up to the reply marker, and the ordered sub-answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaRecord {
    pub question: String,
    pub page_from: usize,
    pub page_to: usize,
    pub question_long: String,
    pub answers: Vec<AnswerEntry>,
}

/// Split each contents entry's page range into question and answer halves.
///
/// Entry *i* spans `[target_page(i), target_page(i+1)]` inclusive — the page
/// a question ends on is the page the next one starts on; the final entry
/// runs to the last page of the document.
pub fn segment(
    doc: &dyn Document,
    entries: &[ContentEntry],
    patterns: &PatternRegistry,
    opts: &ExtractOptions,
) -> Result<Vec<QaRecord>> {
    let last = doc.page_count().saturating_sub(1);
    let mut records = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let start = entry.target_page;
        let end = entries.get(i + 1).map(|e| e.target_page).unwrap_or(last);
        records.push(segment_one(doc, entry, start, end, patterns, opts)?);
    }
    Ok(records)
}

fn segment_one(
    doc: &dyn Document,
    entry: &ContentEntry,
    start: usize,
    end: usize,
    patterns: &PatternRegistry,
    opts: &ExtractOptions,
) -> Result<QaRecord> {
    // The first page in range carrying the reply marker splits the entry.
    let mut reply: Option<(usize, String, String)> = None;
    for page in start..=end {
        let text = doc.page_text(page)?;
        if let Some(m) = patterns.reply.find(&text) {
            reply = Some((page, m.as_str().to_string(), text));
            break;
        }
    }
    let Some((reply_page, reply_marker, reply_text)) = reply else {
        return Err(ExtractError::ReplyNotFound {
            question: entry.question.clone(),
            start,
            end,
        });
    };
    debug!(
        "entry {:?}: pages {}..={}, reply on {}",
        entry.question, start, end, reply_page
    );

    let mut question_long = String::new();
    for page in start..reply_page {
        question_long.push_str(&doc.page_text(page)?);
    }
    // Truncate immediately before the first occurrence of the marker.
    let cut = reply_text.find(&reply_marker).unwrap_or(reply_text.len());
    question_long.push_str(&reply_text[..cut]);

    let answers = match answer_range(reply_page, end, opts) {
        Some(ans_end) => segment_answers(doc, reply_page, ans_end, &reply_marker, patterns, opts)?,
        None => Vec::new(),
    };

    Ok(QaRecord {
        question: entry.question.clone(),
        page_from: start,
        page_to: end,
        question_long,
        answers,
    })
}

/// Upper bound of the answer scan. The final page of the entry's range also
/// opens the next entry, so it is excluded unless configured otherwise.
fn answer_range(reply_page: usize, end: usize, opts: &ExtractOptions) -> Option<usize> {
    let ans_end = if opts.skip_last_answer_page {
        end.checked_sub(1)?
    } else {
        end
    };
    (ans_end >= reply_page).then_some(ans_end)
}

/// Collect sub-answer headings over `[start, end]` inclusive.
///
/// On the first page the search begins right after the reply marker so the
/// marker line itself can never be picked up as a heading. Snippets are a
/// `snippet_window`-character window from the heading offset; windows count
/// characters, not bytes.
pub fn segment_answers(
    doc: &dyn Document,
    start: usize,
    end: usize,
    reply_marker: &str,
    patterns: &PatternRegistry,
    opts: &ExtractOptions,
) -> Result<Vec<AnswerEntry>> {
    let mut answers = Vec::new();
    for (i, page) in (start..=end).enumerate() {
        let text = doc.page_text(page)?;
        let searched = if i == 0 {
            match text.find(reply_marker) {
                Some(idx) => text[idx + reply_marker.len()..].to_string(),
                None => text,
            }
        } else {
            text
        };
        for m in patterns.subtitle.find_iter(&searched) {
            let tail = &searched[m.start()..];
            let cut = tail
                .char_indices()
                .nth(opts.snippet_window)
                .map(|(b, _)| b)
                .unwrap_or(tail.len());
            answers.push(AnswerEntry {
                page,
                snippet: tail[..cut].trim().to_string(),
            });
        }
    }
    Ok(answers)
}
