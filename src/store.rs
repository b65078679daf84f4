use std::collections::HashSet;
use std::fs;
use std::hash::Hash;
use std::path::Path;
use std::sync::LazyLock;

use csv::{ReaderBuilder, WriterBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExtractError, Result};
use crate::meta::MetaInfo;
use crate::parser::qa::QaRecord;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const QUESTION_COLUMNS: [&str; 9] = [
    "source",
    "company",
    "filename",
    "round",
    "question_num",
    "question",
    "question_long",
    "page_from",
    "page_to",
];

const ANSWER_COLUMNS: [&str; 7] = [
    "source",
    "company",
    "round",
    "question_num",
    "answer_entry_num",
    "page",
    "snippet",
];

/// One row of the questions table. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionRow {
    pub source: String,
    pub company: String,
    pub filename: String,
    pub round: u32,
    pub question_num: usize,
    pub question: String,
    pub question_long: String,
    pub page_from: usize,
    pub page_to: usize,
}

/// One row of the answers table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnswerRow {
    pub source: String,
    pub company: String,
    pub round: u32,
    pub question_num: usize,
    pub answer_entry_num: usize,
    pub page: usize,
    pub snippet: String,
}

/// One reconstructed question/answer pair, as returned by [`query_one`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaView {
    pub question: String,
    pub question_long: String,
    pub pages: (usize, usize),
    /// Sub-answer snippets, whitespace-stripped, joined by blank lines.
    pub answer: String,
}

/// Create empty header-only tables (and parent directories) if absent.
pub fn ensure_schema(q_path: &Path, a_path: &Path) -> Result<()> {
    init_table(q_path, &QUESTION_COLUMNS)?;
    init_table(a_path, &ANSWER_COLUMNS)?;
    Ok(())
}

fn init_table(path: &Path, columns: &[&str]) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(columns)?;
    writer.flush()?;
    Ok(())
}

/// Append one document's records to both tables, deduplicating by full-row
/// equality across the whole table, so re-ingesting a document is a no-op.
pub fn insert(records: &[QaRecord], meta: &MetaInfo, q_path: &Path, a_path: &Path) -> Result<()> {
    ensure_schema(q_path, a_path)?;
    let mut q_rows: Vec<QuestionRow> = read_table(q_path)?;
    let mut a_rows: Vec<AnswerRow> = read_table(a_path)?;

    for (i, record) in records.iter().enumerate() {
        q_rows.push(QuestionRow {
            source: meta.source.clone(),
            company: meta.company.clone(),
            filename: meta.filename.clone(),
            round: meta.round,
            question_num: i,
            question: record.question.clone(),
            question_long: record.question_long.clone(),
            page_from: record.page_from,
            page_to: record.page_to,
        });
        for (j, answer) in record.answers.iter().enumerate() {
            a_rows.push(AnswerRow {
                source: meta.source.clone(),
                company: meta.company.clone(),
                round: meta.round,
                question_num: i,
                answer_entry_num: j,
                page: answer.page,
                snippet: answer.snippet.clone(),
            });
        }
    }

    dedup_rows(&mut q_rows);
    dedup_rows(&mut a_rows);
    write_table(q_path, &QUESTION_COLUMNS, &q_rows)?;
    write_table(a_path, &ANSWER_COLUMNS, &a_rows)?;
    Ok(())
}

/// Reconstruct one question and its joined answer text.
pub fn query_one(
    source: &str,
    company: &str,
    round: u32,
    question_num: usize,
    q_path: &Path,
    a_path: &Path,
) -> Result<QaView> {
    let q_rows: Vec<QuestionRow> = read_table(q_path)?;
    let question = q_rows
        .into_iter()
        .find(|r| {
            r.source == source
                && r.company == company
                && r.round == round
                && r.question_num == question_num
        })
        .ok_or_else(|| ExtractError::QuestionNotFound {
            source_name: source.to_string(),
            company: company.to_string(),
            round,
            question_num,
        })?;

    let mut answers: Vec<AnswerRow> = read_table::<AnswerRow>(a_path)?
        .into_iter()
        .filter(|r| {
            r.source == source
                && r.company == company
                && r.round == round
                && r.question_num == question_num
        })
        .collect();
    answers.sort_by_key(|r| r.answer_entry_num);

    let answer = answers
        .iter()
        .map(|r| WHITESPACE_RE.replace_all(&r.snippet, "").into_owned())
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(QaView {
        question: question.question,
        question_long: question.question_long,
        pages: (question.page_from, question.page_to),
        answer,
    })
}

/// Table sizes for the `stats` command.
pub struct StoreStats {
    pub questions: usize,
    pub answers: usize,
    pub companies: usize,
}

pub fn stats(q_path: &Path, a_path: &Path) -> Result<StoreStats> {
    let q_rows: Vec<QuestionRow> = read_table(q_path)?;
    let a_rows: Vec<AnswerRow> = read_table(a_path)?;
    let companies: HashSet<(&str, &str)> = q_rows
        .iter()
        .map(|r| (r.source.as_str(), r.company.as_str()))
        .collect();
    Ok(StoreStats {
        questions: q_rows.len(),
        answers: a_rows.len(),
        companies: companies.len(),
    })
}

fn read_table<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn write_table<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Keep the first occurrence of each distinct row, preserving order.
fn dedup_rows<T: Eq + Hash + Clone>(rows: &mut Vec<T>) {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.retain(|row| seen.insert(row.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::qa::AnswerEntry;
    use tempfile::TempDir;

    fn meta() -> MetaInfo {
        MetaInfo {
            source: "szse".into(),
            company: "华泰科技".into(),
            filename: "ipo_doc/szse/华泰科技/第一轮问询函.pdf".into(),
            round: 1,
        }
    }

    fn sample_records() -> Vec<QaRecord> {
        vec![QaRecord {
            question: "一、关于收入确认".into(),
            page_from: 2,
            page_to: 6,
            question_long: "问题一：请说明收入确认政策。\n相关事实。\n".into(),
            answers: vec![
                AnswerEntry {
                    page: 4,
                    snippet: "一、发行人说明\n内容。".into(),
                },
                AnswerEntry {
                    page: 4,
                    snippet: "二、中介机构核查意见 经核查".into(),
                },
            ],
        }]
    }

    fn paths(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        (
            dir.path().join("db/questions.csv"),
            dir.path().join("db/answers.csv"),
        )
    }

    #[test]
    fn schema_creation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (q, a) = paths(&dir);
        ensure_schema(&q, &a).unwrap();
        let before = fs::read_to_string(&q).unwrap();
        ensure_schema(&q, &a).unwrap();
        assert_eq!(fs::read_to_string(&q).unwrap(), before);
        assert!(before.starts_with("source,company,filename,round"));
    }

    #[test]
    fn insert_twice_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let (q, a) = paths(&dir);
        let records = sample_records();
        insert(&records, &meta(), &q, &a).unwrap();
        let q_once: Vec<QuestionRow> = read_table(&q).unwrap();
        let a_once: Vec<AnswerRow> = read_table(&a).unwrap();
        insert(&records, &meta(), &q, &a).unwrap();
        let q_twice: Vec<QuestionRow> = read_table(&q).unwrap();
        let a_twice: Vec<AnswerRow> = read_table(&a).unwrap();
        assert_eq!(q_once.len(), q_twice.len());
        assert_eq!(a_once.len(), a_twice.len());
        assert_eq!(q_twice.len(), 1);
        assert_eq!(a_twice.len(), 2);
    }

    #[test]
    fn distinct_rounds_are_kept_apart() {
        let dir = TempDir::new().unwrap();
        let (q, a) = paths(&dir);
        let records = sample_records();
        insert(&records, &meta(), &q, &a).unwrap();
        let second_round = MetaInfo {
            round: 2,
            filename: "ipo_doc/szse/华泰科技/第二轮问询函.pdf".into(),
            ..meta()
        };
        insert(&records, &second_round, &q, &a).unwrap();
        let rows: Vec<QuestionRow> = read_table(&q).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn query_reconstructs_joined_answer() {
        let dir = TempDir::new().unwrap();
        let (q, a) = paths(&dir);
        insert(&sample_records(), &meta(), &q, &a).unwrap();
        let view = query_one("szse", "华泰科技", 1, 0, &q, &a).unwrap();
        assert_eq!(view.question, "一、关于收入确认");
        assert_eq!(view.pages, (2, 6));
        // Snippets are whitespace-stripped and blank-line separated.
        assert_eq!(
            view.answer,
            "一、发行人说明内容。\n\n二、中介机构核查意见经核查"
        );
    }

    #[test]
    fn query_miss_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (q, a) = paths(&dir);
        insert(&sample_records(), &meta(), &q, &a).unwrap();
        assert!(matches!(
            query_one("szse", "华泰科技", 2, 0, &q, &a),
            Err(ExtractError::QuestionNotFound { round: 2, .. })
        ));
    }

    #[test]
    fn multiline_fields_survive_the_round_trip() {
        let dir = TempDir::new().unwrap();
        let (q, a) = paths(&dir);
        insert(&sample_records(), &meta(), &q, &a).unwrap();
        let rows: Vec<QuestionRow> = read_table(&q).unwrap();
        assert!(rows[0].question_long.contains('\n'));
    }

    #[test]
    fn stats_counts_distinct_companies() {
        let dir = TempDir::new().unwrap();
        let (q, a) = paths(&dir);
        insert(&sample_records(), &meta(), &q, &a).unwrap();
        let other = MetaInfo {
            company: "另一公司".into(),
            filename: "ipo_doc/szse/另一公司/第一轮问询函.pdf".into(),
            ..meta()
        };
        insert(&sample_records(), &other, &q, &a).unwrap();
        let s = stats(&q, &a).unwrap();
        assert_eq!(s.questions, 2);
        assert_eq!(s.answers, 4);
        assert_eq!(s.companies, 2);
    }
}
