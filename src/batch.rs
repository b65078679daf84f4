use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::document::PdfDocument;
use crate::error::Result;
use crate::meta::{self, MetaInfo};
use crate::parser::{self, qa::QaRecord};
use crate::patterns::{ExtractOptions, PatternRegistry};
use crate::store;

/// Documents parsed in parallel per batch; inserts stay on this thread.
const CHUNK_SIZE: usize = 32;

/// Outcome of one ingestion run.
pub struct BatchReport {
    pub total: usize,
    pub ok: usize,
    pub failures: Vec<(PathBuf, String)>,
}

/// Ingest every `source/company/*.pdf` under `root`.
///
/// Each document runs the whole pipeline independently; a malformed filing is
/// logged against its path and skipped, never aborting the batch. No rows are
/// written for a document unless all of its entries segmented.
pub fn run(
    root: &Path,
    q_path: &Path,
    a_path: &Path,
    patterns: &PatternRegistry,
    opts: &ExtractOptions,
) -> Result<BatchReport> {
    let pattern = root.join("*/*/*.pdf");
    let mut files: Vec<PathBuf> = glob(&pattern.to_string_lossy())?
        .filter_map(|p| p.ok())
        .collect();
    files.sort();
    info!("found {} documents under {}", files.len(), root.display());

    store::ensure_schema(q_path, a_path)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap()
            .progress_chars("=> "),
    );

    let mut report = BatchReport {
        total: files.len(),
        ok: 0,
        failures: Vec::new(),
    };

    for chunk in files.chunks(CHUNK_SIZE) {
        let parsed: Vec<(PathBuf, Result<(MetaInfo, Vec<QaRecord>)>)> = chunk
            .par_iter()
            .map(|path| (path.clone(), parse_one(path, patterns, opts)))
            .collect();

        // Single writer: the store rewrites whole tables on insert.
        for (path, result) in parsed {
            match result.and_then(|(m, records)| store::insert(&records, &m, q_path, a_path)) {
                Ok(()) => report.ok += 1,
                Err(e) => {
                    warn!("{}: {}", path.display(), e);
                    report.failures.push((path, e.to_string()));
                }
            }
            pb.inc(1);
        }
    }

    pb.finish_and_clear();
    info!(
        "ingested {} of {} documents ({} failed)",
        report.ok,
        report.total,
        report.failures.len()
    );
    Ok(report)
}

fn parse_one(
    path: &Path,
    patterns: &PatternRegistry,
    opts: &ExtractOptions,
) -> Result<(MetaInfo, Vec<QaRecord>)> {
    let meta = meta::meta_of(path)?;
    let doc = PdfDocument::open(path)?;
    let records = parser::extract_document(&doc, patterns, opts)?;
    Ok((meta, records))
}

/// Write a timestamped log of skipped documents; every failure in the run is
/// attributable from this file. Returns the log path, or `None` when the run
/// was clean.
pub fn write_failure_report(dir: &Path, report: &BatchReport) -> Result<Option<PathBuf>> {
    if report.failures.is_empty() {
        return Ok(None);
    }
    fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let path = dir.join(format!("failures_{stamp}.log"));
    let mut out = String::new();
    for (file, error) in &report.failures {
        let _ = writeln!(out, "{}: {}", file.display(), error);
    }
    fs::write(&path, out)?;
    Ok(Some(path))
}
