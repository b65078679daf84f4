mod batch;
mod document;
mod error;
mod meta;
mod parser;
mod patterns;
mod store;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use patterns::{ExtractOptions, PatternRegistry, PatternSet};

#[derive(Parser)]
#[command(
    name = "inquiry_qa",
    about = "Extract Q&A records from inquiry-letter PDFs into CSV tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every source/company/*.pdf under a root directory
    Ingest {
        root: PathBuf,
        /// Questions table
        #[arg(long, default_value = "data/questions.csv")]
        questions: PathBuf,
        /// Answers table
        #[arg(long, default_value = "data/answers.csv")]
        answers: PathBuf,
        /// JSON file with dialect patterns (toc_header, toc_entry, reply, subtitle)
        #[arg(long)]
        patterns: Option<PathBuf>,
        /// Characters captured after each sub-answer heading
        #[arg(long, default_value_t = 100)]
        snippet_window: usize,
        /// Also scan the final page of each entry's range for sub-answers
        #[arg(long)]
        keep_last_page: bool,
        /// Directory for a timestamped log of skipped documents
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
    /// Print one stored question and its reconstructed answer
    Query {
        #[arg(long)]
        source: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        round: u32,
        /// Zero-based question number within the document
        #[arg(long)]
        question: usize,
        #[arg(long, default_value = "data/questions.csv")]
        questions: PathBuf,
        #[arg(long, default_value = "data/answers.csv")]
        answers: PathBuf,
    },
    /// Show table sizes
    Stats {
        #[arg(long, default_value = "data/questions.csv")]
        questions: PathBuf,
        #[arg(long, default_value = "data/answers.csv")]
        answers: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result: anyhow::Result<()> = match cli.command {
        Commands::Ingest {
            root,
            questions,
            answers,
            patterns,
            snippet_window,
            keep_last_page,
            report_dir,
        } => {
            let registry = load_registry(patterns.as_deref())?;
            let opts = ExtractOptions {
                snippet_window,
                skip_last_answer_page: !keep_last_page,
            };
            let report = batch::run(&root, &questions, &answers, &registry, &opts)?;
            println!(
                "Ingested {} of {} documents ({} skipped).",
                report.ok,
                report.total,
                report.failures.len()
            );
            for (path, error) in &report.failures {
                println!("  skipped {}: {}", path.display(), error);
            }
            if let Some(dir) = report_dir {
                if let Some(log) = batch::write_failure_report(&dir, &report)? {
                    println!("Failure log: {}", log.display());
                }
            }
            Ok(())
        }
        Commands::Query {
            source,
            company,
            round,
            question,
            questions,
            answers,
        } => {
            let view = store::query_one(&source, &company, round, question, &questions, &answers)?;
            println!("Question: {}", view.question);
            println!("Pages:    {}-{}", view.pages.0, view.pages.1);
            println!("\n--- Question text ---\n{}", view.question_long.trim());
            println!("\n--- Answer ---\n{}", view.answer);
            Ok(())
        }
        Commands::Stats { questions, answers } => {
            let s = store::stats(&questions, &answers)?;
            println!("Questions: {}", s.questions);
            println!("Answers:   {}", s.answers);
            println!("Companies: {}", s.companies);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_registry(path: Option<&std::path::Path>) -> error::Result<PatternRegistry> {
    match path {
        Some(path) => PatternSet::from_json_file(path)?.compile(),
        None => Ok(PatternRegistry::default_dialect()),
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
