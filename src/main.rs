//! Command-line front end for paperless-sorter.
//!
//! Copies every keyword-tagged PDF under SOURCE into a `YYYY/MM` tree under
//! DEST, then lists the documents that could not be dated.

use clap::Parser;
use paperless_sorter::{CancelToken, Extractor, ExtractorConfig, PdfKeywordReader, RunEvent, RunRequest};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "paperless-sorter", version, about = "Sort keyword-tagged PDFs into a dated archive")]
struct Cli {
    /// Library directory to scan for PDFs
    source: PathBuf,

    /// Destination root for the sorted archive
    dest: PathBuf,

    /// Copy documents whose metadata cannot be read into the unclassified
    /// folder instead of skipping them
    #[arg(long)]
    quarantine_unreadable: bool,

    /// Leave copied files with their default timestamps
    #[arg(long)]
    no_dates: bool,

    /// Emit one JSON object per event on stdout
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ExtractorConfig {
        quarantine_unreadable: cli.quarantine_unreadable,
        preserve_dates: !cli.no_dates,
        ..Default::default()
    };
    let extractor = Extractor::with_config(PdfKeywordReader, config);
    let request = RunRequest::new(&cli.source, &cli.dest);

    let json = cli.json;
    let result = extractor.run(request, &CancelToken::new(), |event| {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("failed to encode event: {e}"),
            }
        } else {
            render(&event);
        }
    });

    let ctx = match result {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if json {
        return;
    }

    if !ctx.unclassified.is_empty() {
        println!("\nUnclassified ({}):", ctx.unclassified.len());
        for path in &ctx.unclassified {
            println!("  {}", path.display());
        }
    }

    println!("\nSummary:");
    println!("  {} of {} file(s) placed", ctx.placements.len(), ctx.total);
    println!("  {} unclassified", ctx.unclassified.len());
    println!("  {} skipped", ctx.skipped());
}

fn render(event: &RunEvent) {
    match event {
        RunEvent::Started { total } => eprintln!("Found {total} PDF(s)"),
        RunEvent::Progress(p) => {
            eprint!("\r{:>5.1}%", p.fraction() * 100.0);
            let _ = std::io::stderr().flush();
        }
        RunEvent::Placed(p) => {
            println!("\r{} -> {}", p.source.display(), p.destination.display())
        }
        RunEvent::Error(e) => {
            eprintln!("\rerror {} ({:?}): {}", e.source.display(), e.stage, e.message)
        }
        RunEvent::Done { .. } => eprintln!(),
        RunEvent::Unclassified { .. } => {}
    }
}
