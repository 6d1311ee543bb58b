//! ingot-query: Flatten JSON into a table and query it from the command line
//!
//! Usage:
//!   # First page (25 rows) of a JSON array, as JSON Lines
//!   ingot-query users.json
//!
//!   # Select a sub-document, filter, sort and page
//!   ingot-query api.json --path data.items --filter 'user.name=^a' --sort id --desc --page 2
//!
//!   # Read from stdin and list the flattened columns
//!   curl -s https://example.com/api | ingot-query --columns
//!
//!   # Values of one column still reachable under the other filters
//!   ingot-query users.json --select country=NO --facet city --cascade

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ingot::{available_paths, beautify, parse_json, EngineConfig, RowWriter, Session, SortState};
use std::fs;
use std::io::{self, Read};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ingot-query")]
#[command(about = "Flatten JSON into a table and filter, sort and page it", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Dot/bracket path selecting the part of the document to flatten (e.g. data.items[0])
    #[arg(long)]
    path: Option<String>,

    /// Case-insensitive search across every column
    #[arg(long)]
    search: Option<String>,

    /// Per-column regex filter, COLUMN=PATTERN (repeatable)
    #[arg(long = "filter", value_name = "COLUMN=PATTERN")]
    filters: Vec<String>,

    /// Per-column value selection, COLUMN=VALUE (repeatable)
    #[arg(long = "select", value_name = "COLUMN=VALUE")]
    selections: Vec<String>,

    /// Column to sort by
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending instead of ascending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Page to print (default: 1)
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Rows per page (default: 25)
    #[arg(long)]
    page_size: Option<usize>,

    /// Print every filtered row instead of one page
    #[arg(long)]
    all: bool,

    /// Prefix each row with its 1-based position in the result
    #[arg(long)]
    row_numbers: bool,

    /// List the flattened columns with their hierarchy level
    #[arg(long)]
    columns: bool,

    /// Print the distinct values of a column
    #[arg(long, value_name = "COLUMN")]
    facet: Option<String>,

    /// With --facet, ignore the column's own filter
    #[arg(long, requires = "facet")]
    cascade: bool,

    /// List the paths that can be passed to --path
    #[arg(long)]
    paths: bool,

    /// Pretty-print the input, repairing common mistakes
    #[arg(long)]
    beautify: bool,

    /// Print row, column and nesting counts
    #[arg(long)]
    stats: bool,

    /// Maximum number of distinct values per facet (default: 500)
    #[arg(long)]
    max_unique: Option<usize>,

    /// Top-level elements flattened per batch (default: 100)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Keep strings that contain JSON as plain text
    #[arg(long)]
    no_decode: bool,

    /// Debug logging on stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let text = read_input(args.input.as_deref())?;

    if args.beautify {
        let result = beautify(&text)?;
        debug!(repair = ?result.repair, "beautified input");
        println!("{}", result.text);
        return Ok(());
    }

    if args.paths {
        let value = parse_json(&text)?;
        for path in available_paths(&value) {
            println!("{}", path);
        }
        return Ok(());
    }

    // Build config
    let mut config = EngineConfig::default();
    if let Some(max) = args.max_unique {
        config.max_unique_values = max;
    }
    if let Some(size) = args.batch_size {
        config.batch_size = size;
    }
    if let Some(size) = args.page_size {
        config.default_page_size = size;
    }
    config.decode_embedded_json = !args.no_decode;

    let mut session = Session::new(config);
    let dataset = session.load_str(&text, args.path.as_deref())?;

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&dataset.stats())?);
        return Ok(());
    }

    if args.columns {
        let schema = dataset.schema();
        for column in schema.iter() {
            println!("{}\t{}", schema.level(column), column);
        }
        return Ok(());
    }

    let mut filters = session.filters().clone();
    if let Some(term) = &args.search {
        filters.global_search = term.clone();
    }
    for assignment in &args.filters {
        let (column, pattern) = split_assignment(assignment)?;
        filters.set_column_search(column, pattern);
    }
    for assignment in &args.selections {
        let (column, value) = split_assignment(assignment)?;
        filters.select_values(column, [value]);
    }
    session.set_filters(filters);

    if let Some(column) = &args.facet {
        let facet = if args.cascade {
            session.unique_values_excluding(column)
        } else {
            session.unique_values(column).as_ref().clone()
        };
        for value in &facet.values {
            println!("{}", value);
        }
        if facet.truncated {
            eprintln!("(truncated to {} values)", facet.len());
        }
        return Ok(());
    }

    if let Some(column) = &args.sort {
        if !dataset.schema().contains(column) {
            bail!("Unknown column: {}", column);
        }
        session.set_sort(if args.desc {
            SortState::descending(column.as_str())
        } else {
            SortState::ascending(column.as_str())
        });
    }

    let stdout = io::stdout();
    let mut writer = RowWriter::new(stdout.lock()).with_row_numbers(args.row_numbers);

    if args.all {
        let export = session.export();
        writer.write_export(&export)?;
        writer.flush()?;
        eprintln!("{} of {} rows", export.rows.len(), dataset.len());
        return Ok(());
    }

    if !session.go_to_page(args.page) {
        eprintln!(
            "Page {} is out of range (1-{}), showing page 1",
            args.page,
            session.total_pages()
        );
    }

    let page = session.current_page();
    writer.write_page(&page)?;
    writer.flush()?;

    if page.is_paginated() {
        eprintln!(
            "Rows {}-{} of {} (page {} of {})",
            page.start_row,
            page.end_row,
            page.total_rows(),
            page.current_page(),
            page.total_pages()
        );
        if page.window.has_previous() {
            eprintln!("Previous: --page {}", page.current_page() - 1);
        }
        if page.window.has_next() {
            eprintln!("Next: --page {}", page.current_page() + 1);
        }
    } else {
        eprintln!("No matching rows");
    }

    Ok(())
}

/// The library logs under `ingot`, this binary under `ingot_query`
fn default_directive(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("ingot={level},ingot_query={level}")
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read {}", path)),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Split `COLUMN=VALUE` at the first `=`
fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    assignment.split_once('=')
        .filter(|(column, _)| !column.is_empty())
        .with_context(|| format!("Expected COLUMN=VALUE, got '{}'", assignment))
}
