//! barser command-line front end.
//!
//! Reads a configuration file (or stdin) into a buffer, parses it into a
//! dictionary, and optionally resolves path queries and dumps the tree
//! back out. Parse failures print the diagnostic context window with a
//! caret.

use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use barser_format::{dump, dump_node};
use barser_tree::BsDict;

const EXIT_PARSE_ERROR: u8 = 1;
const EXIT_NO_MATCH: u8 = 2;

/// Parse, query and dump curly-brace configuration data.
#[derive(Parser, Debug)]
#[command(name = "barser", version, about)]
struct Args {
    /// Input file path, or '-' for stdin
    input: String,

    /// Resolve a path query and dump the matched subtree (repeatable)
    #[arg(short, long)]
    query: Vec<String>,

    /// Dump the parsed tree to stdout
    #[arg(short, long)]
    dump: bool,

    /// Parse without building the path index
    #[arg(long)]
    no_index: bool,

    /// Print node and byte counts to stderr
    #[arg(long)]
    stats: bool,

    /// Enable trace logging (also honors RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

/// Read the whole input into a buffer; the parser wants it resident.
fn read_input(path: &str) -> Result<Vec<u8>> {
    if path == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("reading stdin")?;
        Ok(buf)
    } else {
        fs::read(path).with_context(|| format!("reading '{}'", path))
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let buf = read_input(&args.input)?;

    let dict_flags = if args.no_index { BsDict::NOINDEX } else { 0 };
    let mut dict = BsDict::new(args.input.as_bytes(), dict_flags);

    if let Err(err) = dict.parse(&buf) {
        eprintln!("{}", err.render());
        return Ok(ExitCode::from(EXIT_PARSE_ERROR));
    }

    if args.stats {
        eprintln!(
            "parsed {} nodes from {} bytes{}",
            dict.node_count(),
            buf.len(),
            if dict.is_indexed() { "" } else { " (unindexed)" }
        );
    }

    let mut missed = false;
    for query in &args.query {
        match dict.get(query.as_bytes()) {
            Some(id) => {
                dump_node(&dict, id, io::stdout().lock())
                    .context("writing query result")?;
            }
            None => {
                eprintln!("no match: {}", query);
                missed = true;
            }
        }
    }

    if args.dump || (args.query.is_empty() && !args.stats) {
        dump(&dict, io::stdout().lock()).context("writing dump")?;
    }

    Ok(if missed {
        ExitCode::from(EXIT_NO_MATCH)
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trace")),
            )
            .with_writer(io::stderr)
            .init();
    }

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("barser: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
