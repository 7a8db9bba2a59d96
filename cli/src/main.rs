/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::Parser;
use sparrow::{execute_query, load_documents, DocumentSource, NTriplesParser, QueryOptions, TripleStore};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "sparrow-cli",
    version,
    about = "A CLI tool for sparrow",
    long_about = "Sparrow CLI - loads N-Triples files into an in-memory triple store and runs a SPARQL SELECT query against them, printing SPARQL JSON results."
)]
struct Args {
    #[arg(short, long, help = "N-Triples file to load (repeatable)", value_name = "FILE", required = true)]
    file: Vec<PathBuf>,

    #[arg(short, long, help = "SPARQL query string", value_name = "QUERY", conflicts_with = "query_file", required_unless_present = "query_file")]
    query: Option<String>,

    #[arg(long, help = "File containing the SPARQL query", value_name = "FILE")]
    query_file: Option<PathBuf>,

    #[arg(long, help = "Maximum number of rows to return", value_name = "N")]
    max_rows: Option<usize>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let query = match (&args.query, &args.query_file) {
        (Some(query), _) => query.clone(),
        (None, Some(path)) => match std::fs::read_to_string(path) {
            Ok(query) => query,
            Err(e) => {
                eprintln!("Cannot read {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        (None, None) => {
            eprintln!("No query given");
            return ExitCode::FAILURE;
        }
    };

    let mut store = TripleStore::new();
    let sources: Vec<DocumentSource> = args.file.iter().map(DocumentSource::file).collect();
    let report = load_documents(&mut store, &sources, &NTriplesParser);
    for failure in &report.failures {
        eprintln!("Skipped {}", failure);
    }

    let options = QueryOptions {
        max_rows: args.max_rows,
    };
    match execute_query(&store, &query, &options) {
        Ok(results) => match results.to_json() {
            Ok(json) => {
                println!("{}", json);
                if results.truncated {
                    eprintln!("Results truncated to {} rows", results.len());
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to serialize results: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Query error: {}", e);
            ExitCode::FAILURE
        }
    }
}
