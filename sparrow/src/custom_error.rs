/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use nom::error::{Error as NomError, ErrorKind};
use thiserror::Error;

/// Failure to turn one source document into triples. The source is skipped;
/// loading carries on with the others.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {source_id}: {error}")]
    Io {
        source_id: String,
        #[source]
        error: std::io::Error,
    },
    #[error("{source_id}, line {line}: {message}")]
    Malformed {
        source_id: String,
        line: usize,
        message: String,
    },
    #[error("{source_id}: invalid triple: {message}")]
    InvalidTriple { source_id: String, message: String },
}

impl LoadError {
    pub fn source_id(&self) -> &str {
        match self {
            LoadError::Io { source_id, .. }
            | LoadError::Malformed { source_id, .. }
            | LoadError::InvalidTriple { source_id, .. } => source_id,
        }
    }
}

/// Failure of a single query. Never affects the store or other queries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("{0}")]
    Syntax(String),
    #[error("undefined prefix '{0}:'")]
    UnknownPrefix(String),
    #[error("{function}() does not accept {found} argument(s)")]
    Arity { function: String, found: usize },
    #[error("variable ?{0} is projected but is not a GROUP BY key")]
    UngroupedVariable(String),
    #[error("aggregates are not allowed inside FILTER")]
    AggregateInFilter,
    #[error("?{0} is projected more than once")]
    DuplicateProjection(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Internal errors are failures of the engine rather than of the query text.
    pub fn is_internal(&self) -> bool {
        matches!(self, QueryError::Internal(_))
    }
}

pub fn format_parse_error(input: &str, err: nom::Err<NomError<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let error_description = match e.code {
                ErrorKind::Tag => "expected a keyword or token",
                ErrorKind::Char => "expected a specific character",
                ErrorKind::Alt => "expected one of several alternatives",
                ErrorKind::TakeWhile1 => "unexpected character",
                ErrorKind::Digit => "expected a number",
                ErrorKind::Eof => "unexpected trailing input",
                ErrorKind::Verify => "invalid token",
                _ => "unexpected syntax",
            };
            let offset = input.len() - e.input.len();
            let (line_no, col_no) = line_and_column(input, offset);

            let error_line = input.lines().nth(line_no - 1).unwrap_or("[end of input]");

            format!(
                "Syntax error at line {}, column {}: {}\n{}\n{}^ Here",
                line_no,
                col_no,
                error_description,
                error_line,
                " ".repeat(col_no - 1)
            )
        }
        nom::Err::Incomplete(_) => {
            "Incomplete input: the parser needs more input to complete parsing".to_string()
        }
    }
}

fn line_and_column(input: &str, offset: usize) -> (usize, usize) {
    let mut line_no = 1;
    let mut col_no = 1;
    for (i, c) in input.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line_no += 1;
            col_no = 1;
        } else {
            col_no += 1;
        }
    }
    (line_no, col_no)
}
