/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::custom_error::LoadError;
use crate::parser::{blank_node_label, iri_ref, language_tag, quoted_string};
use crate::triple_store::TripleStore;
use log::{info, warn};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, space0},
    combinator::{eof, map, opt, peek, verify},
    sequence::{preceded, tuple},
    IResult,
};
use rayon::prelude::*;
use shared::terms::{LiteralTag, Term};
use shared::triple::TermTriple;
use std::borrow::Cow;
use std::path::PathBuf;
use url::Url;

/// Turns the text of one source document into triples.
pub trait DocumentParser: Sync {
    fn parse(&self, source_id: &str, content: &str) -> Result<Vec<TermTriple>, LoadError>;
}

/// Line-oriented N-Triples. Blank nodes come out unscoped; the store scopes
/// them to the source when loading.
#[derive(Debug, Clone, Copy, Default)]
pub struct NTriplesParser;

impl DocumentParser for NTriplesParser {
    fn parse(&self, source_id: &str, content: &str) -> Result<Vec<TermTriple>, LoadError> {
        content
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
            .map(|(line_no, line)| match statement(line) {
                Ok((_, triple)) => Ok(triple),
                Err(err) => Err(LoadError::Malformed {
                    source_id: source_id.to_string(),
                    line: line_no,
                    message: describe_error(line, err),
                }),
            })
            .collect()
    }
}

fn describe_error(line: &str, err: nom::Err<nom::error::Error<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let column = line.len() - e.input.len() + 1;
            let near: String = e.input.chars().take(24).collect();
            if near.is_empty() {
                format!("unexpected end of line at column {}", column)
            } else {
                format!("unexpected input at column {}: `{}`", column, near)
            }
        }
        nom::Err::Incomplete(_) => "incomplete statement".to_string(),
    }
}

// IRIs in data must be absolute
fn absolute_iri(input: &str) -> IResult<&str, Term> {
    map(verify(iri_ref, |iri: &str| Url::parse(iri).is_ok()), Term::iri)(input)
}

fn blank_node(input: &str) -> IResult<&str, Term> {
    map(blank_node_label, |label| Term::blank("", label))(input)
}

fn literal(input: &str) -> IResult<&str, Term> {
    let (input, lexical) = preceded(peek(char('"')), quoted_string)(input)?;
    let (input, tag) = opt(alt((
        map(language_tag, |language| LiteralTag::Language(language.to_string())),
        map(
            preceded(tag("^^"), verify(iri_ref, |iri: &str| Url::parse(iri).is_ok())),
            |datatype| LiteralTag::Datatype(datatype.to_string()),
        ),
    )))(input)?;
    Ok((
        input,
        Term::Literal {
            lexical: lexical.into_owned(),
            tag: tag.unwrap_or(LiteralTag::Plain),
        },
    ))
}

fn statement(line: &str) -> IResult<&str, TermTriple> {
    let (rest, (subject, _, predicate, _, object, _, _, _)) = tuple((
        alt((absolute_iri, blank_node)),
        space0,
        absolute_iri,
        space0,
        alt((absolute_iri, blank_node, literal)),
        space0,
        char('.'),
        space0,
    ))(line)?;
    let (rest, _) = alt((eof, preceded(char('#'), nom::combinator::rest)))(rest)?;
    Ok((rest, TermTriple::new(subject, predicate, object)))
}

#[derive(Debug, Clone)]
pub enum SourceContent {
    File(PathBuf),
    Inline(String),
}

/// A document to load, identified by `id` for blank-node scoping and error reports.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub id: String,
    pub content: SourceContent,
}

impl DocumentSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: path.display().to_string(),
            content: SourceContent::File(path),
        }
    }

    pub fn inline(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: SourceContent::Inline(content.into()),
        }
    }

    fn read(&self) -> Result<Cow<'_, str>, LoadError> {
        match &self.content {
            SourceContent::Inline(content) => Ok(Cow::Borrowed(content)),
            SourceContent::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|error| LoadError::Io {
                    source_id: self.id.clone(),
                    error,
                }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSource {
    pub source_id: String,
    /// Triples that were new to the store.
    pub triples: usize,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<LoadedSource>,
    pub failures: Vec<LoadError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reads and parses `sources` in parallel, then loads them in the given
/// order. A source that fails is skipped and reported; the rest still load.
pub fn load_documents<P: DocumentParser>(
    store: &mut TripleStore,
    sources: &[DocumentSource],
    parser: &P,
) -> LoadReport {
    let parsed: Vec<Result<Vec<TermTriple>, LoadError>> = sources
        .par_iter()
        .map(|source| {
            let content = source.read()?;
            parser.parse(&source.id, &content)
        })
        .collect();

    let mut report = LoadReport::default();
    for (source, result) in sources.iter().zip(parsed) {
        match result.and_then(|triples| store.load(&source.id, triples)) {
            Ok(added) => {
                info!("Loaded {} ({} new triples)", source.id, added);
                report.loaded.push(LoadedSource {
                    source_id: source.id.clone(),
                    triples: added,
                });
            }
            Err(error) => {
                warn!("Skipping {}: {}", source.id, error);
                report.failures.push(error);
            }
        }
    }
    info!(
        "Store holds {} triples from {} source(s)",
        store.size(),
        report.loaded.len()
    );
    report
}
