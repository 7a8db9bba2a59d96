/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::custom_error::{format_parse_error, QueryError};
use crate::utils::unescape;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{cut, eof, map, map_opt, map_res, not, opt, recognize, value, verify},
    error::{Error as NomError, ErrorKind},
    multi::{many0, many1, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult, Parser,
};
use shared::query::*;
use shared::terms::{RDF_TYPE, XSD_BOOLEAN, XSD_DECIMAL, XSD_DOUBLE, XSD_INTEGER};
use std::borrow::Cow;

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// Skips whitespace and `#` comments
pub fn ws(input: &str) -> IResult<&str, ()> {
    let mut rest = input.trim_start();
    while let Some(comment) = rest.strip_prefix('#') {
        rest = match comment.find('\n') {
            Some(end) => comment[end + 1..].trim_start(),
            None => "",
        };
    }
    Ok((rest, ()))
}

// Runs a parser after skipping leading whitespace
fn token<'a, O, F>(mut parser: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: Parser<&'a str, O, NomError<&'a str>>,
{
    move |input: &'a str| {
        let (input, _) = ws(input)?;
        parser.parse(input)
    }
}

// Case-insensitive keyword that is not the start of a longer name
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_name_char)))
}

pub fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(is_name_char)(input)
}

// Parser for variables (e.g., ?person or $person); yields the bare name
pub fn variable(input: &str) -> IResult<&str, &str> {
    preceded(alt((char('?'), char('$'))), identifier)(input)
}

pub fn blank_node_label(input: &str) -> IResult<&str, &str> {
    preceded(
        tag("_:"),
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    )(input)
}

// Parser for a URI within angle brackets
pub fn iri_ref(input: &str) -> IResult<&str, &str> {
    delimited(
        char('<'),
        take_while(|c: char| !matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') && !c.is_whitespace()),
        char('>'),
    )(input)
}

// Prefix part of a prefixed name, possibly empty (`:local`)
fn prefix_label(input: &str) -> IResult<&str, &str> {
    recognize(opt(pair(
        satisfy(char::is_alphabetic),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    )))(input)
}

// Local part of a prefixed name. A trailing dot ends the triple instead.
fn local_name(input: &str) -> IResult<&str, &str> {
    let end = input
        .char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '%')))
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    let local = input[..end].trim_end_matches('.');
    Ok((&input[local.len()..], local))
}

// Parser for a prefixed identifier like ex:worksAt
pub fn prefixed_name(input: &str) -> IResult<&str, IriRef<'_>> {
    map(
        pair(terminated(prefix_label, char(':')), local_name),
        |(prefix, local)| IriRef::Prefixed { prefix, local },
    )(input)
}

pub fn iri(input: &str) -> IResult<&str, IriRef<'_>> {
    alt((map(iri_ref, IriRef::Full), prefixed_name))(input)
}

/// Body of a single- or double-quoted string with its escapes resolved.
pub fn quoted_string(input: &str) -> IResult<&str, Cow<'_, str>> {
    let quote = match input.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return Err(nom::Err::Error(NomError::new(input, ErrorKind::Char))),
    };
    let body = &input[1..];
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\n' | '\r' => break,
            c if c == quote => {
                return match unescape(&body[..i]) {
                    Some(text) => Ok((&body[i + 1..], text)),
                    None => Err(nom::Err::Failure(NomError::new(input, ErrorKind::Escaped))),
                };
            }
            _ => {}
        }
    }
    // Unterminated string
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Char)))
}

pub fn language_tag(input: &str) -> IResult<&str, &str> {
    preceded(
        char('@'),
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic()),
            many0(pair(char('-'), take_while1(|c: char| c.is_ascii_alphanumeric()))),
        )),
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, SyntaxTerm<'_>> {
    let (input, lexical) = quoted_string(input)?;
    let (input, annotation) = opt(alt((
        map(language_tag, LiteralAnnotation::Language),
        map(preceded(tag("^^"), iri), LiteralAnnotation::Datatype),
    )))(input)?;
    Ok((
        input,
        SyntaxTerm::Literal {
            lexical,
            annotation: annotation.unwrap_or(LiteralAnnotation::Plain),
        },
    ))
}

fn numeric_literal(input: &str) -> IResult<&str, SyntaxTerm<'_>> {
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digit1));
    let (rest, lexical) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(exponent),
    )))(input)?;
    let datatype = if lexical.contains(|c| c == 'e' || c == 'E') {
        XSD_DOUBLE
    } else if lexical.contains('.') {
        XSD_DECIMAL
    } else {
        XSD_INTEGER
    };
    Ok((
        rest,
        SyntaxTerm::Literal {
            lexical: Cow::Borrowed(lexical),
            annotation: LiteralAnnotation::Datatype(IriRef::Full(datatype)),
        },
    ))
}

fn boolean_literal(input: &str) -> IResult<&str, SyntaxTerm<'_>> {
    map(alt((keyword("true"), keyword("false"))), |lexical: &str| {
        SyntaxTerm::Literal {
            lexical: Cow::Owned(lexical.to_ascii_lowercase()),
            annotation: LiteralAnnotation::Datatype(IriRef::Full(XSD_BOOLEAN)),
        }
    })(input)
}

fn literal(input: &str) -> IResult<&str, SyntaxTerm<'_>> {
    alt((string_literal, numeric_literal, boolean_literal))(input)
}

fn subject_term(input: &str) -> IResult<&str, SyntaxTerm<'_>> {
    alt((
        map(variable, SyntaxTerm::Variable),
        map(blank_node_label, SyntaxTerm::BlankNode),
        map(iri, SyntaxTerm::Iri),
    ))(input)
}

// Predicate position: variable, IRI or the `a` shorthand for rdf:type
fn verb(input: &str) -> IResult<&str, SyntaxTerm<'_>> {
    alt((
        map(variable, SyntaxTerm::Variable),
        map(iri, SyntaxTerm::Iri),
        value(SyntaxTerm::Iri(IriRef::Full(RDF_TYPE)), keyword("a")),
    ))(input)
}

fn object_term(input: &str) -> IResult<&str, SyntaxTerm<'_>> {
    alt((
        map(variable, SyntaxTerm::Variable),
        map(blank_node_label, SyntaxTerm::BlankNode),
        literal,
        map(iri, SyntaxTerm::Iri),
    ))(input)
}

// Helper parser to parse a predicate with one or more comma-separated objects
fn predicate_objects(input: &str) -> IResult<&str, (SyntaxTerm<'_>, Vec<SyntaxTerm<'_>>)> {
    let (input, predicate) = token(verb)(input)?;
    let (input, objects) = separated_list1(token(char(',')), token(object_term))(input)?;
    Ok((input, (predicate, objects)))
}

/// One subject with its `;`-separated predicate-object lists, flattened into triples.
pub fn parse_triple_block(input: &str) -> IResult<&str, Vec<SyntaxTriple<'_>>> {
    let (input, subject) = token(subject_term)(input)?;
    let (input, first) = cut(predicate_objects)(input)?;
    let (input, rest) = many0(preceded(token(char(';')), opt(predicate_objects)))(input)?;

    let mut triples = Vec::new();
    for (predicate, objects) in std::iter::once(first).chain(rest.into_iter().flatten()) {
        for object in objects {
            triples.push((subject.clone(), predicate.clone(), object));
        }
    }
    Ok((input, triples))
}

fn comparison_op(input: &str) -> IResult<&str, ComparisonOp> {
    alt((
        value(ComparisonOp::LtEq, tag("<=")),
        value(ComparisonOp::GtEq, tag(">=")),
        value(ComparisonOp::NotEq, tag("!=")),
        value(ComparisonOp::Eq, tag("=")),
        value(ComparisonOp::Lt, tag("<")),
        value(ComparisonOp::Gt, tag(">")),
    ))(input)
}

fn bracketted_expression(input: &str) -> IResult<&str, SyntaxExpression<'_>> {
    delimited(char('('), expression, token(char(')')))(input)
}

fn aggregate(input: &str) -> IResult<&str, SyntaxExpression<'_>> {
    let (input, function) = map_opt(identifier, AggregateFunction::from_name)(input)?;
    let (input, _) = token(char('('))(input)?;
    let (input, distinct) = map(opt(token(keyword("DISTINCT"))), |d| d.is_some())(input)?;
    let (input, argument) = cut(alt((
        map(
            verify(token(char('*')), |_: &char| function == AggregateFunction::Count),
            |_| None,
        ),
        map(expression, |e| Some(Box::new(e))),
    )))(input)?;
    let (input, separator) = opt(preceded(
        tuple((
            token(char(';')),
            token(keyword("SEPARATOR")),
            token(char('=')),
        )),
        cut(token(quoted_string)),
    ))(input)?;
    let (input, _) = cut(token(char(')')))(input)?;

    Ok((
        input,
        SyntaxExpression::Aggregate(AggregateSyntax {
            function,
            distinct,
            argument,
            separator,
        }),
    ))
}

fn function_call(input: &str) -> IResult<&str, SyntaxExpression<'_>> {
    let (input, function) = map_opt(identifier, Function::from_name)(input)?;
    let (input, _) = token(char('('))(input)?;
    let (input, args) = separated_list0(token(char(',')), expression)(input)?;
    let (input, _) = cut(token(char(')')))(input)?;
    Ok((input, SyntaxExpression::Call { function, args }))
}

fn expression_term(input: &str) -> IResult<&str, SyntaxTerm<'_>> {
    alt((
        map(variable, SyntaxTerm::Variable),
        literal,
        map(iri, SyntaxTerm::Iri),
    ))(input)
}

fn primary_expression(input: &str) -> IResult<&str, SyntaxExpression<'_>> {
    token(alt((
        bracketted_expression,
        aggregate,
        function_call,
        map(expression_term, SyntaxExpression::Term),
    )))(input)
}

fn unary_expression(input: &str) -> IResult<&str, SyntaxExpression<'_>> {
    alt((
        map(preceded(token(char('!')), unary_expression), |e| {
            SyntaxExpression::Not(Box::new(e))
        }),
        primary_expression,
    ))(input)
}

fn relational_expression(input: &str) -> IResult<&str, SyntaxExpression<'_>> {
    let (input, left) = unary_expression(input)?;
    let (input, right) = opt(pair(token(comparison_op), cut(unary_expression)))(input)?;
    let expr = match right {
        Some((op, right)) => SyntaxExpression::Comparison(Box::new(left), op, Box::new(right)),
        None => left,
    };
    Ok((input, expr))
}

fn and_expression(input: &str) -> IResult<&str, SyntaxExpression<'_>> {
    let (input, first) = relational_expression(input)?;
    let (input, rest) = many0(preceded(token(tag("&&")), cut(relational_expression)))(input)?;
    let expr = rest.into_iter().fold(first, |left, right| {
        SyntaxExpression::And(Box::new(left), Box::new(right))
    });
    Ok((input, expr))
}

fn or_expression(input: &str) -> IResult<&str, SyntaxExpression<'_>> {
    let (input, first) = and_expression(input)?;
    let (input, rest) = many0(preceded(token(tag("||")), cut(and_expression)))(input)?;
    let expr = rest.into_iter().fold(first, |left, right| {
        SyntaxExpression::Or(Box::new(left), Box::new(right))
    });
    Ok((input, expr))
}

// Main entry point for parsing expressions
pub fn expression(input: &str) -> IResult<&str, SyntaxExpression<'_>> {
    or_expression(input)
}

// FILTER (expr) or FILTER with a bare function call
pub fn parse_filter(input: &str) -> IResult<&str, SyntaxExpression<'_>> {
    preceded(
        token(keyword("FILTER")),
        cut(token(alt((bracketted_expression, function_call)))),
    )(input)
}

pub fn parse_optional(input: &str) -> IResult<&str, GroupSyntax<'_>> {
    preceded(token(keyword("OPTIONAL")), cut(group_graph_pattern))(input)
}

/// `{ ... }` with triple blocks, OPTIONAL groups and FILTERs in any order.
pub fn group_graph_pattern(input: &str) -> IResult<&str, GroupSyntax<'_>> {
    let (mut input, _) = token(char('{'))(input)?;
    let mut group = GroupSyntax::default();

    loop {
        if let Ok((rest, _)) = token(char('}'))(input) {
            return Ok((rest, group));
        }
        if let Ok((rest, _)) = token(char('.'))(input) {
            input = rest;
            continue;
        }

        match parse_optional(input) {
            Ok((rest, optional)) => {
                group.elements.push(GroupElement::Optional(optional));
                input = rest;
                continue;
            }
            Err(nom::Err::Error(_)) => {}
            Err(e) => return Err(e),
        }

        match parse_filter(input) {
            Ok((rest, filter)) => {
                group.filters.push(filter);
                input = rest;
                continue;
            }
            Err(nom::Err::Error(_)) => {}
            Err(e) => return Err(e),
        }

        let (rest, triples) = parse_triple_block(input)?;
        group
            .elements
            .extend(triples.into_iter().map(GroupElement::Triple));
        input = rest;
    }
}

fn select_item(input: &str) -> IResult<&str, SelectItem<'_>> {
    token(alt((
        map(variable, SelectItem::Variable),
        map(
            delimited(
                char('('),
                tuple((expression, token(keyword("AS")), token(variable))),
                token(char(')')),
            ),
            |(expression, _, alias)| SelectItem::Expression { expression, alias },
        ),
    )))(input)
}

pub fn parse_select(input: &str) -> IResult<&str, (bool, Selection<'_>)> {
    let (input, _) = token(keyword("SELECT"))(input)?;
    let (input, distinct) = map(opt(token(keyword("DISTINCT"))), |d| d.is_some())(input)?;
    let (input, selection) = cut(alt((
        value(Selection::All, token(char('*'))),
        map(many1(select_item), Selection::Items),
    )))(input)?;
    Ok((input, (distinct, selection)))
}

// Parser for PREFIX declarations
pub fn parse_prefix(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        token(keyword("PREFIX")),
        cut(pair(
            token(terminated(prefix_label, char(':'))),
            token(iri_ref),
        )),
    )(input)
}

pub fn parse_group_by(input: &str) -> IResult<&str, Vec<&str>> {
    preceded(
        pair(token(keyword("GROUP")), cut(token(keyword("BY")))),
        cut(many1(token(variable))),
    )(input)
}

pub fn parse_limit(input: &str) -> IResult<&str, usize> {
    preceded(
        token(keyword("LIMIT")),
        cut(token(map_res(digit1, |digits: &str| digits.parse::<usize>()))),
    )(input)
}

pub fn parse_sparql_query(input: &str) -> IResult<&str, SelectQuery<'_>> {
    let (input, prefixes) = many0(parse_prefix)(input)?;
    let (input, (distinct, selection)) = parse_select(input)?;
    let (input, _) = opt(token(keyword("WHERE")))(input)?;
    let (input, pattern) = cut(group_graph_pattern)(input)?;
    let (input, group_by) = opt(parse_group_by)(input)?;
    let (input, limit) = opt(parse_limit)(input)?;
    let (input, _) = token(eof)(input)?;

    Ok((
        input,
        SelectQuery {
            prefixes,
            distinct,
            selection,
            pattern,
            group_by: group_by.unwrap_or_default(),
            limit,
        },
    ))
}

/// Parses a query string, turning nom failures into a located syntax error.
pub fn parse_query(query: &str) -> Result<SelectQuery<'_>, QueryError> {
    match parse_sparql_query(query) {
        Ok((_, parsed)) => Ok(parsed),
        Err(err) => Err(QueryError::Syntax(format_parse_error(query, err))),
    }
}
