/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! RDF terms and the typed ordering used by `FILTER` comparisons.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::fmt;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

// Datatypes derived from xsd:integer, by local name.
const XSD_INTEGER_DERIVED: &[&str] = &[
    "integer",
    "int",
    "long",
    "short",
    "byte",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "positiveInteger",
    "negativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

/// Annotation carried by a literal. A literal has a datatype or a language
/// tag, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LiteralTag {
    Plain,
    Datatype(String),
    Language(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Literal { lexical: String, tag: LiteralTag },
    /// Blank nodes are scoped to the document that produced them.
    BlankNode { scope: String, label: String },
}

/// Result of [`compare`]. `Incomparable` makes every predicate built on the
/// comparison evaluate to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOrdering {
    Less,
    Equal,
    Greater,
    Incomparable,
}

impl From<Ordering> for TermOrdering {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => TermOrdering::Less,
            Ordering::Equal => TermOrdering::Equal,
            Ordering::Greater => TermOrdering::Greater,
        }
    }
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn plain(lexical: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            tag: LiteralTag::Plain,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            tag: LiteralTag::Datatype(datatype.into()),
        }
    }

    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            tag: LiteralTag::Language(language.into()),
        }
    }

    pub fn blank(scope: impl Into<String>, label: impl Into<String>) -> Self {
        Term::BlankNode {
            scope: scope.into(),
            label: label.into(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Term::typed(if value { "true" } else { "false" }, XSD_BOOLEAN)
    }

    pub fn integer(value: i64) -> Self {
        Term::typed(value.to_string(), XSD_INTEGER)
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal { .. })
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::BlankNode { .. })
    }

    /// Typed view used for comparisons and effective boolean values.
    pub fn value(&self) -> TypedValue<'_> {
        match self {
            Term::Iri(iri) => TypedValue::Iri(iri),
            Term::BlankNode { .. } => TypedValue::Blank,
            Term::Literal { lexical, tag } => match tag {
                LiteralTag::Plain => TypedValue::Text { lexical, language: None },
                LiteralTag::Language(language) => TypedValue::Text {
                    lexical,
                    language: Some(language.as_str()),
                },
                LiteralTag::Datatype(datatype) => typed_literal_value(lexical, datatype),
            },
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode { scope, label } => write!(f, "_:{}.{}", scope, label),
            Term::Literal { lexical, tag } => match tag {
                LiteralTag::Plain => write!(f, "\"{}\"", lexical),
                LiteralTag::Language(language) => write!(f, "\"{}\"@{}", lexical, language),
                LiteralTag::Datatype(datatype) => write!(f, "\"{}\"^^<{}>", lexical, datatype),
            },
        }
    }
}

/// Lexical form for literals, IRI text for IRIs, synthesized id for blank nodes.
pub fn coerce_to_string(term: &Term) -> String {
    match term {
        Term::Iri(iri) => iri.clone(),
        Term::Literal { lexical, .. } => lexical.clone(),
        Term::BlankNode { scope, label } => format!("_:{}.{}", scope, label),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue<'a> {
    Iri(&'a str),
    Blank,
    /// Plain, `xsd:string` or language-tagged text.
    Text {
        lexical: &'a str,
        language: Option<&'a str>,
    },
    Integer(i128),
    Number(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    /// Literal of a datatype without a value space here, or a malformed
    /// lexical form of a known one.
    Other { lexical: &'a str, datatype: &'a str },
}

fn typed_literal_value<'a>(lexical: &'a str, datatype: &'a str) -> TypedValue<'a> {
    let other = TypedValue::Other { lexical, datatype };
    let Some(local) = datatype.strip_prefix(XSD) else {
        return other;
    };
    let trimmed = lexical.trim();
    match local {
        "string" => TypedValue::Text {
            lexical,
            language: None,
        },
        "boolean" => match trimmed {
            "true" | "1" => TypedValue::Boolean(true),
            "false" | "0" => TypedValue::Boolean(false),
            _ => other,
        },
        "decimal" | "double" | "float" => match trimmed.parse::<f64>() {
            Ok(number) => TypedValue::Number(number),
            Err(_) => match trimmed {
                "INF" => TypedValue::Number(f64::INFINITY),
                "-INF" => TypedValue::Number(f64::NEG_INFINITY),
                "NaN" => TypedValue::Number(f64::NAN),
                _ => other,
            },
        },
        "date" => parse_date(trimmed).map(TypedValue::DateTime).unwrap_or(other),
        "dateTime" => parse_date_time(trimmed)
            .map(TypedValue::DateTime)
            .unwrap_or(other),
        local if XSD_INTEGER_DERIVED.contains(&local) => trimmed
            .trim_start_matches('+')
            .parse::<i128>()
            .map(TypedValue::Integer)
            .unwrap_or(other),
        _ => other,
    }
}

// xsd:date may carry a timezone suffix ("2000-01-01Z", "2000-01-01+02:00").
fn parse_date(lexical: &str) -> Option<NaiveDateTime> {
    let day = lexical.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn parse_date_time(lexical: &str) -> Option<NaiveDateTime> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(lexical) {
        return Some(with_offset.naive_utc());
    }
    let without_zone = lexical.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(without_zone, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Typed ordering: numbers numerically, dates chronologically, strings
/// lexically; mismatched kinds are `Incomparable`.
pub fn compare(a: &Term, b: &Term) -> TermOrdering {
    use TypedValue::*;

    match (a.value(), b.value()) {
        (Integer(x), Integer(y)) => x.cmp(&y).into(),
        (Integer(x), Number(y)) => compare_floats(x as f64, y),
        (Number(x), Integer(y)) => compare_floats(x, y as f64),
        (Number(x), Number(y)) => compare_floats(x, y),
        (DateTime(x), DateTime(y)) => x.cmp(&y).into(),
        (Boolean(x), Boolean(y)) => x.cmp(&y).into(),
        // Same text under different language tags is never equal.
        (
            Text { lexical: x, language: lx },
            Text { lexical: y, language: ly },
        ) => (x, lx).cmp(&(y, ly)).into(),
        (Iri(x), Iri(y)) => x.cmp(y).into(),
        (Blank, Blank) => coerce_to_string(a).cmp(&coerce_to_string(b)).into(),
        (
            Other { lexical: x, datatype: dx },
            Other { lexical: y, datatype: dy },
        ) if dx == dy => x.cmp(y).into(),
        _ => TermOrdering::Incomparable,
    }
}

fn compare_floats(x: f64, y: f64) -> TermOrdering {
    x.partial_cmp(&y)
        .map(TermOrdering::from)
        .unwrap_or(TermOrdering::Incomparable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_literals_compare_by_value() {
        let a = Term::typed("9", XSD_INTEGER);
        let b = Term::typed("10", XSD_INTEGER);
        assert_eq!(compare(&a, &b), TermOrdering::Less);

        let c = Term::typed("10.0", XSD_DECIMAL);
        assert_eq!(compare(&b, &c), TermOrdering::Equal);
    }

    #[test]
    fn dates_compare_chronologically() {
        let early = Term::typed("1999-12-31", XSD_DATE);
        let late = Term::typed("2000-01-01T10:00:00Z", XSD_DATE_TIME);
        assert_eq!(compare(&early, &late), TermOrdering::Less);
        assert_eq!(compare(&late, &early), TermOrdering::Greater);
    }

    #[test]
    fn mismatched_kinds_are_incomparable() {
        let iri = Term::iri("http://example.org/a");
        let number = Term::integer(3);
        let text = Term::plain("3");
        assert_eq!(compare(&iri, &number), TermOrdering::Incomparable);
        assert_eq!(compare(&text, &number), TermOrdering::Incomparable);
        assert_eq!(
            compare(&Term::typed("abc", XSD_INTEGER), &number),
            TermOrdering::Incomparable
        );
    }

    #[test]
    fn language_tagged_and_plain_compare_lexically() {
        let a = Term::lang("apple", "en");
        let b = Term::plain("banana");
        assert_eq!(compare(&a, &b), TermOrdering::Less);
    }

    #[test]
    fn language_tags_take_part_in_equality() {
        let en = Term::lang("a", "en");
        let fr = Term::lang("a", "fr");
        let plain = Term::plain("a");
        assert_ne!(compare(&en, &fr), TermOrdering::Equal);
        assert_ne!(compare(&en, &plain), TermOrdering::Equal);
        assert_eq!(compare(&en, &Term::lang("a", "en")), TermOrdering::Equal);
        assert_eq!(
            compare(&plain, &Term::typed("a", XSD_STRING)),
            TermOrdering::Equal
        );
    }

    #[test]
    fn g_year_is_not_an_integer() {
        let year = Term::typed("1984", format!("{}gYear", XSD));
        assert_eq!(compare(&year, &Term::integer(1984)), TermOrdering::Incomparable);
    }

    #[test]
    fn coerce_to_string_uses_lexical_and_iri_text() {
        assert_eq!(coerce_to_string(&Term::iri("http://x/y")), "http://x/y");
        assert_eq!(coerce_to_string(&Term::typed("5", XSD_INTEGER)), "5");
        assert_eq!(coerce_to_string(&Term::blank("doc", "b1")), "_:doc.b1");
    }
}
