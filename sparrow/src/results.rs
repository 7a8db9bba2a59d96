/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use shared::terms::{coerce_to_string, Term};

/// Rows of a SELECT query, one column per projected name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResults {
    pub vars: Vec<String>,
    pub rows: Vec<Vec<Option<Term>>>,
    /// Set when the row budget cut the result short.
    pub truncated: bool,
}

impl QueryResults {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of column `var` in row `row`, if bound.
    pub fn value(&self, row: usize, var: &str) -> Option<&Term> {
        let column = self.vars.iter().position(|name| name == var)?;
        self.rows.get(row)?.get(column)?.as_ref()
    }

    /// SPARQL 1.1 JSON results document.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for QueryResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut document = serializer.serialize_struct("QueryResults", 2)?;
        document.serialize_field("head", &Head { vars: &self.vars })?;
        document.serialize_field(
            "results",
            &Bindings {
                vars: &self.vars,
                rows: &self.rows,
            },
        )?;
        document.end()
    }
}

#[derive(Serialize)]
struct Head<'a> {
    vars: &'a [String],
}

struct Bindings<'a> {
    vars: &'a [String],
    rows: &'a [Vec<Option<Term>>],
}

impl Serialize for Bindings<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|values| Row {
                vars: self.vars,
                values,
            })
            .collect();
        let mut bindings = serializer.serialize_struct("Bindings", 1)?;
        bindings.serialize_field("bindings", &rows)?;
        bindings.end()
    }
}

// Unbound columns are left out of the row object
struct Row<'a> {
    vars: &'a [String],
    values: &'a [Option<Term>],
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (var, value) in self.vars.iter().zip(self.values) {
            if let Some(term) = value {
                map.serialize_entry(var, &JsonTerm::from(term))?;
            }
        }
        map.end()
    }
}

#[derive(Serialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

impl From<&Term> for JsonTerm {
    fn from(term: &Term) -> Self {
        JsonTerm {
            kind: if term.is_iri() { "uri" } else { "literal" },
            value: coerce_to_string(term),
        }
    }
}
