/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::terms::Term;

/// Dictionary-encoded triple as kept by the store.
#[derive(PartialEq, Debug, Clone, Copy, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub subject: u32,
    pub predicate: u32,
    pub object: u32,
}

/// A triple of terms, as produced by a document parser.
#[derive(PartialEq, Debug, Clone, Eq, Hash)]
pub struct TermTriple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TermTriple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Checks the RDF position constraints: the subject is an IRI or a blank
    /// node and the predicate is an IRI.
    pub fn validate(&self) -> Result<(), String> {
        if self.subject.is_literal() {
            return Err(format!("literal {} in subject position", self.subject));
        }
        if !self.predicate.is_iri() {
            return Err(format!("{} in predicate position", self.predicate));
        }
        Ok(())
    }
}
