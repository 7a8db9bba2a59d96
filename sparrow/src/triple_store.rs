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
use log::{debug, trace};
use rustc_hash::FxHashSet;
use shared::dictionary::Dictionary;
use shared::index_manager::PositionIndex;
use shared::terms::Term;
use shared::triple::{TermTriple, Triple};

/// Variable assignment indexed by variable slot. `None` is unbound.
pub type Binding = Vec<Option<u32>>;

/// One position of a triple pattern after dictionary encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Bound(u32),
    Var(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedPattern {
    pub subject: Slot,
    pub predicate: Slot,
    pub object: Slot,
}

impl EncodedPattern {
    fn slots(&self) -> [Slot; 3] {
        [self.subject, self.predicate, self.object]
    }
}

/// Deduplicated set of triples kept in insertion order. Built once at
/// startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TripleStore {
    dictionary: Dictionary,
    triples: Vec<Triple>,
    seen: FxHashSet<Triple>,
    index: PositionIndex,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the triples of one source document. Blank nodes are scoped to
    /// `document_id`, so `_:b1` from two documents stays two nodes. The whole
    /// source is rejected when any triple breaks the position constraints.
    /// Returns how many triples were new.
    pub fn load(&mut self, document_id: &str, triples: Vec<TermTriple>) -> Result<usize, LoadError> {
        for triple in &triples {
            triple.validate().map_err(|message| LoadError::InvalidTriple {
                source_id: document_id.to_string(),
                message,
            })?;
        }

        let before = self.triples.len();
        for triple in triples {
            let scoped = TermTriple::new(
                scope_blank_node(triple.subject, document_id),
                triple.predicate,
                scope_blank_node(triple.object, document_id),
            );
            let encoded = self.dictionary.encode_triple(&scoped);
            if self.add_triple(encoded) {
                trace!("+ {}", self.dictionary.decode_triple(&encoded));
            }
        }
        let added = self.triples.len() - before;
        debug!("{}: {} new triple(s), store size {}", document_id, added, self.triples.len());
        Ok(added)
    }

    fn add_triple(&mut self, triple: Triple) -> bool {
        if !self.seen.insert(triple) {
            return false;
        }
        self.index.insert(&triple, self.triples.len());
        self.triples.push(triple);
        true
    }

    pub fn size(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn contains(&self, triple: &TermTriple) -> bool {
        let lookup = |term: &Term| self.dictionary.lookup(term);
        match (
            lookup(&triple.subject),
            lookup(&triple.predicate),
            lookup(&triple.object),
        ) {
            (Some(subject), Some(predicate), Some(object)) => self.seen.contains(&Triple {
                subject,
                predicate,
                object,
            }),
            _ => false,
        }
    }

    /// Lazily matches `pattern` against the store, extending `seed`.
    /// Variables already bound in `seed` act as fixed terms, and a variable
    /// used twice in the pattern only matches triples holding the same term
    /// in both slots. Results follow insertion order.
    pub fn match_pattern<'s>(
        &'s self,
        pattern: EncodedPattern,
        seed: &Binding,
    ) -> impl Iterator<Item = Binding> + 's {
        let fixed = pattern.slots().map(|slot| match slot {
            Slot::Bound(id) => Some(id),
            Slot::Var(var) => seed[var],
        });
        let candidates: Box<dyn Iterator<Item = usize> + 's> = match self.shortest_posting(&fixed) {
            Some(positions) => Box::new(positions.iter().copied()),
            None => Box::new(0..self.triples.len()),
        };
        let seed = seed.clone();

        candidates.filter_map(move |position| {
            let triple = &self.triples[position];
            let values = [triple.subject, triple.predicate, triple.object];
            if fixed
                .iter()
                .zip(values.iter())
                .any(|(fixed, value)| matches!(fixed, Some(id) if id != value))
            {
                return None;
            }
            extend_binding(&seed, &pattern, &values)
        })
    }

    fn shortest_posting(&self, fixed: &[Option<u32>; 3]) -> Option<&[usize]> {
        let postings = [
            fixed[0].map(|id| self.index.subject(id)),
            fixed[1].map(|id| self.index.predicate(id)),
            fixed[2].map(|id| self.index.object(id)),
        ];
        postings
            .into_iter()
            .flatten()
            .min_by_key(|positions| positions.len())
    }
}

fn extend_binding(seed: &Binding, pattern: &EncodedPattern, values: &[u32; 3]) -> Option<Binding> {
    let mut binding = seed.clone();
    for (slot, value) in pattern.slots().iter().zip(values.iter()) {
        if let Slot::Var(var) = *slot {
            match binding[var] {
                Some(existing) if existing != *value => return None,
                Some(_) => {}
                None => binding[var] = Some(*value),
            }
        }
    }
    Some(binding)
}

fn scope_blank_node(term: Term, document_id: &str) -> Term {
    match term {
        Term::BlankNode { label, .. } => Term::BlankNode {
            scope: document_id.to_string(),
            label,
        },
        other => other,
    }
}
