/*
 * Copyright © 2024 ladroid
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::terms::Term;
use crate::triple::{TermTriple, Triple};
use rustc_hash::FxHashMap;

// Dictionary for encoding and decoding terms
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    term_to_id: FxHashMap<Term, u32>,
    id_to_term: Vec<Term>,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary {
            term_to_id: FxHashMap::default(),
            id_to_term: Vec::new(),
        }
    }

    pub fn encode(&mut self, term: &Term) -> u32 {
        if let Some(&id) = self.term_to_id.get(term) {
            id
        } else {
            let id = self.id_to_term.len() as u32;
            self.term_to_id.insert(term.clone(), id);
            self.id_to_term.push(term.clone());
            id
        }
    }

    /// Id of an already interned term. Query constants go through here so
    /// that evaluating a query never grows the dictionary.
    pub fn lookup(&self, term: &Term) -> Option<u32> {
        self.term_to_id.get(term).copied()
    }

    pub fn decode(&self, id: u32) -> Option<&Term> {
        self.id_to_term.get(id as usize)
    }

    pub fn encode_triple(&mut self, triple: &TermTriple) -> Triple {
        Triple {
            subject: self.encode(&triple.subject),
            predicate: self.encode(&triple.predicate),
            object: self.encode(&triple.object),
        }
    }

    pub fn decode_triple(&self, triple: &Triple) -> String {
        let render = |id| {
            self.decode(id)
                .map(|term| term.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        };
        format!(
            "{} {} {} .",
            render(triple.subject),
            render(triple.predicate),
            render(triple.object)
        )
    }

    pub fn len(&self) -> usize {
        self.id_to_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_term.is_empty()
    }
}
