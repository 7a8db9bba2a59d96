/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::triple::Triple;
use rustc_hash::FxHashMap;

/// Per-position index from term id to the positions (in insertion order) of
/// the triples holding that id in the slot.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    pub by_subject: FxHashMap<u32, Vec<usize>>,
    pub by_predicate: FxHashMap<u32, Vec<usize>>,
    pub by_object: FxHashMap<u32, Vec<usize>>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the triple stored at `position`. Positions must be inserted in
    /// increasing order so every posting list stays sorted.
    pub fn insert(&mut self, triple: &Triple, position: usize) {
        self.by_subject.entry(triple.subject).or_default().push(position);
        self.by_predicate.entry(triple.predicate).or_default().push(position);
        self.by_object.entry(triple.object).or_default().push(position);
    }

    pub fn subject(&self, id: u32) -> &[usize] {
        self.by_subject.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predicate(&self, id: u32) -> &[usize] {
        self.by_predicate.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn object(&self, id: u32) -> &[usize] {
        self.by_object.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}
