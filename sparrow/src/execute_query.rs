/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::custom_error::QueryError;
use crate::expression::Evaluator;
use crate::parser::parse_query;
use crate::query_plan::{build_query_plan, GroupPattern, PatternElement, PatternTerm, QueryPlan, TriplePattern};
use crate::results::QueryResults;
use crate::triple_store::{Binding, EncodedPattern, Slot, TripleStore};
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use shared::terms::Term;

type Bindings<'s> = Box<dyn Iterator<Item = Binding> + 's>;
type Rows<'s> = Box<dyn Iterator<Item = Vec<Option<Term>>> + 's>;

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Upper bound on returned rows, applied after LIMIT. `None` never truncates.
    pub max_rows: Option<usize>,
}

/// Parses, plans and evaluates one SELECT query against `store`.
pub fn execute_query(
    store: &TripleStore,
    sparql: &str,
    options: &QueryOptions,
) -> Result<QueryResults, QueryError> {
    let parsed = parse_query(sparql)?;
    debug!("Parsed query with {} top-level pattern element(s)", parsed.pattern.elements.len());
    let plan = build_query_plan(&parsed)?;
    Ok(execute_plan(store, &plan, options))
}

pub fn execute_plan(store: &TripleStore, plan: &QueryPlan, options: &QueryOptions) -> QueryResults {
    let evaluator = Evaluator::new(store.dictionary());
    let seed: Binding = vec![None; plan.slot_count()];
    let bindings = evaluate_group(store, evaluator, &plan.pattern, seed);

    let rows: Rows = if plan.aggregate {
        Box::new(group_and_aggregate(plan, evaluator, bindings).into_iter())
    } else {
        Box::new(bindings.map(move |binding| {
            plan.projection
                .iter()
                .map(|column| evaluator.evaluate(&column.expression, &binding))
                .collect()
        }))
    };

    let rows: Rows = if plan.distinct {
        let mut seen = FxHashSet::default();
        Box::new(rows.filter(move |row| seen.insert(row.clone())))
    } else {
        rows
    };

    let limited = rows.take(plan.limit.unwrap_or(usize::MAX));
    let (rows, truncated) = match options.max_rows {
        Some(budget) => {
            let mut rows: Vec<_> = limited.take(budget.saturating_add(1)).collect();
            let truncated = rows.len() > budget;
            if truncated {
                warn!("Result truncated to {} rows", budget);
                rows.truncate(budget);
            }
            (rows, truncated)
        }
        None => (limited.collect(), false),
    };
    debug!("Query produced {} row(s)", rows.len());

    QueryResults {
        vars: plan.output_names(),
        rows,
        truncated,
    }
}

/// Lazily evaluates a group: triple patterns join in source order, OPTIONAL
/// groups left-join, and the group's filters run last.
fn evaluate_group<'s>(
    store: &'s TripleStore,
    evaluator: Evaluator<'s>,
    group: &'s GroupPattern,
    seed: Binding,
) -> Bindings<'s> {
    let mut bindings: Bindings<'s> = Box::new(std::iter::once(seed));

    for element in &group.elements {
        bindings = match element {
            PatternElement::Triple(pattern) => match encode_pattern(store, pattern) {
                Some(encoded) => {
                    Box::new(bindings.flat_map(move |binding| store.match_pattern(encoded, &binding)))
                }
                // A constant the store has never seen matches nothing
                None => Box::new(std::iter::empty()),
            },
            PatternElement::Optional(inner) => {
                Box::new(bindings.flat_map(move |binding| -> Bindings<'s> {
                    let mut extended =
                        evaluate_group(store, evaluator, inner, binding.clone()).peekable();
                    if extended.peek().is_some() {
                        Box::new(extended)
                    } else {
                        Box::new(std::iter::once(binding))
                    }
                }))
            }
        };
    }

    if group.filters.is_empty() {
        bindings
    } else {
        Box::new(bindings.filter(move |binding| {
            group
                .filters
                .iter()
                .all(|filter| evaluator.passes(filter, binding))
        }))
    }
}

fn encode_pattern(store: &TripleStore, pattern: &TriplePattern) -> Option<EncodedPattern> {
    let slot = |term: &PatternTerm| match term {
        PatternTerm::Var(var) => Some(Slot::Var(*var)),
        PatternTerm::Constant(constant) => store.dictionary().lookup(constant).map(Slot::Bound),
    };
    Some(EncodedPattern {
        subject: slot(&pattern.subject)?,
        predicate: slot(&pattern.predicate)?,
        object: slot(&pattern.object)?,
    })
}

/// Buckets bindings by their GROUP BY key in first-seen order and evaluates
/// the projection once per group. Without GROUP BY all bindings form one
/// group, which exists even when there are none.
fn group_and_aggregate(
    plan: &QueryPlan,
    evaluator: Evaluator,
    bindings: Bindings,
) -> Vec<Vec<Option<Term>>> {
    let mut groups: Vec<Vec<Binding>> = Vec::new();
    let mut positions: FxHashMap<Vec<Option<u32>>, usize> = FxHashMap::default();

    for binding in bindings {
        let key: Vec<Option<u32>> = plan.group_by.iter().map(|&var| binding[var]).collect();
        let position = *positions.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[position].push(binding);
    }
    if groups.is_empty() && plan.group_by.is_empty() {
        groups.push(Vec::new());
    }
    debug!("Aggregating {} group(s)", groups.len());

    groups
        .iter()
        .map(|rows| {
            plan.projection
                .iter()
                .map(|column| evaluator.evaluate_group(&column.expression, rows))
                .collect()
        })
        .collect()
}
