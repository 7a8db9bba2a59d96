/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Expression evaluation over a single binding or over a group of bindings.
//!
//! Every expression yields `Option<Term>`: `None` stands for both an unbound
//! variable and an evaluation error, and propagates through operators and
//! functions. `&&` and `||` use three-valued logic, so an error operand is
//! absorbed when the other operand decides the result.

use crate::query_plan::{Aggregate, Expression};
use crate::triple_store::Binding;
use rustc_hash::FxHashSet;
use shared::dictionary::Dictionary;
use shared::query::{AggregateFunction, ComparisonOp, Function};
use shared::terms::{compare, coerce_to_string, Term, TermOrdering, TypedValue};

#[derive(Debug, Clone, Copy)]
enum Scope<'b> {
    Row(&'b Binding),
    /// Grouped bindings. Plain variables read the first binding, which holds
    /// the same values as every other one for the grouping keys.
    Group(&'b [Binding]),
}

/// Evaluates plan expressions against bindings of one store.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'s> {
    dictionary: &'s Dictionary,
}

impl<'s> Evaluator<'s> {
    pub fn new(dictionary: &'s Dictionary) -> Self {
        Self { dictionary }
    }

    pub fn evaluate(&self, expression: &Expression, binding: &Binding) -> Option<Term> {
        self.eval(expression, Scope::Row(binding))
    }

    pub fn evaluate_group(&self, expression: &Expression, group: &[Binding]) -> Option<Term> {
        self.eval(expression, Scope::Group(group))
    }

    /// A binding passes a filter only when the filter's effective boolean
    /// value is true. Errors and unbound variables reject it.
    pub fn passes(&self, filter: &Expression, binding: &Binding) -> bool {
        self.truth(filter, Scope::Row(binding)) == Some(true)
    }

    fn truth(&self, expression: &Expression, scope: Scope) -> Option<bool> {
        self.eval(expression, scope)
            .as_ref()
            .and_then(effective_boolean_value)
    }

    fn variable(&self, var: usize, scope: Scope) -> Option<Term> {
        let binding = match scope {
            Scope::Row(binding) => binding,
            Scope::Group(rows) => rows.first()?,
        };
        let id = binding.get(var).copied().flatten()?;
        self.dictionary.decode(id).cloned()
    }

    fn eval(&self, expression: &Expression, scope: Scope) -> Option<Term> {
        match expression {
            Expression::Constant(term) => Some(term.clone()),
            Expression::Variable(var) => self.variable(*var, scope),
            Expression::Or(left, right) => {
                match (self.truth(left, scope), self.truth(right, scope)) {
                    (Some(true), _) | (_, Some(true)) => Some(Term::boolean(true)),
                    (Some(false), Some(false)) => Some(Term::boolean(false)),
                    _ => None,
                }
            }
            Expression::And(left, right) => {
                match (self.truth(left, scope), self.truth(right, scope)) {
                    (Some(false), _) | (_, Some(false)) => Some(Term::boolean(false)),
                    (Some(true), Some(true)) => Some(Term::boolean(true)),
                    _ => None,
                }
            }
            Expression::Not(inner) => self.truth(inner, scope).map(|value| Term::boolean(!value)),
            Expression::Comparison(left, op, right) => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                Some(Term::boolean(compare_terms(&left, *op, &right)))
            }
            Expression::Call { function, args } => self.call(*function, args, scope),
            Expression::Aggregate(aggregate) => match scope {
                Scope::Group(rows) => self.aggregate(aggregate, rows),
                Scope::Row(_) => None,
            },
        }
    }

    fn call(&self, function: Function, args: &[Expression], scope: Scope) -> Option<Term> {
        if function == Function::Coalesce {
            return args.iter().find_map(|arg| self.eval(arg, scope));
        }

        let values = args
            .iter()
            .map(|arg| self.eval(arg, scope).map(|term| coerce_to_string(&term)))
            .collect::<Option<Vec<String>>>()?;
        let text = |i: usize| values.get(i).map(String::as_str);

        let result = match function {
            Function::Str => Term::plain(text(0)?),
            Function::LCase => Term::plain(text(0)?.to_lowercase()),
            Function::Contains => Term::boolean(text(0)?.contains(text(1)?)),
            Function::Replace => {
                let (input, pattern, replacement) = (text(0)?, text(1)?, text(2)?);
                if pattern.is_empty() {
                    Term::plain(input)
                } else {
                    Term::plain(input.replace(pattern, replacement))
                }
            }
            Function::Coalesce => return None,
        };
        Some(result)
    }

    fn aggregate(&self, aggregate: &Aggregate, rows: &[Binding]) -> Option<Term> {
        let Some(argument) = &aggregate.argument else {
            // COUNT(*)
            let count = if aggregate.distinct {
                rows.iter().collect::<FxHashSet<_>>().len()
            } else {
                rows.len()
            };
            return Some(Term::integer(count as i64));
        };

        let mut values: Vec<Term> = rows
            .iter()
            .filter_map(|row| self.eval(argument, Scope::Row(row)))
            .collect();
        if aggregate.distinct {
            let mut seen = FxHashSet::default();
            values.retain(|term| seen.insert(term.clone()));
        }

        match aggregate.function {
            AggregateFunction::Count => Some(Term::integer(values.len() as i64)),
            // Any value of the group qualifies; the first one is taken.
            AggregateFunction::Sample => values.into_iter().next(),
            AggregateFunction::GroupConcat => {
                let parts: Vec<String> = values.iter().map(coerce_to_string).collect();
                Some(Term::plain(parts.join(&aggregate.separator)))
            }
        }
    }
}

/// Effective boolean value. IRIs, blank nodes, dates and literals of
/// unknown datatypes have none.
pub fn effective_boolean_value(term: &Term) -> Option<bool> {
    match term.value() {
        TypedValue::Boolean(value) => Some(value),
        TypedValue::Integer(value) => Some(value != 0),
        TypedValue::Number(value) => Some(value != 0.0 && !value.is_nan()),
        TypedValue::Text { lexical, .. } => Some(!lexical.is_empty()),
        TypedValue::Iri(_) | TypedValue::Blank | TypedValue::DateTime(_) | TypedValue::Other { .. } => {
            None
        }
    }
}

/// Applies a comparison operator. Identical terms are always equal;
/// otherwise an incomparable pair fails every operator.
pub fn compare_terms(left: &Term, op: ComparisonOp, right: &Term) -> bool {
    if left == right {
        return matches!(op, ComparisonOp::Eq | ComparisonOp::LtEq | ComparisonOp::GtEq);
    }
    let ordering = compare(left, right);
    match (op, ordering) {
        (_, TermOrdering::Incomparable) => false,
        (ComparisonOp::Eq, ordering) => ordering == TermOrdering::Equal,
        (ComparisonOp::NotEq, ordering) => ordering != TermOrdering::Equal,
        (ComparisonOp::Lt, ordering) => ordering == TermOrdering::Less,
        (ComparisonOp::LtEq, ordering) => ordering != TermOrdering::Greater,
        (ComparisonOp::Gt, ordering) => ordering == TermOrdering::Greater,
        (ComparisonOp::GtEq, ordering) => ordering != TermOrdering::Less,
    }
}
