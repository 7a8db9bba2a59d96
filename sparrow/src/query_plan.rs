/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Resolution of a parsed query into an owned plan: prefixed names become
//! IRIs, variables become binding slots, and the semantic checks that the
//! grammar cannot express are applied.

use crate::custom_error::QueryError;
use log::debug;
use rustc_hash::FxHashMap;
use shared::query::*;
use shared::terms::{LiteralTag, Term};

pub const BUILTIN_PREFIXES: [(&str, &str); 4] = [
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum PatternTerm {
    Constant(Term),
    Var(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternElement {
    Triple(TriplePattern),
    Optional(GroupPattern),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupPattern {
    pub elements: Vec<PatternElement>,
    pub filters: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub distinct: bool,
    /// `None` is `COUNT(*)`.
    pub argument: Option<Box<Expression>>,
    pub separator: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Term),
    Variable(usize),
    Or(Box<Expression>, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Comparison(Box<Expression>, ComparisonOp, Box<Expression>),
    Call {
        function: Function,
        args: Vec<Expression>,
    },
    Aggregate(Aggregate),
}

impl Expression {
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate(_) => true,
            Expression::Constant(_) | Expression::Variable(_) => false,
            Expression::Not(inner) => inner.contains_aggregate(),
            Expression::Or(left, right)
            | Expression::And(left, right)
            | Expression::Comparison(left, _, right) => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expression::Call { args, .. } => args.iter().any(Expression::contains_aggregate),
        }
    }

    // First variable read outside of an aggregate that is not in `keys`
    fn ungrouped_variable(&self, keys: &[usize]) -> Option<usize> {
        match self {
            Expression::Variable(var) if !keys.contains(var) => Some(*var),
            Expression::Variable(_) | Expression::Constant(_) | Expression::Aggregate(_) => None,
            Expression::Not(inner) => inner.ungrouped_variable(keys),
            Expression::Or(left, right)
            | Expression::And(left, right)
            | Expression::Comparison(left, _, right) => left
                .ungrouped_variable(keys)
                .or_else(|| right.ungrouped_variable(keys)),
            Expression::Call { args, .. } => {
                args.iter().find_map(|arg| arg.ungrouped_variable(keys))
            }
        }
    }
}

/// One output column.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub name: String,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Slot names; query blank nodes are kept as `_:label`.
    pub variables: Vec<String>,
    pub pattern: GroupPattern,
    pub projection: Vec<Projection>,
    pub distinct: bool,
    pub group_by: Vec<usize>,
    pub aggregate: bool,
    pub limit: Option<usize>,
}

impl QueryPlan {
    pub fn slot_count(&self) -> usize {
        self.variables.len()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.projection.iter().map(|p| p.name.clone()).collect()
    }
}

struct Resolver<'a> {
    prefixes: FxHashMap<&'a str, &'a str>,
    variables: Vec<String>,
    slots: FxHashMap<String, usize>,
    // Named pattern variables in first-appearance order, for SELECT *
    pattern_variables: Vec<usize>,
}

impl<'a> Resolver<'a> {
    fn new(declared: &[(&'a str, &'a str)]) -> Self {
        let mut prefixes: FxHashMap<&'a str, &'a str> = BUILTIN_PREFIXES.into_iter().collect();
        for &(prefix, iri) in declared {
            prefixes.insert(prefix, iri);
        }
        Self {
            prefixes,
            variables: Vec::new(),
            slots: FxHashMap::default(),
            pattern_variables: Vec::new(),
        }
    }

    fn slot(&mut self, name: String) -> usize {
        if let Some(&slot) = self.slots.get(&name) {
            return slot;
        }
        let slot = self.variables.len();
        self.variables.push(name.clone());
        self.slots.insert(name, slot);
        slot
    }

    fn iri(&self, iri: &IriRef) -> Result<String, QueryError> {
        match iri {
            IriRef::Full(full) => Ok(full.to_string()),
            IriRef::Prefixed { prefix, local } => self
                .prefixes
                .get(prefix)
                .map(|namespace| format!("{}{}", namespace, local))
                .ok_or_else(|| QueryError::UnknownPrefix(prefix.to_string())),
        }
    }

    fn constant(&self, term: &SyntaxTerm) -> Result<Option<Term>, QueryError> {
        let constant = match term {
            SyntaxTerm::Variable(_) | SyntaxTerm::BlankNode(_) => return Ok(None),
            SyntaxTerm::Iri(iri) => Term::Iri(self.iri(iri)?),
            SyntaxTerm::Literal { lexical, annotation } => {
                let tag = match annotation {
                    LiteralAnnotation::Plain => LiteralTag::Plain,
                    LiteralAnnotation::Language(language) => {
                        LiteralTag::Language(language.to_string())
                    }
                    LiteralAnnotation::Datatype(datatype) => {
                        LiteralTag::Datatype(self.iri(datatype)?)
                    }
                };
                Term::Literal {
                    lexical: lexical.to_string(),
                    tag,
                }
            }
        };
        Ok(Some(constant))
    }

    fn pattern_term(&mut self, term: &SyntaxTerm) -> Result<PatternTerm, QueryError> {
        match term {
            SyntaxTerm::Variable(name) => {
                let slot = self.slot(name.to_string());
                if !self.pattern_variables.contains(&slot) {
                    self.pattern_variables.push(slot);
                }
                Ok(PatternTerm::Var(slot))
            }
            SyntaxTerm::BlankNode(label) => Ok(PatternTerm::Var(self.slot(format!("_:{}", label)))),
            other => match self.constant(other)? {
                Some(constant) => Ok(PatternTerm::Constant(constant)),
                None => Err(QueryError::Internal("unresolved pattern term".to_string())),
            },
        }
    }

    fn group(&mut self, group: &GroupSyntax) -> Result<GroupPattern, QueryError> {
        let mut elements = Vec::with_capacity(group.elements.len());
        for element in &group.elements {
            let resolved = match element {
                GroupElement::Triple((subject, predicate, object)) => {
                    PatternElement::Triple(TriplePattern {
                        subject: self.pattern_term(subject)?,
                        predicate: self.pattern_term(predicate)?,
                        object: self.pattern_term(object)?,
                    })
                }
                GroupElement::Optional(inner) => PatternElement::Optional(self.group(inner)?),
            };
            elements.push(resolved);
        }

        let mut filters = Vec::with_capacity(group.filters.len());
        for filter in &group.filters {
            let expression = self.expression(filter)?;
            if expression.contains_aggregate() {
                return Err(QueryError::AggregateInFilter);
            }
            filters.push(expression);
        }
        Ok(GroupPattern { elements, filters })
    }

    fn expression(&mut self, expression: &SyntaxExpression) -> Result<Expression, QueryError> {
        let resolved = match expression {
            SyntaxExpression::Or(left, right) => Expression::Or(
                Box::new(self.expression(left)?),
                Box::new(self.expression(right)?),
            ),
            SyntaxExpression::And(left, right) => Expression::And(
                Box::new(self.expression(left)?),
                Box::new(self.expression(right)?),
            ),
            SyntaxExpression::Not(inner) => Expression::Not(Box::new(self.expression(inner)?)),
            SyntaxExpression::Comparison(left, op, right) => Expression::Comparison(
                Box::new(self.expression(left)?),
                *op,
                Box::new(self.expression(right)?),
            ),
            SyntaxExpression::Term(SyntaxTerm::Variable(name)) => {
                Expression::Variable(self.slot(name.to_string()))
            }
            SyntaxExpression::Term(SyntaxTerm::BlankNode(label)) => {
                Expression::Variable(self.slot(format!("_:{}", label)))
            }
            SyntaxExpression::Term(term) => match self.constant(term)? {
                Some(constant) => Expression::Constant(constant),
                None => return Err(QueryError::Internal("unresolved expression term".to_string())),
            },
            SyntaxExpression::Call { function, args } => {
                let (min, max) = function.arity();
                if args.len() < min || args.len() > max {
                    return Err(QueryError::Arity {
                        function: format!("{:?}", function).to_uppercase(),
                        found: args.len(),
                    });
                }
                let args = args
                    .iter()
                    .map(|arg| self.expression(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                Expression::Call {
                    function: *function,
                    args,
                }
            }
            SyntaxExpression::Aggregate(aggregate) => {
                let argument = match &aggregate.argument {
                    Some(argument) => {
                        let argument = self.expression(argument)?;
                        if argument.contains_aggregate() {
                            return Err(QueryError::Syntax(
                                "aggregates cannot be nested".to_string(),
                            ));
                        }
                        Some(Box::new(argument))
                    }
                    None => None,
                };
                Expression::Aggregate(Aggregate {
                    function: aggregate.function,
                    distinct: aggregate.distinct,
                    argument,
                    separator: aggregate
                        .separator
                        .as_deref()
                        .unwrap_or(" ")
                        .to_string(),
                })
            }
        };
        Ok(resolved)
    }
}

/// Builds the evaluation plan for a parsed query.
pub fn build_query_plan(query: &SelectQuery) -> Result<QueryPlan, QueryError> {
    let mut resolver = Resolver::new(&query.prefixes);
    let pattern = resolver.group(&query.pattern)?;

    let projection = match &query.selection {
        Selection::All => resolver
            .pattern_variables
            .iter()
            .map(|&slot| Projection {
                name: resolver.variables[slot].clone(),
                expression: Expression::Variable(slot),
            })
            .collect(),
        Selection::Items(items) => {
            let mut projection: Vec<Projection> = Vec::with_capacity(items.len());
            for item in items {
                let (name, expression) = match item {
                    SelectItem::Variable(name) => {
                        (name.to_string(), Expression::Variable(resolver.slot(name.to_string())))
                    }
                    SelectItem::Expression { expression, alias } => {
                        (alias.to_string(), resolver.expression(expression)?)
                    }
                };
                if projection.iter().any(|p| p.name == name) {
                    return Err(QueryError::DuplicateProjection(name));
                }
                projection.push(Projection { name, expression });
            }
            projection
        }
    };

    let group_by: Vec<usize> = query
        .group_by
        .iter()
        .map(|name| resolver.slot(name.to_string()))
        .collect();
    let aggregate =
        !group_by.is_empty() || projection.iter().any(|p| p.expression.contains_aggregate());

    if aggregate {
        for column in &projection {
            if let Some(var) = column.expression.ungrouped_variable(&group_by) {
                return Err(QueryError::UngroupedVariable(resolver.variables[var].clone()));
            }
        }
    }

    debug!(
        "Plan: {} variable slot(s), {} output column(s), aggregate={}",
        resolver.variables.len(),
        projection.len(),
        aggregate
    );

    Ok(QueryPlan {
        variables: resolver.variables,
        pattern,
        projection,
        distinct: query.distinct,
        group_by,
        aggregate,
        limit: query.limit,
    })
}
