/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Syntax tree of a SELECT query, borrowing from the query text.
//! Prefixed names are still unresolved at this stage.

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
pub enum IriRef<'a> {
    Full(&'a str),
    Prefixed { prefix: &'a str, local: &'a str },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralAnnotation<'a> {
    Plain,
    Language(&'a str),
    Datatype(IriRef<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxTerm<'a> {
    /// Variable name without the leading `?` or `$`.
    Variable(&'a str),
    /// `_:label` inside a pattern; behaves like a variable that cannot be projected.
    BlankNode(&'a str),
    Iri(IriRef<'a>),
    Literal {
        lexical: Cow<'a, str>,
        annotation: LiteralAnnotation<'a>,
    },
}

pub type SyntaxTriple<'a> = (SyntaxTerm<'a>, SyntaxTerm<'a>, SyntaxTerm<'a>);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupSyntax<'a> {
    pub elements: Vec<GroupElement<'a>>,
    pub filters: Vec<SyntaxExpression<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupElement<'a> {
    Triple(SyntaxTriple<'a>),
    Optional(GroupSyntax<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Str,
    LCase,
    Contains,
    Replace,
    Coalesce,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name.to_ascii_uppercase().as_str() {
            "STR" => Function::Str,
            "LCASE" => Function::LCase,
            "CONTAINS" => Function::Contains,
            "REPLACE" => Function::Replace,
            "COALESCE" => Function::Coalesce,
            _ => return None,
        };
        Some(function)
    }

    /// Accepted argument counts, inclusive.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Function::Str | Function::LCase => (1, 1),
            Function::Contains => (2, 2),
            Function::Replace => (3, 3),
            Function::Coalesce => (1, usize::MAX),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sample,
    GroupConcat,
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name.to_ascii_uppercase().as_str() {
            "COUNT" => AggregateFunction::Count,
            "SAMPLE" => AggregateFunction::Sample,
            "GROUP_CONCAT" => AggregateFunction::GroupConcat,
            _ => return None,
        };
        Some(function)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSyntax<'a> {
    pub function: AggregateFunction,
    pub distinct: bool,
    /// `None` stands for `*`, only valid with COUNT.
    pub argument: Option<Box<SyntaxExpression<'a>>>,
    pub separator: Option<Cow<'a, str>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxExpression<'a> {
    Or(Box<SyntaxExpression<'a>>, Box<SyntaxExpression<'a>>),
    And(Box<SyntaxExpression<'a>>, Box<SyntaxExpression<'a>>),
    Not(Box<SyntaxExpression<'a>>),
    Comparison(Box<SyntaxExpression<'a>>, ComparisonOp, Box<SyntaxExpression<'a>>),
    Term(SyntaxTerm<'a>),
    Call {
        function: Function,
        args: Vec<SyntaxExpression<'a>>,
    },
    Aggregate(AggregateSyntax<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem<'a> {
    Variable(&'a str),
    Expression {
        expression: SyntaxExpression<'a>,
        alias: &'a str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'a> {
    All,
    Items(Vec<SelectItem<'a>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery<'a> {
    pub prefixes: Vec<(&'a str, &'a str)>,
    pub distinct: bool,
    pub selection: Selection<'a>,
    pub pattern: GroupSyntax<'a>,
    pub group_by: Vec<&'a str>,
    pub limit: Option<usize>,
}
