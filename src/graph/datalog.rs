//! Parser for the Datalog query subset emitted by the tree query builder.
//!
//! # Example
//!
//! ```
//! use pagetree::graph::datalog::{parse, FindElem};
//!
//! let query = parse("[:find (pull ?p [*]) :where [?p :block/name \"apple\"]]").unwrap();
//! assert!(matches!(query.find[0], FindElem::Pull { .. }));
//! assert_eq!(query.clauses.len(), 1);
//! ```

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::AppError;

#[derive(Parser)]
#[grammar = "graph/datalog.pest"]
struct DatalogParser;

/// A parsed query: what to return and the clauses that must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct DatalogQuery {
    pub find: Vec<FindElem>,
    pub clauses: Vec<Clause>,
}

/// One element of the `:find` spec.
#[derive(Debug, Clone, PartialEq)]
pub enum FindElem {
    /// A bound variable, returned as-is.
    Var(String),
    /// `(pull ?e [...])`, returned as the entity's attribute map.
    Pull { var: String, pattern: PullPattern },
}

/// Attribute selection for a pull expression.
#[derive(Debug, Clone, PartialEq)]
pub enum PullPattern {
    /// `[*]`
    Wildcard,
    /// Explicit attribute keywords, e.g. `[:block/name :block/original-name]`.
    Attrs(Vec<String>),
}

/// A `:where` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `[e a v]`; the value slot is optional.
    Data { e: Term, a: Term, v: Option<Term> },
    /// `[(f args...) ?out]`; predicates have no output variable.
    Fn {
        name: String,
        args: Vec<Term>,
        binding: Option<String>,
    },
    /// `(not clauses...)`
    Not(Vec<Clause>),
}

/// A term inside a clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Var(String),
    /// Keyword including its leading colon, e.g. `:block/name`.
    Keyword(String),
    Str(String),
    Int(i64),
    Blank,
}

impl Term {
    /// Returns the variable name if this term is a variable.
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Term::Var(name) => Some(name),
            _ => None,
        }
    }
}

/// Parses a Datalog query string.
pub fn parse(datalog: &str) -> Result<DatalogQuery, AppError> {
    let mut pairs = DatalogParser::parse(Rule::Query, datalog)
        .map_err(|e| AppError::Parse(format!("{}", e)))?;
    let query = pairs
        .next()
        .ok_or_else(|| AppError::Parse("empty query".to_string()))?;

    let mut find = Vec::new();
    let mut clauses = Vec::new();

    for pair in query.into_inner() {
        match pair.as_rule() {
            Rule::FindSpec => {
                for elem in pair.into_inner() {
                    find.push(parse_find_elem(elem)?);
                }
            }
            Rule::WhereSpec => {
                for clause in pair.into_inner() {
                    clauses.push(parse_clause(clause)?);
                }
            }
            _ => {}
        }
    }

    if find.is_empty() {
        return Err(AppError::Parse("query has no :find elements".to_string()));
    }

    Ok(DatalogQuery { find, clauses })
}

fn parse_find_elem(pair: Pair<Rule>) -> Result<FindElem, AppError> {
    match pair.as_rule() {
        Rule::Variable => Ok(FindElem::Var(pair.as_str().to_string())),
        Rule::PullExpr => {
            let mut inner = pair.into_inner();
            let var = inner
                .next()
                .map(|p| p.as_str().to_string())
                .ok_or_else(|| AppError::Parse("pull without variable".to_string()))?;
            let pattern = inner
                .next()
                .map(parse_pull_pattern)
                .ok_or_else(|| AppError::Parse("pull without pattern".to_string()))?;
            Ok(FindElem::Pull { var, pattern })
        }
        rule => Err(unexpected(rule)),
    }
}

fn parse_pull_pattern(pair: Pair<Rule>) -> PullPattern {
    let mut attrs = Vec::new();
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::Wildcard => return PullPattern::Wildcard,
            _ => attrs.push(item.as_str().to_string()),
        }
    }
    PullPattern::Attrs(attrs)
}

fn parse_clause(pair: Pair<Rule>) -> Result<Clause, AppError> {
    match pair.as_rule() {
        Rule::DataPattern => {
            let mut terms = pair
                .into_inner()
                .map(parse_term)
                .collect::<Result<Vec<_>, _>>()?
                .into_iter();
            let e = terms.next().unwrap_or(Term::Blank);
            let a = terms.next().unwrap_or(Term::Blank);
            let v = terms.next();
            Ok(Clause::Data { e, a, v })
        }
        Rule::FnClause => {
            let mut inner = pair.into_inner();
            let call = inner
                .next()
                .ok_or_else(|| AppError::Parse("empty function clause".to_string()))?;
            let binding = inner.next().map(|p| p.as_str().to_string());

            let mut call_inner = call.into_inner();
            let name = call_inner
                .next()
                .map(|p| p.as_str().to_string())
                .ok_or_else(|| AppError::Parse("function call without name".to_string()))?;
            let args = call_inner.map(parse_term).collect::<Result<Vec<_>, _>>()?;

            Ok(Clause::Fn {
                name,
                args,
                binding,
            })
        }
        Rule::NotClause => {
            let nested = pair
                .into_inner()
                .map(parse_clause)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Clause::Not(nested))
        }
        rule => Err(unexpected(rule)),
    }
}

fn parse_term(pair: Pair<Rule>) -> Result<Term, AppError> {
    match pair.as_rule() {
        Rule::Variable => Ok(Term::Var(pair.as_str().to_string())),
        Rule::Keyword => Ok(Term::Keyword(pair.as_str().to_string())),
        Rule::StringLit => {
            let raw = pair
                .into_inner()
                .next()
                .map(|p| p.as_str())
                .unwrap_or_default();
            Ok(Term::Str(unescape(raw)))
        }
        Rule::Number => pair
            .as_str()
            .parse()
            .map(Term::Int)
            .map_err(|e| AppError::Parse(format!("invalid number '{}': {}", pair.as_str(), e))),
        Rule::Blank => Ok(Term::Blank),
        rule => Err(unexpected(rule)),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn unexpected(rule: Rule) -> AppError {
    AppError::Parse(format!("unexpected {:?}", rule))
}
