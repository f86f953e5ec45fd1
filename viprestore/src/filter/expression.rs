// File: viprestore/src/filter/expression.rs
//! Flat boolean text expressions.
//!
//! Grammar: `term (OP term)*` where `OP` is `AND` or `OR` as a standalone,
//! case-insensitive whitespace token. Adjacent non-keyword tokens form one
//! phrase term (`CAM 1` is a single term). There is no operator precedence:
//! the chain folds strictly left to right, so `A OR B AND C` is
//! `(A OR B) AND C`.
//!
//! A term matches when it is a case-insensitive substring of any of the
//! candidate fields (endpoint label and endpoint id).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("AND") {
            Some(Operator::And)
        } else if token.eq_ignore_ascii_case("OR") {
            Some(Operator::Or)
        } else {
            None
        }
    }
}

/// Why an expression could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    LeadingOperator,
    TrailingOperator,
    AdjacentOperators { position: usize },
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionError::LeadingOperator => write!(f, "expression starts with an operator"),
            ExpressionError::TrailingOperator => write!(f, "expression ends with an operator"),
            ExpressionError::AdjacentOperators { position } => {
                write!(f, "two operators in a row at token {}", position)
            }
        }
    }
}

impl std::error::Error for ExpressionError {}

/// Parsed expression. Terms are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextExpression {
    first: String,
    rest: Vec<(Operator, String)>,
}

impl TextExpression {
    /// Parse `input`. Blank input yields `Ok(None)`: the dimension is unfiltered.
    pub fn parse(input: &str) -> Result<Option<Self>, ExpressionError> {
        let mut terms: Vec<String> = Vec::new();
        let mut operators: Vec<Operator> = Vec::new();
        let mut phrase: Vec<&str> = Vec::new();
        let mut last_was_operator = false;

        for (position, token) in input.split_whitespace().enumerate() {
            match Operator::from_token(token) {
                Some(op) => {
                    if phrase.is_empty() {
                        return Err(if terms.is_empty() {
                            ExpressionError::LeadingOperator
                        } else {
                            ExpressionError::AdjacentOperators { position }
                        });
                    }
                    terms.push(phrase.join(" ").to_lowercase());
                    phrase.clear();
                    operators.push(op);
                    last_was_operator = true;
                }
                None => {
                    phrase.push(token);
                    last_was_operator = false;
                }
            }
        }

        if last_was_operator {
            return Err(ExpressionError::TrailingOperator);
        }
        if !phrase.is_empty() {
            terms.push(phrase.join(" ").to_lowercase());
        }

        let mut terms = terms.into_iter();
        let Some(first) = terms.next() else {
            return Ok(None);
        };

        Ok(Some(Self {
            first,
            rest: operators.into_iter().zip(terms).collect(),
        }))
    }

    /// Evaluate against candidate fields, folding left to right.
    pub fn matches(&self, fields: &[&str]) -> bool {
        let lowered: Vec<String> = fields.iter().map(|f| f.to_lowercase()).collect();
        let term_matches = |term: &str| lowered.iter().any(|field| field.contains(term));

        self.rest
            .iter()
            .fold(term_matches(&self.first), |acc, (op, term)| match op {
                Operator::And => acc && term_matches(term),
                Operator::Or => acc || term_matches(term),
            })
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.first.as_str()).chain(self.rest.iter().map(|(_, t)| t.as_str()))
    }
}
