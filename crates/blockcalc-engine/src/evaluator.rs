//! Chain evaluation
//!
//! Reduces a token chain strictly left to right: each operator is applied
//! to the running accumulator and the next operand as soon as it is met.
//! There is no precedence and no general expression parsing. Every failure
//! collapses to the `NA` sentinel so a Result block always has something
//! deterministic to show.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{constants, EngineConfig};
use crate::types::OperatorSymbol;

/// Outcome of evaluating a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "camelCase")]
pub enum Outcome {
    /// Formatted numeric result
    Value(String),
    /// The `NA` sentinel
    NotAvailable,
}

impl Outcome {
    /// The string written into a Result block
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Value(value) => value,
            Outcome::NotAvailable => constants::NA,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a chain could not be reduced
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationFailure {
    #[error("chain is empty")]
    Empty,

    #[error("chain contains the NA sentinel")]
    Poisoned,

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("'{0}' is not a supported operator")]
    UnknownOperator(String),

    #[error("operator '{0}' has no right-hand operand")]
    MissingOperand(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not finite")]
    NonFinite,
}

/// Left-to-right chain reducer with configurable output precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluator {
    precision: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(constants::defaults::DECIMAL_PRECISION)
    }
}

impl Evaluator {
    pub fn new(precision: usize) -> Self {
        Self {
            precision: precision.min(constants::defaults::MAX_DECIMAL_PRECISION),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.decimal_precision)
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Evaluate a chain into a formatted value or `NA`
    pub fn evaluate<S: AsRef<str>>(&self, tokens: &[S]) -> Outcome {
        match reduce(tokens) {
            Ok(value) => Outcome::Value(format_number(value, self.precision)),
            Err(failure) => {
                log::debug!("Chain evaluates to NA: {}", failure);
                Outcome::NotAvailable
            }
        }
    }
}

/// Evaluate a chain with the default precision
pub fn evaluate<S: AsRef<str>>(tokens: &[S]) -> Outcome {
    Evaluator::default().evaluate(tokens)
}

/// Reduce a chain to a number
///
/// Tokens are consumed as `operand (operator operand)*`.
pub fn reduce<S: AsRef<str>>(tokens: &[S]) -> Result<f64, EvaluationFailure> {
    let (first, rest) = tokens.split_first().ok_or(EvaluationFailure::Empty)?;

    if tokens.iter().any(|t| t.as_ref() == constants::NA) {
        return Err(EvaluationFailure::Poisoned);
    }

    let mut acc = parse_operand(first.as_ref())?;

    for step in rest.chunks(2) {
        let op_token = step[0].as_ref();
        let operator: OperatorSymbol = op_token
            .parse()
            .map_err(|_| EvaluationFailure::UnknownOperator(op_token.to_string()))?;
        let rhs = step
            .get(1)
            .ok_or_else(|| EvaluationFailure::MissingOperand(op_token.to_string()))?;
        let rhs = parse_operand(rhs.as_ref())?;

        acc = operator
            .apply(acc, rhs)
            .ok_or(EvaluationFailure::DivisionByZero)?;
        if !acc.is_finite() {
            return Err(EvaluationFailure::NonFinite);
        }
    }

    Ok(acc)
}

fn parse_operand(token: &str) -> Result<f64, EvaluationFailure> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| EvaluationFailure::NotANumber(token.to_string()))
}

/// Format a number for display
///
/// Integral values have no decimal point; others are rendered with
/// `precision` digits and trailing zeros trimmed.
pub fn format_number(value: f64, precision: usize) -> String {
    let formatted = if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        let fixed = format!("{:.*}", precision, value);
        if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            fixed
        }
    };

    if formatted == "-0" {
        "0".to_string()
    } else {
        formatted
    }
}
