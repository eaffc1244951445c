//! Arithmetic expressions compiled from normalized formulas.
//!
//! Literals stand for relevance probabilities in `[0, 1]`, weight literals
//! for their encoded boost. Evaluating a [`CalcExpression`] combines them with
//! the probability rules the compiler applied:
//!
//! | formula        | expression                 |
//! |----------------|----------------------------|
//! | `x \|\| y`     | `x + y - x * y`            |
//! | `x && y`       | `x * y`                    |
//! | `!x`           | `1 - x`                    |
//! | split on `o`   | `o * pos + (1 - o) * neg`  |

pub mod compiler;

use std::fmt;

use crate::error::Result;
use crate::formula::{Literal, WeightLiteral};

pub use self::compiler::compile;

/// An arithmetic expression over literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcExpression {
    /// A numeric constant.
    Constant(f32),
    /// The resolved score of a literal.
    Literal(Literal),
    /// The encoded boost of a weight literal.
    Weight(WeightLiteral),
    /// Sum of all children.
    Add(Vec<CalcExpression>),
    /// Difference of two expressions.
    Sub(Box<CalcExpression>, Box<CalcExpression>),
    /// Product of all children.
    Mul(Vec<CalcExpression>),
}

impl CalcExpression {
    /// `1 - expression`.
    pub fn complement(expression: CalcExpression) -> Self {
        CalcExpression::Sub(Box::new(CalcExpression::Constant(1.0)), Box::new(expression))
    }

    /// Get the constant value, if this is a constant.
    pub fn as_constant(&self) -> Option<f32> {
        match self {
            CalcExpression::Constant(value) => Some(*value),
            _ => None,
        }
    }

    /// Collect the distinct literals in first-seen order.
    pub fn literals(&self) -> Vec<&Literal> {
        let mut literals = Vec::new();
        self.collect_literals(&mut literals);
        literals
    }

    fn collect_literals<'a>(&'a self, out: &mut Vec<&'a Literal>) {
        match self {
            CalcExpression::Literal(literal) => {
                if !out.contains(&literal) {
                    out.push(literal);
                }
            }
            CalcExpression::Constant(_) | CalcExpression::Weight(_) => {}
            CalcExpression::Add(children) | CalcExpression::Mul(children) => {
                for child in children {
                    child.collect_literals(out);
                }
            }
            CalcExpression::Sub(left, right) => {
                left.collect_literals(out);
                right.collect_literals(out);
            }
        }
    }

    /// Evaluate bottom-up, resolving literals through `resolve`.
    pub fn evaluate<F>(&self, resolve: &F) -> Result<f32>
    where
        F: Fn(&Literal) -> Result<f32> + ?Sized,
    {
        match self {
            CalcExpression::Constant(value) => Ok(*value),
            CalcExpression::Literal(literal) => resolve(literal),
            CalcExpression::Weight(weight) => Ok(weight.weight()),
            CalcExpression::Add(children) => children
                .iter()
                .try_fold(0.0, |sum, child| -> Result<f32> {
                    Ok(sum + child.evaluate(resolve)?)
                }),
            CalcExpression::Sub(left, right) => {
                Ok(left.evaluate(resolve)? - right.evaluate(resolve)?)
            }
            CalcExpression::Mul(children) => children
                .iter()
                .try_fold(1.0, |product, child| -> Result<f32> {
                    Ok(product * child.evaluate(resolve)?)
                }),
        }
    }

    fn is_sum(&self) -> bool {
        matches!(self, CalcExpression::Add(_) | CalcExpression::Sub(..))
    }
}

impl fmt::Display for CalcExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcExpression::Constant(value) => write!(f, "{value}"),
            CalcExpression::Literal(literal) => literal.fmt(f),
            CalcExpression::Weight(weight) => weight.fmt(f),
            CalcExpression::Add(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    child.fmt(f)?;
                }
                Ok(())
            }
            CalcExpression::Sub(left, right) => {
                if right.is_sum() {
                    write!(f, "{left} - ({right})")
                } else {
                    write!(f, "{left} - {right}")
                }
            }
            CalcExpression::Mul(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" * ")?;
                    }
                    if child.is_sum() {
                        write!(f, "({child})")?;
                    } else {
                        child.fmt(f)?;
                    }
                }
                Ok(())
            }
        }
    }
}
