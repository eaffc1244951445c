//! Boolean formulas over literals and weight literals.
//!
//! A commuting quantum query is carried through the pipeline as a
//! [`Formula`] tree: the transcriber produces it, the normalizer turns it into
//! a [`NormalizedFormula`](normalize::NormalizedFormula), and the calc
//! compiler maps that onto arithmetic. The textual grammar printed by
//! `Display` and read by [`parser::parse_formula`] is fully parenthesized:
//!
//! ```text
//! (match$$fox) || ((match$$eagle) && (match$$crocodile))
//! ```

pub mod dnf;
pub mod literal;
pub mod normalize;
pub mod parser;
pub mod transcribe;

use std::fmt;

use crate::error::{CqqlError, Result};

pub use self::dnf::{Conjunction, Dnf, Term};
pub use self::literal::{Literal, LiteralRegistry, Variable, WeightLiteral};
pub use self::normalize::{NormalizedFormula, Normalizer, normalize};
pub use self::parser::parse_formula;
pub use self::transcribe::{Transcription, transcribe};

/// Largest variable count for which truth tables are enumerated.
pub const MAX_TRUTH_TABLE_VARIABLES: usize = 20;

/// A boolean expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// The empty formula; treated as universal truth.
    Empty,
    /// Constant truth.
    True,
    /// Constant falsehood.
    False,
    /// A literal or weight literal.
    Var(Variable),
    /// Negation.
    Not(Box<Formula>),
    /// Conjunction of all children.
    And(Vec<Formula>),
    /// Disjunction of all children.
    Or(Vec<Formula>),
}

impl Formula {
    /// Create a variable node.
    pub fn var<V: Into<Variable>>(variable: V) -> Self {
        Formula::Var(variable.into())
    }

    /// Negate a formula.
    #[allow(clippy::should_implement_trait)]
    pub fn not(formula: Formula) -> Self {
        Formula::Not(Box::new(formula))
    }

    /// Conjoin formulas; no children is `True`, one child is returned as is.
    pub fn and(mut children: Vec<Formula>) -> Self {
        match children.len() {
            0 => Formula::True,
            1 => children.remove(0),
            _ => Formula::And(children),
        }
    }

    /// Disjoin formulas; no children is `False`, one child is returned as is.
    pub fn or(mut children: Vec<Formula>) -> Self {
        match children.len() {
            0 => Formula::False,
            1 => children.remove(0),
            _ => Formula::Or(children),
        }
    }

    /// Check if this is the empty formula.
    pub fn is_empty(&self) -> bool {
        matches!(self, Formula::Empty)
    }

    /// Collect the distinct variables in first-seen order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut variables = Vec::new();
        self.collect_variables(&mut variables);
        variables
    }

    fn collect_variables(&self, out: &mut Vec<Variable>) {
        match self {
            Formula::Empty | Formula::True | Formula::False => {}
            Formula::Var(variable) => {
                if !out.contains(variable) {
                    out.push(variable.clone());
                }
            }
            Formula::Not(inner) => inner.collect_variables(out),
            Formula::And(children) | Formula::Or(children) => {
                for child in children {
                    child.collect_variables(out);
                }
            }
        }
    }

    /// Evaluate under a truth assignment.
    pub fn evaluate<F>(&self, assignment: &F) -> bool
    where
        F: Fn(&Variable) -> bool + ?Sized,
    {
        match self {
            Formula::Empty | Formula::True => true,
            Formula::False => false,
            Formula::Var(variable) => assignment(variable),
            Formula::Not(inner) => !inner.evaluate(assignment),
            Formula::And(children) => children.iter().all(|child| child.evaluate(assignment)),
            Formula::Or(children) => children.iter().any(|child| child.evaluate(assignment)),
        }
    }

    /// Check truth-table equivalence with another formula.
    ///
    /// Fails with `ResourceExhausted` beyond [`MAX_TRUTH_TABLE_VARIABLES`] variables.
    pub fn is_equivalent(&self, other: &Formula) -> Result<bool> {
        let mut variables = self.variables();
        for variable in other.variables() {
            if !variables.contains(&variable) {
                variables.push(variable);
            }
        }
        let mut differs = false;
        for_each_assignment(&variables, |assignment| {
            if self.evaluate(assignment) != other.evaluate(assignment) {
                differs = true;
            }
            !differs
        })?;
        Ok(!differs)
    }
}

/// Enumerate every truth assignment over `variables`, stopping early when
/// `visit` returns false.
pub fn for_each_assignment<F>(variables: &[Variable], mut visit: F) -> Result<()>
where
    F: FnMut(&dyn Fn(&Variable) -> bool) -> bool,
{
    if variables.len() > MAX_TRUTH_TABLE_VARIABLES {
        return Err(CqqlError::exhausted(format!(
            "truth table over {} variables exceeds the limit of {}",
            variables.len(),
            MAX_TRUTH_TABLE_VARIABLES
        )));
    }
    for bits in 0u32..(1u32 << variables.len()) {
        let assignment = |variable: &Variable| {
            variables
                .iter()
                .position(|candidate| candidate == variable)
                .is_some_and(|index| bits & (1 << index) != 0)
        };
        if !visit(&assignment) {
            break;
        }
    }
    Ok(())
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Empty => Ok(()),
            Formula::True => f.write_str("True"),
            Formula::False => f.write_str("False"),
            Formula::Var(variable) => variable.fmt(f),
            Formula::Not(inner) => write!(f, "!({inner})"),
            Formula::And(children) => write_joined(f, children, " && ", "True"),
            Formula::Or(children) => write_joined(f, children, " || ", "False"),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    children: &[Formula],
    separator: &str,
    neutral: &str,
) -> fmt::Result {
    if children.is_empty() {
        return f.write_str(neutral);
    }
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "({child})")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(name: &str) -> Formula {
        Formula::var(Literal::from_name(name))
    }

    #[test]
    fn test_display_is_fully_parenthesized() {
        let formula = Formula::Or(vec![
            lit("fox"),
            Formula::And(vec![lit("eagle"), lit("crocodile")]),
        ]);
        assert_eq!(formula.to_string(), "(fox) || ((eagle) && (crocodile))");

        let formula = Formula::And(vec![
            lit("fox"),
            Formula::not(lit("eagle")),
            Formula::var(WeightLiteral::new(0.4).unwrap()),
        ]);
        assert_eq!(formula.to_string(), "(fox) && (!(eagle)) && (w$$0$4)");

        assert_eq!(Formula::Empty.to_string(), "");
    }

    #[test]
    fn test_smart_constructors() {
        assert_eq!(Formula::and(vec![]), Formula::True);
        assert_eq!(Formula::or(vec![]), Formula::False);
        assert_eq!(Formula::and(vec![lit("fox")]), lit("fox"));
    }

    #[test]
    fn test_variables_in_first_seen_order() {
        let formula = Formula::Or(vec![
            Formula::And(vec![lit("b"), lit("a")]),
            Formula::not(lit("b")),
            lit("c"),
        ]);
        let names: Vec<String> = formula.variables().iter().map(|v| v.to_string()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_equivalence() {
        // De Morgan
        let left = Formula::not(Formula::And(vec![lit("a"), lit("b")]));
        let right = Formula::Or(vec![Formula::not(lit("a")), Formula::not(lit("b"))]);
        assert!(left.is_equivalent(&right).unwrap());

        let wrong = Formula::Or(vec![lit("a"), Formula::not(lit("b"))]);
        assert!(!left.is_equivalent(&wrong).unwrap());

        assert!(Formula::Empty.is_equivalent(&Formula::True).unwrap());
    }
}
