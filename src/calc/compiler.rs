//! Compilation of normalized formulas into arithmetic.

use crate::calc::CalcExpression;
use crate::formula::{Formula, NormalizedFormula, Variable};

/// Compile a normalized formula and fold constants.
///
/// Disjointness is not re-checked: the disjuncts of every `Disjoint` part
/// share no variable, so treating them as independent events is exact.
pub fn compile(normalized: &NormalizedFormula) -> CalcExpression {
    fold(translate(normalized))
}

fn translate(normalized: &NormalizedFormula) -> CalcExpression {
    match normalized {
        NormalizedFormula::Disjoint { disjuncts, .. } => {
            translate_formula(&disjuncts.to_formula())
        }
        NormalizedFormula::Split {
            pivot,
            when_true,
            when_false,
        } => CalcExpression::Add(vec![
            CalcExpression::Mul(vec![variable(pivot), translate(when_true)]),
            CalcExpression::Mul(vec![
                CalcExpression::complement(variable(pivot)),
                translate(when_false),
            ]),
        ]),
    }
}

fn translate_formula(formula: &Formula) -> CalcExpression {
    match formula {
        Formula::Empty | Formula::True => CalcExpression::Constant(1.0),
        Formula::False => CalcExpression::Constant(0.0),
        Formula::Var(var) => variable(var),
        Formula::Not(inner) => CalcExpression::complement(translate_formula(inner)),
        Formula::And(children) => {
            CalcExpression::Mul(children.iter().map(translate_formula).collect())
        }
        Formula::Or(children) => disjunction(children.iter().map(translate_formula).collect()),
    }
}

/// `x + y - x * y` for two operands; wider disjunctions use the equivalent
/// `1 - (1 - x1) * (1 - x2) * …`, which does not double in size per operand.
fn disjunction(mut operands: Vec<CalcExpression>) -> CalcExpression {
    match operands.len() {
        0 => CalcExpression::Constant(0.0),
        1 => operands.remove(0),
        2 => {
            let product = CalcExpression::Mul(operands.clone());
            CalcExpression::Sub(Box::new(CalcExpression::Add(operands)), Box::new(product))
        }
        _ => CalcExpression::complement(CalcExpression::Mul(
            operands.into_iter().map(CalcExpression::complement).collect(),
        )),
    }
}

fn variable(variable: &Variable) -> CalcExpression {
    match variable {
        Variable::Literal(literal) => CalcExpression::Literal(literal.clone()),
        Variable::Weight(weight) => CalcExpression::Weight(*weight),
    }
}

/// Fold constants, flatten nested sums and products and drop neutral
/// elements, annihilators and double complements.
pub fn fold(expression: CalcExpression) -> CalcExpression {
    match expression {
        CalcExpression::Add(children) => {
            let mut constant = 0.0;
            let mut terms = Vec::with_capacity(children.len());
            for child in flatten(children, |e| match e {
                CalcExpression::Add(inner) => Ok(inner),
                other => Err(other),
            }) {
                match child {
                    CalcExpression::Constant(value) => constant += value,
                    other => terms.push(other),
                }
            }
            if constant != 0.0 {
                terms.insert(0, CalcExpression::Constant(constant));
            }
            match terms.len() {
                0 => CalcExpression::Constant(0.0),
                1 => terms.remove(0),
                _ => CalcExpression::Add(terms),
            }
        }
        CalcExpression::Mul(children) => {
            let mut constant = 1.0;
            let mut factors = Vec::with_capacity(children.len());
            for child in flatten(children, |e| match e {
                CalcExpression::Mul(inner) => Ok(inner),
                other => Err(other),
            }) {
                match child {
                    CalcExpression::Constant(value) => constant *= value,
                    other => factors.push(other),
                }
            }
            if constant == 0.0 {
                return CalcExpression::Constant(0.0);
            }
            if constant != 1.0 {
                factors.insert(0, CalcExpression::Constant(constant));
            }
            match factors.len() {
                0 => CalcExpression::Constant(1.0),
                1 => factors.remove(0),
                _ => CalcExpression::Mul(factors),
            }
        }
        CalcExpression::Sub(left, right) => match (fold(*left), fold(*right)) {
            (CalcExpression::Constant(a), CalcExpression::Constant(b)) => {
                CalcExpression::Constant(a - b)
            }
            (left, CalcExpression::Constant(b)) if b == 0.0 => left,
            // 1 - (1 - x) == x
            (CalcExpression::Constant(a), CalcExpression::Sub(inner_left, inner_right))
                if a == 1.0 && inner_left.as_constant() == Some(1.0) =>
            {
                *inner_right
            }
            (left, right) => CalcExpression::Sub(Box::new(left), Box::new(right)),
        },
        leaf => leaf,
    }
}

/// Fold every child and splice in the children of same-kind nodes.
fn flatten<S>(children: Vec<CalcExpression>, splice: S) -> Vec<CalcExpression>
where
    S: Fn(CalcExpression) -> Result<Vec<CalcExpression>, CalcExpression>,
{
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match splice(fold(child)) {
            Ok(inner) => flat.extend(inner),
            Err(single) => flat.push(single),
        }
    }
    flat
}
