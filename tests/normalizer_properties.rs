//! Randomized property tests for normalization and calculation compiling.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cqql::calc::compile;
use cqql::error::Result;
use cqql::formula::{
    Formula, Literal, Variable, WeightLiteral, for_each_assignment, normalize, transcribe,
};
use cqql::query::{AtomicQuery, CommutingQuantumQueryBuilder, OccurrenceNode};

const CASES: usize = 200;
const NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];

fn random_formula(rng: &mut StdRng, depth: usize) -> Formula {
    if depth == 0 || rng.random_bool(0.3) {
        return match rng.random_range(0..12) {
            0 => Formula::True,
            1 => Formula::False,
            2 => Formula::var(WeightLiteral::new(0.5).unwrap()),
            _ => Formula::var(Literal::from_name(NAMES[rng.random_range(0..NAMES.len())])),
        };
    }
    let width = rng.random_range(2..4);
    let children = (0..width)
        .map(|_| random_formula(rng, depth - 1))
        .collect();
    match rng.random_range(0..5) {
        0 => Formula::not(random_formula(rng, depth - 1)),
        1 | 2 => Formula::and(children),
        _ => Formula::or(children),
    }
}

fn probability_of(variable: &Variable) -> f32 {
    match variable {
        Variable::Weight(weight) => weight.weight(),
        Variable::Literal(literal) => match literal.name() {
            "a" => 0.9,
            "b" => 0.35,
            "c" => 0.6,
            "d" => 0.15,
            _ => 0.5,
        },
    }
}

/// The probability that `formula` holds when variables are independent.
fn probability(formula: &Formula) -> Result<f32> {
    let variables = formula.variables();
    let mut total = 0.0f32;
    for_each_assignment(&variables, |assignment| {
        if formula.evaluate(assignment) {
            total += variables
                .iter()
                .map(|variable| {
                    let p = probability_of(variable);
                    if assignment(variable) { p } else { 1.0 - p }
                })
                .product::<f32>();
        }
        true
    })?;
    Ok(total)
}

fn resolve(literal: &Literal) -> Result<f32> {
    Ok(probability_of(&Variable::Literal(literal.clone())))
}

#[test]
fn test_normalization_preserves_meaning() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..CASES {
        let formula = random_formula(&mut rng, 3);
        let normalized = normalize(&formula)?;
        assert!(
            normalized.to_formula().is_equivalent(&formula)?,
            "{formula} normalized to the inequivalent {normalized}"
        );
    }
    Ok(())
}

#[test]
fn test_normalized_disjuncts_are_exclusive() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..CASES {
        let formula = random_formula(&mut rng, 3);
        let normalized = normalize(&formula)?;
        assert!(normalized.is_overlap_free(), "{formula} -> {normalized}");
    }
    Ok(())
}

#[test]
fn test_normalization_is_idempotent() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..CASES {
        let formula = random_formula(&mut rng, 3);
        let once = normalize(&formula)?;
        let twice = normalize(&once.to_formula())?;
        assert!(twice.is_overlap_free());
        assert!(twice.to_formula().is_equivalent(&once.to_formula())?);
    }
    Ok(())
}

#[test]
fn test_calculation_is_the_probability() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..CASES {
        let formula = random_formula(&mut rng, 3);
        let expression = compile(&normalize(&formula)?);
        let value = expression.evaluate(&resolve)?;
        let expected = probability(&formula)?;
        assert!(
            (value - expected).abs() < 1e-4,
            "{formula}: {expression} gave {value}, expected {expected}"
        );
        assert!((-1e-5..=1.0 + 1e-5).contains(&value), "{value} out of range");
    }
    Ok(())
}

fn random_tree(
    rng: &mut StdRng,
    depth: usize,
    used: &mut BTreeSet<&'static str>,
) -> OccurrenceNode {
    let mut builder = CommutingQuantumQueryBuilder::new();
    for _ in 0..rng.random_range(1..4) {
        let child: OccurrenceNode = if depth > 0 && rng.random_bool(0.4) {
            random_tree(rng, depth - 1, used)
        } else {
            let word = NAMES[rng.random_range(0..3)];
            used.insert(word);
            AtomicQuery::matching(word).into()
        };
        builder = match rng.random_range(0..3) {
            0 => builder.must(child),
            1 => builder.should(child),
            _ => builder.must_not(child),
        };
    }
    builder.build()
}

#[test]
fn test_repeated_clauses_are_registered_once() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(19);
    for _ in 0..CASES {
        let mut used = BTreeSet::new();
        let mut tree = random_tree(&mut rng, 2, &mut used);
        let transcription = transcribe(&mut tree)?;
        assert_eq!(transcription.registry.len(), used.len());
        for word in &used {
            let literal = Literal::from_name(&format!("match$${word}"));
            assert!(transcription.registry.contains(&literal));
        }
    }
    Ok(())
}
