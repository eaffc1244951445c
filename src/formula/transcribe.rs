//! Transcription of occurrence trees into boolean formulas.

use log::debug;

use crate::config::NEUTRAL_BOOST;
use crate::error::Result;
use crate::formula::Formula;
use crate::formula::literal::{LiteralRegistry, WeightLiteral};
use crate::query::occurrence::{AtomicKind, AtomicQuery, CompoundNode, OccurrenceNode};

/// The result of transcribing one occurrence tree.
#[derive(Debug, Clone)]
pub struct Transcription {
    /// The boolean formula over literals and weight literals.
    pub formula: Formula,
    /// The literals the formula refers to, with their atomic queries.
    pub registry: LiteralRegistry,
    /// The root boost, applied to the final score.
    pub boost: f32,
}

/// Transcribe an occurrence tree into a formula.
///
/// Every boost in the tree is consumed: non-neutral child boosts become
/// weight literals and are reset to the neutral boost on the node, so the
/// index never applies them a second time.
pub fn transcribe(root: &mut OccurrenceNode) -> Result<Transcription> {
    let mut transcriber = Transcriber::default();
    let boost = root.boost();
    WeightLiteral::new(boost)?;
    root.set_boost(NEUTRAL_BOOST);

    let formula = match root {
        OccurrenceNode::Compound(node) => transcriber.compound(node)?,
        OccurrenceNode::Atomic(query) => transcriber.atomic(query),
    };
    debug!(
        "Transcribed formula '{}' over {} literals",
        formula,
        transcriber.registry.len()
    );

    Ok(Transcription {
        formula,
        registry: transcriber.registry,
        boost,
    })
}

#[derive(Default)]
struct Transcriber {
    registry: LiteralRegistry,
}

impl Transcriber {
    fn compound(&mut self, node: &mut CompoundNode) -> Result<Formula> {
        let must = self.children(&mut node.must)?;
        let should = self.children(&mut node.should)?;
        let must_not: Vec<Formula> = self
            .children(&mut node.must_not)?
            .into_iter()
            .map(Formula::not)
            .collect();

        let mut parts = Vec::with_capacity(3);
        if !must.is_empty() {
            parts.push(Formula::and(must));
        }
        if !should.is_empty() {
            parts.push(Formula::or(should));
        }
        if !must_not.is_empty() {
            parts.push(Formula::and(must_not));
        }

        if parts.is_empty() {
            Ok(Formula::Empty)
        } else {
            Ok(Formula::and(parts))
        }
    }

    /// Transcribe a clause list, dropping children that transcribe to nothing.
    fn children(&mut self, nodes: &mut [OccurrenceNode]) -> Result<Vec<Formula>> {
        let mut formulas = Vec::with_capacity(nodes.len());
        for node in nodes {
            let formula = self.child(node)?;
            if !formula.is_empty() {
                formulas.push(formula);
            }
        }
        Ok(formulas)
    }

    fn child(&mut self, node: &mut OccurrenceNode) -> Result<Formula> {
        let formula = match node {
            OccurrenceNode::Compound(compound) => self.compound(compound)?,
            OccurrenceNode::Atomic(query) => self.atomic(query),
        };
        let weight = WeightLiteral::for_boost(node.boost())?;
        node.set_boost(NEUTRAL_BOOST);

        match weight {
            Some(weight) if !formula.is_empty() => {
                Ok(Formula::And(vec![formula, Formula::var(weight)]))
            }
            _ => Ok(formula),
        }
    }

    fn atomic(&mut self, query: &AtomicQuery) -> Formula {
        match query.kind() {
            AtomicKind::MatchAll => Formula::True,
            AtomicKind::MatchNone => Formula::False,
            AtomicKind::Match | AtomicKind::Term => Formula::var(self.registry.register(query)),
        }
    }
}
