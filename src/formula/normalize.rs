//! CQQL normalization: DNF, overlap resolution and the De Morgan pass.
//!
//! Combining disjuncts as independent probabilities double counts any
//! condition that two disjuncts share. The normalizer removes such overlaps
//! by repeatedly splitting on a shared variable `o`:
//!
//! ```text
//! D  ==>  (o && D[o := True]) + (!o && D[o := False])
//! ```
//!
//! The two branches are mutually exclusive, so they are combined by a plain
//! sum rather than by a probabilistic OR. Splitting continues inside each
//! branch until every remaining DNF is overlap-free, and the remainder is
//! rewritten with De Morgan's law into a conjunction-only canonical form.

use std::fmt;

use log::{debug, trace};

use crate::config::NormalizerConfig;
use crate::error::{CqqlError, Result};
use crate::formula::Formula;
use crate::formula::dnf::Dnf;
use crate::formula::literal::Variable;
use crate::util::CancellationToken;

/// A formula whose disjuncts never share a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedFormula {
    /// An overlap-free DNF together with its De Morgan canonical form.
    Disjoint {
        /// The overlap-free disjuncts.
        disjuncts: Dnf,
        /// `!(!c1 && !c2 && …)`, or the single conjunction, or a constant.
        canonical: Formula,
    },
    /// `(pivot && when_true) + (!pivot && when_false)`.
    Split {
        /// The variable the formula was split on.
        pivot: Variable,
        /// Normalized cofactor with the pivot true.
        when_true: Box<NormalizedFormula>,
        /// Normalized cofactor with the pivot false.
        when_false: Box<NormalizedFormula>,
    },
}

impl NormalizedFormula {
    /// Wrap an overlap-free DNF.
    pub fn disjoint(disjuncts: Dnf) -> Self {
        let canonical = disjuncts.de_morgan();
        NormalizedFormula::Disjoint {
            disjuncts,
            canonical,
        }
    }

    /// The normalized constant `True` or `False`.
    pub fn constant(value: bool) -> Self {
        Self::disjoint(if value { Dnf::verum() } else { Dnf::falsum() })
    }

    /// Check if this is the constant `True`.
    pub fn is_true(&self) -> bool {
        matches!(self, NormalizedFormula::Disjoint { disjuncts, .. } if disjuncts.is_verum())
    }

    /// Check if this is the constant `False`.
    pub fn is_false(&self) -> bool {
        matches!(self, NormalizedFormula::Disjoint { disjuncts, .. } if disjuncts.is_empty())
    }

    /// Get the boolean-equivalent formula, reading the sum as a disjunction.
    pub fn to_formula(&self) -> Formula {
        match self {
            NormalizedFormula::Disjoint { canonical, .. } => canonical.clone(),
            NormalizedFormula::Split {
                pivot,
                when_true,
                when_false,
            } => Formula::Or(vec![
                Formula::And(vec![Formula::Var(pivot.clone()), when_true.to_formula()]),
                Formula::And(vec![
                    Formula::not(Formula::Var(pivot.clone())),
                    when_false.to_formula(),
                ]),
            ]),
        }
    }

    /// Check the disjointness invariant: every remaining DNF is
    /// overlap-free and no branch mentions a pivot it was split on.
    pub fn is_overlap_free(&self) -> bool {
        let mut pivots: Vec<&Variable> = Vec::new();
        self.overlap_free_under(&mut pivots)
    }

    fn overlap_free_under<'a>(&'a self, pivots: &mut Vec<&'a Variable>) -> bool {
        match self {
            NormalizedFormula::Disjoint { disjuncts, .. } => {
                disjuncts.is_overlap_free() && !pivots.iter().any(|p| disjuncts.mentions(p))
            }
            NormalizedFormula::Split {
                pivot,
                when_true,
                when_false,
            } => {
                pivots.push(pivot);
                let free =
                    when_true.overlap_free_under(pivots) && when_false.overlap_free_under(pivots);
                pivots.pop();
                free
            }
        }
    }

    /// Get the number of splits.
    pub fn split_count(&self) -> usize {
        match self {
            NormalizedFormula::Disjoint { .. } => 0,
            NormalizedFormula::Split {
                when_true,
                when_false,
                ..
            } => 1 + when_true.split_count() + when_false.split_count(),
        }
    }

    /// Get the deepest nesting of splits.
    pub fn depth(&self) -> usize {
        match self {
            NormalizedFormula::Disjoint { .. } => 0,
            NormalizedFormula::Split {
                when_true,
                when_false,
                ..
            } => 1 + when_true.depth().max(when_false.depth()),
        }
    }
}

impl fmt::Display for NormalizedFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedFormula::Disjoint { canonical, .. } => canonical.fmt(f),
            NormalizedFormula::Split {
                pivot,
                when_true,
                when_false,
            } => write!(
                f,
                "(({pivot}) && ({when_true})) + ((!({pivot})) && ({when_false}))"
            ),
        }
    }
}

/// Normalizes formulas under configurable bounds.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
    cancel: CancellationToken,
}

enum Slot {
    Pending,
    Leaf(Dnf),
    Split {
        pivot: Variable,
        when_true: usize,
        when_false: usize,
    },
}

impl Normalizer {
    /// Create a normalizer with the given bounds.
    pub fn new(config: NormalizerConfig) -> Self {
        Normalizer {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Poll `cancel` while normalizing.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the configured bounds.
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize a formula. The empty formula is `True`.
    pub fn normalize(&self, formula: &Formula) -> Result<NormalizedFormula> {
        if formula.is_empty() {
            return Ok(NormalizedFormula::constant(true));
        }

        let dnf = Dnf::from_formula(formula, self.config.max_disjuncts, &self.cancel)?;
        debug!("DNF with {} disjuncts: {}", dnf.len(), dnf);

        let normalized = self.resolve_overlaps(dnf)?;
        debug!(
            "Normalized with {} splits (depth {}): {}",
            normalized.split_count(),
            normalized.depth(),
            normalized
        );
        Ok(normalized)
    }

    /// Split on shared variables until every branch is overlap-free.
    ///
    /// Runs on an explicit worklist; a split's children always get higher
    /// slot indices than the split itself, so the tree is assembled by a
    /// single reverse pass over the slots.
    fn resolve_overlaps(&self, dnf: Dnf) -> Result<NormalizedFormula> {
        let mut slots = vec![Slot::Pending];
        let mut worklist = vec![(0usize, dnf, 0usize)];
        let mut splits = 0usize;

        while let Some((slot, dnf, depth)) = worklist.pop() {
            self.cancel.check("overlap resolution")?;

            let Some(pivot) = dnf.find_overlap() else {
                slots[slot] = Slot::Leaf(dnf);
                continue;
            };
            if depth >= self.config.max_depth {
                return Err(CqqlError::RecursionLimitExceeded {
                    limit: self.config.max_depth,
                });
            }
            splits += 1;
            if splits > self.config.max_nodes {
                return Err(CqqlError::exhausted(format!(
                    "overlap resolution needed more than {} splits",
                    self.config.max_nodes
                )));
            }

            let when_true = dnf.cofactor(&pivot, true);
            let when_false = dnf.cofactor(&pivot, false);
            trace!(
                "Split on {} at depth {}: [{}] + [{}]",
                pivot, depth, when_true, when_false
            );

            let true_slot = slots.len();
            let false_slot = true_slot + 1;
            slots.push(Slot::Pending);
            slots.push(Slot::Pending);
            slots[slot] = Slot::Split {
                pivot,
                when_true: true_slot,
                when_false: false_slot,
            };
            worklist.push((false_slot, when_false, depth + 1));
            worklist.push((true_slot, when_true, depth + 1));
        }

        let mut built: Vec<Option<NormalizedFormula>> = slots.iter().map(|_| None).collect();
        for index in (0..slots.len()).rev() {
            let node = match std::mem::replace(&mut slots[index], Slot::Pending) {
                Slot::Leaf(dnf) => NormalizedFormula::disjoint(dnf),
                Slot::Split {
                    pivot,
                    when_true,
                    when_false,
                } => NormalizedFormula::Split {
                    pivot,
                    when_true: Box::new(take_built(&mut built, when_true)?),
                    when_false: Box::new(take_built(&mut built, when_false)?),
                },
                Slot::Pending => return Err(unresolved_branch()),
            };
            built[index] = Some(node);
        }
        take_built(&mut built, 0)
    }
}

fn take_built(built: &mut [Option<NormalizedFormula>], index: usize) -> Result<NormalizedFormula> {
    built
        .get_mut(index)
        .and_then(Option::take)
        .ok_or_else(unresolved_branch)
}

fn unresolved_branch() -> CqqlError {
    CqqlError::exhausted("overlap resolution left a branch unresolved")
}

/// Normalize a formula with the default bounds and no cancellation.
pub fn normalize(formula: &Formula) -> Result<NormalizedFormula> {
    Normalizer::default().normalize(formula)
}
