//! Disjunctive normal form and the boolean simplification rules applied to it.
//!
//! A [`Dnf`] is a disjunction of [`Conjunction`]s, each of which is a set of
//! signed variables ([`Term`]s). Order is preserved everywhere: terms keep the
//! order in which they were first conjoined and disjuncts the order in which
//! they were produced, which keeps overlap selection deterministic.

use std::fmt;

use crate::error::{CqqlError, Result};
use crate::formula::Formula;
use crate::formula::literal::Variable;
use crate::util::CancellationToken;

/// A possibly negated variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    /// The variable.
    pub variable: Variable,
    /// Whether the variable appears negated.
    pub negated: bool,
}

impl Term {
    /// Create a positive term.
    pub fn positive(variable: Variable) -> Self {
        Term {
            variable,
            negated: false,
        }
    }

    /// Create a negated term.
    pub fn negative(variable: Variable) -> Self {
        Term {
            variable,
            negated: true,
        }
    }

    /// Get the same variable with the opposite sign.
    pub fn complement(&self) -> Self {
        Term {
            variable: self.variable.clone(),
            negated: !self.negated,
        }
    }

    /// Convert to a formula node.
    pub fn to_formula(&self) -> Formula {
        let var = Formula::Var(self.variable.clone());
        if self.negated { Formula::not(var) } else { var }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!({})", self.variable)
        } else {
            self.variable.fmt(f)
        }
    }
}

/// A conjunction of terms without duplicates or complementary pairs.
///
/// The empty conjunction is `True`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Conjunction {
    terms: Vec<Term>,
}

impl Conjunction {
    /// Create the empty (true) conjunction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a conjunction from terms. Returns None if two terms contradict.
    pub fn from_terms<I: IntoIterator<Item = Term>>(terms: I) -> Option<Self> {
        let mut conjunction = Conjunction::new();
        for term in terms {
            if !conjunction.push(term) {
                return None;
            }
        }
        Some(conjunction)
    }

    /// Add a term. Duplicates collapse (idempotence); returns false if the
    /// term contradicts one already present (`x && !x`).
    pub fn push(&mut self, term: Term) -> bool {
        match self.sign_of(&term.variable) {
            Some(negated) => negated == term.negated,
            None => {
                self.terms.push(term);
                true
            }
        }
    }

    /// Conjoin with another conjunction. Returns None on contradiction.
    pub fn merge(&self, other: &Conjunction) -> Option<Conjunction> {
        let mut merged = self.clone();
        for term in &other.terms {
            if !merged.push(term.clone()) {
                return None;
            }
        }
        Some(merged)
    }

    /// Get the sign of a variable in this conjunction, if it occurs.
    pub fn sign_of(&self, variable: &Variable) -> Option<bool> {
        self.terms
            .iter()
            .find(|term| &term.variable == variable)
            .map(|term| term.negated)
    }

    /// Check whether a variable occurs, with either sign.
    pub fn mentions(&self, variable: &Variable) -> bool {
        self.sign_of(variable).is_some()
    }

    /// Check whether every term of this conjunction occurs in `other`.
    pub fn is_subset_of(&self, other: &Conjunction) -> bool {
        self.terms.iter().all(|term| other.terms.contains(term))
    }

    /// Get the same conjunction without any term on `variable`.
    pub fn without(&self, variable: &Variable) -> Conjunction {
        Conjunction {
            terms: self
                .terms
                .iter()
                .filter(|term| &term.variable != variable)
                .cloned()
                .collect(),
        }
    }

    /// Get the terms in order.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Get the number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Check if this is the empty (true) conjunction.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Convert to a formula node.
    pub fn to_formula(&self) -> Formula {
        Formula::and(self.terms.iter().map(Term::to_formula).collect())
    }

    /// If the two conjunctions are equal except for one complementary term,
    /// return the common part: `(A && x) || (A && !x) == A`.
    fn resolve(&self, other: &Conjunction) -> Option<Conjunction> {
        if self.len() != other.len() {
            return None;
        }
        let mut pivot = None;
        for term in &self.terms {
            if other.terms.contains(term) {
                continue;
            }
            if pivot.is_some() || !other.terms.contains(&term.complement()) {
                return None;
            }
            pivot = Some(term.variable.clone());
        }
        pivot.map(|variable| self.without(&variable))
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_formula().fmt(f)
    }
}

/// A disjunction of conjunctions. No disjuncts is `False`; a single empty
/// disjunct is `True`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dnf {
    disjuncts: Vec<Conjunction>,
}

impl Dnf {
    /// The constant `False`.
    pub fn falsum() -> Self {
        Dnf {
            disjuncts: Vec::new(),
        }
    }

    /// The constant `True`.
    pub fn verum() -> Self {
        Dnf {
            disjuncts: vec![Conjunction::new()],
        }
    }

    /// Build from disjuncts and simplify.
    pub fn from_disjuncts(disjuncts: Vec<Conjunction>) -> Self {
        let mut dnf = Dnf { disjuncts };
        dnf.simplify();
        dnf
    }

    /// Convert a formula to simplified DNF.
    ///
    /// Negations are pushed to the variables and conjunctions are distributed
    /// over disjunctions. Fails with `ResourceExhausted` if more than
    /// `max_disjuncts` disjuncts would be produced.
    pub fn from_formula(
        formula: &Formula,
        max_disjuncts: usize,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let mut dnf = DnfConverter {
            max_disjuncts,
            cancel,
        }
        .convert(formula, false)?;
        dnf.simplify();
        Ok(dnf)
    }

    /// Get the disjuncts.
    pub fn disjuncts(&self) -> &[Conjunction] {
        &self.disjuncts
    }

    /// Get the number of disjuncts.
    pub fn len(&self) -> usize {
        self.disjuncts.len()
    }

    /// Check if this is the constant `False`.
    pub fn is_empty(&self) -> bool {
        self.disjuncts.is_empty()
    }

    /// Check if this is the constant `True`.
    pub fn is_verum(&self) -> bool {
        self.disjuncts.iter().any(Conjunction::is_empty)
    }

    /// Apply idempotence, absorption and complementation until nothing changes.
    pub fn simplify(&mut self) {
        if self.is_verum() {
            *self = Dnf::verum();
            return;
        }
        loop {
            self.absorb();
            if !self.complement_once() {
                break;
            }
        }
    }

    /// Remove duplicates and any disjunct that contains another one.
    fn absorb(&mut self) {
        let mut kept: Vec<Conjunction> = Vec::with_capacity(self.disjuncts.len());
        for candidate in self.disjuncts.drain(..) {
            if kept.iter().any(|existing| existing.is_subset_of(&candidate)) {
                continue;
            }
            kept.retain(|existing| !candidate.is_subset_of(existing));
            kept.push(candidate);
        }
        self.disjuncts = kept;
    }

    /// Merge the first pair of disjuncts that differ only in one complementary term.
    fn complement_once(&mut self) -> bool {
        for i in 0..self.disjuncts.len() {
            for j in (i + 1)..self.disjuncts.len() {
                if let Some(common) = self.disjuncts[i].resolve(&self.disjuncts[j]) {
                    self.disjuncts[i] = common;
                    self.disjuncts.remove(j);
                    return true;
                }
            }
        }
        false
    }

    /// Find the first variable that occurs in two or more disjuncts.
    ///
    /// Disjuncts are scanned in order and terms within a disjunct in order;
    /// the first term whose variable also occurs in a later disjunct wins.
    pub fn find_overlap(&self) -> Option<Variable> {
        for (i, disjunct) in self.disjuncts.iter().enumerate() {
            for term in disjunct.terms() {
                if self.disjuncts[i + 1..]
                    .iter()
                    .any(|later| later.mentions(&term.variable))
                {
                    return Some(term.variable.clone());
                }
            }
        }
        None
    }

    /// Check that no variable occurs in more than one disjunct.
    pub fn is_overlap_free(&self) -> bool {
        self.find_overlap().is_none()
    }

    /// Check whether a variable occurs anywhere.
    pub fn mentions(&self, variable: &Variable) -> bool {
        self.disjuncts.iter().any(|d| d.mentions(variable))
    }

    /// Fix `variable` to `value` and simplify.
    pub fn cofactor(&self, variable: &Variable, value: bool) -> Dnf {
        let disjuncts = self
            .disjuncts
            .iter()
            .filter_map(|disjunct| match disjunct.sign_of(variable) {
                // the term holds exactly when the assigned value differs from its negation flag
                Some(negated) if negated != value => Some(disjunct.without(variable)),
                Some(_) => None,
                None => Some(disjunct.clone()),
            })
            .collect();
        Dnf::from_disjuncts(disjuncts)
    }

    /// Convert to a plain `Or` of `And`s.
    pub fn to_formula(&self) -> Formula {
        Formula::or(self.disjuncts.iter().map(Conjunction::to_formula).collect())
    }

    /// Canonicalize the disjunction with De Morgan's law:
    /// `c1 || c2 || … ≡ !(!c1 && !c2 && …)`.
    pub fn de_morgan(&self) -> Formula {
        match self.disjuncts.len() {
            0 => Formula::False,
            1 => self.disjuncts[0].to_formula(),
            _ => Formula::not(Formula::And(
                self.disjuncts
                    .iter()
                    .map(|disjunct| Formula::not(disjunct.to_formula()))
                    .collect(),
            )),
        }
    }
}

impl fmt::Display for Dnf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_formula().fmt(f)
    }
}

struct DnfConverter<'a> {
    max_disjuncts: usize,
    cancel: &'a CancellationToken,
}

impl DnfConverter<'_> {
    fn convert(&self, formula: &Formula, negate: bool) -> Result<Dnf> {
        self.cancel.check("DNF conversion")?;
        match (formula, negate) {
            (Formula::Empty | Formula::True, false) | (Formula::False, true) => Ok(Dnf::verum()),
            (Formula::Empty | Formula::True, true) | (Formula::False, false) => {
                Ok(Dnf::falsum())
            }
            (Formula::Var(variable), negated) => Ok(Dnf {
                disjuncts: vec![Conjunction {
                    terms: vec![Term {
                        variable: variable.clone(),
                        negated,
                    }],
                }],
            }),
            (Formula::Not(inner), negated) => self.convert(inner, !negated),
            (Formula::And(children), false) | (Formula::Or(children), true) => {
                self.product(children, negate)
            }
            (Formula::Or(children), false) | (Formula::And(children), true) => {
                self.union(children, negate)
            }
        }
    }

    fn product(&self, children: &[Formula], negate: bool) -> Result<Dnf> {
        let mut acc = Dnf::verum();
        for child in children {
            let child = self.convert(child, negate)?;
            let mut disjuncts = Vec::new();
            for left in &acc.disjuncts {
                for right in &child.disjuncts {
                    if let Some(merged) = left.merge(right) {
                        disjuncts.push(merged);
                        self.check_size(disjuncts.len())?;
                    }
                }
            }
            acc = Dnf::from_disjuncts(disjuncts);
            if acc.is_empty() {
                break;
            }
        }
        Ok(acc)
    }

    fn union(&self, children: &[Formula], negate: bool) -> Result<Dnf> {
        let mut disjuncts = Vec::new();
        for child in children {
            disjuncts.extend(self.convert(child, negate)?.disjuncts);
            self.check_size(disjuncts.len())?;
        }
        Ok(Dnf::from_disjuncts(disjuncts))
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_disjuncts {
            return Err(CqqlError::exhausted(format!(
                "DNF conversion produced more than {} disjuncts",
                self.max_disjuncts
            )));
        }
        Ok(())
    }
}
