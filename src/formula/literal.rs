//! Literals, weight literals and the per-query literal registry.

use std::fmt;
use std::hash::{Hash, Hasher};

use ahash::AHashMap;

use crate::config::NEUTRAL_BOOST;
use crate::error::{CqqlError, Result};
use crate::query::occurrence::{AtomicKind, AtomicQuery};

/// Separator between the kind and the payload of a literal name.
pub const KIND_SEPARATOR: &str = "$$";

/// Prefix of every weight literal name.
pub const WEIGHT_PREFIX: &str = "w$$";

/// The name of one deduplicated atomic condition.
///
/// Two atomic queries with the same kind, field and value map to the same
/// literal, so a repeated condition contributes one score.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal(String);

impl Literal {
    /// Build the literal for an atomic condition.
    pub fn new(kind: AtomicKind, field: Option<&str>, value: &str) -> Self {
        match field {
            Some(field) => Literal(format!("{kind}{KIND_SEPARATOR}{field}:{value}")),
            None => Literal(format!("{kind}{KIND_SEPARATOR}{value}")),
        }
    }

    /// Build the literal for an atomic query.
    pub fn for_query(query: &AtomicQuery) -> Self {
        Self::new(query.kind(), query.field(), query.value())
    }

    /// Wrap an already formed literal name.
    pub fn from_name<S: Into<String>>(name: S) -> Self {
        Literal(name.into())
    }

    /// Get the literal name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A synthetic literal carrying a boost value.
///
/// Its textual form `w$$<integer>$<fraction>` lets it live inside the formula
/// grammar; the numeric payload is what scoring uses.
#[derive(Debug, Clone, Copy)]
pub struct WeightLiteral {
    weight: f32,
}

impl WeightLiteral {
    /// Create a weight literal. The weight must be finite and non-negative.
    pub fn new(weight: f32) -> Result<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(CqqlError::invalid_argument(format!(
                "boost must be a finite non-negative number, got {weight}"
            )));
        }
        Ok(WeightLiteral { weight })
    }

    /// Derive the weight literal for a boost, if it differs from the neutral boost.
    pub fn for_boost(boost: f32) -> Result<Option<Self>> {
        if boost == NEUTRAL_BOOST {
            return Ok(None);
        }
        Self::new(boost).map(Some)
    }

    /// Get the encoded weight.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Decode a weight literal name such as `w$$0$4`.
    pub fn decode(name: &str) -> Result<Self> {
        let payload = name.strip_prefix(WEIGHT_PREFIX).ok_or_else(|| {
            CqqlError::invalid_argument(format!("'{name}' is not a weight literal"))
        })?;
        let (integer, fraction) = payload.split_once('$').ok_or_else(|| {
            CqqlError::invalid_argument(format!("weight literal '{name}' has no fraction part"))
        })?;
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(integer) || !all_digits(fraction) {
            return Err(CqqlError::invalid_argument(format!(
                "weight literal '{name}' must encode a decimal number"
            )));
        }
        let weight: f32 = format!("{integer}.{fraction}")
            .parse()
            .map_err(|_| CqqlError::invalid_argument(format!("invalid weight literal '{name}'")))?;
        Self::new(weight)
    }
}

impl PartialEq for WeightLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.weight.to_bits() == other.weight.to_bits()
    }
}

impl Eq for WeightLiteral {}

impl Hash for WeightLiteral {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.weight.to_bits().hash(state);
    }
}

impl fmt::Display for WeightLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Float Display is the shortest round-tripping decimal and never uses an exponent.
        let text = self.weight.to_string();
        let (integer, fraction) = text.split_once('.').unwrap_or((&text, "0"));
        write!(f, "{WEIGHT_PREFIX}{integer}${fraction}")
    }
}

/// A propositional variable: either a condition or a weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Variable {
    /// An atomic condition resolved from the score matrix.
    Literal(Literal),
    /// A boost resolved to its own value.
    Weight(WeightLiteral),
}

impl Variable {
    /// Parse a variable name, recognising weight literals by their prefix.
    pub fn from_name(name: &str) -> Result<Self> {
        if name.starts_with(WEIGHT_PREFIX) {
            WeightLiteral::decode(name).map(Variable::Weight)
        } else {
            Ok(Variable::Literal(Literal::from_name(name)))
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Literal(literal) => literal.fmt(f),
            Variable::Weight(weight) => weight.fmt(f),
        }
    }
}

impl From<Literal> for Variable {
    fn from(literal: Literal) -> Self {
        Variable::Literal(literal)
    }
}

impl From<WeightLiteral> for Variable {
    fn from(weight: WeightLiteral) -> Self {
        Variable::Weight(weight)
    }
}

/// Maps each distinct literal of one query evaluation to the atomic query
/// that scores it, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct LiteralRegistry {
    literals: Vec<Literal>,
    queries: Vec<AtomicQuery>,
    positions: AHashMap<Literal, usize>,
}

impl LiteralRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an atomic query and return its literal.
    ///
    /// The stored query carries the neutral boost; its weighting lives in the formula.
    pub fn register(&mut self, query: &AtomicQuery) -> Literal {
        let literal = Literal::for_query(query);
        if !self.positions.contains_key(&literal) {
            let mut stored = query.clone();
            stored.set_boost(NEUTRAL_BOOST);
            self.positions.insert(literal.clone(), self.literals.len());
            self.literals.push(literal.clone());
            self.queries.push(stored);
        }
        literal
    }

    /// Get the registration position of a literal.
    pub fn position(&self, literal: &Literal) -> Option<usize> {
        self.positions.get(literal).copied()
    }

    /// Get the atomic query behind a literal.
    pub fn query(&self, literal: &Literal) -> Option<&AtomicQuery> {
        self.position(literal).map(|position| &self.queries[position])
    }

    /// Check whether a literal is registered.
    pub fn contains(&self, literal: &Literal) -> bool {
        self.positions.contains_key(literal)
    }

    /// Get all literals in registration order.
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// Iterate over literals and their queries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Literal, &AtomicQuery)> {
        self.literals.iter().zip(self.queries.iter())
    }

    /// Get the number of distinct literals.
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// Check if no literal is registered.
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_names() {
        let literal = Literal::for_query(&AtomicQuery::matching("fox"));
        assert_eq!(literal.name(), "match$$fox");

        let literal = Literal::for_query(&AtomicQuery::term("fox").with_field("title"));
        assert_eq!(literal.name(), "term$$title:fox");
    }

    #[test]
    fn test_weight_literal_encoding() {
        let weight = WeightLiteral::new(0.4).unwrap();
        assert_eq!(weight.to_string(), "w$$0$4");

        let weight = WeightLiteral::new(2.0).unwrap();
        assert_eq!(weight.to_string(), "w$$2$0");

        let weight = WeightLiteral::new(12.375).unwrap();
        assert_eq!(weight.to_string(), "w$$12$375");
    }

    #[test]
    fn test_weight_literal_decodes_losslessly() {
        for boost in [0.4_f32, 0.1, 2.0, 1.5, 0.333, 7.25, 0.0001] {
            let weight = WeightLiteral::new(boost).unwrap();
            let decoded = WeightLiteral::decode(&weight.to_string()).unwrap();
            assert_eq!(decoded.weight(), boost);
            assert_eq!(decoded, weight);
        }
    }

    #[test]
    fn test_weight_literal_rejects_garbage() {
        assert!(WeightLiteral::decode("w$$0.4").is_err());
        assert!(WeightLiteral::decode("w$$a$4").is_err());
        assert!(WeightLiteral::decode("match$$fox").is_err());
        assert!(WeightLiteral::new(-1.0).is_err());
        assert!(WeightLiteral::new(f32::NAN).is_err());
    }

    #[test]
    fn test_neutral_boost_has_no_weight() {
        assert!(WeightLiteral::for_boost(NEUTRAL_BOOST).unwrap().is_none());
        assert!(WeightLiteral::for_boost(0.4).unwrap().is_some());
    }

    #[test]
    fn test_variable_from_name() {
        assert_eq!(
            Variable::from_name("w$$0$4").unwrap(),
            Variable::Weight(WeightLiteral::new(0.4).unwrap())
        );
        assert_eq!(
            Variable::from_name("match$$fox").unwrap(),
            Variable::Literal(Literal::from_name("match$$fox"))
        );
    }

    #[test]
    fn test_registry_deduplicates_in_first_seen_order() {
        let mut registry = LiteralRegistry::new();
        let fox = registry.register(&AtomicQuery::matching("fox"));
        let eagle = registry.register(&AtomicQuery::matching("eagle"));
        let fox_again = registry.register(&AtomicQuery::matching("fox").with_boost(3.0));

        assert_eq!(fox, fox_again);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.position(&fox), Some(0));
        assert_eq!(registry.position(&eagle), Some(1));
        assert_eq!(registry.query(&fox).unwrap().boost(), NEUTRAL_BOOST);
    }

    #[test]
    fn test_registry_distinguishes_kind_and_field() {
        let mut registry = LiteralRegistry::new();
        registry.register(&AtomicQuery::matching("fox"));
        registry.register(&AtomicQuery::term("fox"));
        registry.register(&AtomicQuery::matching("fox").with_field("title"));

        assert_eq!(registry.len(), 3);
        assert!(registry.contains(&Literal::from_name("term$$fox")));
        assert!(!registry.contains(&Literal::from_name("term$$eagle")));
    }
}
