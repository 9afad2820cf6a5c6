//! `Reaction` and `LogicalReaction`: one-data-source and aggregated
//! REACLIB reactions.

use crate::error::{NetworkError, Result};
use crate::reaction::rate::RateCoefficients;
use crate::scalar::Scalar;
use crate::species::Species;

/// REACLIB structural chapter, 1 through 8, classifying reactant/product
/// arity.
pub type Chapter = u8;

/// One evaluation of one physical reaction from one REACLIB data source.
/// Constructed once at network build time and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    id: String,
    pe_name: String,
    chapter: Chapter,
    reactants: Vec<Species>,
    products: Vec<Species>,
    q_value_mev: f64,
    source: String,
    coefficients: RateCoefficients,
    is_reverse: bool,
}

impl Reaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pe_name: impl Into<String>,
        chapter: Chapter,
        reactants: Vec<Species>,
        products: Vec<Species>,
        q_value_mev: f64,
        source: impl Into<String>,
        coefficients: RateCoefficients,
        is_reverse: bool,
    ) -> Result<Self> {
        let pe_name = pe_name.into();
        let source = source.into();
        if !(1..=3).contains(&reactants.len()) {
            return Err(NetworkError::ConservationViolation {
                reaction: pe_name.clone(),
                quantity: "reactant count",
                reactant_total: reactants.len() as i64,
                product_total: 0,
            });
        }
        check_conservation(&pe_name, &reactants, &products)?;
        let id = format!("{pe_name}:{source}");
        Ok(Self {
            id,
            pe_name,
            chapter,
            reactants,
            products,
            q_value_mev,
            source,
            coefficients,
            is_reverse,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pe_name(&self) -> &str {
        &self.pe_name
    }

    pub fn chapter(&self) -> Chapter {
        self.chapter
    }

    pub fn reactants(&self) -> &[Species] {
        &self.reactants
    }

    pub fn products(&self) -> &[Species] {
        &self.products
    }

    pub fn q_value_mev(&self) -> f64 {
        self.q_value_mev
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn coefficients(&self) -> &RateCoefficients {
        &self.coefficients
    }

    pub fn is_reverse(&self) -> bool {
        self.is_reverse
    }

    pub fn rate<S: Scalar>(&self, t9: S) -> S {
        self.coefficients.rate(t9)
    }

    /// Mass-difference-derived Q-value, `(sum reactant mass - sum product
    /// mass) * 931.494 MeV/u`, as a cross-check against the stored,
    /// data-source Q-value. Diagnostic only; rates use `q_value_mev`.
    pub fn excess_energy(&self) -> f64 {
        const AMU_MEV: f64 = 931.494;
        let reactant_mass: f64 = self.reactants.iter().map(Species::approx_mass_u).sum();
        let product_mass: f64 = self.products.iter().map(Species::approx_mass_u).sum();
        (reactant_mass - product_mass) * AMU_MEV
    }

    /// Symmetry factor `1 / prod_i(c_i!)` over reactant multiplicities.
    pub fn reactant_symmetry_factor(&self) -> f64 {
        symmetry_factor(&self.reactants)
    }

    pub fn product_symmetry_factor(&self) -> f64 {
        symmetry_factor(&self.products)
    }
}

pub(crate) fn symmetry_factor(species: &[Species]) -> f64 {
    let mut counts = std::collections::HashMap::new();
    for s in species {
        *counts.entry(*s).or_insert(0u64) += 1;
    }
    let mut denom = 1.0;
    for count in counts.values() {
        denom *= factorial(*count);
    }
    1.0 / denom
}

fn factorial(n: u64) -> f64 {
    (1..=n).map(|x| x as f64).product::<f64>().max(1.0)
}

fn check_conservation(name: &str, reactants: &[Species], products: &[Species]) -> Result<()> {
    let reactant_a: i64 = reactants.iter().map(|s| s.a as i64).sum();
    let product_a: i64 = products.iter().map(|s| s.a as i64).sum();
    if reactant_a != product_a {
        return Err(NetworkError::ConservationViolation {
            reaction: name.to_string(),
            quantity: "mass number A",
            reactant_total: reactant_a,
            product_total: product_a,
        });
    }
    let reactant_z: i64 = reactants.iter().map(|s| s.z as i64).sum();
    let product_z: i64 = products.iter().map(|s| s.z as i64).sum();
    if reactant_z != product_z {
        return Err(NetworkError::ConservationViolation {
            reaction: name.to_string(),
            quantity: "atomic number Z",
            reactant_total: reactant_z,
            product_total: product_z,
        });
    }
    Ok(())
}

/// An aggregated reaction summing rates from every REACLIB data source
/// that shares a projectile-ejectile name.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalReaction {
    pe_name: String,
    chapter: Chapter,
    reactants: Vec<Species>,
    products: Vec<Species>,
    q_value_mev: f64,
    contributors: Vec<(String, RateCoefficients)>,
}

impl LogicalReaction {
    /// Seeds a logical reaction from its first contributing `Reaction`.
    pub fn new(first: &Reaction) -> Self {
        Self {
            pe_name: first.pe_name.clone(),
            chapter: first.chapter,
            reactants: first.reactants.clone(),
            products: first.products.clone(),
            q_value_mev: first.q_value_mev,
            contributors: vec![(first.source.clone(), first.coefficients)],
        }
    }

    /// Folds in another data source for the same physical reaction.
    /// Rejects a duplicate source label or a Q-value mismatch greater than
    /// 1e-6 MeV.
    pub fn add_contributor(&mut self, reaction: &Reaction) -> Result<()> {
        if reaction.pe_name != self.pe_name {
            return Err(NetworkError::QValueMismatch {
                reaction: self.pe_name.clone(),
                source: reaction.source.clone(),
                existing: self.q_value_mev,
                new: reaction.q_value_mev,
            });
        }
        if (reaction.q_value_mev - self.q_value_mev).abs() > 1e-6 {
            return Err(NetworkError::QValueMismatch {
                reaction: self.pe_name.clone(),
                source: reaction.source.clone(),
                existing: self.q_value_mev,
                new: reaction.q_value_mev,
            });
        }
        if self
            .contributors
            .iter()
            .any(|(source, _)| source == &reaction.source)
        {
            return Err(NetworkError::DuplicateSource {
                reaction: self.pe_name.clone(),
                source: reaction.source.clone(),
            });
        }
        self.contributors
            .push((reaction.source.clone(), reaction.coefficients));
        Ok(())
    }

    pub fn pe_name(&self) -> &str {
        &self.pe_name
    }

    pub fn chapter(&self) -> Chapter {
        self.chapter
    }

    pub fn reactants(&self) -> &[Species] {
        &self.reactants
    }

    pub fn products(&self) -> &[Species] {
        &self.products
    }

    pub fn q_value_mev(&self) -> f64 {
        self.q_value_mev
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.contributors.iter().map(|(s, _)| s.as_str())
    }

    /// `sum_k exp(poly_k(T9))` over every contributor.
    pub fn rate<S: Scalar>(&self, t9: S) -> S {
        let mut iter = self.contributors.iter();
        let (_, first) = iter.next().expect("a logical reaction always has >=1 contributor");
        let mut total = first.rate(t9);
        for (_, coeffs) in iter {
            total += coeffs.rate(t9);
        }
        total
    }

    pub fn reactant_symmetry_factor(&self) -> f64 {
        symmetry_factor(&self.reactants)
    }

    pub fn product_symmetry_factor(&self) -> f64 {
        symmetry_factor(&self.products)
    }

    /// `d(ln k)/dT9` for the summed rate, weighted by each contributor's
    /// share of the total: `sum_k exp(f_k) f_k' / sum_k exp(f_k)`.
    pub fn forward_log_derivative(&self, t9: f64) -> f64 {
        let mut weighted_sum = 0.0;
        let mut total = 0.0;
        for (_, coeffs) in &self.contributors {
            let rate = coeffs.rate(t9);
            weighted_sum += rate * coeffs.dlnk_dt9(t9);
            total += rate;
        }
        if total == 0.0 {
            0.0
        } else {
            weighted_sum / total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::rate::RateCoefficients;

    fn species(z: u16, a: u16) -> Species {
        Species::new(z, a)
    }

    fn dummy_coeffs() -> RateCoefficients {
        RateCoefficients::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
    }

    #[test]
    fn conservation_violation_is_rejected() {
        let p = species(1, 1);
        let d = species(1, 2);
        let he3 = species(2, 3);
        let err = Reaction::new(
            "p(p,g)d",
            1,
            vec![p, p],
            vec![he3],
            1.0,
            "test",
            dummy_coeffs(),
            false,
        );
        assert!(err.is_err());
        let _ = d;
    }

    #[test]
    fn valid_reaction_conserves_a_and_z() {
        let p = species(1, 1);
        let d = species(1, 2);
        let he3 = species(2, 3);
        let r = Reaction::new(
            "p(d,g)he3",
            2,
            vec![p, d],
            vec![he3],
            5.49,
            "nacre",
            dummy_coeffs(),
            false,
        )
        .unwrap();
        assert_eq!(r.pe_name(), "p(d,g)he3");
    }

    #[test]
    fn logical_reaction_rate_is_additive() {
        let p = species(1, 1);
        let d = species(1, 2);
        let he3 = species(2, 3);
        let r1 = Reaction::new(
            "p(d,g)he3",
            2,
            vec![p, d],
            vec![he3],
            5.49,
            "a",
            RateCoefficients::new([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            false,
        )
        .unwrap();
        let r2 = Reaction::new(
            "p(d,g)he3",
            2,
            vec![p, d],
            vec![he3],
            5.49,
            "b",
            RateCoefficients::new([2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            false,
        )
        .unwrap();
        let mut logical = LogicalReaction::new(&r1);
        logical.add_contributor(&r2).unwrap();
        let t9 = 1.0;
        let expected = r1.rate(t9) + r2.rate(t9);
        assert!((logical.rate(t9) - expected).abs() < 1e-12);
    }

    #[test]
    fn duplicate_source_is_rejected() {
        let p = species(1, 1);
        let d = species(1, 2);
        let he3 = species(2, 3);
        let r1 = Reaction::new(
            "p(d,g)he3", 2, vec![p, d], vec![he3], 5.49, "a", dummy_coeffs(), false,
        )
        .unwrap();
        let r2 = Reaction::new(
            "p(d,g)he3", 2, vec![p, d], vec![he3], 5.49, "a", dummy_coeffs(), false,
        )
        .unwrap();
        let mut logical = LogicalReaction::new(&r1);
        assert!(logical.add_contributor(&r2).is_err());
    }
}
