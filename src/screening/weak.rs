//! Weak (Salpeter) electron screening.
//!
//! `H = prefactor * Z1 * Z2` for a two-body reaction (`H = 3 * prefactor *
//! 4` for triple-alpha), clipped at 2 and collapsed to zero below
//! `T9 = 1e-9`, with `factor = exp(H)`. All branches are evaluated
//! branch-free via [`Scalar::select_lt`] so the AD tape never forks — see
//! `crate::scalar` for why.

use crate::ad::Var;
use crate::reaction::LogicalReactionSet;
use crate::scalar::Scalar;
use crate::species::Species;

use super::ScreeningModel;

const LOW_T9_THRESHOLD: f64 = 1e-9;
const H_CLIP: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct WeakScreeningModel;

fn factors_impl<S: Scalar>(
    reactions: &LogicalReactionSet,
    species: &[Species],
    y: &[S],
    t9: S,
    rho: S,
) -> Vec<S> {
    let zero = t9.constant(0.0);
    let one = t9.constant(1.0);

    let mut zeta = zero;
    for (s, yi) in species.iter().zip(y.iter()) {
        let z = t9.constant(s.z as f64);
        zeta += (z * z + z) * *yi;
    }

    let low_t_flag = t9.select_lt(t9.constant(LOW_T9_THRESHOLD), zero, one);

    let t7 = t9 * t9.constant(100.0);
    let t7_safe = t7.select_lt(t9.constant(LOW_T9_THRESHOLD), t9.constant(LOW_T9_THRESHOLD), t7);
    let prefactor = t9.constant(0.188) * (rho / (t7_safe * t7_safe * t7_safe)).sqrt() * zeta.sqrt();

    let mut factors = Vec::with_capacity(reactions.len());
    for reaction in reactions.iter() {
        let reactants = reaction.reactants();
        let is_triple_alpha = reactants.len() == 3
            && reactants.iter().all(|s| s.z == 2)
            && reactants[0] == reactants[1]
            && reactants[1] == reactants[2];

        let mut h = zero;
        if reactants.len() == 2 {
            let z1 = t9.constant(reactants[0].z as f64);
            let z2 = t9.constant(reactants[1].z as f64);
            h = prefactor * z1 * z2;
        } else if is_triple_alpha {
            let z_alpha = t9.constant(2.0);
            let h_alpha_alpha = prefactor * z_alpha * z_alpha;
            h = t9.constant(3.0) * h_alpha_alpha;
        }

        h = h * low_t_flag;
        h = h.select_lt(t9.constant(H_CLIP), h, t9.constant(H_CLIP));
        factors.push(h.exp());
    }
    factors
}

impl ScreeningModel for WeakScreeningModel {
    fn factors_f64(
        &self,
        reactions: &LogicalReactionSet,
        species: &[Species],
        y: &[f64],
        t9: f64,
        rho: f64,
    ) -> Vec<f64> {
        factors_impl(reactions, species, y, t9, rho)
    }

    fn factors_ad<'t>(
        &self,
        reactions: &LogicalReactionSet,
        species: &[Species],
        y: &[Var<'t>],
        t9: Var<'t>,
        rho: Var<'t>,
    ) -> Vec<Var<'t>> {
        factors_impl(reactions, species, y, t9, rho)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::rate::RateCoefficients;
    use crate::reaction::reaction::Reaction;

    fn two_body_set() -> (LogicalReactionSet, Vec<Species>) {
        let p = Species::new(1, 1);
        let d = Species::new(1, 2);
        let he3 = Species::new(2, 3);
        let r = Reaction::new(
            "p(d,g)he3",
            2,
            vec![p, d],
            vec![he3],
            5.49,
            "nacre",
            RateCoefficients::new([0.0; 7]),
            false,
        )
        .unwrap();
        let mut set = LogicalReactionSet::new();
        set.insert_or_merge(&r).unwrap();
        (set, vec![p, d, he3])
    }

    #[test]
    fn collapses_to_one_below_low_temperature_threshold() {
        let (set, species) = two_body_set();
        let factors = WeakScreeningModel.factors_f64(&set, &species, &[0.5, 0.5, 0.0], 1e-10, 100.0);
        assert_eq!(factors, vec![1.0]);
    }

    #[test]
    fn factor_exceeds_one_at_typical_stellar_conditions() {
        let (set, species) = two_body_set();
        let factors = WeakScreeningModel.factors_f64(&set, &species, &[0.5, 0.5, 0.0], 0.015, 1e5);
        assert!(factors[0] > 1.0);
    }

    #[test]
    fn clips_at_exp_two() {
        let (set, species) = two_body_set();
        // Extreme density/zeta to push H past the clip.
        let factors = WeakScreeningModel.factors_f64(&set, &species, &[100.0, 100.0, 0.0], 0.1, 1e10);
        assert!((factors[0] - H_CLIP.exp()).abs() < 1e-9);
    }
}
