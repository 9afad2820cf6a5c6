//! The bare (no-screening) model: every factor is 1.

use crate::ad::Var;
use crate::reaction::LogicalReactionSet;
use crate::scalar::Scalar;
use crate::species::Species;

use super::ScreeningModel;

#[derive(Debug, Clone, Copy, Default)]
pub struct BareScreeningModel;

impl ScreeningModel for BareScreeningModel {
    fn factors_f64(
        &self,
        reactions: &LogicalReactionSet,
        _species: &[Species],
        _y: &[f64],
        _t9: f64,
        _rho: f64,
    ) -> Vec<f64> {
        vec![1.0; reactions.len()]
    }

    fn factors_ad<'t>(
        &self,
        reactions: &LogicalReactionSet,
        _species: &[Species],
        _y: &[Var<'t>],
        t9: Var<'t>,
        _rho: Var<'t>,
    ) -> Vec<Var<'t>> {
        vec![t9.constant(1.0); reactions.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::rate::RateCoefficients;
    use crate::reaction::reaction::Reaction;

    #[test]
    fn all_factors_are_one() {
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
        let factors = BareScreeningModel.factors_f64(&set, &[p, d, he3], &[0.5, 0.5, 0.0], 1.0, 100.0);
        assert_eq!(factors, vec![1.0]);
    }
}
