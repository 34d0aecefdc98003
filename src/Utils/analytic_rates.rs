//! Closed-form rate coefficients and a material provider built on them.
//!
//! Real runs take `k(ε)` from BOLSIG+ tables interpolated elsewhere; the models here stand in
//! for that provider in demos and tests, where an exact `dk/dε` is needed.

use crate::Kernels::material_fields::{
    FieldHandle, FieldKey, FieldLayout, FieldProvider, FieldValues, RateFieldProvider,
};
use crate::Kernels::qp_data::{CoupledValues, VarId};

/// k = const
#[derive(Debug, Clone, Copy)]
pub struct ConstantRate(pub f64);

impl RateFieldProvider for ConstantRate {
    fn rate_and_derivative(&self, _mean_energy: f64) -> (f64, f64) {
        (self.0, 0.0)
    }
}

/// k = A * exp(-B/ε), ε in eV
#[derive(Debug, Clone, Copy)]
pub struct ArrheniusRate {
    pub a: f64,
    pub b: f64,
}

impl ArrheniusRate {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }
}

impl RateFieldProvider for ArrheniusRate {
    fn rate_and_derivative(&self, mean_energy: f64) -> (f64, f64) {
        let k = self.a * f64::exp(-self.b / mean_energy);
        (k, k * self.b / (mean_energy * mean_energy))
    }
}

struct RateEntry {
    k: FieldHandle,
    d_k: FieldHandle,
    model: Box<dyn RateFieldProvider + Send + Sync>,
}

/// Declares rate and constant fields in a layout and fills them point by point.
pub struct MaterialProvider {
    electrons: VarId,
    mean_energy: VarId,
    rates: Vec<RateEntry>,
    constants: Vec<(FieldHandle, f64)>,
}

impl MaterialProvider {
    pub fn new(electrons: VarId, mean_energy: VarId) -> Self {
        Self {
            electrons,
            mean_energy,
            rates: Vec::new(),
            constants: Vec::new(),
        }
    }

    pub fn add_rate(
        &mut self,
        layout: &mut FieldLayout,
        reaction: &str,
        number: &str,
        model: impl RateFieldProvider + Send + Sync + 'static,
    ) -> &mut Self {
        let k = layout.declare(FieldKey::rate(reaction, number));
        let d_k = layout.declare(FieldKey::rate_derivative(reaction, number));
        self.rates.push(RateEntry {
            k,
            d_k,
            model: Box::new(model),
        });
        self
    }

    pub fn add_constant(&mut self, layout: &mut FieldLayout, key: FieldKey, value: f64) -> &mut Self {
        let handle = layout.declare(key);
        self.constants.push((handle, value));
        self
    }

    /// Values for one point, laid out by `layout`.
    pub fn values_at(&self, layout: &FieldLayout, vars: &CoupledValues) -> FieldValues {
        let mut out = FieldValues::new(layout);
        self.compute_qp_properties(vars, &mut out);
        out
    }
}

impl FieldProvider for MaterialProvider {
    fn compute_qp_properties(&self, vars: &CoupledValues, out: &mut FieldValues) {
        let mean_energy = vars.get(self.mean_energy) / vars.get(self.electrons);
        for entry in &self.rates {
            let (k, d_k) = entry.model.rate_and_derivative(mean_energy);
            out.set(entry.k, k);
            out.set(entry.d_k, d_k);
        }
        for (handle, value) in &self.constants {
            out.set(*handle, *value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_arrhenius_derivative() {
        let rate = ArrheniusRate::new(1e-13, 11.5);
        let eps = 4.0;
        let h = 1e-6 * eps;
        let (_, d_k) = rate.rate_and_derivative(eps);
        let fd = (rate.rate_and_derivative(eps + h).0 - rate.rate_and_derivative(eps - h).0)
            / (2.0 * h);
        assert_relative_eq!(d_k, fd, max_relative = 1e-6);
    }

    #[test]
    fn test_provider_uses_mean_energy_per_electron() {
        let mut layout = FieldLayout::new();
        let mut provider = MaterialProvider::new(VarId(0), VarId(1));
        provider
            .add_rate(&mut layout, "ionization", "", ArrheniusRate::new(2.0, 3.0))
            .add_constant(&mut layout, FieldKey::mass("Ar"), 6.6e-26);
        let vars = CoupledValues::from_vec(vec![1e16, 3e16]);
        let values = provider.values_at(&layout, &vars);

        let k = layout.resolve(&FieldKey::rate("ionization", "")).unwrap();
        let mass = layout.resolve(&FieldKey::mass("Ar")).unwrap();
        assert_relative_eq!(values.get(k), 2.0 * f64::exp(-1.0), max_relative = 1e-12);
        assert_eq!(values.get(mass), 6.6e-26);
    }
}
