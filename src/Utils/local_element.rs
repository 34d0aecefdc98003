//! # Local Element Driver
//!
//! A minimal stand-in for the finite-element assembly loop: it walks the quadrature points
//! and basis functions of one element and collects kernel values into a local residual vector
//! and local Jacobian blocks. Useful for demos and for checking kernels against finite
//! differences of whole element residuals.
//!
//! Elements are independent, so `element_residuals` evaluates them in parallel with rayon;
//! every element owns its point data, kernels are shared read-only.

use crate::Kernels::kernel_api::{ReactionKernel, ReactionKernelEnum};
use crate::Kernels::material_fields::{FieldLayout, FieldProvider, FieldValues};
use crate::Kernels::qp_data::{CoupledValues, QpContext, QpState, VarId};
use log::info;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::collections::HashMap;

/// Data of one quadrature point: weight (with the Jacobian of the mapping folded in),
/// basis function values, unknowns and material fields.
#[derive(Debug, Clone)]
pub struct QpSample {
    pub weight: f64,
    pub basis: Vec<f64>,
    pub vars: CoupledValues,
    pub fields: FieldValues,
}

#[derive(Debug, Clone)]
pub struct LocalElement {
    pub id: usize,
    pub n_basis: usize,
    pub samples: Vec<QpSample>,
}

impl LocalElement {
    /// Interpolates nodal unknowns to the quadrature points and fills the fields there.
    ///
    /// `basis[qp][n]` is the value of basis function `n` at point `qp`.
    pub fn from_nodal(
        id: usize,
        nodal: &[CoupledValues],
        basis: &[Vec<f64>],
        weights: &[f64],
        provider: &dyn FieldProvider,
        layout: &FieldLayout,
    ) -> Self {
        let n_basis = nodal.len();
        let n_vars = nodal.first().map(|v| v.len()).unwrap_or(0);
        let samples = basis
            .iter()
            .zip(weights)
            .map(|(phi, weight)| {
                let mut vars = CoupledValues::new(n_vars);
                for var in (0..n_vars).map(VarId) {
                    let value: f64 = nodal.iter().zip(phi).map(|(u, p)| u.get(var) * p).sum();
                    vars.set(var, value);
                }
                let mut fields = FieldValues::new(layout);
                provider.compute_qp_properties(&vars, &mut fields);
                QpSample {
                    weight: *weight,
                    basis: phi.clone(),
                    vars,
                    fields,
                }
            })
            .collect();
        Self {
            id,
            n_basis,
            samples,
        }
    }
}

/// Local residual of one kernel on its own equation row.
pub fn local_residual<K: ReactionKernel>(kernel: &K, element: &LocalElement) -> DVector<f64> {
    let equation = kernel.variable();
    let mut residual = DVector::zeros(element.n_basis);
    for (qp, sample) in element.samples.iter().enumerate() {
        for i in 0..element.n_basis {
            let ctx = QpContext::residual(element.id, qp, i, equation, sample.basis[i]);
            let state = QpState::new(ctx, &sample.vars, &sample.fields);
            residual[i] += sample.weight * kernel.compute_qp_residual(&state);
        }
    }
    residual
}

/// Local Jacobian block (equation row of the kernel, column variable `jvar`).
pub fn local_jacobian<K: ReactionKernel>(
    kernel: &K,
    element: &LocalElement,
    jvar: VarId,
) -> DMatrix<f64> {
    let equation = kernel.variable();
    let mut jacobian = DMatrix::zeros(element.n_basis, element.n_basis);
    for (qp, sample) in element.samples.iter().enumerate() {
        for i in 0..element.n_basis {
            for j in 0..element.n_basis {
                let ctx = QpContext::jacobian(
                    element.id,
                    qp,
                    i,
                    j,
                    equation,
                    sample.basis[i],
                    sample.basis[j],
                );
                let state = QpState::new(ctx, &sample.vars, &sample.fields);
                let value = if jvar == equation {
                    kernel.compute_qp_jacobian(&state)
                } else {
                    kernel.compute_qp_off_diag_jacobian(&state, jvar)
                };
                jacobian[(i, j)] += sample.weight * value;
            }
        }
    }
    jacobian
}

/// Residuals of all kernels on all elements, summed per equation row.
pub fn element_residuals(
    kernels: &[ReactionKernelEnum],
    elements: &[LocalElement],
) -> Vec<HashMap<VarId, DVector<f64>>> {
    info!(
        "evaluating {} kernels on {} elements",
        kernels.len(),
        elements.len()
    );
    elements
        .par_iter()
        .map(|element| {
            let mut rows: HashMap<VarId, DVector<f64>> = HashMap::new();
            for kernel in kernels {
                let local = local_residual(kernel, element);
                *rows
                    .entry(kernel.variable())
                    .or_insert_with(|| DVector::zeros(element.n_basis)) += local;
            }
            rows
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kernels::kernel_api::{ReactionKernelEnum, create_kernel};
    use crate::Kernels::kernel_config::{KernelConfig, VariableRegistry};
    use crate::Kernels::material_fields::FieldKey;
    use crate::Utils::analytic_rates::{ArrheniusRate, MaterialProvider};
    use approx::assert_relative_eq;
    use serde_json::json;

    // two-node linear element, two-point Gauss rule on [0, 1]
    fn linear_basis() -> (Vec<Vec<f64>>, Vec<f64>) {
        let g = 0.5 / 3f64.sqrt();
        let points = [0.5 - g, 0.5 + g];
        let basis = points.iter().map(|x| vec![1.0 - x, *x]).collect();
        (basis, vec![0.5, 0.5])
    }

    struct Setup {
        variables: VariableRegistry,
        layout: FieldLayout,
        provider: MaterialProvider,
        kernels: Vec<ReactionKernelEnum>,
    }

    fn setup() -> Setup {
        let variables = VariableRegistry::new(&["em", "mean_en", "Ar", "Ar+"]);
        let mut layout = FieldLayout::new();
        let mut provider = MaterialProvider::new(VarId(0), VarId(1));
        provider
            .add_rate(&mut layout, "ionization", "", ArrheniusRate::new(5e-14, 15.8))
            .add_rate(&mut layout, "elastic", "", ArrheniusRate::new(1e-13, 1.0))
            .add_constant(&mut layout, FieldKey::mass("Ar"), 6.63e-26);
        let configs = vec![
            json!({"type": "EEDFReaction", "variable": "em", "mean_energy": "mean_en",
                   "electrons": "em", "target": "Ar", "reaction": "ionization", "coefficient": 1.0}),
            json!({"type": "EEDFReaction", "variable": "Ar", "mean_energy": "mean_en",
                   "electrons": "em", "target": "Ar", "reaction": "ionization", "coefficient": -1.0}),
            json!({"type": "EEDFReaction", "variable": "Ar+", "mean_energy": "mean_en",
                   "electrons": "em", "target": "Ar", "reaction": "ionization", "coefficient": 1.0}),
            json!({"type": "EEDFEnergy", "variable": "mean_en", "electrons": "em",
                   "target": "Ar", "reaction": "ionization", "threshold_energy": -15.8}),
            json!({"type": "EEDFElastic", "variable": "mean_en", "electrons": "em",
                   "target": "Ar", "reaction": "elastic"}),
        ];
        let kernels = configs
            .into_iter()
            .map(|c| create_kernel(&KernelConfig::from_json(c).unwrap(), &variables, &layout).unwrap())
            .collect();
        Setup {
            variables,
            layout,
            provider,
            kernels,
        }
    }

    fn nodal() -> Vec<CoupledValues> {
        vec![
            CoupledValues::from_vec(vec![1e16, 4e16, 2e22, 1e15]),
            CoupledValues::from_vec(vec![2e16, 5e16, 2.1e22, 3e15]),
        ]
    }

    fn element(s: &Setup, nodal: &[CoupledValues]) -> LocalElement {
        let (basis, weights) = linear_basis();
        LocalElement::from_nodal(7, nodal, &basis, &weights, &s.provider, &s.layout)
    }

    #[test]
    fn test_interpolation_at_points() {
        let s = setup();
        let element = element(&s, &nodal());
        assert_eq!(element.samples.len(), 2);
        let first = &element.samples[0];
        let x = first.basis[1];
        assert_relative_eq!(
            first.vars.get(VarId(0)),
            1e16 * (1.0 - x) + 2e16 * x,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_local_jacobian_matches_nodal_finite_difference() {
        let s = setup();
        let base = nodal();
        for kernel in &s.kernels {
            for jvar in (0..s.variables.len()).map(VarId) {
                let jacobian = local_jacobian(kernel, &element(&s, &base), jvar);
                for node in 0..2 {
                    let h = 1e-6 * base[node].get(jvar);
                    let mut plus = base.clone();
                    plus[node] = plus[node].perturbed(jvar, h);
                    let mut minus = base.clone();
                    minus[node] = minus[node].perturbed(jvar, -h);
                    let column = (local_residual(kernel, &element(&s, &plus))
                        - local_residual(kernel, &element(&s, &minus)))
                        / (2.0 * h);
                    for i in 0..2 {
                        let scale = column.amax().max(jacobian.column(node).amax());
                        if scale == 0.0 {
                            continue;
                        }
                        assert!(
                            (jacobian[(i, node)] - column[i]).abs() <= 1e-4 * scale,
                            "{:?} wrt {}: analytic {} vs fd {}",
                            kernel.kernel_type(),
                            jvar,
                            jacobian[(i, node)],
                            column[i]
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_parallel_residuals_match_serial() {
        let s = setup();
        let base = nodal();
        let elements: Vec<LocalElement> = (0..16)
            .map(|id| {
                let shifted: Vec<CoupledValues> = base
                    .iter()
                    .map(|u| u.perturbed(VarId(0), id as f64 * 1e14))
                    .collect();
                let mut e = element(&s, &shifted);
                e.id = id;
                e
            })
            .collect();
        let parallel = element_residuals(&s.kernels, &elements);
        assert_eq!(parallel.len(), 16);
        for (element, rows) in elements.iter().zip(&parallel) {
            let mut em_row = DVector::zeros(2);
            for kernel in s.kernels.iter().filter(|k| k.variable() == VarId(0)) {
                em_row += local_residual(kernel, element);
            }
            assert_eq!(rows[&VarId(0)], em_row);
            assert_eq!(rows.len(), 4);
        }
    }

    #[test]
    fn test_ionization_conserves_heavy_particles() {
        // loss of Ar equals gain of Ar+
        let s = setup();
        let element = element(&s, &nodal());
        let rows = &element_residuals(&s.kernels, std::slice::from_ref(&element))[0];
        let sum = &rows[&VarId(2)] + &rows[&VarId(3)];
        assert!(sum.amax() <= 1e-12 * rows[&VarId(2)].amax());
    }
}
