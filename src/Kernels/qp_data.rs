//! # Quadrature Point Data Contract
//!
//! Data handed to a kernel at one quadrature point by the assembly loop:
//! - [`VarId`]: opaque handle of a nonlinear unknown, compared only for equality
//! - [`QpContext`]: where we are (element, qp, test index `i`, trial index `j`), which
//!   equation row is being assembled and the values of the test and trial functions
//! - [`CoupledValues`]: values of all unknowns at the point
//! - [`QpState`]: the bundle passed to every kernel entry point
//!
//! All of it is recreated for every point and every assembly pass. Kernels only read it.

use super::material_fields::{FieldHandle, FieldValues};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a nonlinear unknown (electron density, energy density, species density...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var#{}", self.0)
    }
}

/// Position of the current evaluation inside the assembly loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QpContext {
    pub element: usize,
    pub qp: usize,
    /// test function index
    pub i: usize,
    /// trial function index, meaningful for Jacobian entries only
    pub j: usize,
    /// equation (variable row) the residual/Jacobian is assembled for
    pub equation: VarId,
    /// value of test function `i` at the point
    pub test: f64,
    /// value of trial function `j` at the point
    pub phi: f64,
}

impl QpContext {
    /// Context for a residual entry: no trial function involved.
    pub fn residual(element: usize, qp: usize, i: usize, equation: VarId, test: f64) -> Self {
        Self {
            element,
            qp,
            i,
            j: 0,
            equation,
            test,
            phi: 0.0,
        }
    }

    /// Context for a Jacobian entry (i, j).
    pub fn jacobian(
        element: usize,
        qp: usize,
        i: usize,
        j: usize,
        equation: VarId,
        test: f64,
        phi: f64,
    ) -> Self {
        Self {
            element,
            qp,
            i,
            j,
            equation,
            test,
            phi,
        }
    }
}

/// Values of the nonlinear unknowns at one quadrature point, indexed by [`VarId`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoupledValues {
    values: Vec<f64>,
}

impl CoupledValues {
    pub fn new(n_vars: usize) -> Self {
        Self {
            values: vec![0.0; n_vars],
        }
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// The handle must come from the same variable registry the vector was sized for.
    #[inline]
    pub fn get(&self, var: VarId) -> f64 {
        self.values[var.0]
    }

    pub fn set(&mut self, var: VarId, value: f64) {
        if var.0 >= self.values.len() {
            self.values.resize(var.0 + 1, 0.0);
        }
        self.values[var.0] = value;
    }

    /// Copy with one unknown shifted by `delta`.
    pub fn perturbed(&self, var: VarId, delta: f64) -> Self {
        let mut values = self.clone();
        values.values[var.0] += delta;
        values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Everything a kernel sees at one point.
#[derive(Debug, Clone, Copy)]
pub struct QpState<'a> {
    pub ctx: QpContext,
    pub vars: &'a CoupledValues,
    pub fields: &'a FieldValues,
}

impl<'a> QpState<'a> {
    pub fn new(ctx: QpContext, vars: &'a CoupledValues, fields: &'a FieldValues) -> Self {
        Self { ctx, vars, fields }
    }

    #[inline]
    pub fn var(&self, var: VarId) -> f64 {
        self.vars.get(var)
    }

    #[inline]
    pub fn field(&self, handle: FieldHandle) -> f64 {
        self.fields.get(handle)
    }

    /// Same point and fields, different test/trial indices and values.
    pub fn with_ctx(&self, ctx: QpContext) -> Self {
        Self {
            ctx,
            vars: self.vars,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupled_values_set_grows() {
        let mut values = CoupledValues::new(2);
        values.set(VarId(4), 3.5);
        assert_eq!(values.len(), 5);
        assert_eq!(values.get(VarId(4)), 3.5);
        assert_eq!(values.get(VarId(1)), 0.0);
    }

    #[test]
    fn test_perturbed_leaves_original() {
        let values = CoupledValues::from_vec(vec![1.0, 2.0]);
        let shifted = values.perturbed(VarId(1), 0.5);
        assert_eq!(values.get(VarId(1)), 2.0);
        assert_eq!(shifted.get(VarId(1)), 2.5);
        assert_eq!(shifted.get(VarId(0)), 1.0);
    }

    #[test]
    fn test_residual_context_has_no_trial() {
        let ctx = QpContext::residual(3, 1, 2, VarId(0), 0.25);
        assert_eq!(ctx.phi, 0.0);
        assert_eq!(ctx.j, 0);
        assert_eq!(ctx.equation, VarId(0));
    }
}
