//! Production/loss of a species in an electron-impact reaction.
//!
//! ```text
//! R = -test * n_e * n_t * k(n_eps/n_e) * c
//! ```
//! `c` is the signed stoichiometric coefficient of the species whose equation is assembled.
//! The same reaction enters the electron, target and product equations, and its derivatives
//! differ per row: on the electron row the electron dependence is the diagonal block, on the
//! target row the target dependence is. The row is read from `QpContext::equation` on every
//! call, so one kernel value is a pure function of its arguments.
//!
//! An off-diagonal entry is never produced for the row's own unknown; that derivative is
//! delivered by `compute_qp_jacobian` only, so self and cross calls cannot count it twice.

use super::kernel_api::{
    KernelError, KernelType, ReactionDescriptor, ReactionKernel, Target, sym_unknowns,
    validate_finite,
};
use super::kernel_config::{ReactionConfig, VariableRegistry};
use super::material_fields::{FieldHandle, FieldKey, FieldLayout};
use super::qp_data::{QpState, VarId};
use RustedSciThe::symbolic::symbolic_engine::Expr;
use log::{info, warn};

#[derive(Debug, Clone)]
pub struct EEDFReaction {
    descriptor: ReactionDescriptor,
    variable: VarId,
    mean_en: VarId,
    em: VarId,
    reaction_coeff: FieldHandle,
    d_k_d_actual_mean_en: FieldHandle,
}

impl EEDFReaction {
    pub fn from_config(
        config: &ReactionConfig,
        variables: &VariableRegistry,
        layout: &FieldLayout,
    ) -> Result<Self, KernelError> {
        validate_finite("coefficient", config.coefficient)?;
        let variable = variables.id(&config.variable)?;
        let mean_en = variables.id(&config.mean_energy)?;
        let em = variables.id(&config.electrons)?;
        if variable == mean_en {
            return Err(KernelError::InvalidCoupling(format!(
                "EEDFReaction acts on species densities, not on the energy variable '{}'",
                config.mean_energy
            )));
        }
        if em == mean_en {
            return Err(KernelError::InvalidCoupling(format!(
                "electrons '{}' cannot be the energy variable",
                config.electrons
            )));
        }
        let target = match &config.target {
            Some(name) => {
                let id = variables.id(name)?;
                if id == em || id == mean_en {
                    return Err(KernelError::InvalidCoupling(format!(
                        "target '{}' must be a heavy species",
                        name
                    )));
                }
                Target::Species(id)
            }
            None => Target::BackgroundGas,
        };
        let reaction_coeff = layout.resolve(&FieldKey::rate(&config.reaction, &config.number))?;
        let d_k_d_actual_mean_en =
            layout.resolve(&FieldKey::rate_derivative(&config.reaction, &config.number))?;
        if config.coefficient == 0.0 {
            warn!(
                "EEDFReaction on '{}' for '{}' has zero coefficient and contributes nothing",
                config.variable, config.reaction
            );
        }

        let mut descriptor = ReactionDescriptor::new(&config.reaction, &config.number, target);
        descriptor.coefficient = config.coefficient;
        info!(
            "EEDFReaction on '{}': reaction '{}', coefficient {}, target {:?}",
            config.variable, config.reaction, config.coefficient, target
        );
        Ok(Self {
            descriptor,
            variable,
            mean_en,
            em,
            reaction_coeff,
            d_k_d_actual_mean_en,
        })
    }

    fn target_value(&self, qp: &QpState) -> f64 {
        match self.descriptor.target {
            Target::Species(id) => qp.var(id),
            Target::BackgroundGas => 1.0,
        }
    }

    /// d R / d n_e: direct density term plus the rate change through n_eps/n_e.
    fn d_residual_d_em(&self, qp: &QpState) -> f64 {
        let em = qp.var(self.em);
        let phi = qp.ctx.phi;
        let d_k_d_em =
            qp.field(self.d_k_d_actual_mean_en) * -(qp.var(self.mean_en) / (em * em)) * phi;

        -qp.ctx.test
            * self.target_value(qp)
            * self.descriptor.coefficient
            * (qp.field(self.reaction_coeff) * phi + d_k_d_em * em)
    }

    /// d R / d n_t: the rate coefficient does not depend on the target.
    fn d_residual_d_target(&self, qp: &QpState) -> f64 {
        -qp.ctx.test
            * qp.var(self.em)
            * qp.ctx.phi
            * qp.field(self.reaction_coeff)
            * self.descriptor.coefficient
    }
}

impl ReactionKernel for EEDFReaction {
    fn compute_qp_residual(&self, qp: &QpState) -> f64 {
        -qp.ctx.test
            * qp.var(self.em)
            * self.target_value(qp)
            * qp.field(self.reaction_coeff)
            * self.descriptor.coefficient
    }

    fn compute_qp_jacobian(&self, qp: &QpState) -> f64 {
        let equation = qp.ctx.equation;
        if equation == self.em {
            self.d_residual_d_em(qp)
        } else if self.descriptor.target.is(equation) {
            self.d_residual_d_target(qp)
        } else {
            0.0
        }
    }

    fn compute_qp_off_diag_jacobian(&self, qp: &QpState, jvar: VarId) -> f64 {
        if jvar == qp.ctx.equation {
            return 0.0;
        }
        if jvar == self.mean_en {
            let em = qp.var(self.em);
            let d_k_d_mean_en = qp.field(self.d_k_d_actual_mean_en) * (1.0 / em) * qp.ctx.phi;
            -qp.ctx.test
                * em
                * self.target_value(qp)
                * d_k_d_mean_en
                * self.descriptor.coefficient
        } else if jvar == self.em {
            self.d_residual_d_em(qp)
        } else if self.descriptor.target.is(jvar) {
            self.d_residual_d_target(qp)
        } else {
            0.0
        }
    }

    fn residual_sym(&self, qp: &QpState, rate: &dyn Fn(Expr) -> Expr) -> Expr {
        let (n_e, n_eps, n_t) = sym_unknowns(self.descriptor.target);
        let k = rate(n_eps / n_e.clone());
        Expr::Const(-qp.ctx.test) * n_e * n_t * k * Expr::Const(self.descriptor.coefficient)
    }

    fn descriptor(&self) -> &ReactionDescriptor {
        &self.descriptor
    }

    fn variable(&self) -> VarId {
        self.variable
    }

    fn coupled_variables(&self) -> Vec<VarId> {
        let mut vars = vec![self.mean_en, self.em];
        vars.extend(self.descriptor.target.id());
        vars
    }

    fn kernel_type(&self) -> KernelType {
        KernelType::Reaction
    }
}
