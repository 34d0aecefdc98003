//! Energy sink/source of an inelastic reaction with a fixed threshold energy.
//!
//! ```text
//! R = -test * k(n_eps/n_e) * n_e * n_t * E_th
//! ```
//! Without a coupled target the reaction runs against the background gas, whose density is
//! already inside `k`: `n_t = 1` and there is no target Jacobian entry.

use super::kernel_api::{
    KernelError, KernelType, ReactionDescriptor, ReactionKernel, Target, sym_unknowns,
    validate_finite,
};
use super::kernel_config::{EnergyConfig, VariableRegistry};
use super::material_fields::{FieldHandle, FieldKey, FieldLayout};
use super::qp_data::{QpState, VarId};
use RustedSciThe::symbolic::symbolic_engine::Expr;
use log::info;

#[derive(Debug, Clone)]
pub struct EEDFEnergy {
    descriptor: ReactionDescriptor,
    mean_en: VarId,
    em: VarId,
    reaction_coeff: FieldHandle,
    d_k_d_actual_mean_en: FieldHandle,
}

impl EEDFEnergy {
    pub fn from_config(
        config: &EnergyConfig,
        variables: &VariableRegistry,
        layout: &FieldLayout,
    ) -> Result<Self, KernelError> {
        validate_finite("threshold_energy", config.threshold_energy)?;
        let mean_en = variables.id(&config.variable)?;
        let em = variables.id(&config.electrons)?;
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

        let mut descriptor = ReactionDescriptor::new(&config.reaction, &config.number, target);
        descriptor.threshold_energy = config.threshold_energy;
        info!(
            "EEDFEnergy on '{}': reaction '{}', threshold {} eV, target {:?}",
            config.variable, config.reaction, config.threshold_energy, target
        );
        Ok(Self {
            descriptor,
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
}

impl ReactionKernel for EEDFEnergy {
    fn compute_qp_residual(&self, qp: &QpState) -> f64 {
        -qp.ctx.test
            * qp.field(self.reaction_coeff)
            * qp.var(self.em)
            * self.target_value(qp)
            * self.descriptor.threshold_energy
    }

    fn compute_qp_jacobian(&self, qp: &QpState) -> f64 {
        let em = qp.var(self.em);
        let d_actual_mean_en_d_mean_en = (1.0 / em) * qp.ctx.phi;
        let d_k_d_mean_en = qp.field(self.d_k_d_actual_mean_en) * d_actual_mean_en_d_mean_en;

        -qp.ctx.test
            * d_k_d_mean_en
            * em
            * self.target_value(qp)
            * self.descriptor.threshold_energy
    }

    fn compute_qp_off_diag_jacobian(&self, qp: &QpState, jvar: VarId) -> f64 {
        let em = qp.var(self.em);
        let phi = qp.ctx.phi;
        let k = qp.field(self.reaction_coeff);
        let threshold = self.descriptor.threshold_energy;

        if jvar == self.em {
            let d_actual_mean_en_d_em = -(qp.var(self.mean_en) / (em * em)) * phi;
            let d_k_d_em = qp.field(self.d_k_d_actual_mean_en) * d_actual_mean_en_d_em;
            -qp.ctx.test * threshold * self.target_value(qp) * (k * phi + d_k_d_em * em)
        } else if self.descriptor.target.is(jvar) {
            -qp.ctx.test * k * threshold * em * phi
        } else {
            0.0
        }
    }

    fn residual_sym(&self, qp: &QpState, rate: &dyn Fn(Expr) -> Expr) -> Expr {
        let (n_e, n_eps, n_t) = sym_unknowns(self.descriptor.target);
        let k = rate(n_eps / n_e.clone());
        Expr::Const(-qp.ctx.test) * k * n_e * n_t * Expr::Const(self.descriptor.threshold_energy)
    }

    fn descriptor(&self) -> &ReactionDescriptor {
        &self.descriptor
    }

    fn variable(&self) -> VarId {
        self.mean_en
    }

    fn coupled_variables(&self) -> Vec<VarId> {
        let mut vars = vec![self.mean_en, self.em];
        vars.extend(self.descriptor.target.id());
        vars
    }

    fn kernel_type(&self) -> KernelType {
        KernelType::Energy
    }
}
