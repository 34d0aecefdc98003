//! Electron energy exchange in elastic collisions with a heavy target.
//!
//! Energy lost by an electron per elastic collision:
//! ```text
//! Eel = -3 (m_e / M_t) * dT,     dT = 2/3 * n_eps/n_e  [ - k_B/e * T_t ]
//! R   = -test * k(n_eps/n_e) * n_e * n_t * Eel
//! ```
//! The bracketed term is used with `use_temp_diff`. The kernel acts on the energy density
//! `n_eps`; its rate coefficient depends on the mean energy per electron `n_eps/n_e`, so every
//! derivative of `k` goes through that ratio.

use super::kernel_api::{
    ELECTRON_MASS, KernelError, KernelType, ReactionDescriptor, ReactionKernel, Target,
    sym_unknowns,
};
use super::kernel_config::{ElasticConfig, VariableRegistry};
use super::material_fields::{FieldHandle, FieldKey, FieldLayout};
use super::qp_data::{QpState, VarId};
use RustedSciThe::symbolic::symbolic_engine::Expr;
use log::info;

#[derive(Debug, Clone, Copy)]
struct TempDiffFields {
    e: FieldHandle,
    k_boltz: FieldHandle,
    t_target: FieldHandle,
}

#[derive(Debug, Clone)]
pub struct EEDFElastic {
    descriptor: ReactionDescriptor,
    mean_en: VarId,
    em: VarId,
    target: VarId,
    reaction_coeff: FieldHandle,
    d_k_d_actual_mean_en: FieldHandle,
    mass_target: FieldHandle,
    /// resolved only when the temperature difference is used
    temp_diff: Option<TempDiffFields>,
}

impl EEDFElastic {
    pub fn from_config(
        config: &ElasticConfig,
        variables: &VariableRegistry,
        layout: &FieldLayout,
    ) -> Result<Self, KernelError> {
        let mean_en = variables.id(&config.variable)?;
        let em = variables.id(&config.electrons)?;
        let target = variables.id(&config.target)?;
        if em == mean_en {
            return Err(KernelError::InvalidCoupling(format!(
                "electrons '{}' cannot be the energy variable",
                config.electrons
            )));
        }
        if target == em || target == mean_en {
            return Err(KernelError::InvalidCoupling(format!(
                "elastic target '{}' must be a heavy species",
                config.target
            )));
        }
        let reaction_coeff = layout.resolve(&FieldKey::rate(&config.reaction, &config.number))?;
        let d_k_d_actual_mean_en =
            layout.resolve(&FieldKey::rate_derivative(&config.reaction, &config.number))?;
        let mass_target = layout.resolve(&FieldKey::mass(&config.target))?;
        let temp_diff = if config.use_temp_diff {
            Some(TempDiffFields {
                e: layout.resolve(&FieldKey::ElementaryCharge)?,
                k_boltz: layout.resolve(&FieldKey::Boltzmann)?,
                t_target: layout.resolve(&FieldKey::temperature(&config.target))?,
            })
        } else {
            None
        };

        let mut descriptor =
            ReactionDescriptor::new(&config.reaction, &config.number, Target::Species(target));
        descriptor.use_temp_diff = config.use_temp_diff;
        info!(
            "EEDFElastic on '{}': reaction '{}', target '{}', temperature difference: {}",
            config.variable, config.reaction, config.target, config.use_temp_diff
        );
        Ok(Self {
            descriptor,
            mean_en,
            em,
            target,
            reaction_coeff,
            d_k_d_actual_mean_en,
            mass_target,
            temp_diff,
        })
    }

    /// Effective electron/target temperature difference, eV.
    fn temperature_difference(&self, qp: &QpState) -> f64 {
        let temp = 2.0 / 3.0 * (qp.var(self.mean_en) / qp.var(self.em));
        match &self.temp_diff {
            Some(fields) => {
                temp - qp.field(fields.k_boltz) / qp.field(fields.e) * qp.field(fields.t_target)
            }
            None => temp,
        }
    }

    fn mass_ratio_factor(&self, qp: &QpState) -> f64 {
        -3.0 * ELECTRON_MASS / qp.field(self.mass_target)
    }

    /// Energy lost per elastic collision.
    pub fn energy_loss(&self, qp: &QpState) -> f64 {
        self.mass_ratio_factor(qp) * self.temperature_difference(qp)
    }
}

impl ReactionKernel for EEDFElastic {
    fn compute_qp_residual(&self, qp: &QpState) -> f64 {
        let eel = self.energy_loss(qp);
        -qp.ctx.test
            * qp.field(self.reaction_coeff)
            * qp.var(self.em)
            * qp.var(self.target)
            * eel
    }

    fn compute_qp_jacobian(&self, qp: &QpState) -> f64 {
        let em = qp.var(self.em);
        let phi = qp.ctx.phi;
        let d_actual_mean_en_d_mean_en = (1.0 / em) * phi;
        let d_k_d_mean_en = qp.field(self.d_k_d_actual_mean_en) * d_actual_mean_en_d_mean_en;

        let eel = self.energy_loss(qp);
        let d_temp_d_mean_en = 2.0 / 3.0 * (1.0 / em) * phi;
        let d_eel_d_mean_en = self.mass_ratio_factor(qp) * d_temp_d_mean_en;

        -qp.ctx.test
            * em
            * qp.var(self.target)
            * (d_k_d_mean_en * eel + qp.field(self.reaction_coeff) * d_eel_d_mean_en)
    }

    fn compute_qp_off_diag_jacobian(&self, qp: &QpState, jvar: VarId) -> f64 {
        let em = qp.var(self.em);
        let target = qp.var(self.target);
        let k = qp.field(self.reaction_coeff);
        let phi = qp.ctx.phi;
        let eel = self.energy_loss(qp);

        if jvar == self.em {
            let mean_en = qp.var(self.mean_en);
            let d_actual_mean_en_d_em = -(mean_en / (em * em)) * phi;
            let d_k_d_em = qp.field(self.d_k_d_actual_mean_en) * d_actual_mean_en_d_em;
            let d_temp_d_em = 2.0 / 3.0 * (mean_en / (em * em)) * -phi;
            let d_eel_d_em = self.mass_ratio_factor(qp) * d_temp_d_em;

            -qp.ctx.test
                * (d_k_d_em * em * target * eel
                    + k * target * phi * eel
                    + k * em * target * d_eel_d_em)
        } else if jvar == self.target {
            -qp.ctx.test * k * eel * em * phi
        } else {
            0.0
        }
    }

    fn residual_sym(&self, qp: &QpState, rate: &dyn Fn(Expr) -> Expr) -> Expr {
        let (n_e, n_eps, n_t) = sym_unknowns(self.descriptor.target);
        let k = rate(n_eps.clone() / n_e.clone());
        let mut temp = Expr::Const(2.0 / 3.0) * (n_eps / n_e.clone());
        if let Some(fields) = &self.temp_diff {
            temp = temp
                - Expr::Const(
                    qp.field(fields.k_boltz) / qp.field(fields.e) * qp.field(fields.t_target),
                );
        }
        let eel = Expr::Const(self.mass_ratio_factor(qp)) * temp;
        Expr::Const(-qp.ctx.test) * k * n_e * n_t * eel
    }

    fn descriptor(&self) -> &ReactionDescriptor {
        &self.descriptor
    }

    fn variable(&self) -> VarId {
        self.mean_en
    }

    fn coupled_variables(&self) -> Vec<VarId> {
        vec![self.mean_en, self.em, self.target]
    }

    fn kernel_type(&self) -> KernelType {
        KernelType::Elastic
    }
}
