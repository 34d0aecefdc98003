use super::EEDFElastic::EEDFElastic;
use super::EEDFEnergy::EEDFEnergy;
use super::EEDFReaction::EEDFReaction;
use super::kernel_config::{KernelConfig, VariableRegistry};
use super::material_fields::{FieldKey, FieldLayout};
use super::qp_data::{QpState, VarId};
use RustedSciThe::symbolic::symbolic_engine::Expr;
use enum_dispatch::enum_dispatch;
use prettytable::{Cell, Row, Table};
use thiserror::Error;

/// electron mass, kg
pub const ELECTRON_MASS: f64 = 9.11e-31;
/// symbol of the electron density in symbolic residuals
pub const SYM_ELECTRONS: &str = "n_e";
/// symbol of the electron energy density
pub const SYM_ENERGY: &str = "n_eps";
/// symbol of the target density
pub const SYM_TARGET: &str = "n_t";

/// Symbolic unknowns `(n_e, n_eps, n_t)`; a background-gas target is the constant 1.
pub fn sym_unknowns(target: Target) -> (Expr, Expr, Expr) {
    let n_t = match target {
        Target::Species(_) => Expr::Var(SYM_TARGET.to_owned()),
        Target::BackgroundGas => Expr::Const(1.0),
    };
    (
        Expr::Var(SYM_ELECTRONS.to_owned()),
        Expr::Var(SYM_ENERGY.to_owned()),
        n_t,
    )
}

/// Errors raised while configuring kernels. Evaluation itself never fails.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("Unknown coupled variable '{0}'")]
    UnknownVariable(String),
    #[error("Material field '{0}' is not provided")]
    MissingField(String),
    #[error("Cannot parse material field name '{0}'")]
    FieldNameParse(String),
    #[error("Invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("Invalid coupling: {0}")]
    InvalidCoupling(String),
    #[error("Unknown kernel type '{0}'")]
    UnknownKernelType(String),
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input file error: {0}")]
    InputFile(String),
}

/// Whom the electrons collide with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Species(VarId),
    /// background gas: density folded into the rate coefficient, n_t = 1
    BackgroundGas,
}

impl Target {
    pub fn id(&self) -> Option<VarId> {
        match self {
            Target::Species(id) => Some(*id),
            Target::BackgroundGas => None,
        }
    }

    pub fn is(&self, var: VarId) -> bool {
        self.id() == Some(var)
    }
}

/// Immutable per-kernel reaction data.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionDescriptor {
    pub reaction: String,
    pub number: String,
    /// signed stoichiometric coefficient of the variable the kernel acts on
    pub coefficient: f64,
    pub threshold_energy: f64,
    pub use_temp_diff: bool,
    pub target: Target,
}

impl ReactionDescriptor {
    pub fn new(reaction: &str, number: &str, target: Target) -> Self {
        Self {
            reaction: reaction.to_owned(),
            number: number.to_owned(),
            coefficient: 0.0,
            threshold_energy: 0.0,
            use_temp_diff: false,
            target,
        }
    }
}

/// Residual and Jacobian contributions of one reaction term at a quadrature point.
#[enum_dispatch]
pub trait ReactionKernel {
    /// weak-form residual for test function `ctx.i`
    fn compute_qp_residual(&self, qp: &QpState) -> f64;
    /// derivative of the residual w.r.t. the equation's own unknown, trial function `ctx.j`
    fn compute_qp_jacobian(&self, qp: &QpState) -> f64;
    /// derivative of the residual w.r.t. another unknown `jvar`, trial function `ctx.j`
    fn compute_qp_off_diag_jacobian(&self, qp: &QpState, jvar: VarId) -> f64;
    /// residual integrand as a symbolic expression of `n_e`, `n_eps`, `n_t`
    fn residual_sym(&self, qp: &QpState, rate: &dyn Fn(Expr) -> Expr) -> Expr;
    fn descriptor(&self) -> &ReactionDescriptor;
    /// the variable (equation row) the kernel is configured on
    fn variable(&self) -> VarId;
    /// every unknown the residual depends on
    fn coupled_variables(&self) -> Vec<VarId>;
    fn kernel_type(&self) -> KernelType;
}

#[derive(Debug, Clone)]
#[enum_dispatch(ReactionKernel)]
pub enum ReactionKernelEnum {
    Elastic(EEDFElastic),
    Energy(EEDFEnergy),
    Reaction(EEDFReaction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelType {
    Elastic,
    Energy,
    Reaction,
}

impl KernelType {
    pub fn name(&self) -> &'static str {
        match self {
            KernelType::Elastic => "EEDFElastic",
            KernelType::Energy => "EEDFEnergy",
            KernelType::Reaction => "EEDFReaction",
        }
    }
}

pub fn kernel_type_by_name(name: &str) -> Result<KernelType, KernelError> {
    match name {
        "EEDFElastic" | "elastic" => Ok(KernelType::Elastic),
        "EEDFEnergy" | "energy" => Ok(KernelType::Energy),
        "EEDFReaction" | "reaction" => Ok(KernelType::Reaction),
        _ => Err(KernelError::UnknownKernelType(name.to_owned())),
    }
}

/////////////////////////////////////////////////////////////////////////////////////////
// FACTORY METHODS  ////////////////////////////////////////////////////////////////////
pub fn create_kernel(
    config: &KernelConfig,
    variables: &VariableRegistry,
    layout: &FieldLayout,
) -> Result<ReactionKernelEnum, KernelError> {
    let (reaction, number) = config.rate_name();
    FieldKey::check_rate_names(reaction, number)?;
    let kernel = match config {
        KernelConfig::EEDFElastic(cfg) => {
            ReactionKernelEnum::Elastic(EEDFElastic::from_config(cfg, variables, layout)?)
        }
        KernelConfig::EEDFEnergy(cfg) => {
            ReactionKernelEnum::Energy(EEDFEnergy::from_config(cfg, variables, layout)?)
        }
        KernelConfig::EEDFReaction(cfg) => {
            ReactionKernelEnum::Reaction(EEDFReaction::from_config(cfg, variables, layout)?)
        }
    };
    Ok(kernel)
}

pub fn build_kernels(
    configs: &[KernelConfig],
    variables: &VariableRegistry,
    layout: &FieldLayout,
) -> Result<Vec<ReactionKernelEnum>, KernelError> {
    configs
        .iter()
        .map(|config| create_kernel(config, variables, layout))
        .collect()
}

/// Table of configured kernels, one row per kernel.
pub fn kernels_table(kernels: &[ReactionKernelEnum], variables: &VariableRegistry) -> Table {
    let name_of = |id: VarId| variables.name(id).unwrap_or("?").to_owned();
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("kernel"),
        Cell::new("variable"),
        Cell::new("reaction"),
        Cell::new("target"),
        Cell::new("coefficient"),
        Cell::new("threshold, eV"),
    ]));
    for kernel in kernels {
        let descriptor = kernel.descriptor();
        let target = match descriptor.target {
            Target::Species(id) => name_of(id),
            Target::BackgroundGas => "background".to_owned(),
        };
        let reaction = if descriptor.number.is_empty() {
            descriptor.reaction.clone()
        } else {
            format!("{} (#{})", descriptor.reaction, descriptor.number)
        };
        table.add_row(Row::new(vec![
            Cell::new(kernel.kernel_type().name()),
            Cell::new(&name_of(kernel.variable())),
            Cell::new(&reaction),
            Cell::new(&target),
            Cell::new(&format!("{}", descriptor.coefficient)),
            Cell::new(&format!("{}", descriptor.threshold_energy)),
        ]));
    }
    table
}

/// Rejects NaN and infinite constants.
pub fn validate_finite(name: &'static str, value: f64) -> Result<(), KernelError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(KernelError::InvalidParameter { name, value })
    }
}
