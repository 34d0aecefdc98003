/// eng
/// Residual and Jacobian kernels of electron-impact reactions whose rate coefficients come from
/// the electron energy distribution function (EEDF), i.e. tabulated against the electron mean
/// energy. Unknowns: electron density `n_e`, electron energy density `n_eps` (mean energy per
/// electron is `n_eps/n_e`) and heavy species densities.
///
/// Every kernel is evaluated at one quadrature point for one test function (residual) or one
/// pair of test/trial functions (Jacobian) and returns a number. Rate coefficients and their
/// derivatives with respect to mean energy are supplied by a field provider; kernels only
/// differentiate closed-form expressions around them.
///
/// # Examples
/// ```rust, ignore
/// use EEDFKernels::Kernels::kernel_config::{KernelConfig, VariableRegistry};
/// use EEDFKernels::Kernels::kernel_api::{create_kernel, ReactionKernel};
/// let variables = VariableRegistry::new(&["em", "mean_en", "Ar"]);
/// let kernel = create_kernel(&config, &variables, &layout)?;
/// let r = kernel.compute_qp_residual(&qp);
/// ```
pub mod kernel_api;
/// input schema, variable registry and input deck
pub mod kernel_config;
/// typed material field keys resolved once into handles
pub mod material_fields;
/// the per-point data contract
pub mod qp_data;
/// elastic collisions: electron energy exchange with a heavy target
#[allow(non_snake_case)]
pub mod EEDFElastic;
/// threshold energy of an inelastic reaction
#[allow(non_snake_case)]
pub mod EEDFEnergy;
/// stoichiometric source/sink of a species
#[allow(non_snake_case)]
pub mod EEDFReaction;
