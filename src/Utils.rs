/// closed-form rate coefficients and a material provider for demos and tests
pub mod analytic_rates;
/// sectioned input deck loader
pub mod load_from_file;
/// local residual/Jacobian of one element and a parallel loop over elements
pub mod local_element;
