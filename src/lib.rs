#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Kernels;
#[allow(non_snake_case)]
pub mod Utils;
