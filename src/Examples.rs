pub mod eedf_examples;
