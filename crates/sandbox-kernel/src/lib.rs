pub mod constants;
pub mod harness;
pub mod sandbox;
