pub mod model;
pub mod sandbox_options;
