pub const CARGO_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION: &str = match option_env!("GITHUB_SHA") {
    Some(v) => v,
    None => "development",
};
