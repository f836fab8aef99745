pub mod cli;
pub mod levels_table;
pub mod logging;
pub mod terminal;
