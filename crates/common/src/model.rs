pub mod level;
pub mod verdict;
