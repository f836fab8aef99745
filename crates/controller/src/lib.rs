pub mod config;
pub mod controller;
pub mod hygiene;
pub mod levels;
pub mod persistence;
pub mod state;
pub mod view;
