pub mod build;
pub mod config;
pub mod errors;
pub mod launch;
pub mod provision;
pub mod stage;
