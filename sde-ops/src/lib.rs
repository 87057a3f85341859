pub mod aws;
pub mod cli;
pub mod handlers;
pub mod lambda;
pub mod load_config;
pub mod slack;

pub use cli::{run, Cli, Commands};
