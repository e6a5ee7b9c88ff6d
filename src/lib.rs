//! WakaTime statistics gateway and weekly aggregation

pub mod cli;
pub mod config;
pub mod server;
pub mod services;
pub mod types;
