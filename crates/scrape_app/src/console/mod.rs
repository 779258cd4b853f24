mod app;
mod commands;
pub mod config;
mod effects;
pub mod logging;
mod render;

pub use app::run;
