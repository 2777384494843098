pub mod api;
pub mod calendar;
pub mod canvas;
pub mod cli;
pub mod config;
pub mod entry;
pub mod journaling;
pub mod notify;
pub mod session;
pub mod wire;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
