mod client;

pub mod types;

pub use client::config::{Config, ConfigBuilder};
pub use client::{Client, ServerRx, connect, connect_with_config};
