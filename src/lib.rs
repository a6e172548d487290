pub mod types;
pub mod cities;
pub mod config;
pub mod query;
pub mod fetch;
pub mod heat;
pub mod styles;
pub mod render;
pub mod scene;
pub mod dashboard;
pub mod server;
