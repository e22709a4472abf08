pub mod api;
pub mod app;
pub mod config;
pub mod fixtures;
pub mod forms;
pub mod logging;
pub mod resources;
pub mod state;
