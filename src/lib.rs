pub mod agi;
pub mod app;
pub mod backend;
pub mod config;
pub mod correlation;
pub mod lifecycle;
pub mod logging;
