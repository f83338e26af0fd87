pub mod actions;
pub mod audio;
pub mod config;
pub mod diagnostics;
pub mod emergency;
pub mod engine;
pub mod input;
pub mod models;
pub mod publish;
