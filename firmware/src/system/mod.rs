//! Core system components shared between tasks
pub mod config;
pub mod event;
pub mod indicator;
pub mod measure;
pub mod publication;
pub mod resources;
pub mod state;
