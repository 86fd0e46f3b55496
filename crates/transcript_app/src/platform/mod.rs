pub mod commands;
pub mod dashboard;
pub mod effects;
pub mod logging;
pub mod render;
