pub mod config;
pub mod dashboard;
pub mod tmux;
pub mod ui;
pub mod usage;
