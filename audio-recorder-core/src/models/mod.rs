pub mod command;
pub mod config;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod recording_result;
pub mod state;
