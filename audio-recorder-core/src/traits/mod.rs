pub mod input_backend;
pub mod recorder_listener;
pub mod scheduler;
