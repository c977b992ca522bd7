pub mod bridge;
pub mod runner;
pub mod schedule;
