pub mod buffer_pool;
pub mod capture_sink;
pub mod command_queue;
pub mod notifier;
pub mod recorder;

#[cfg(test)]
pub(crate) mod testing;
