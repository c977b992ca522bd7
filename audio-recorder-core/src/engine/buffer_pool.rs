use crossbeam_channel::{Receiver, Sender};

/// Free list of sample buffers shared between the capture callback and the
/// consumer thread.
///
/// The callback takes a buffer, fills it, and sends it through the command
/// queue; the consumer returns it after listeners have seen it. Once the
/// pool has warmed up, buffer delivery performs no allocation. When the pool
/// is empty (consumer lagging) `take` falls back to allocating, and when it
/// is full `recycle` lets the buffer drop.
#[derive(Debug, Clone)]
pub struct BufferPool {
    free: Sender<Vec<i16>>,
    available: Receiver<Vec<i16>>,
}

impl BufferPool {
    /// Create a pool holding up to `buffers` buffers, all pre-allocated with
    /// room for `samples_per_buffer` samples.
    pub fn new(buffers: usize, samples_per_buffer: usize) -> Self {
        let (free, available) = crossbeam_channel::bounded(buffers.max(1));
        for _ in 0..buffers {
            let _ = free.try_send(Vec::with_capacity(samples_per_buffer));
        }
        Self { free, available }
    }

    /// Get an empty buffer with capacity for at least `len` samples.
    pub fn take(&self, len: usize) -> Vec<i16> {
        match self.available.try_recv() {
            Ok(mut buffer) => {
                buffer.clear();
                buffer.reserve(len);
                buffer
            }
            Err(_) => Vec::with_capacity(len),
        }
    }

    /// Return a buffer to the pool.
    pub fn recycle(&self, mut buffer: Vec<i16>) {
        buffer.clear();
        let _ = self.free.try_send(buffer);
    }

    /// Number of buffers currently free.
    pub fn available(&self) -> usize {
        self.available.len()
    }
}
