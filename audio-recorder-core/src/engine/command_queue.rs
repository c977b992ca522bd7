use crossbeam_channel::{Receiver, Sender};

use crate::models::command::Command;
use crate::models::error::RecorderError;

/// Unbounded multi-producer, single-consumer FIFO of engine commands.
///
/// Producers (callers, the schedule bridge, the capture callback) hold
/// `CommandSender` handles; the engine's consumer thread owns the queue and
/// is the only caller of `pop`.
#[derive(Debug)]
pub struct CommandQueue {
    sender: Sender<Command>,
    receiver: Receiver<Command>,
}

/// Cloneable producer handle for a `CommandQueue`.
#[derive(Debug, Clone)]
pub struct CommandSender {
    sender: Sender<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> CommandSender {
        CommandSender {
            sender: self.sender.clone(),
        }
    }

    /// Enqueue a command. Never blocks.
    #[cfg(test)]
    pub(crate) fn push(&self, command: Command) {
        // The queue holds its own sender, so the channel cannot be disconnected here.
        let _ = self.sender.send(command);
    }

    /// Block until a command is available and remove it.
    ///
    /// Only returns `None` if the channel is disconnected, which cannot happen
    /// while the queue itself is alive.
    pub fn pop(&self) -> Option<Command> {
        self.receiver.recv().ok()
    }

    /// Remove the next command if one is already queued.
    #[cfg(test)]
    pub(crate) fn try_pop(&self) -> Option<Command> {
        self.receiver.try_recv().ok()
    }

    /// Number of commands waiting.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.receiver.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSender {
    /// Enqueue a command. Never blocks.
    ///
    /// Fails with `EngineStopped` once the consumer side has been dropped.
    pub fn push(&self, command: Command) -> Result<(), RecorderError> {
        self.sender
            .send(command)
            .map_err(|_| RecorderError::EngineStopped)
    }
}
