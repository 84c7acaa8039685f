use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::dispatch::command::Command;
use crate::dispatch::dispatch_error::DispatchError;

/// A command stamped with the purge generation it was queued under.
struct Envelope {
    command: Command,
    generation: u64,
}

/// Creates the ordered inbox between a dispatcher and its worker.
///
/// Purging is done by bumping a shared generation rather than removing
/// entries: the receiver discards any purgeable command stamped with an
/// older generation without executing it. This keeps the queue a plain
/// FIFO channel with a single writer on each side.
pub fn channel() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let generation = Arc::new(AtomicU64::new(0));
    (
        CommandSender {
            tx,
            generation: generation.clone(),
        },
        CommandReceiver {
            rx,
            generation,
            purged: 0,
        },
    )
}

pub struct CommandSender {
    tx: Sender<Envelope>,
    generation: Arc<AtomicU64>,
}

impl CommandSender {
    pub fn send(&self, command: Command) -> Result<(), DispatchError> {
        let envelope = Envelope {
            command,
            generation: self.generation.load(Ordering::SeqCst),
        };
        self.tx
            .send(envelope)
            .map_err(|_| DispatchError::WorkerUnavailable)
    }

    /// Invalidates every queued frame and reset. Start and stop survive.
    pub fn purge(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct CommandReceiver {
    rx: Receiver<Envelope>,
    generation: Arc<AtomicU64>,
    purged: u64,
}

impl CommandReceiver {
    /// Blocks for the next live command. Returns `None` once the sender is
    /// gone and the queue is drained.
    pub fn recv(&mut self) -> Option<Command> {
        loop {
            let envelope = self.rx.recv().ok()?;
            if self.is_stale(&envelope) {
                self.purged += 1;
                log::debug!("Purged queued {} command", envelope.command.name());
                continue;
            }
            return Some(envelope.command);
        }
    }

    pub fn purged(&self) -> u64 {
        self.purged
    }

    fn is_stale(&self, envelope: &Envelope) -> bool {
        envelope.command.is_purgeable()
            && envelope.generation != self.generation.load(Ordering::SeqCst)
    }
}
