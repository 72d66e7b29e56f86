use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::session::{Session, SessionConfig, SessionKind};
use crate::transport::Transport;

/// Handle to a graph-serving backend connection.
///
/// Owns the transport behind a mutex so that multiple sessions can share one
/// connection; the channel is strictly request-then-reply, so at most one
/// round-trip is ever in flight across all sessions. Cloning the client
/// clones the handle, not the connection.
pub struct GraphClient<T: Transport> {
    transport: Arc<Mutex<T>>,
}

impl<T: Transport> GraphClient<T> {
    /// Wrap an established transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
        }
    }

    /// Open a session that iterates deterministically over the whole node
    /// population.
    pub fn eval_session(&self, config: SessionConfig) -> Result<Session<T>> {
        Session::create(Arc::clone(&self.transport), config, SessionKind::Eval)
    }

    /// Open a session whose server side draws `num_seeds` fresh random seeds
    /// on every `begin`. Fails locally if `num_seeds` is zero.
    pub fn sampling_session(&self, config: SessionConfig, num_seeds: u64) -> Result<Session<T>> {
        Session::create(
            Arc::clone(&self.transport),
            config,
            SessionKind::Sampling { num_seeds },
        )
    }

    /// Open a session over a fixed seed set, reused on every `begin`. Fails
    /// locally if `seed_ids` is empty.
    pub fn train_session(&self, config: SessionConfig, seed_ids: Vec<u64>) -> Result<Session<T>> {
        Session::create(
            Arc::clone(&self.transport),
            config,
            SessionKind::Train { seed_ids },
        )
    }
}

impl<T: Transport> Clone for GraphClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> std::fmt::Debug for GraphClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient").finish_non_exhaustive()
    }
}
