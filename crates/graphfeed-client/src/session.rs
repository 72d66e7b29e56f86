use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::{Bytes, BytesMut};
use graphfeed_wire::{
    put_byte, put_str, put_u64, put_u64_slice, GraphBatch, Opcode, StatusCode, WireReader,
};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::transport::Transport;

/// Immutable creation parameters shared by all session variants.
///
/// Validation happens locally in [`SessionConfig::new`], before any network
/// interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    tensor_store_name: String,
    batch_size: u64,
    num_neighbors: Vec<u64>,
}

impl SessionConfig {
    /// Validate and normalize creation parameters.
    ///
    /// `num_neighbors` holds one entry per sampling layer. A negative entry
    /// means "sample all neighbors at that layer" and is normalized to
    /// `u64::MAX`, which is what travels on the wire.
    pub fn new(
        tensor_store_name: impl Into<String>,
        batch_size: u64,
        num_neighbors: &[i64],
    ) -> Result<Self> {
        let tensor_store_name = tensor_store_name.into();
        if tensor_store_name.is_empty() {
            return Err(ClientError::InvalidArgument(
                "tensor_store_name must be non-empty",
            ));
        }
        if batch_size < 1 {
            return Err(ClientError::InvalidArgument(
                "batch_size must be a positive integer",
            ));
        }
        if num_neighbors.is_empty() {
            return Err(ClientError::InvalidArgument(
                "num_neighbors must be non-empty",
            ));
        }
        let num_neighbors = num_neighbors
            .iter()
            .map(|&n| if n < 0 { u64::MAX } else { n as u64 })
            .collect();
        Ok(Self {
            tensor_store_name,
            batch_size,
            num_neighbors,
        })
    }

    /// Name of the tensor store the server loads features from.
    pub fn tensor_store_name(&self) -> &str {
        &self.tensor_store_name
    }

    /// Seeds consumed per batch.
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Normalized per-layer neighbor counts.
    pub fn num_neighbors(&self) -> &[u64] {
        &self.num_neighbors
    }
}

/// The session variant tag, fixed at creation.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionKind {
    /// Deterministic mini-batching over the whole node population.
    Eval,
    /// The server draws a fresh random seed set of this size on every
    /// `begin`.
    Sampling { num_seeds: u64 },
    /// A fixed caller-supplied seed set, reused on every `begin`.
    Train { seed_ids: Vec<u64> },
}

// Seed id lists can be large; print the count, not the contents.
impl fmt::Debug for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Eval => f.debug_struct("Eval").finish(),
            SessionKind::Sampling { num_seeds } => f
                .debug_struct("Sampling")
                .field("num_seeds", num_seeds)
                .finish(),
            SessionKind::Train { seed_ids } => f
                .debug_struct("Train")
                .field("num_seed_ids", &seed_ids.len())
                .finish(),
        }
    }
}

/// One open iteration context on the server.
///
/// Created open by the constructor round-trip; reaches `Closed` exactly once
/// via [`Session::close`] and can never be reopened. The only supported
/// traversal is `begin()` followed by repeated `next()` until
/// end-of-iteration; calling `next()` without a prior `begin()` in the same
/// pass is a precondition violation.
pub struct Session<T: Transport> {
    transport: Arc<Mutex<T>>,
    config: SessionConfig,
    kind: SessionKind,
    session_id: Option<u64>,
    size: Option<u64>,
    closed: bool,
}

impl<T: Transport> Session<T> {
    /// Perform the creation round-trip for a validated config/kind pair.
    pub(crate) fn create(
        transport: Arc<Mutex<T>>,
        config: SessionConfig,
        kind: SessionKind,
    ) -> Result<Self> {
        match &kind {
            SessionKind::Sampling { num_seeds } if *num_seeds < 1 => {
                return Err(ClientError::InvalidArgument(
                    "num_seeds must be a positive integer",
                ));
            }
            SessionKind::Train { seed_ids } if seed_ids.is_empty() => {
                return Err(ClientError::InvalidArgument("seed_ids must be non-empty"));
            }
            _ => {}
        }

        let request = creation_request(&config, &kind);
        let (payload, status) = roundtrip(&transport, &request)?;
        expect_success(status)?;

        let mut reader = WireReader::new(&payload);
        let session_id = reader.u64()?;
        let size = reader.u64()?;
        reader.finish()?;

        debug!(session_id, size, kind = ?kind, "session created");
        Ok(Self {
            transport,
            config,
            kind,
            session_id: Some(session_id),
            size: Some(size),
            closed: false,
        })
    }

    /// The creation parameters of this session.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The variant tag of this session.
    pub fn kind(&self) -> &SessionKind {
        &self.kind
    }

    /// `true` once the session has been closed.
    ///
    /// Pure state query; never fails and never touches the network.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of batches one full iteration pass yields, fixed at creation.
    pub fn size(&self) -> Result<u64> {
        self.require_open()?;
        self.size.ok_or(ClientError::SessionClosed)
    }

    /// Reset the server-side cursor for this session.
    ///
    /// For sampling sessions this is also the point at which the server
    /// draws a new random seed set. Re-calling mid-pass restarts the cursor.
    pub fn begin(&mut self) -> Result<()> {
        let session_id = self.require_open()?;
        let (_, status) = roundtrip(&self.transport, &control_request(Opcode::Begin, session_id))?;
        expect_success(status)?;
        debug!(session_id, "iteration begun");
        Ok(())
    }

    /// Fetch the next mini-batch.
    ///
    /// `Ok(None)` is the normal end-of-iteration signal for this pass, not
    /// an error and never an empty batch.
    pub fn next(&mut self) -> Result<Option<GraphBatch>> {
        let session_id = self.require_open()?;
        let (payload, status) =
            roundtrip(&self.transport, &control_request(Opcode::Next, session_id))?;
        match status {
            StatusCode::Success => Ok(Some(GraphBatch::decode(&payload)?)),
            StatusCode::EndOfIteration => Ok(None),
            StatusCode::Error(code) => Err(ClientError::Server { code }),
        }
    }

    /// Release server-side state and close the local handle.
    ///
    /// Idempotent: closing an already-closed session is a no-op round-trip.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let session_id = self.require_open()?;
        let (_, status) = roundtrip(&self.transport, &control_request(Opcode::Close, session_id))?;
        expect_success(status)?;
        self.session_id = None;
        self.size = None;
        self.closed = true;
        debug!(session_id, "session closed");
        Ok(())
    }

    /// Begin a pass and iterate its batches until end-of-iteration.
    pub fn batches(&mut self) -> Result<Batches<'_, T>> {
        self.begin()?;
        Ok(Batches {
            session: self,
            done: false,
        })
    }

    fn require_open(&self) -> Result<u64> {
        if self.closed {
            return Err(ClientError::SessionClosed);
        }
        self.session_id.ok_or(ClientError::SessionClosed)
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(error) = self.close() {
            debug!(%error, "failed to close session on drop");
        }
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind)
            .field("session_id", &self.session_id)
            .field("size", &self.size)
            .field("closed", &self.closed)
            .field("config", &self.config)
            .finish()
    }
}

/// Iterator over one pass of a session, created by [`Session::batches`].
pub struct Batches<'a, T: Transport> {
    session: &'a mut Session<T>,
    done: bool,
}

impl<T: Transport> Iterator for Batches<'_, T> {
    type Item = Result<GraphBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.session.next() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn lock<T>(transport: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock means another caller panicked mid-round-trip; the
    // stream is indeterminate either way, so recover the guard and let the
    // next I/O surface the failure.
    transport.lock().unwrap_or_else(|err| err.into_inner())
}

fn roundtrip<T: Transport>(transport: &Mutex<T>, request: &[u8]) -> Result<(Bytes, StatusCode)> {
    let mut guard = lock(transport);
    guard.send(request)?;
    let (payload, status) = guard.recv()?;
    Ok((payload, StatusCode::from_byte(status)))
}

fn expect_success(status: StatusCode) -> Result<()> {
    match status {
        StatusCode::Success => Ok(()),
        // End-of-iteration is only meaningful as a reply to `Next`.
        other => Err(ClientError::Server {
            code: other.as_byte(),
        }),
    }
}

fn control_request(opcode: Opcode, session_id: u64) -> BytesMut {
    let mut msg = BytesMut::with_capacity(9);
    put_byte(&mut msg, opcode.as_byte());
    put_u64(&mut msg, session_id);
    msg
}

fn creation_request(config: &SessionConfig, kind: &SessionKind) -> BytesMut {
    let mut msg = BytesMut::new();
    match kind {
        SessionKind::Eval => {
            put_byte(&mut msg, Opcode::EvalNew.as_byte());
            put_u64(&mut msg, config.batch_size());
            put_u64(&mut msg, config.num_neighbors().len() as u64);
            put_u64(&mut msg, config.tensor_store_name().len() as u64);
            put_u64_slice(&mut msg, config.num_neighbors());
            put_str(&mut msg, config.tensor_store_name());
        }
        SessionKind::Sampling { num_seeds } => {
            put_byte(&mut msg, Opcode::SamplingNew.as_byte());
            put_u64(&mut msg, config.batch_size());
            put_u64(&mut msg, *num_seeds);
            put_u64(&mut msg, config.num_neighbors().len() as u64);
            put_u64(&mut msg, config.tensor_store_name().len() as u64);
            put_u64_slice(&mut msg, config.num_neighbors());
            put_str(&mut msg, config.tensor_store_name());
        }
        SessionKind::Train { seed_ids } => {
            put_byte(&mut msg, Opcode::TrainNew.as_byte());
            put_u64(&mut msg, config.batch_size());
            put_u64(&mut msg, config.num_neighbors().len() as u64);
            put_u64(&mut msg, config.tensor_store_name().len() as u64);
            put_u64(&mut msg, seed_ids.len() as u64);
            put_u64_slice(&mut msg, config.num_neighbors());
            put_str(&mut msg, config.tensor_store_name());
            put_u64_slice(&mut msg, seed_ids);
        }
    }
    msg
}
