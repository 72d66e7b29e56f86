//! Session-oriented client for streaming sampled graph mini-batches.
//!
//! The serving backend owns the graph and performs neighbor sampling; this
//! crate opens sessions, drives iteration and decodes the per-batch tensors.
//! A typical training loop:
//!
//! ```no_run
//! use graphfeed_client::{FramedTransport, GraphClient, SessionConfig};
//!
//! # fn main() -> graphfeed_client::Result<()> {
//! let transport = FramedTransport::connect("127.0.0.1:8080")?;
//! let client = GraphClient::new(transport);
//!
//! let config = SessionConfig::new("papers-features", 64, &[10, -1])?;
//! let mut session = client.train_session(config, vec![1, 2, 3])?;
//!
//! for _epoch in 0..3 {
//!     for batch in session.batches()? {
//!         let batch = batch?;
//!         let _ = batch.node_features.row(0);
//!     }
//! }
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod session;
pub mod transport;

pub use client::GraphClient;
pub use error::{ClientError, Result};
pub use session::{Batches, Session, SessionConfig, SessionKind};
pub use transport::{FramedTransport, Transport, TransportConfig, DEFAULT_MAX_FRAME};

pub use graphfeed_wire::{EdgeIndex, GraphBatch, NodeFeatures, Opcode, StatusCode};
