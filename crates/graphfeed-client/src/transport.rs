use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;
use tracing::trace;

/// Length of the frame length prefix in bytes.
const LEN_PREFIX_SIZE: usize = 8;

/// Default maximum frame body size: 256 MiB.
pub const DEFAULT_MAX_FRAME: usize = 256 * 1024 * 1024;

/// A blocking, strictly request-then-reply byte channel to the server.
///
/// `send` ships one complete request; `recv` blocks for the matching reply
/// and surfaces the raw status byte alongside the payload. Only one
/// round-trip may be in flight at a time on a given transport; callers
/// sharing one across sessions must serialize access.
pub trait Transport {
    /// Send one complete request payload.
    fn send(&mut self, payload: &[u8]) -> std::io::Result<()>;

    /// Receive one complete reply as `(payload, status byte)`.
    fn recv(&mut self) -> std::io::Result<(Bytes, u8)>;
}

/// Configuration for [`FramedTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum frame body size in bytes. Default: 256 MiB.
    pub max_frame_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Length-prefixed framing over any byte stream.
///
/// Wire format, both directions:
/// ```text
/// ┌───────────────┬──────────────────┐
/// │ Length (8B LE)│ Body (Length B)  │
/// └───────────────┴──────────────────┘
/// ```
/// A reply body starts with one status byte; the rest is the payload.
/// Partial reads and writes are handled internally.
pub struct FramedTransport<S> {
    stream: S,
    config: TransportConfig,
}

impl<S: Read + Write> FramedTransport<S> {
    /// Wrap a stream with default configuration.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, TransportConfig::default())
    }

    /// Wrap a stream with explicit configuration.
    pub fn with_config(stream: S, config: TransportConfig) -> Self {
        Self { stream, config }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Consume the transport and return the inner stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn read_exact_retry(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        let mut offset = 0usize;
        while offset < buf.len() {
            match self.stream.read(&mut buf[offset..]) {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "connection closed mid-frame",
                    ))
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn write_all_retry(&mut self, buf: &[u8]) -> std::io::Result<()> {
        let mut offset = 0usize;
        while offset < buf.len() {
            match self.stream.write(&buf[offset..]) {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        ErrorKind::WriteZero,
                        "connection closed mid-frame",
                    ))
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

impl FramedTransport<TcpStream> {
    /// Connect to a serving backend over TCP with default configuration.
    pub fn connect(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        Self::connect_with_config(addr, TransportConfig::default())
    }

    /// Connect over TCP and apply the configured timeouts.
    pub fn connect_with_config(
        addr: impl ToSocketAddrs,
        config: TransportConfig,
    ) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(stream, config))
    }
}

impl<S: Read + Write> Transport for FramedTransport<S> {
    fn send(&mut self, payload: &[u8]) -> std::io::Result<()> {
        if payload.len() > self.config.max_frame_size {
            return Err(std::io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "frame too large ({} bytes, max {})",
                    payload.len(),
                    self.config.max_frame_size
                ),
            ));
        }

        trace!(len = payload.len(), "sending frame");
        self.write_all_retry(&(payload.len() as u64).to_le_bytes())?;
        self.write_all_retry(payload)?;
        self.stream.flush()
    }

    fn recv(&mut self) -> std::io::Result<(Bytes, u8)> {
        let mut prefix = [0u8; LEN_PREFIX_SIZE];
        self.read_exact_retry(&mut prefix)?;
        let body_len = u64::from_le_bytes(prefix);

        // Reject before allocating; the cap also keeps a desynchronized
        // stream from being misread as a multi-gigabyte frame.
        if body_len == 0 || body_len > self.config.max_frame_size as u64 {
            return Err(std::io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "invalid frame length {body_len} (max {})",
                    self.config.max_frame_size
                ),
            ));
        }

        let mut body = vec![0u8; body_len as usize];
        self.read_exact_retry(&mut body)?;

        let status = body[0];
        let payload = Bytes::from(body).slice(1..);
        trace!(status, len = payload.len(), "received frame");
        Ok((payload, status))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn frame(status: u8, payload: &[u8]) -> Vec<u8> {
        let mut wire = Vec::new();
        wire.extend_from_slice(&(1 + payload.len() as u64).to_le_bytes());
        wire.push(status);
        wire.extend_from_slice(payload);
        wire
    }

    #[test]
    fn recv_single_frame() {
        let wire = frame(0x00, b"hello");
        let mut transport = FramedTransport::new(Cursor::new(wire));
        let (payload, status) = transport.recv().unwrap();
        assert_eq!(status, 0x00);
        assert_eq!(payload.as_ref(), b"hello");
    }

    #[test]
    fn recv_status_only_frame() {
        let wire = frame(0x01, b"");
        let mut transport = FramedTransport::new(Cursor::new(wire));
        let (payload, status) = transport.recv().unwrap();
        assert_eq!(status, 0x01);
        assert!(payload.is_empty());
    }

    #[test]
    fn recv_multiple_frames() {
        let mut wire = frame(0x00, b"one");
        wire.extend_from_slice(&frame(0x00, b"two"));
        let mut transport = FramedTransport::new(Cursor::new(wire));
        assert_eq!(transport.recv().unwrap().0.as_ref(), b"one");
        assert_eq!(transport.recv().unwrap().0.as_ref(), b"two");
    }

    #[test]
    fn send_writes_length_prefix() {
        let mut transport = FramedTransport::new(Cursor::new(Vec::new()));
        transport.send(b"abc").unwrap();
        let wire = transport.into_inner().into_inner();
        assert_eq!(&wire[..8], &3u64.to_le_bytes());
        assert_eq!(&wire[8..], b"abc");
    }

    #[test]
    fn eof_mid_frame_fails() {
        let mut wire = frame(0x00, b"truncated");
        wire.truncate(wire.len() - 4);
        let mut transport = FramedTransport::new(Cursor::new(wire));
        let err = transport.recv().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn eof_in_length_prefix_fails() {
        let mut transport = FramedTransport::new(Cursor::new(vec![0u8; 3]));
        let err = transport.recv().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn oversized_frame_rejected_before_allocation() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&u64::MAX.to_le_bytes());
        let config = TransportConfig {
            max_frame_size: 1024,
            ..TransportConfig::default()
        };
        let mut transport = FramedTransport::with_config(Cursor::new(wire), config);
        let err = transport.recv().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn zero_length_frame_rejected() {
        let wire = 0u64.to_le_bytes().to_vec();
        let mut transport = FramedTransport::new(Cursor::new(wire));
        let err = transport.recv().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn oversized_send_rejected() {
        let config = TransportConfig {
            max_frame_size: 4,
            ..TransportConfig::default()
        };
        let mut transport = FramedTransport::with_config(Cursor::new(Vec::new()), config);
        let err = transport.send(b"too long").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn interrupted_read_retries() {
        struct InterruptedThenData {
            state: u8,
            bytes: Vec<u8>,
            pos: usize,
        }

        impl Read for InterruptedThenData {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.state == 0 {
                    self.state = 1;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                if self.pos >= self.bytes.len() {
                    return Ok(0);
                }
                let n = (self.bytes.len() - self.pos).min(buf.len());
                buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            }
        }

        impl Write for InterruptedThenData {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let stream = InterruptedThenData {
            state: 0,
            bytes: frame(0x00, b"ok"),
            pos: 0,
        };
        let mut transport = FramedTransport::new(stream);
        let (payload, status) = transport.recv().unwrap();
        assert_eq!(status, 0x00);
        assert_eq!(payload.as_ref(), b"ok");
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut client = FramedTransport::new(left);
        let mut server = FramedTransport::new(right);

        client.send(b"ping").unwrap();

        // Server side reads the raw request frame and answers with a status.
        let mut prefix = [0u8; 8];
        server.read_exact_retry(&mut prefix).unwrap();
        let len = u64::from_le_bytes(prefix) as usize;
        let mut body = vec![0u8; len];
        server.read_exact_retry(&mut body).unwrap();
        assert_eq!(body, b"ping");

        server.send(&frame(0x00, b"pong")[8..]).unwrap();
        let (payload, status) = client.recv().unwrap();
        assert_eq!(status, 0x00);
        assert_eq!(payload.as_ref(), b"pong");
    }
}
