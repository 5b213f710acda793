//! TCP byte source

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::source::ByteSource;
use crate::{CaptureError, Result};

/// TCP client for the encoder controller's data port.
pub struct TcpSource {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    buf: Vec<u8>,
}

impl TcpSource {
    /// Unconnected source for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, stream: None, buf: Vec::new() }
    }

    /// Wrap an already-established stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr().map_err(|e| {
            CaptureError::connection_failed_with_source("peer address unavailable", Box::new(e))
        })?;
        Ok(Self { host: peer.ip().to_string(), port: peer.port(), stream: Some(stream), buf: Vec::new() })
    }

    /// Open the connection. Connecting twice is a no-op.
    pub async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            debug!("Already connected to {}", self.peer());
            return Ok(());
        }

        let stream = TcpStream::connect((self.host.as_str(), self.port)).await.map_err(|e| {
            CaptureError::connection_failed_with_source(format!("connect {}", self.peer()), Box::new(e))
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        info!("Connected to {}", self.peer());
        self.stream = Some(stream);
        Ok(())
    }

    /// Drop the connection. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Closed connection to {}", self.peer());
        } else {
            debug!("Connection to {} already closed", self.peer());
        }
    }

    pub fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait::async_trait]
impl ByteSource for TcpSource {
    async fn read_chunk(&mut self, max_len: usize) -> Result<Option<Vec<u8>>> {
        let stream = self.stream.as_mut().ok_or(CaptureError::NotConnected)?;
        // A zero-length read would be indistinguishable from the peer closing
        if max_len == 0 {
            return Err(CaptureError::invalid_config("chunk_size", "must be non-zero"));
        }

        self.buf.resize(max_len, 0);
        let n = stream.read(&mut self.buf).await.map_err(|e| {
            CaptureError::connection_failed_with_source("read failed", Box::new(e))
        })?;

        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf[..n].to_vec()))
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
