//! Replay transport for recorded raw byte captures

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::transport::{RawChunk, Transport};
use crate::{MonitorError, Result};

/// Feeds a previously captured raw byte stream back through the capture path.
///
/// Without pacing, chunks are returned as fast as they are requested. With
/// [`ReplayTransport::paced`] each read sleeps for the time the device would
/// have needed to send that many bytes.
pub struct ReplayTransport {
    /// Entire capture, loaded at open time
    data: Vec<u8>,

    /// Next byte to deliver
    position: usize,

    /// Device byte rate used for pacing
    bytes_per_second: Option<f64>,

    /// Origin for logs
    source: PathBuf,
}

impl ReplayTransport {
    /// Load a raw capture file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| MonitorError::file_error(path.to_path_buf(), e))?;

        info!("Opened replay capture {} ({} bytes)", path.display(), data.len());

        Ok(Self { data, position: 0, bytes_per_second: None, source: path.to_path_buf() })
    }

    /// Replay bytes held in memory
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
            bytes_per_second: None,
            source: PathBuf::from("<memory>"),
        }
    }

    /// Pace reads at the given device byte rate.
    pub fn paced(mut self, bytes_per_second: f64) -> Self {
        self.bytes_per_second =
            (bytes_per_second.is_finite() && bytes_per_second > 0.0).then_some(bytes_per_second);
        self
    }

    /// Bytes not yet delivered
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

#[async_trait::async_trait]
impl Transport for ReplayTransport {
    async fn read(&mut self, max_bytes: usize, _timeout: Duration) -> Result<Option<RawChunk>> {
        if self.remaining() == 0 {
            debug!("Reached end of replay");
            return Ok(None);
        }

        let n = max_bytes.min(self.remaining());

        if let Some(rate) = self.bytes_per_second {
            tokio::time::sleep(Duration::from_secs_f64(n as f64 / rate)).await;
        }

        let chunk = self.data[self.position..self.position + n].to_vec();
        self.position += n;

        trace!("Replay chunk {} bytes, {} remaining", n, self.remaining());

        Ok(Some(chunk))
    }

    fn describe(&self) -> String {
        format!("replay {}", self.source.display())
    }
}
