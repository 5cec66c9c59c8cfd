//! Transport trait for byte sources

use std::time::Duration;

use crate::Result;

/// Bytes delivered by one transport read. May be empty.
pub type RawChunk = Vec<u8>;

/// Trait for raw byte sources feeding the capture task
///
/// Transports abstract over the physical link (serial port, recorded capture
/// file, test scripts). Opening is transport specific; once handed to the
/// capture driver a transport is only read from and finally closed.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Read up to `max_bytes`, waiting at most roughly `timeout`.
    ///
    /// Returns:
    /// - `Ok(Some(chunk))` - Bytes received; an empty chunk means no data yet
    /// - `Ok(None)` - Transport closed (normal termination)
    /// - `Err(e)` - Transport fault, terminal for capture
    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Option<RawChunk>>;

    /// Release the underlying link. Called once when capture ends.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human readable name for logs and status text
    fn describe(&self) -> String;
}
