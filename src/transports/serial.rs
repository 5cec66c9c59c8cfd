//! Serial transport for the physical amplifier

use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::config::SerialConfig;
use crate::transport::{RawChunk, Transport};
use crate::{MonitorError, Result};

/// Serial link to the amplifier (8 data bits, no parity, 1 stop bit).
///
/// Blocking port reads run on the blocking thread pool so the capture task
/// never stalls the runtime.
pub struct SerialTransport {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    name: String,
}

impl SerialTransport {
    /// Open and configure the port.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(config.timeout())
            .open()
            .map_err(|e| {
                MonitorError::transport_failed_with_source(
                    format!("cannot open {}", config.port),
                    Box::new(e),
                )
            })?;

        info!(port = %config.port, baud = config.baud_rate, "Serial port opened");

        Ok(Self { port: Arc::new(Mutex::new(port)), name: config.port.clone() })
    }
}

#[async_trait::async_trait]
impl Transport for SerialTransport {
    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Option<RawChunk>> {
        let port = Arc::clone(&self.port);

        let result = tokio::task::spawn_blocking(move || {
            let mut port = port.blocking_lock();
            port.set_timeout(timeout)?;
            let mut buf = vec![0u8; max_bytes];
            match port.read(&mut buf) {
                Ok(n) => {
                    buf.truncate(n);
                    Ok(buf)
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                    Ok(Vec::new())
                }
                Err(e) => Err(serialport::Error::from(e)),
            }
        })
        .await
        .map_err(|e| MonitorError::transport_failed_with_source("read task panicked", Box::new(e)))?;

        match result {
            Ok(chunk) => {
                trace!("Serial read {} bytes", chunk.len());
                Ok(Some(chunk))
            }
            Err(e) => Err(MonitorError::transport_failed_with_source(
                format!("read from {} failed", self.name),
                Box::new(e),
            )),
        }
    }

    async fn close(&mut self) -> Result<()> {
        debug!("Closing serial port {}", self.name);
        let port = self.port.lock().await;
        port.clear(serialport::ClearBuffer::All).map_err(|e| {
            MonitorError::transport_failed_with_source("clear on close failed", Box::new(e))
        })
    }

    fn describe(&self) -> String {
        format!("serial {}", self.name)
    }
}
