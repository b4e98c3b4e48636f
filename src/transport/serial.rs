//! Hardware serial transport backed by the `serialport` crate
//!
//! [`SerialManager`] owns the port handle and a background reader thread.
//! The reader accumulates bytes until a newline, tolerates CR, decodes
//! UTF-8 lossily (firmware occasionally emits garbage during reset) and
//! hands each complete line to the registered callback.

use crate::error::{Result, TempLabError};
use crate::transport::{LineCallback, SerialTransport};
use std::io::Read;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Read timeout for the reader thread; bounds how long close() can block
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Longest accepted line before the accumulator resets (matches the
/// firmware's own input buffer discipline)
const MAX_LINE_BYTES: usize = 1024;

struct Connection {
    writer: Box<dyn serialport::SerialPort>,
    alive: Arc<AtomicBool>,
    reader_thread: Option<JoinHandle<()>>,
}

/// Serial transport over a real port
///
/// `open()` spawns the reader thread; `close()` stops it and releases the
/// port. All methods are callable from any thread.
pub struct SerialManager {
    baud_rate: u32,
    connection: Mutex<Option<Connection>>,
    callback: Arc<Mutex<Option<LineCallback>>>,
}

impl SerialManager {
    /// Create a manager for the given baud rate; no port is opened yet
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            connection: Mutex::new(None),
            callback: Arc::new(Mutex::new(None)),
        }
    }

    fn reader_loop(
        mut port: Box<dyn serialport::SerialPort>,
        alive: Arc<AtomicBool>,
        callback: Arc<Mutex<Option<LineCallback>>>,
    ) {
        let mut chunk = [0u8; 256];
        let mut pending: Vec<u8> = Vec::new();

        while alive.load(Ordering::SeqCst) {
            match port.read(&mut chunk) {
                Ok(0) => {}
                Ok(n) => {
                    for &byte in &chunk[..n] {
                        match byte {
                            b'\n' => {
                                let line = String::from_utf8_lossy(&pending).into_owned();
                                pending.clear();
                                Self::dispatch(&callback, &line);
                            }
                            b'\r' => {}
                            _ => {
                                if pending.len() >= MAX_LINE_BYTES {
                                    pending.clear();
                                }
                                pending.push(byte);
                            }
                        }
                    }
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::TimedOut
                        || e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    if alive.load(Ordering::SeqCst) {
                        tracing::warn!("Serial read failed, stopping reader: {}", e);
                    }
                    break;
                }
            }
        }

        tracing::debug!("Serial reader thread exiting");
    }

    /// Deliver a line to the current callback
    ///
    /// The callback Arc is cloned out before invocation so a callback may
    /// replace itself via set_line_callback without deadlocking.
    fn dispatch(callback: &Mutex<Option<LineCallback>>, line: &str) {
        let handler = callback.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
        if let Some(handler) = handler {
            handler(line);
        } else {
            tracing::trace!("Dropping line, no callback registered: {:?}", line);
        }
    }
}

impl SerialTransport for SerialManager {
    fn open(&self, port: &str) -> Result<()> {
        let mut connection = self.connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if connection.is_some() {
            return Err(TempLabError::Session(format!(
                "Port already open, close it before opening {}",
                port
            )));
        }

        let writer = serialport::new(port, self.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;
        let reader = writer.try_clone()?;

        let alive = Arc::new(AtomicBool::new(true));
        let thread_alive = alive.clone();
        let thread_callback = self.callback.clone();
        let reader_thread = std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || Self::reader_loop(reader, thread_alive, thread_callback))?;

        *connection = Some(Connection {
            writer,
            alive,
            reader_thread: Some(reader_thread),
        });

        tracing::info!("Opened serial port {} at {} baud", port, self.baud_rate);
        Ok(())
    }

    fn close(&self) {
        let mut connection = self.connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(mut conn) = connection.take() {
            conn.alive.store(false, Ordering::SeqCst);
            if let Some(handle) = conn.reader_thread.take() {
                // Reader wakes at least every READ_TIMEOUT, so this is brief
                let _ = handle.join();
            }
            tracing::info!("Closed serial port");
        }
    }

    fn is_open(&self) -> bool {
        self.connection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_some()
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut connection = self.connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let conn = connection.as_mut().ok_or(TempLabError::NotConnected)?;
        conn.writer.write_all(line.as_bytes())?;
        conn.writer.write_all(b"\n")?;
        conn.writer.flush()?;
        Ok(())
    }

    fn set_line_callback(&self, callback: LineCallback) {
        *self.callback.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(callback);
    }

    fn clear_line_callback(&self) {
        *self.callback.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

impl Drop for SerialManager {
    fn drop(&mut self) {
        self.close();
    }
}
