//! Byte-stream transport abstraction (§5, §6).
//!
//! [`Transport`] is the collaborator seam between the transaction engine
//! and the physical serial line: the engine never talks to `serialport`
//! directly, only through this trait, so it can be driven in tests by an
//! in-memory double instead of real hardware.

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;
use crate::types::{Parity, SerialSettings};

/// A half-duplex, open-or-closed byte stream configured per
/// [`SerialSettings`]. Implementations are not required to be `Send`
/// themselves; the engine wraps them in `Arc<Mutex<_>>`.
pub trait Transport {
    /// Open the underlying stream with the given settings. Calling
    /// `open` on an already-open transport is a logic error left to the
    /// implementation to define; the engine never does so.
    fn open(&mut self, settings: &SerialSettings) -> Result<()>;

    /// Close the underlying stream. A no-op if already closed.
    fn close(&mut self) -> Result<()>;

    /// Whether the transport currently holds an open stream.
    fn is_open(&self) -> bool;

    /// Write the full contents of `data`, blocking up to the configured
    /// write timeout.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes, blocking up to the configured read
    /// timeout. Returns the number of bytes actually read; `0` means the
    /// timeout elapsed with nothing received.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Discard any bytes already buffered for reading (e.g. a stale echo
    /// or exception reply from a previous, abandoned exchange).
    fn clear_input(&mut self) -> Result<()>;

    /// Discard any bytes queued for writing but not yet transmitted.
    fn clear_output(&mut self) -> Result<()>;
}

/// Default [`Transport`] implementation, backed by a native serial port
/// via the `serialport` crate.
pub struct SerialTransport {
    path: String,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialTransport {
    /// Create a transport bound to the given device path (e.g.
    /// `/dev/ttyUSB0` or `COM3`). The port is not opened until
    /// [`Transport::open`] is called.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            port: None,
        }
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, settings: &SerialSettings) -> Result<()> {
        let data_bits = match settings.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            _ => serialport::DataBits::Eight,
        };
        let stop_bits = match settings.stop_bits {
            2 => serialport::StopBits::Two,
            _ => serialport::StopBits::One,
        };
        let parity = match settings.parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        };

        let port = serialport::new(&self.path, settings.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .timeout(settings.read_timeout)
            .open()?;
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.port = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let port = self.open_port()?;
        port.write_all(data)?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.open_port()?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn clear_input(&mut self) -> Result<()> {
        let port = self.open_port()?;
        port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }

    fn clear_output(&mut self) -> Result<()> {
        let port = self.open_port()?;
        port.clear(serialport::ClearBuffer::Output)?;
        Ok(())
    }
}

impl SerialTransport {
    fn open_port(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotConnected, "port not open").into())
    }
}

/// An in-memory [`Transport`] double for unit and integration tests: a
/// scripted byte stream plays back as the "read" side, and every write is
/// recorded for assertions (and optionally echoed back, to exercise
/// local-echo handling).
///
/// Queued replies and readable bytes are kept in separate buffers. A
/// scripted reply models a slave's response, which is only ever produced
/// *after* the master's request goes out on the wire; it moves into the
/// readable buffer from `write_all`, not from `push_response`. This keeps
/// `clear_input` — which the engine calls before transmitting, to flush
/// any stale bytes left over from a previous abandoned exchange — from
/// wiping out a reply the test has already queued for the exchange that
/// hasn't been sent yet.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    open: bool,
    /// Bytes currently available to `read`: local echo already written,
    /// plus any scripted reply moved in by a subsequent `write_all`.
    readable: Vec<u8>,
    /// Bytes queued by `push_response`, not yet readable. Moved into
    /// `readable` by the next `write_all` call.
    queued_replies: Vec<u8>,
    /// Every byte sequence passed to `write_all`, in order.
    pub writes: Vec<Vec<u8>>,
    /// If `true`, every `write_all` call appends its bytes to the readable
    /// buffer ahead of the queued reply, simulating a bus that echoes
    /// transmitted octets back to the master.
    pub echo: bool,
}

impl ScriptedTransport {
    /// Create a transport with no scripted response queued yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be made readable once `write_all` is next called, in
    /// addition to anything already queued.
    pub fn push_response(&mut self, bytes: &[u8]) {
        self.queued_replies.extend_from_slice(bytes);
    }
}

impl Transport for ScriptedTransport {
    fn open(&mut self, _settings: &SerialSettings) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.writes.push(data.to_vec());
        if self.echo {
            self.readable.extend_from_slice(data);
        }
        self.readable.append(&mut self.queued_replies);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.readable.len());
        buf[..n].copy_from_slice(&self.readable[..n]);
        self.readable.drain(..n);
        Ok(n)
    }

    fn clear_input(&mut self) -> Result<()> {
        self.readable.clear();
        Ok(())
    }

    fn clear_output(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Block for `duration`, the inter-frame silent interval mandated before
/// transmitting a new RTU request (§4.4). Factored out so the engine's
/// timing discipline is expressed in one place and can be skipped in
/// tests that don't care about real-time pacing.
pub fn wait_silent_interval(duration: Duration) {
    std::thread::sleep(duration);
}
