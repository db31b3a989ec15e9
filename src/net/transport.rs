//! Message transports between the wrapper and the debugger.

use super::protocol::{Envelope, Message};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// A connected debugger.
pub trait Transport: Send {
    /// Returns a message only if one is already available.
    fn try_read_message(&mut self) -> io::Result<Option<String>>;

    fn write_message(&mut self, message: &str) -> io::Result<()>;
}

/// Accepts debugger connections.
pub trait Listener: Send {
    fn accept_pending(&mut self) -> io::Result<Option<Box<dyn Transport>>>;

    fn accept_blocking(&mut self) -> io::Result<Box<dyn Transport>>;
}

/// Creates listeners; called again each time the server is re-established.
pub trait Endpoint: Send + Sync {
    fn listen(&self, port: u16) -> io::Result<Box<dyn Listener>>;
}

/// Largest message body accepted from a debugger.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

pub fn encode_frame(message: &str) -> String {
    format!("Content-Length: {}\r\n\r\n{}", message.len(), message)
}

/// Removes one complete frame from the front of `buffer`, if there is one.
pub fn take_frame(buffer: &mut Vec<u8>) -> io::Result<Option<String>> {
    let header_end = match buffer.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let header = String::from_utf8_lossy(&buffer[..header_end]);
    let content_length: usize = header
        .lines()
        .find(|line| line.starts_with("Content-Length:"))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Missing Content-Length"))?;

    if content_length > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Content-Length {} exceeds {}", content_length, MAX_FRAME_LEN),
        ));
    }

    let body_start = header_end + 4;
    let frame_end = body_start
        .checked_add(content_length)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Frame length overflows"))?;
    if buffer.len() < frame_end {
        return Ok(None);
    }

    let body = buffer[body_start..frame_end].to_vec();
    buffer.drain(..frame_end);
    String::from_utf8(body)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub struct TcpTransport {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    fn fill(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; 4096];
        let n = self.stream.read(&mut chunk)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "debugger closed the connection",
            ));
        }
        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(n)
    }
}

impl Transport for TcpTransport {
    fn try_read_message(&mut self) -> io::Result<Option<String>> {
        if let Some(frame) = take_frame(&mut self.buffer)? {
            return Ok(Some(frame));
        }

        self.stream.set_nonblocking(true)?;
        let result = loop {
            match self.fill() {
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.stream.set_nonblocking(false)?;
        result?;

        take_frame(&mut self.buffer)
    }

    fn write_message(&mut self, message: &str) -> io::Result<()> {
        self.stream.write_all(encode_frame(message).as_bytes())?;
        self.stream.flush()
    }
}

pub struct TcpAcceptor {
    listener: TcpListener,
}

impl Listener for TcpAcceptor {
    fn accept_pending(&mut self) -> io::Result<Option<Box<dyn Transport>>> {
        self.listener.set_nonblocking(true)?;
        let accepted = self.listener.accept();
        self.listener.set_nonblocking(false)?;
        match accepted {
            Ok((stream, addr)) => {
                log::info!("Debugger connected from {}", addr);
                stream.set_nonblocking(false)?;
                Ok(Some(Box::new(TcpTransport::new(stream))))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn accept_blocking(&mut self) -> io::Result<Box<dyn Transport>> {
        let (stream, addr) = self.listener.accept()?;
        log::info!("Debugger connected from {}", addr);
        Ok(Box::new(TcpTransport::new(stream)))
    }
}

/// Listens on localhost.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpEndpoint;

impl Endpoint for TcpEndpoint {
    fn listen(&self, port: u16) -> io::Result<Box<dyn Listener>> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        log::info!("Waiting for debugger on {}", listener.local_addr()?);
        Ok(Box::new(TcpAcceptor { listener }))
    }
}

/// In-process transport over channels.
pub struct MemoryTransport {
    incoming: Receiver<String>,
    outgoing: Sender<String>,
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "debugger closed the connection")
}

impl Transport for MemoryTransport {
    fn try_read_message(&mut self) -> io::Result<Option<String>> {
        match self.incoming.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(closed()),
        }
    }

    fn write_message(&mut self, message: &str) -> io::Result<()> {
        self.outgoing
            .send(message.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "debugger went away"))
    }
}

/// Debugger side of a [`MemoryTransport`].
pub struct MemoryClient {
    outgoing: Sender<String>,
    incoming: Receiver<String>,
    seq: u64,
}

impl MemoryClient {
    pub fn send(&mut self, message: Message) -> Result<()> {
        self.seq += 1;
        let text = serde_json::to_string(&Envelope {
            seq: self.seq,
            message,
        })?;
        self.send_raw(&text)
    }

    pub fn send_raw(&mut self, text: &str) -> Result<()> {
        self.outgoing
            .send(text.to_string())
            .map_err(|_| Error::Disconnected)
    }

    pub fn recv(&self, timeout: Duration) -> Result<Envelope> {
        let text = self
            .incoming
            .recv_timeout(timeout)
            .map_err(|_| Error::Disconnected)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Waits for the first message matching `pred`, dropping the others.
    pub fn recv_until(
        &self,
        timeout: Duration,
        mut pred: impl FnMut(&Message) -> bool,
    ) -> Result<Message> {
        loop {
            let envelope = self.recv(timeout)?;
            if pred(&envelope.message) {
                return Ok(envelope.message);
            }
        }
    }
}

/// Channel-backed [`Endpoint`] for tests and embedding.
pub struct MemoryEndpoint {
    pending: Arc<Mutex<Receiver<MemoryTransport>>>,
}

#[derive(Clone)]
pub struct MemoryConnector {
    connect: Sender<MemoryTransport>,
}

impl MemoryEndpoint {
    pub fn new() -> (MemoryEndpoint, MemoryConnector) {
        let (connect, pending) = mpsc::channel();
        (
            MemoryEndpoint {
                pending: Arc::new(Mutex::new(pending)),
            },
            MemoryConnector { connect },
        )
    }
}

impl MemoryConnector {
    pub fn connect(&self) -> Result<MemoryClient> {
        let (to_wrapper, incoming) = mpsc::channel();
        let (outgoing, from_wrapper) = mpsc::channel();
        self.connect
            .send(MemoryTransport { incoming, outgoing })
            .map_err(|_| Error::Disconnected)?;
        Ok(MemoryClient {
            outgoing: to_wrapper,
            incoming: from_wrapper,
            seq: 0,
        })
    }
}

struct MemoryListener {
    pending: Arc<Mutex<Receiver<MemoryTransport>>>,
}

impl Listener for MemoryListener {
    fn accept_pending(&mut self) -> io::Result<Option<Box<dyn Transport>>> {
        match self.pending.lock().try_recv() {
            Ok(transport) => Ok(Some(Box::new(transport))),
            Err(_) => Ok(None),
        }
    }

    fn accept_blocking(&mut self) -> io::Result<Box<dyn Transport>> {
        let transport = self.pending.lock().recv().map_err(|_| {
            io::Error::new(io::ErrorKind::NotConnected, "no debugger can connect anymore")
        })?;
        Ok(Box::new(transport))
    }
}

impl Endpoint for MemoryEndpoint {
    fn listen(&self, _port: u16) -> io::Result<Box<dyn Listener>> {
        Ok(Box::new(MemoryListener {
            pending: Arc::clone(&self.pending),
        }))
    }
}
