use super::protocol::{Envelope, Message};
use super::transport::{Endpoint, Listener, Transport};
use crate::error::{Error, Result};
use std::time::Duration;

/// Pause between polls while blocked waiting for the debugger.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Outcome of one pump of the server.
#[derive(Debug)]
pub enum ServerEvent {
    Idle,
    Connected,
    Message(Message),
    /// The debugger sent something that could not be decoded.
    Invalid(String),
}

/// Listening socket plus at most one connected debugger. A newer
/// connection replaces the current one.
pub struct Server {
    listener: Box<dyn Listener>,
    connection: Option<Box<dyn Transport>>,
    seq: u64,
    connections: u64,
}

impl Server {
    pub fn listen(endpoint: &dyn Endpoint, port: u16) -> Result<Self> {
        Ok(Self {
            listener: endpoint.listen(port)?,
            connection: None,
            seq: 0,
            connections: 0,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> u64 {
        self.connections
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn send(&mut self, message: Message) -> Result<()> {
        if self.connection.is_none() {
            log::debug!("No debugger connected, dropping {:?}", message);
            return Ok(());
        }
        let envelope = Envelope {
            seq: self.next_seq(),
            message,
        };
        let json = serde_json::to_string(&envelope)?;
        log::debug!("Sending {} bytes", json.len());
        if let Some(connection) = self.connection.as_mut() {
            if let Err(e) = connection.write_message(&json) {
                log::info!("Debugger connection lost while sending: {}", e);
                return Err(Error::Disconnected);
            }
        }
        Ok(())
    }

    /// Handles at most one pending event without blocking.
    pub fn poll(&mut self) -> Result<ServerEvent> {
        if let Some(transport) = self.listener.accept_pending()? {
            if self.connection.is_some() {
                log::info!("New debugger connection replaces the current one");
            }
            return Ok(self.accept(transport));
        }

        let connection = match self.connection.as_mut() {
            Some(connection) => connection,
            None => return Ok(ServerEvent::Idle),
        };
        match connection.try_read_message() {
            Ok(Some(text)) => Ok(Self::decode(&text)),
            Ok(None) => Ok(ServerEvent::Idle),
            Err(e) => {
                log::info!("Debugger connection lost: {}", e);
                Err(Error::Disconnected)
            }
        }
    }

    /// Blocks until one event happens.
    pub fn run_one(&mut self) -> Result<ServerEvent> {
        loop {
            if self.connection.is_none() {
                let transport = self.listener.accept_blocking()?;
                return Ok(self.accept(transport));
            }
            match self.poll()? {
                ServerEvent::Idle => std::thread::sleep(POLL_INTERVAL),
                event => return Ok(event),
            }
        }
    }

    /// Blocks until a debugger connects.
    pub fn wait_for_connection(&mut self) -> Result<()> {
        while !self.is_connected() {
            let transport = self.listener.accept_blocking()?;
            self.accept(transport);
        }
        Ok(())
    }

    fn accept(&mut self, transport: Box<dyn Transport>) -> ServerEvent {
        self.connection = Some(transport);
        self.connections += 1;
        ServerEvent::Connected
    }

    fn decode(text: &str) -> ServerEvent {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => {
                log::debug!("Received #{}: {:?}", envelope.seq, envelope.message);
                ServerEvent::Message(envelope.message)
            }
            Err(e) => {
                log::warn!("Undecodable message from debugger: {}", e);
                ServerEvent::Invalid(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::transport::MemoryEndpoint;

    #[test]
    fn test_poll_accepts_then_reads() {
        let (endpoint, connector) = MemoryEndpoint::new();
        let mut server = Server::listen(&endpoint, 0).unwrap();
        assert!(matches!(server.poll().unwrap(), ServerEvent::Idle));

        let mut client = connector.connect().unwrap();
        assert!(matches!(server.poll().unwrap(), ServerEvent::Connected));
        assert_eq!(server.connections(), 1);

        client.send(Message::Terminate).unwrap();
        client.send_raw("not json").unwrap();
        assert!(matches!(
            server.poll().unwrap(),
            ServerEvent::Message(Message::Terminate)
        ));
        assert!(matches!(server.poll().unwrap(), ServerEvent::Invalid(_)));
        assert!(matches!(server.poll().unwrap(), ServerEvent::Idle));

        server
            .send(Message::Error {
                message: "x".into(),
            })
            .unwrap();
        let envelope = client.recv(Duration::from_secs(5)).unwrap();
        assert_eq!(envelope.seq, 1);

        drop(client);
        assert!(matches!(server.poll(), Err(Error::Disconnected)));
    }

    #[test]
    fn test_newer_connection_replaces_current() {
        let (endpoint, connector) = MemoryEndpoint::new();
        let mut server = Server::listen(&endpoint, 0).unwrap();
        let first = connector.connect().unwrap();
        assert!(matches!(server.run_one().unwrap(), ServerEvent::Connected));

        let mut second = connector.connect().unwrap();
        assert!(matches!(server.run_one().unwrap(), ServerEvent::Connected));
        assert_eq!(server.connections(), 2);
        assert!(
            first.recv(Duration::from_millis(50)).is_err(),
            "Replaced connection is closed"
        );

        second.send(Message::Terminate).unwrap();
        assert!(matches!(
            server.run_one().unwrap(),
            ServerEvent::Message(Message::Terminate)
        ));
    }

    #[test]
    fn test_send_without_connection_is_dropped() {
        let (endpoint, _connector) = MemoryEndpoint::new();
        let mut server = Server::listen(&endpoint, 0).unwrap();
        server.send(Message::Terminate).unwrap();
        assert!(!server.is_connected());
    }
}
