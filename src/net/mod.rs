pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{Envelope, Message, Reply, Request};
pub use server::{Server, ServerEvent};
pub use transport::{
    Endpoint, Listener, MemoryClient, MemoryConnector, MemoryEndpoint, TcpEndpoint, Transport,
};
