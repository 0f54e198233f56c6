pub mod protocol;
pub mod server;

pub use protocol::Message;
pub use server::BridgeServer;
