pub mod peer_client;

pub use peer_client::PeerClient;
