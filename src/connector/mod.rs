pub mod store;
pub mod types;

pub use store::{ConnectorStore, InMemoryConnectorStore};
pub use types::Connector;
