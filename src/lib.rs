pub mod awk;
pub mod compute;
pub mod config;
pub mod connector;
pub mod job;
pub mod pipeline;
pub mod reference;
pub mod table;
pub mod translation;

#[cfg(test)]
mod test_support;

pub use awk::{AwkCommand, AwkInterpreter};
pub use compute::Compute;
pub use config::EngineConfig;
pub use connector::{Connector, ConnectorStore, InMemoryConnectorStore};
pub use pipeline::{ComputeContext, ComputePipeline, PipelineReport};
pub use table::SourceTable;
pub use translation::{TranslationResolver, TranslationTable, TranslationTableRef};
