//! Broker adapters shipped with HERALD
//!
//! Production adapters (Kafka, Redpanda, ...) live in their own crates and
//! implement [`BrokerClient`] from herald-core. The adapters here cover
//! local debugging and embedding in tests.

pub mod memory;
pub mod stdout;

// Re-export the broker trait from herald-core
// This is the canonical source - adapter crates depend on herald-core directly
pub use herald_core::BrokerClient;
pub use herald_core::DeliveryReport;
pub use herald_core::ProduceError;

pub use memory::{InMemoryBroker, ProducedMessage};
pub use stdout::StdoutBroker;
