pub mod envelope;
pub mod memory;
pub mod nats;

pub use memory::MemoryRelay;
pub use nats::{NatsRelay, NatsSettings};
