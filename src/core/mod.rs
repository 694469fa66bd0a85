pub mod engine;
pub mod pipeline;
pub mod reshape;

pub use crate::domain::model::{Record, RelayedRow, Row, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Relay, Storage};
pub use crate::utils::error::Result;
