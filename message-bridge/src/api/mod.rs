//! REST API for operating bridge instances.

pub mod bridges;
pub mod generic;

pub use generic::{ApiResponse, ApiServer, BridgeMap, HealthStatus};
