//! Monitoring API access.
//!
//! [`MonitoringApi`] is the seam between collection and transport.
//! [`AxonOpsClient`] is the production implementation; tests substitute
//! in-memory fakes.

pub mod axonops;
pub mod error;
pub mod provider;

pub use axonops::AxonOpsClient;
pub use error::{ApiError, ApiResult};
pub use provider::{LogSearch, MonitoringApi};
