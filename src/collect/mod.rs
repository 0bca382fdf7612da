//! Data collection from the monitoring API into a [`crate::model::ClusterState`].

pub mod collector;
pub mod decode;
pub mod queries;

pub use collector::Collector;
