//! HTTP surface of the Portier forward-authentication gateway

pub mod metrics;
pub mod routes;
pub mod server;
pub mod session;
pub mod views;

pub use metrics::MetricsRecorder;
pub use server::{build_router, AppState, PortierServer};
