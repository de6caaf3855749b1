//! Registry module for Docker registry interactions
//!
//! Domain normalization, scheme resolution, and the retrying credential probe
//! against the Docker Registry HTTP API v2.

pub mod auth;
pub mod client;
pub mod domain;
pub mod probe;
pub mod retry;
pub mod scheme;

pub use client::{HttpTransportFactory, RegistryClient, RegistryClientBuilder, TransportFactory};
pub use domain::resolve_domain;
pub use probe::{PingTransport, ProbeReport, probe};
pub use retry::RetryPolicy;
pub use scheme::{Endpoint, RequestScheme, Scheme, scheme_for};
