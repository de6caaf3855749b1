//! Registry Login Library
//!
//! This file serves as the library root for the registry-login crate,
//! organizing and exposing the modules that verify registry credentials
//! and persist them to a secure store.

pub mod cli;
pub mod credential;
pub mod error;
pub mod logging;
pub mod login;
pub mod registry;
pub mod store;
pub mod trust;

pub use credential::Credential;
pub use error::{FailureKind, RegistryError, Result, StoreError};
pub use logging::Logger;
pub use login::{LoginFlow, LoginReport, LoginRequest, LoginState};
