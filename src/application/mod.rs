mod ancestor_store;
mod application_impl;
pub mod data;
mod runtime_config;

pub use ancestor_store::{AncestorStore, AncestorStoreError};
pub use application_impl::{Application, ApplicationError};
pub use runtime_config::RuntimeConfig;
