//! Short-lived proxy credential provisioning.
//!
//! [`OwlProxyClient`] talks to the signed provisioning API, [`ChunkedProvisioner`]
//! splits large requests into upstream-sized batches.

pub mod client;
pub mod credential;
pub mod error;
pub mod models;
pub mod provisioner;
pub mod signer;

pub use client::{OwlProxyClient, OwlProxyConfig};
pub use credential::{ProxyCredential, ProxyScheme};
pub use error::ProvisioningError;
pub use provisioner::{ChunkedProvisioner, MAX_PER_REQUEST, ProxyProvisioner, ProxyUpstream};
pub use signer::{Signature, calculate_signature};
