//! Executes a single exact-input token swap against a constant-product
//! router: fetch reserves, quote, approve, then swap

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::needless_pass_by_ref_mut)]
#![deny(unsafe_code)]
#![deny(clippy::uninlined_format_args)]

pub mod abi;
pub mod chain_client;
pub mod cli;
pub mod clock;
pub mod error;
pub mod orchestrator;
pub mod pricing;
pub mod signer;
pub mod submitter;
pub mod telemetry;
pub mod tx_builder;
pub mod types;

#[cfg(test)]
mod test_helpers;
