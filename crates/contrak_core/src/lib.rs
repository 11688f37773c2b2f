// Shared plumbing for the Contrak SDK, CLI and web frontend.

pub mod api;
pub mod chains;
pub mod config;
pub mod logging;

pub use api::{ApiError, ContractRecord, ContrakClient, CreateContractRequest};
pub use chains::{ChainInfo, abi_url, chain_name, explorer_url, lookup, tx_url};
pub use config::{ConfigError, ContrakConfig, NotifyCredentials, validate_url};
