// Contract deployment attestation: sign, record, notify.

pub mod connect;
pub mod git;
pub mod message;
pub mod notify;
pub mod signer;

pub use connect::{
    ConnectConfig, ConnectOptions, ConnectOutput, ConnectReport, SigningKeys, Submission,
    VerifyReport, connect, verify,
};
pub use message::{ConnectMessage, MessageError};
pub use notify::{Notification, NotifyClient, build_notification};
pub use signer::{Signer, SignerError, recover_signer, to_checksum_address};
