//! Client side of the confidential score ledger: encrypts activity values,
//! submits them, and decrypts results the signer is entitled to see.

pub mod config;
pub mod decrypt;
pub mod errors;
pub mod presentation;
pub mod retry;
pub mod session;
pub mod submit;
pub mod wallet;

pub use config::{network_for_chain, ClientConfig, NetworkConfig, RetryPolicy, SUPPORTED_NETWORKS};
pub use decrypt::{user_decrypt, user_decrypt_one};
pub use errors::{ClientError, Operation, Result};
pub use presentation::{display_score, ActivitySummary, ScoreRating};
pub use retry::retry_idempotent;
pub use session::ScoreClient;
pub use submit::{encrypt_activity, ActivitySubmission, DEFAULT_INCREMENT_WIDTH};
pub use wallet::{LocalWallet, SigningIdentity};
