use serde::{Deserialize, Serialize};

use crate::handle::Handle;

/// Encrypted input bundle produced on the client: one or more ciphertext
/// handles plus a proof that they are well formed and were encrypted for a
/// specific (contract, user) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<Handle>,
    pub input_proof: Vec<u8>,
}

impl EncryptedInput {
    pub fn new(handles: Vec<Handle>, input_proof: Vec<u8>) -> Self {
        Self {
            handles,
            input_proof,
        }
    }

    /// First handle of the bundle, the one submitted for single-value inputs.
    pub fn first_handle(&self) -> Option<Handle> {
        self.handles.first().copied()
    }
}
