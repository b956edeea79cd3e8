use std::time::Duration;

use serde::Serialize;

/// A chain the client knows how to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: &'static str,
    pub relayer_url: &'static str,
    pub public_key_url: &'static str,
}

pub const SEPOLIA: NetworkConfig = NetworkConfig {
    chain_id: 11155111,
    name: "Sepolia Testnet",
    relayer_url: "https://relayer.testnet.zama.cloud",
    public_key_url: "https://relayer.testnet.zama.cloud/fhe-keys",
};

pub const ZAMA_DEVNET: NetworkConfig = NetworkConfig {
    chain_id: 8009,
    name: "Zama Devnet",
    relayer_url: "https://devnet.zama.ai/relayer",
    public_key_url: "https://devnet.zama.ai/fhe-keys",
};

pub const INCO_TESTNET: NetworkConfig = NetworkConfig {
    chain_id: 21097,
    name: "Inco Testnet",
    relayer_url: "https://testnet.inco.org/relayer",
    public_key_url: "https://testnet.inco.org/fhe-keys",
};

pub const LOCALHOST: NetworkConfig = NetworkConfig {
    chain_id: 31337,
    name: "Localhost",
    relayer_url: "http://localhost:8080/relayer",
    public_key_url: "http://localhost:8080/fhe-keys",
};

pub static SUPPORTED_NETWORKS: [NetworkConfig; 4] = [SEPOLIA, ZAMA_DEVNET, INCO_TESTNET, LOCALHOST];

pub fn network_for_chain(chain_id: u64) -> Option<&'static NetworkConfig> {
    SUPPORTED_NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Backoff applied by [`crate::retry::retry_idempotent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `1` disables retrying.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }

    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Upper bound on each call into the ledger or ciphertext service.
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::none(),
        }
    }
}
