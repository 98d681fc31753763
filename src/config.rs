//! # Configuration Constants
//!
//! Configuration values used throughout the sharecoin library and CLI.

/// Network and chain-API configuration
pub mod network {
    use std::time::Duration;

    /// Default Esplora/Chopsticks endpoint of a local Nigiri Liquid regtest
    pub const ESPLORA_API_BASE: &str = "http://localhost:3001";

    /// Public Esplora endpoint for Liquid testnet
    pub const LIQUID_TESTNET_API_BASE: &str = "https://blockstream.info/liquidtestnet/api";

    /// Request timeout for network operations
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Delay between polls of the address index after a faucet call
    pub const FAUCET_POLL_INTERVAL: Duration = Duration::from_secs(1);

    /// How many times to poll before giving up on a faucet coin
    pub const FAUCET_POLL_ATTEMPTS: u32 = 30;
}

/// Environment variable names
pub mod env {
    /// Esplora endpoint override
    pub const ESPLORA_URL: &str = "ESPLORA_URL";
}

/// Asset identifiers
pub mod asset {
    /// L-BTC policy asset on the default Elements regtest
    pub const LBTC_REGTEST: &str =
        "5ac9f65c0efcc4775e0baec4ec03abdde22473cd3cf33c0419ca290e0751b225";
}

/// Shared-coin operation constants
pub mod coin {
    /// Amount the Nigiri faucet sends per call (1 L-BTC)
    pub const FAUCET_AMOUNT_SATS: u64 = 100_000_000;
}
