//! # Services Module
//!
//! External service integrations for the sharecoin system.
//!
//! ## Components
//!
//! - **Esplora Client**: Liquid chain API access (faucet, UTXO lookup,
//!   transaction fetch, broadcast) for regtest harnesses and demos

pub mod esplora_client;

pub use esplora_client::{EsploraClient, Utxo, UtxoStatus};
