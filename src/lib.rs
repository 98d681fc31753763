//! # Liquid Sharecoin: Shared-Custody UTXO Covenants
//!
//! Core library for building self-replicating shared coins on Liquid: N
//! stakeholders deposit into one Taproot output whose script tree lets any
//! of them withdraw their share unilaterally, while output introspection
//! forces the remainder back under the covenant of the other stakeholders.

pub mod config;
pub mod error;
pub mod script;
pub mod services;
pub mod sharecoin;
pub mod taproot;

// Re-export commonly used types
pub use error::{CovenantError, CovenantResult};
pub use script::OutputConstraint;
pub use services::EsploraClient;
pub use sharecoin::{
    find_leaf_including_script, shared_coin_tree, shared_coin_tree_with_internal_key,
    unspendable_internal_key, Stakeholder,
};
pub use taproot::{
    control_block, leaf_hash, merkle_path, merkle_root_from_control_block, p2tr_address,
    p2tr_script_pubkey, sorted_taproot_tree, taproot_output_key, taproot_witness_program,
    HashTree, LEAF_VERSION_TAPSCRIPT,
};
