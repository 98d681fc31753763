//! # Shared-Coin Covenant Trees
//!
//! The recursive construction that lets N stakeholders lock funds into one
//! Taproot UTXO such that any of them can withdraw their share unilaterally.
//! Each stakeholder's tapscripts are prefixed with an output constraint
//! forcing output #0 of the withdrawal to pay the remaining total to the
//! shared-coin program of the *other* stakeholders. The script interpreter
//! enforces the covenant at spend time; no cooperation is needed after the
//! joint deposit.

use elements::script::Script;
use elements::secp256k1_zkp::{Secp256k1, Verification, XOnlyPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::{CovenantError, CovenantResult};
use crate::script::OutputConstraint;
use crate::taproot::{self, HashTree};

/// X-only NUMS point from BIP 341: `H = sha256(G)` lifted to the curve.
/// No discrete log is known, so a coin using it as internal key can only be
/// spent through a committed script path.
const UNSPENDABLE_KEY_BYTES: [u8; 32] = [
    0x50, 0x92, 0x9b, 0x74, 0xc1, 0xa0, 0x49, 0x54, 0xb7, 0x8b, 0x4b, 0x60, 0x35, 0xe9, 0x7a,
    0x5e, 0x07, 0x8a, 0x5a, 0x0f, 0x28, 0xec, 0x96, 0xd5, 0x47, 0xbf, 0xee, 0x9a, 0xce, 0x80,
    0x3a, 0xc0,
];

/// The fixed unspendable internal key shared-coin trees commit to
pub fn unspendable_internal_key() -> CovenantResult<XOnlyPublicKey> {
    XOnlyPublicKey::from_slice(&UNSPENDABLE_KEY_BYTES)
        .map_err(|e| CovenantError::crypto(format!("failed to build NUMS point: {}", e)))
}

/// One party of a shared coin: the tapscripts that let them spend, and the
/// satoshi amount they contributed.
///
/// Stakeholder lists are the only state that crosses the system boundary;
/// callers persist and exchange them (hence the serde derives) and supply
/// them again, minus the exiting party, at each withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    /// Alternative spending scripts for this party (at least one)
    pub scripts: Vec<Script>,
    /// This party's share of the coin in satoshis
    pub amount: u64,
}

/// Build the spending tree of a shared coin using the unspendable internal
/// key. See [`shared_coin_tree_with_internal_key`].
pub fn shared_coin_tree<C: Verification>(
    secp: &Secp256k1<C>,
    stakeholders: &[Stakeholder],
) -> CovenantResult<HashTree> {
    let internal_key = unspendable_internal_key()?;
    shared_coin_tree_with_internal_key(secp, stakeholders, &internal_key)
}

/// Build the spending tree of a shared coin.
///
/// A single stakeholder gets the canonical tree over their own scripts,
/// unwrapped. With more parties, every script of stakeholder `i` becomes a
/// leaf constrained to recreate, at output #0 and for `total - amount[i]`,
/// the witness program of the tree built from the remaining stakeholders.
/// That inner tree is itself a shared coin, so the covenant replicates down
/// to the last party.
///
/// Every sibling subtree is rebuilt from scratch, which is factorial-order
/// work in the stakeholder count. Fine for the intended handful of parties;
/// callers with larger sets should memoize results keyed by the ordered
/// remaining-stakeholder subset.
pub fn shared_coin_tree_with_internal_key<C: Verification>(
    secp: &Secp256k1<C>,
    stakeholders: &[Stakeholder],
    internal_key: &XOnlyPublicKey,
) -> CovenantResult<HashTree> {
    match stakeholders {
        [] => Err(CovenantError::NoStakeholders),
        [only] => taproot::sorted_taproot_tree(only.scripts.clone()),
        _ => {
            let total = shared_amount(stakeholders)?;
            let mut leaves = Vec::new();

            for (index, stakeholder) in stakeholders.iter().enumerate() {
                let others: Vec<Stakeholder> = stakeholders
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, other)| other.clone())
                    .collect();

                let change_tree =
                    shared_coin_tree_with_internal_key(secp, &others, internal_key)?;
                let change_program =
                    taproot::taproot_witness_program(secp, internal_key, change_tree.hash())?;

                let constraint = OutputConstraint {
                    output_index: 0,
                    witness_program: change_program,
                    amount: total - stakeholder.amount,
                };
                leaves.extend(stakeholder.scripts.iter().map(|script| constraint.wrap(script)));
            }

            taproot::sorted_taproot_tree(leaves)
        }
    }
}

/// Find the committed leaf corresponding to a stakeholder's plain script.
///
/// Descends left before right and returns the first leaf that either equals
/// the script exactly (single-stakeholder trees) or whose constraint prefix
/// decodes and, re-wrapped around the script, reproduces the leaf byte for
/// byte (multi-stakeholder trees). A script that merely appears somewhere
/// inside an unrelated leaf's bytes does not match.
pub fn find_leaf_including_script<'a>(tree: &'a HashTree, script: &Script) -> Option<&'a Script> {
    match tree {
        HashTree::Leaf(leaf) => leaf_matches(leaf, script).then_some(leaf),
        HashTree::Node { left, right, .. } => find_leaf_including_script(left, script)
            .or_else(|| find_leaf_including_script(right, script)),
    }
}

fn leaf_matches(leaf: &Script, script: &Script) -> bool {
    if leaf == script {
        return true;
    }
    match OutputConstraint::from_script(leaf) {
        Ok(Some(constraint)) => constraint.wrap(script) == *leaf,
        _ => false,
    }
}

fn shared_amount(stakeholders: &[Stakeholder]) -> CovenantResult<u64> {
    stakeholders
        .iter()
        .try_fold(0u64, |sum, stakeholder| sum.checked_add(stakeholder.amount))
        .ok_or(CovenantError::AmountOverflow)
}
