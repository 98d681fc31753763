//! # Taproot Tree Construction
//!
//! Canonical (order-independent) tapscript Merkle trees for Elements, plus
//! the derivations a script-path spender needs: witness program, sibling
//! path, control block, and control-block-to-root verification.
//!
//! Leaves are sorted by their tapleaf hash before assembly, so two parties
//! building a tree from the same leaf set always arrive at the same root
//! without agreeing on an ordering first.

use elements::hashes::{sha256, Hash, HashEngine};
use elements::opcodes::all::OP_PUSHNUM_1;
use elements::schnorr::TweakedPublicKey;
use elements::script::{Builder, Script};
use elements::secp256k1_zkp::{Parity, Scalar, Secp256k1, Verification, XOnlyPublicKey};
use elements::taproot::{
    LeafVersion, TapLeafHash, TapNodeHash, TapTweakHash, TAPROOT_CONTROL_BASE_SIZE,
    TAPROOT_CONTROL_NODE_SIZE,
};
use elements::{Address, AddressParams};

use crate::error::{CovenantError, CovenantResult};

/// Tapscript leaf version on Elements chains
pub const LEAF_VERSION_TAPSCRIPT: u8 = 0xc4;

/// A tapscript Merkle tree.
///
/// Either a single leaf carrying a script, or an internal node whose hash
/// commits to both children. Nodes own their children; trees are built
/// bottom-up and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashTree {
    /// A leaf script of the spending tree
    Leaf(Script),
    /// An internal node combining two subtrees
    Node {
        /// Branch hash over the two child hashes
        hash: sha256::Hash,
        left: Box<HashTree>,
        right: Box<HashTree>,
    },
}

impl HashTree {
    /// Hash of this node: the tapleaf hash for leaves, the branch hash for
    /// internal nodes. The root node's hash is the tree's Merkle root.
    pub fn hash(&self) -> sha256::Hash {
        match self {
            HashTree::Leaf(script) => to_sha256(leaf_hash(script)),
            HashTree::Node { hash, .. } => *hash,
        }
    }

    /// All leaf scripts, left to right
    pub fn leaves(&self) -> Vec<&Script> {
        match self {
            HashTree::Leaf(script) => vec![script],
            HashTree::Node { left, right, .. } => {
                let mut scripts = left.leaves();
                scripts.extend(right.leaves());
                scripts
            }
        }
    }
}

/// Tapleaf hash of a script under the Elements tapscript leaf version
pub fn leaf_hash(script: &Script) -> TapLeafHash {
    TapLeafHash::from_script(script, LeafVersion::default())
}

/// Build the canonical tree over a set of leaf scripts.
///
/// Leaves are sorted by tapleaf hash ascending, then folded level by level:
/// adjacent pairs combine into branch nodes and an odd remainder carries up
/// unchanged. Any permutation of the input therefore produces the same root.
pub fn sorted_taproot_tree(leaves: Vec<Script>) -> CovenantResult<HashTree> {
    if leaves.is_empty() {
        return Err(CovenantError::operation(
            "sorted_taproot_tree",
            "cannot build a tree without leaves",
        ));
    }

    let mut nodes: Vec<HashTree> = leaves.into_iter().map(HashTree::Leaf).collect();
    nodes.sort_by_key(|node| node.hash());

    while nodes.len() > 1 {
        let mut level = Vec::with_capacity(nodes.len() / 2 + 1);
        let mut pairs = nodes.into_iter();
        while let Some(left) = pairs.next() {
            match pairs.next() {
                Some(right) => {
                    let hash = branch_hash(&left.hash(), &right.hash());
                    level.push(HashTree::Node {
                        hash,
                        left: Box::new(left),
                        right: Box::new(right),
                    });
                }
                None => level.push(left),
            }
        }
        nodes = level;
    }

    Ok(nodes.remove(0))
}

/// Tweak the internal key with the tree root, returning the output key and
/// its parity. The parity goes into the control block's first byte.
pub fn taproot_output_key<C: Verification>(
    secp: &Secp256k1<C>,
    internal_key: &XOnlyPublicKey,
    merkle_root: sha256::Hash,
) -> CovenantResult<(XOnlyPublicKey, Parity)> {
    let mut engine = TapTweakHash::engine();
    engine.input(&internal_key.serialize());
    engine.input(merkle_root.as_byte_array());
    let tweak = TapTweakHash::from_engine(engine);

    let scalar = Scalar::from_be_bytes(tweak.to_byte_array())
        .map_err(|_| CovenantError::crypto("taproot tweak is out of range"))?;
    internal_key
        .add_tweak(secp, &scalar)
        .map_err(|e| CovenantError::crypto(format!("taproot tweak-add failed: {}", e)))
}

/// The 32-byte witness program committing to `internal_key` and the tree
/// root. This is the x-only key published in the segwit-v1 scriptPubKey; it
/// binds every leaf of the tree into a single on-chain value.
pub fn taproot_witness_program<C: Verification>(
    secp: &Secp256k1<C>,
    internal_key: &XOnlyPublicKey,
    merkle_root: sha256::Hash,
) -> CovenantResult<XOnlyPublicKey> {
    let (output_key, _) = taproot_output_key(secp, internal_key, merkle_root)?;
    Ok(output_key)
}

/// Reconstruct a Merkle root from a control block and a leaf hash.
///
/// A control block is one byte of leaf version and parity, the 32-byte
/// internal key, then a sibling hash per tree level; the path length follows
/// from the total length. The leaf hash is folded upward through the path,
/// hashing the lexicographically smaller operand first at every step.
/// Callers compare the result against a known committed root to prove tree
/// membership.
pub fn merkle_root_from_control_block(
    control: &[u8],
    leaf: TapLeafHash,
) -> CovenantResult<sha256::Hash> {
    if control.len() < TAPROOT_CONTROL_BASE_SIZE
        || (control.len() - TAPROOT_CONTROL_BASE_SIZE) % TAPROOT_CONTROL_NODE_SIZE != 0
    {
        return Err(CovenantError::InvalidControlBlock {
            length: control.len(),
        });
    }

    let mut current = to_sha256(leaf);
    for node in control[TAPROOT_CONTROL_BASE_SIZE..].chunks_exact(TAPROOT_CONTROL_NODE_SIZE) {
        let mut sibling = [0u8; 32];
        sibling.copy_from_slice(node);
        current = branch_hash(&current, &sha256::Hash::from_byte_array(sibling));
    }
    Ok(current)
}

/// Sibling hashes from the leaf with hash `leaf` up to the root, in
/// control-block order (deepest sibling first). `None` if no leaf of the
/// tree has that hash.
pub fn merkle_path(tree: &HashTree, leaf: TapLeafHash) -> Option<Vec<sha256::Hash>> {
    path_to_leaf(tree, to_sha256(leaf))
}

fn path_to_leaf(node: &HashTree, target: sha256::Hash) -> Option<Vec<sha256::Hash>> {
    match node {
        HashTree::Leaf(_) => (node.hash() == target).then(Vec::new),
        HashTree::Node { left, right, .. } => {
            if let Some(mut path) = path_to_leaf(left, target) {
                path.push(right.hash());
                return Some(path);
            }
            if let Some(mut path) = path_to_leaf(right, target) {
                path.push(left.hash());
                return Some(path);
            }
            None
        }
    }
}

/// Assemble the script-path control block for one leaf of a tree: the leaf
/// version byte carrying the output key parity, the internal key, then the
/// sibling path. Fails if the script is not a leaf of the tree.
pub fn control_block<C: Verification>(
    secp: &Secp256k1<C>,
    internal_key: &XOnlyPublicKey,
    tree: &HashTree,
    leaf_script: &Script,
) -> CovenantResult<Vec<u8>> {
    let path = merkle_path(tree, leaf_hash(leaf_script)).ok_or_else(|| {
        CovenantError::operation("control_block", "script is not a leaf of the tree")
    })?;
    let (_, parity) = taproot_output_key(secp, internal_key, tree.hash())?;

    let mut control =
        Vec::with_capacity(TAPROOT_CONTROL_BASE_SIZE + TAPROOT_CONTROL_NODE_SIZE * path.len());
    control.push(LEAF_VERSION_TAPSCRIPT | parity.to_u8());
    control.extend_from_slice(&internal_key.serialize());
    for sibling in &path {
        control.extend_from_slice(sibling.as_byte_array());
    }
    Ok(control)
}

/// The segwit-v1 scriptPubKey for a witness program: `OP_1 <32 bytes>`
pub fn p2tr_script_pubkey(witness_program: &XOnlyPublicKey) -> Script {
    Builder::new()
        .push_opcode(OP_PUSHNUM_1)
        .push_slice(&witness_program.serialize())
        .into_script()
}

/// Unconfidential P2TR address committing to `internal_key` and the tree
pub fn p2tr_address<C: Verification>(
    secp: &Secp256k1<C>,
    internal_key: &XOnlyPublicKey,
    tree: &HashTree,
    params: &'static AddressParams,
) -> CovenantResult<Address> {
    let program = taproot_witness_program(secp, internal_key, tree.hash())?;
    Ok(Address::p2tr_tweaked(
        TweakedPublicKey::new(program),
        None,
        params,
    ))
}

/// Branch hash over two child hashes, smaller operand first
fn branch_hash(a: &sha256::Hash, b: &sha256::Hash) -> sha256::Hash {
    let (first, second) = if a.as_byte_array() <= b.as_byte_array() {
        (a, b)
    } else {
        (b, a)
    };
    let mut engine = TapNodeHash::engine();
    engine.input(first.as_byte_array());
    engine.input(second.as_byte_array());
    to_sha256(TapNodeHash::from_engine(engine))
}

fn to_sha256<H: Hash<Bytes = [u8; 32]>>(hash: H) -> sha256::Hash {
    sha256::Hash::from_byte_array(hash.to_byte_array())
}
