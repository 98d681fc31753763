//! # Output-Constraint Script Codec
//!
//! Encoding and decoding of the introspection prefix that turns an ordinary
//! tapscript into a shared-coin leaf. The prefix forces the spending
//! transaction to carry, at a fixed output index, a segwit-v1 scriptPubKey
//! equal to a given witness program and an explicit (non-confidential) value
//! equal to a given amount. Everything after the prefix is the stakeholder's
//! own script, left untouched.

use elements::opcodes::all::{
    OP_EQUALVERIFY, OP_INSPECTOUTPUTSCRIPTPUBKEY, OP_INSPECTOUTPUTVALUE, OP_PUSHNUM_1,
    OP_PUSHNUM_16,
};
use elements::opcodes::All;
use elements::script::{Builder, Instruction, Script};
use elements::secp256k1_zkp::XOnlyPublicKey;

use crate::error::CovenantResult;

/// Number of script tokens in the introspection prefix
const TEMPLATE_TOKENS: usize = 12;

/// Constraint forcing one transaction output onto a fixed witness program
/// and explicit amount.
///
/// Encodes to the script fragment
///
/// ```text
/// <index> OP_INSPECTOUTPUTSCRIPTPUBKEY OP_1 OP_EQUALVERIFY
/// <witness_program> OP_EQUALVERIFY
/// <index> OP_INSPECTOUTPUTVALUE OP_1 OP_EQUALVERIFY
/// <amount-le64> OP_EQUALVERIFY
/// ```
///
/// The two `OP_1` checks assert that the inspected output is segwit v1
/// (Taproot) and that its value is explicit rather than confidential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConstraint {
    /// Index of the transaction output being constrained
    pub output_index: u32,
    /// Witness program (tweaked x-only key) the output must pay to
    pub witness_program: XOnlyPublicKey,
    /// Explicit satoshi amount the output must carry
    pub amount: u64,
}

impl OutputConstraint {
    /// Compile the constraint into its 12-token script fragment.
    ///
    /// The output index is pushed minimally (`0` becomes an empty push) and
    /// the amount is pushed as the 8-byte little-endian value that
    /// `OP_INSPECTOUTPUTVALUE` puts on the stack for explicit outputs.
    pub fn to_script(&self) -> Script {
        let index = i64::from(self.output_index);
        Builder::new()
            .push_int(index)
            .push_opcode(OP_INSPECTOUTPUTSCRIPTPUBKEY)
            .push_opcode(OP_PUSHNUM_1)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&self.witness_program.serialize())
            .push_opcode(OP_EQUALVERIFY)
            .push_int(index)
            .push_opcode(OP_INSPECTOUTPUTVALUE)
            .push_opcode(OP_PUSHNUM_1)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&self.amount.to_le_bytes())
            .push_opcode(OP_EQUALVERIFY)
            .into_script()
    }

    /// Prefix a stakeholder tapscript with this constraint, producing a
    /// shared-coin leaf. The original script bytes follow the prefix
    /// unmodified.
    pub fn wrap(&self, leaf_script: &Script) -> Script {
        let mut bytes = self.to_script().into_bytes();
        bytes.extend_from_slice(leaf_script.as_bytes());
        Script::from(bytes)
    }

    /// Try to read a constraint prefix back out of a script.
    ///
    /// Returns `Ok(None)` when the script simply is not a shared-coin leaf
    /// (too few tokens, or any token deviating from the template). That is
    /// an expected outcome, since most scripts are not. Corrupt bytes that do
    /// not decompile at all are a hard error. Tokens after the prefix (the
    /// wrapped stakeholder script) are ignored here and left to the caller.
    pub fn from_script(script: &Script) -> CovenantResult<Option<OutputConstraint>> {
        let tokens = script
            .instructions()
            .collect::<Result<Vec<Instruction>, _>>()?;
        if tokens.len() < TEMPLATE_TOKENS {
            return Ok(None);
        }

        let output_index = match script_int(&tokens[0]) {
            Some(index) => index,
            None => return Ok(None),
        };
        if !is_op(&tokens[1], OP_INSPECTOUTPUTSCRIPTPUBKEY)
            || !is_op(&tokens[2], OP_PUSHNUM_1)
            || !is_op(&tokens[3], OP_EQUALVERIFY)
        {
            return Ok(None);
        }
        let witness_program = match &tokens[4] {
            Instruction::PushBytes(bytes) => match XOnlyPublicKey::from_slice(bytes) {
                Ok(key) => key,
                Err(_) => return Ok(None),
            },
            Instruction::Op(_) => return Ok(None),
        };
        if !is_op(&tokens[5], OP_EQUALVERIFY)
            || script_int(&tokens[6]).is_none()
            || !is_op(&tokens[7], OP_INSPECTOUTPUTVALUE)
            || !is_op(&tokens[8], OP_PUSHNUM_1)
            || !is_op(&tokens[9], OP_EQUALVERIFY)
        {
            return Ok(None);
        }
        let amount = match &tokens[10] {
            Instruction::PushBytes(bytes) if bytes.len() == 8 => {
                let mut le = [0u8; 8];
                le.copy_from_slice(bytes);
                u64::from_le_bytes(le)
            }
            _ => return Ok(None),
        };
        if !is_op(&tokens[11], OP_EQUALVERIFY) {
            return Ok(None);
        }

        Ok(Some(OutputConstraint {
            output_index,
            witness_program,
            amount,
        }))
    }
}

fn is_op(instruction: &Instruction, expected: All) -> bool {
    matches!(instruction, Instruction::Op(op) if *op == expected)
}

/// Classify a token as a numeric push and return its value.
///
/// Minimal encodings put small numbers on the stack as dedicated opcodes
/// (`OP_0`/`OP_1`..`OP_16`), larger ones as little-endian scriptnum pushes
/// of up to four bytes. An empty push is the number zero.
fn script_int(instruction: &Instruction) -> Option<u32> {
    match instruction {
        Instruction::PushBytes(bytes) => decode_scriptnum(bytes),
        Instruction::Op(op) => small_int(*op),
    }
}

fn small_int(op: All) -> Option<u32> {
    let code = op.into_u8();
    let base = OP_PUSHNUM_1.into_u8();
    if (base..=OP_PUSHNUM_16.into_u8()).contains(&code) {
        Some(u32::from(code - base) + 1)
    } else {
        None
    }
}

fn decode_scriptnum(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() {
        return Some(0);
    }
    if bytes.len() > 4 {
        return None;
    }
    // Sign bit set would make the index negative.
    if bytes[bytes.len() - 1] & 0x80 != 0 {
        return None;
    }
    let mut value: u32 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        value |= u32::from(*byte) << (8 * i);
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use elements::opcodes::all::OP_CHECKSIG;
    use std::str::FromStr;

    fn test_program() -> XOnlyPublicKey {
        XOnlyPublicKey::from_str(
            "50929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0",
        )
        .unwrap()
    }

    fn checksig_script(key: &XOnlyPublicKey) -> Script {
        Builder::new()
            .push_slice(&key.serialize())
            .push_opcode(OP_CHECKSIG)
            .into_script()
    }

    #[test]
    fn test_roundtrip_zero_index_and_amount() {
        let constraint = OutputConstraint {
            output_index: 0,
            witness_program: test_program(),
            amount: 0,
        };
        let decoded = OutputConstraint::from_script(&constraint.to_script()).unwrap();
        assert_eq!(decoded, Some(constraint));
    }

    #[test]
    fn test_roundtrip_small_and_wide_index() {
        for output_index in [1u32, 16, 17, 300, 70_000] {
            let constraint = OutputConstraint {
                output_index,
                witness_program: test_program(),
                amount: 50_000_000,
            };
            let decoded = OutputConstraint::from_script(&constraint.to_script()).unwrap();
            assert_eq!(decoded, Some(constraint), "index {}", output_index);
        }
    }

    #[test]
    fn test_roundtrip_large_amount() {
        let constraint = OutputConstraint {
            output_index: 0,
            witness_program: test_program(),
            amount: u64::MAX,
        };
        let decoded = OutputConstraint::from_script(&constraint.to_script()).unwrap();
        assert_eq!(decoded, Some(constraint));
    }

    #[test]
    fn test_decode_ignores_wrapped_suffix() {
        let constraint = OutputConstraint {
            output_index: 0,
            witness_program: test_program(),
            amount: 25_000,
        };
        let leaf = constraint.wrap(&checksig_script(&test_program()));
        let decoded = OutputConstraint::from_script(&leaf).unwrap();
        assert_eq!(decoded, Some(constraint));
    }

    #[test]
    fn test_wrap_appends_original_bytes() {
        let constraint = OutputConstraint {
            output_index: 0,
            witness_program: test_program(),
            amount: 25_000,
        };
        let original = checksig_script(&test_program());
        let leaf = constraint.wrap(&original);
        assert!(leaf.as_bytes().ends_with(original.as_bytes()));
        assert_eq!(
            leaf.len(),
            constraint.to_script().len() + original.len()
        );
    }

    #[test]
    fn test_plain_script_is_no_match() {
        let script = checksig_script(&test_program());
        assert_eq!(OutputConstraint::from_script(&script).unwrap(), None);
    }

    #[test]
    fn test_truncated_template_is_no_match() {
        // Eleven tokens: the template without its final OP_EQUALVERIFY.
        let script = Builder::new()
            .push_int(0)
            .push_opcode(OP_INSPECTOUTPUTSCRIPTPUBKEY)
            .push_opcode(OP_PUSHNUM_1)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&test_program().serialize())
            .push_opcode(OP_EQUALVERIFY)
            .push_int(0)
            .push_opcode(OP_INSPECTOUTPUTVALUE)
            .push_opcode(OP_PUSHNUM_1)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&25_000u64.to_le_bytes())
            .into_script();
        assert_eq!(OutputConstraint::from_script(&script).unwrap(), None);
    }

    #[test]
    fn test_reordered_template_is_no_match() {
        // Value inspection before scriptPubKey inspection.
        let script = Builder::new()
            .push_int(0)
            .push_opcode(OP_INSPECTOUTPUTVALUE)
            .push_opcode(OP_PUSHNUM_1)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&test_program().serialize())
            .push_opcode(OP_EQUALVERIFY)
            .push_int(0)
            .push_opcode(OP_INSPECTOUTPUTSCRIPTPUBKEY)
            .push_opcode(OP_PUSHNUM_1)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&25_000u64.to_le_bytes())
            .push_opcode(OP_EQUALVERIFY)
            .into_script();
        assert_eq!(OutputConstraint::from_script(&script).unwrap(), None);
    }

    #[test]
    fn test_narrow_amount_push_is_no_match() {
        // A four-byte amount push never matches: the inspected value is
        // always eight bytes on the stack.
        let script = Builder::new()
            .push_int(0)
            .push_opcode(OP_INSPECTOUTPUTSCRIPTPUBKEY)
            .push_opcode(OP_PUSHNUM_1)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&test_program().serialize())
            .push_opcode(OP_EQUALVERIFY)
            .push_int(0)
            .push_opcode(OP_INSPECTOUTPUTVALUE)
            .push_opcode(OP_PUSHNUM_1)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&25_000u32.to_le_bytes())
            .push_opcode(OP_EQUALVERIFY)
            .into_script();
        assert_eq!(OutputConstraint::from_script(&script).unwrap(), None);
    }

    #[test]
    fn test_non_numeric_index_is_no_match() {
        // A five-byte push cannot be a minimal output index.
        let script = Builder::new()
            .push_slice(&[1, 2, 3, 4, 5])
            .push_opcode(OP_INSPECTOUTPUTSCRIPTPUBKEY)
            .push_opcode(OP_PUSHNUM_1)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&test_program().serialize())
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&[1, 2, 3, 4, 5])
            .push_opcode(OP_INSPECTOUTPUTVALUE)
            .push_opcode(OP_PUSHNUM_1)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(&25_000u64.to_le_bytes())
            .push_opcode(OP_EQUALVERIFY)
            .into_script();
        assert_eq!(OutputConstraint::from_script(&script).unwrap(), None);
    }
}
