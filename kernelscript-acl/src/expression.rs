// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiler for permission conditions.
//!
//! The access control list evaluates a condition attached to a permission as a flat list of
//! 32-byte words. Every word is one node of the condition tree:
//!
//! ```text
//! byte 0      slot: call argument 0-199 or one of the pseudo-slots below
//! byte 1      operator
//! bytes 2-31  right-aligned value
//! ```
//!
//! Comparisons hold their operand as value. Logic combinators hold the absolute word indices of
//! their operands, packed as `uint32`s: condition (or sole operand) in the lowest 32 bits, then
//! success, then failure. Operands follow their combinator in the list, left to right, so a
//! combinator can only be encoded once the sizes of all operands before it are known.
//!
//! Compilation therefore runs in two passes: the first measures every subtree, the second
//! walks the tree in the same pre-order and emits words with the now known indices.
use std::fmt;

use alloy_primitives::U256;
use kernelscript_core::Address;

use crate::error::AclError;

/// Highest slot referring to a call argument.
pub const MAX_ARG_ID: u8 = 199;
pub const BLOCK_NUMBER_PARAM_ID: u8 = 200;
pub const TIMESTAMP_PARAM_ID: u8 = 201;
pub const ORACLE_PARAM_ID: u8 = 203;
pub const LOGIC_OP_PARAM_ID: u8 = 204;
pub const PARAM_VALUE_PARAM_ID: u8 = 205;

/// Size of an encoded word.
pub const WORD_LEN: usize = 32;

/// Bytes available for the value of a word.
const VALUE_LEN: usize = WORD_LEN - 2;

/// What a comparison is evaluated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Argument of the call the permission is checked for.
    Arg(u8),
    BlockNumber,
    Timestamp,
    /// External oracle contract deciding on the call.
    Oracle,
    /// Constant value, used with [`CmpOp::Ret`].
    ParamValue,
}

impl Slot {
    pub fn id(&self) -> u8 {
        match self {
            Slot::Arg(index) => *index,
            Slot::BlockNumber => BLOCK_NUMBER_PARAM_ID,
            Slot::Timestamp => TIMESTAMP_PARAM_ID,
            Slot::Oracle => ORACLE_PARAM_ID,
            Slot::ParamValue => PARAM_VALUE_PARAM_ID,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    None,
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    Ret,
}

impl CmpOp {
    pub fn code(&self) -> u8 {
        match self {
            CmpOp::None => 0,
            CmpOp::Eq => 1,
            CmpOp::Neq => 2,
            CmpOp::Gt => 3,
            CmpOp::Lt => 4,
            CmpOp::Gte => 5,
            CmpOp::Lte => 6,
            CmpOp::Ret => 7,
        }
    }
}

/// Logic operators, numbered after the comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicOp {
    Not,
    And,
    Or,
    Xor,
    IfElse,
}

impl LogicOp {
    pub fn code(&self) -> u8 {
        match self {
            LogicOp::Not => 8,
            LogicOp::And => 9,
            LogicOp::Or => 10,
            LogicOp::Xor => 11,
            LogicOp::IfElse => 12,
        }
    }

    /// Number of operands the operator takes.
    pub fn arity(&self) -> usize {
        match self {
            LogicOp::Not => 1,
            LogicOp::And | LogicOp::Or | LogicOp::Xor => 2,
            LogicOp::IfElse => 3,
        }
    }
}

/// Operand of a comparison, at most 30 bytes wide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamValue(U256);

impl ParamValue {
    /// Largest value which fits a word.
    pub const MAX: U256 = U256::from_limbs([u64::MAX, u64::MAX, u64::MAX, u64::MAX >> 16]);

    pub fn into_inner(self) -> U256 {
        self.0
    }
}

impl From<U256> for ParamValue {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for ParamValue {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self(U256::from(value as u8))
    }
}

impl From<Address> for ParamValue {
    fn from(value: Address) -> Self {
        Self(U256::from_be_slice(value.as_bytes()))
    }
}

/// Condition tree attached to a permission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression {
    Comparison {
        slot: Slot,
        op: CmpOp,
        value: ParamValue,
    },
    Logic {
        op: LogicOp,
        operands: Vec<Expression>,
    },
}

/// Left-hand side of a comparison.
#[derive(Clone, Copy, Debug)]
pub struct Param(Slot);

/// Compare against the call argument at `index`.
pub fn arg(index: u8) -> Param {
    Param(Slot::Arg(index))
}

pub fn block_number() -> Param {
    Param(Slot::BlockNumber)
}

pub fn timestamp() -> Param {
    Param(Slot::Timestamp)
}

/// Delegate the decision to an oracle contract.
pub fn oracle(address: Address) -> Expression {
    Expression::Comparison {
        slot: Slot::Oracle,
        op: CmpOp::Eq,
        value: address.into(),
    }
}

/// Evaluate to a constant, non-zero meaning allowed.
pub fn param_value(value: impl Into<ParamValue>) -> Expression {
    Expression::Comparison {
        slot: Slot::ParamValue,
        op: CmpOp::Ret,
        value: value.into(),
    }
}

pub fn not(operand: Expression) -> Expression {
    logic(LogicOp::Not, vec![operand])
}

pub fn and(left: Expression, right: Expression) -> Expression {
    logic(LogicOp::And, vec![left, right])
}

pub fn or(left: Expression, right: Expression) -> Expression {
    logic(LogicOp::Or, vec![left, right])
}

pub fn xor(left: Expression, right: Expression) -> Expression {
    logic(LogicOp::Xor, vec![left, right])
}

pub fn if_else(condition: Expression, success: Expression, failure: Expression) -> Expression {
    logic(LogicOp::IfElse, vec![condition, success, failure])
}

fn logic(op: LogicOp, operands: Vec<Expression>) -> Expression {
    Expression::Logic { op, operands }
}

impl Param {
    fn compare(self, op: CmpOp, value: impl Into<ParamValue>) -> Expression {
        Expression::Comparison {
            slot: self.0,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<ParamValue>) -> Expression {
        self.compare(CmpOp::Eq, value)
    }

    pub fn neq(self, value: impl Into<ParamValue>) -> Expression {
        self.compare(CmpOp::Neq, value)
    }

    pub fn gt(self, value: impl Into<ParamValue>) -> Expression {
        self.compare(CmpOp::Gt, value)
    }

    pub fn lt(self, value: impl Into<ParamValue>) -> Expression {
        self.compare(CmpOp::Lt, value)
    }

    pub fn gte(self, value: impl Into<ParamValue>) -> Expression {
        self.compare(CmpOp::Gte, value)
    }

    pub fn lte(self, value: impl Into<ParamValue>) -> Expression {
        self.compare(CmpOp::Lte, value)
    }

    /// Evaluate to the slot's value itself.
    pub fn ret(self) -> Expression {
        self.compare(CmpOp::Ret, 0u64)
    }
}

impl Expression {
    /// Number of words the expression encodes to.
    pub fn size(&self) -> usize {
        match self {
            Expression::Comparison { .. } => 1,
            Expression::Logic { operands, .. } => {
                1 + operands.iter().map(Self::size).sum::<usize>()
            }
        }
    }

    /// Compile the expression into the word list attached to a permission.
    pub fn encode(&self) -> Result<OracleParams, AclError> {
        self.encode_at(0)
    }

    /// Compile the expression as if its root was placed at word `index`.
    pub fn encode_at(&self, index: usize) -> Result<OracleParams, AclError> {
        let mut sizes = Vec::new();
        let len = self.measure(&mut sizes)?;

        if index.saturating_add(len) > u32::MAX as usize {
            return Err(AclError::Invalid(format!(
                "condition of {len} words does not fit at index {index}"
            )));
        }

        let mut words = Vec::with_capacity(len);
        let mut position = 0;
        self.emit(index, &mut position, &sizes, &mut words);
        Ok(OracleParams(words))
    }

    /// First pass: validate every node and record subtree sizes in pre-order.
    fn measure(&self, sizes: &mut Vec<usize>) -> Result<usize, AclError> {
        let position = sizes.len();
        sizes.push(1);

        match self {
            Expression::Comparison { slot, value, .. } => {
                if let Slot::Arg(index) = slot {
                    if *index > MAX_ARG_ID {
                        return Err(AclError::Invalid(format!(
                            "argument index {index} exceeds {MAX_ARG_ID}"
                        )));
                    }
                }

                if value.0 > ParamValue::MAX {
                    return Err(AclError::Invalid(format!(
                        "value {} does not fit into {VALUE_LEN} bytes",
                        value.0
                    )));
                }
            }
            Expression::Logic { op, operands } => {
                if operands.len() != op.arity() {
                    return Err(AclError::Invalid(format!(
                        "{op:?} takes {} operands, got {}",
                        op.arity(),
                        operands.len()
                    )));
                }

                let mut size = 1;
                for operand in operands {
                    size += operand.measure(sizes)?;
                }
                sizes[position] = size;
            }
        }

        Ok(sizes[position])
    }

    /// Second pass: emit words. A node's pre-order position is its offset from `base`.
    fn emit(&self, base: usize, position: &mut usize, sizes: &[usize], out: &mut Vec<Word>) {
        let own = *position;
        *position += 1;

        match self {
            Expression::Comparison { slot, op, value } => {
                out.push(Word::new(slot.id(), op.code(), value.0));
            }
            Expression::Logic { op, operands } => {
                let mut starts = [0u32; 3];
                let mut child = own + 1;
                for start in starts.iter_mut().take(operands.len()) {
                    // Indices are bounded by the check in `encode_at`.
                    *start = (base + child) as u32;
                    child += sizes[child];
                }

                let value = match op {
                    LogicOp::Not => U256::from(starts[0]),
                    LogicOp::And | LogicOp::Or | LogicOp::Xor => pack(starts[0], starts[1], 0),
                    LogicOp::IfElse => pack(starts[0], starts[1], starts[2]),
                };
                out.push(Word::new(LOGIC_OP_PARAM_ID, op.code(), value));

                for operand in operands {
                    operand.emit(base, position, sizes, out);
                }
            }
        }
    }
}

fn pack(condition: u32, success: u32, failure: u32) -> U256 {
    U256::from(condition) | (U256::from(success) << 32usize) | (U256::from(failure) << 64usize)
}

/// One encoded node of a condition.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Word([u8; WORD_LEN]);

impl Word {
    pub fn new(slot: u8, op: u8, value: U256) -> Self {
        let mut bytes = value.to_be_bytes::<WORD_LEN>();
        bytes[0] = slot;
        bytes[1] = op;
        Self(bytes)
    }

    pub fn slot(&self) -> u8 {
        self.0[0]
    }

    pub fn op(&self) -> u8 {
        self.0[1]
    }

    pub fn value(&self) -> U256 {
        let mut bytes = self.0;
        bytes[0] = 0;
        bytes[1] = 0;
        U256::from_be_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; WORD_LEN] {
        &self.0
    }

    pub fn to_uint(&self) -> U256 {
        U256::from_be_bytes(self.0)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Word")
            .field("slot", &self.slot())
            .field("op", &self.op())
            .field("value", &self.value())
            .finish()
    }
}

/// Encoded condition passed along with a conditional grant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OracleParams(Vec<Word>);

impl OracleParams {
    pub fn words(&self) -> &[Word] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Words as `uint256` call arguments.
    pub fn to_uints(&self) -> Vec<U256> {
        self.0.iter().map(Word::to_uint).collect()
    }
}

impl From<Vec<Word>> for OracleParams {
    fn from(value: Vec<Word>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use kernelscript_core::Address;

    use crate::error::AclError;

    use super::{
        Expression, LogicOp, ParamValue, and, arg, block_number, if_else, not, or, oracle,
        param_value, timestamp, xor,
    };

    fn expected(words: &[String]) -> Vec<String> {
        words.iter().map(|word| format!("0x{word}")).collect()
    }

    fn hex_words(expression: &Expression) -> Vec<String> {
        expression
            .encode()
            .unwrap()
            .words()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn single_comparison() {
        assert_eq!(
            hex_words(&arg(0).lt(10u64)),
            expected(&[format!("0004{}0a", "0".repeat(58))])
        );
    }

    #[test]
    fn nested_combinators() {
        let oracle_address: Address = "0x8401eb5ff34cc943f096a32ef3d5113febe8d4eb".parse().unwrap();
        let condition = or(
            and(oracle(oracle_address), block_number().gt(100u64)),
            arg(0).lt(10u64),
        );

        assert_eq!(condition.size(), 5);
        assert_eq!(
            hex_words(&condition),
            expected(&[
                // OR(1, 4)
                format!("cc0a{}0000000400000001", "0".repeat(44)),
                // AND(2, 3)
                format!("cc09{}0000000300000002", "0".repeat(44)),
                format!("cb01{}8401eb5ff34cc943f096a32ef3d5113febe8d4eb", "0".repeat(20)),
                format!("c803{}64", "0".repeat(58)),
                format!("0004{}0a", "0".repeat(58)),
            ])
        );
    }

    #[test]
    fn if_else_and_not() {
        let condition = if_else(
            not(timestamp().gte(1_700_000_000u64)),
            param_value(true),
            and(arg(1).eq(5u64), arg(2).neq(6u64)),
        );

        let params = condition.encode().unwrap();
        let words = params.words();
        assert_eq!(words.len(), 7);

        // Condition at 1, success at 3, failure at 4.
        assert_eq!(words[0].slot(), 204);
        assert_eq!(words[0].op(), LogicOp::IfElse.code());
        assert_eq!(
            words[0].value(),
            U256::from(1u64) | (U256::from(3u64) << 32usize) | (U256::from(4u64) << 64usize)
        );

        // NOT points at its operand directly.
        assert_eq!(words[1].op(), LogicOp::Not.code());
        assert_eq!(words[1].value(), U256::from(2u64));
        assert_eq!(words[2].slot(), 201);

        assert_eq!(words[3].slot(), 205);
        assert_eq!(words[3].op(), 7);
        assert_eq!(words[3].value(), U256::from(1u64));

        assert_eq!(words[4].value(), U256::from(5u64) | (U256::from(6u64) << 32usize));
        assert_eq!(words[5].slot(), 1);
        assert_eq!(words[6].slot(), 2);
    }

    #[test]
    fn index_does_not_change_length() {
        let conditions = [
            arg(3).eq(1u64),
            not(arg(0).eq(1u64)),
            xor(arg(0).eq(1u64), or(arg(1).gt(2u64), block_number().lte(3u64))),
            if_else(
                and(arg(0).eq(1u64), arg(1).eq(2u64)),
                not(param_value(false)),
                or(timestamp().lt(4u64), arg(2).gte(5u64)),
            ),
        ];

        for condition in conditions {
            let at_zero = condition.encode_at(0).unwrap();
            let at_seven = condition.encode_at(7).unwrap();
            assert_eq!(at_zero.len(), at_seven.len());
            assert_eq!(at_zero.len(), condition.size());

            // Comparisons don't depend on their position.
            for (left, right) in at_zero.words().iter().zip(at_seven.words()) {
                if left.slot() != 204 {
                    assert_eq!(left, right);
                }
            }
        }
    }

    #[test]
    fn offsets_are_absolute() {
        let condition = and(arg(0).eq(1u64), arg(1).eq(2u64));
        let words = condition.encode_at(7).unwrap();
        assert_eq!(
            words.words()[0].value(),
            U256::from(8u64) | (U256::from(9u64) << 32usize)
        );
    }

    #[test]
    fn reject_malformed_conditions() {
        assert!(matches!(
            arg(200).eq(1u64).encode(),
            Err(AclError::Invalid(_))
        ));

        assert!(matches!(
            arg(0).eq(U256::MAX).encode(),
            Err(AclError::Invalid(_))
        ));
        assert!(arg(0).eq(ParamValue::MAX).encode().is_ok());

        let missing_operand = Expression::Logic {
            op: LogicOp::And,
            operands: vec![arg(0).eq(1u64)],
        };
        assert!(matches!(missing_operand.encode(), Err(AclError::Invalid(_))));
    }
}
