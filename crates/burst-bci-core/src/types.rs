//! Target identifiers, reference codes, and the codebook.
//!
//! Each flashing target carries a cyclic binary burst code. The codebook
//! maps target ids to codes and is immutable once built: it is created at
//! configuration time and only read afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{CodeError, CodeResult};

/// Identifier of a flashing target.
///
/// Small, unique, and stable for the duration of an episode. Targets are
/// numbered `0..n` in codebook order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub u16);

impl TargetId {
    /// Index into per-target arrays.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for TargetId {
    fn from(index: usize) -> Self {
        Self(index as u16)
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cyclic binary reference code for one target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    bits: Vec<u8>,
}

impl Code {
    /// Build a code from raw bits. Every element must be 0 or 1.
    pub fn from_bits(bits: Vec<u8>) -> CodeResult<Self> {
        for (position, &bit) in bits.iter().enumerate() {
            if bit > 1 {
                return Err(CodeError::InvalidBit {
                    position,
                    value: (b'0' + bit.min(9)) as char,
                });
            }
        }
        Ok(Self { bits })
    }

    /// Parse a code from a string of `'0'` and `'1'` characters.
    pub fn parse(text: &str) -> CodeResult<Self> {
        let mut bits = Vec::with_capacity(text.len());
        for (position, value) in text.chars().enumerate() {
            match value {
                '0' => bits.push(0),
                '1' => bits.push(1),
                _ => return Err(CodeError::InvalidBit { position, value }),
            }
        }
        Ok(Self { bits })
    }

    /// Number of bits in one code cycle.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the code holds no bits.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Bit at a phase index. The caller guarantees `phase < len()`.
    #[inline]
    #[must_use]
    pub fn bit(&self, phase: usize) -> u8 {
        self.bits[phase]
    }

    /// The raw bit sequence.
    #[must_use]
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }
}

/// Immutable collection of one reference code per target.
///
/// All codes share the same cycle length; a phase index is therefore valid
/// for every target at once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBook {
    codes: Vec<Code>,
    code_len: usize,
}

impl CodeBook {
    /// Build a codebook. Fails on an empty book, an empty code, or codes
    /// of differing lengths.
    pub fn new(codes: Vec<Code>) -> CodeResult<Self> {
        let first = codes.first().ok_or(CodeError::EmptyCodebook)?;
        let code_len = first.len();
        for (target, code) in codes.iter().enumerate() {
            if code.is_empty() {
                return Err(CodeError::EmptyCode { target });
            }
            if code.len() != code_len {
                return Err(CodeError::LengthMismatch {
                    target,
                    got: code.len(),
                    expected: code_len,
                });
            }
        }
        Ok(Self { codes, code_len })
    }

    /// Parse a codebook from one bit string per target.
    pub fn parse<S: AsRef<str>>(codes: &[S]) -> CodeResult<Self> {
        let codes = codes
            .iter()
            .map(|text| Code::parse(text.as_ref()))
            .collect::<CodeResult<Vec<_>>>()?;
        Self::new(codes)
    }

    /// Number of targets.
    #[inline]
    #[must_use]
    pub fn num_targets(&self) -> usize {
        self.codes.len()
    }

    /// Shared cycle length of every code.
    #[inline]
    #[must_use]
    pub fn code_len(&self) -> usize {
        self.code_len
    }

    /// Code for a target, if the target exists.
    #[must_use]
    pub fn code(&self, target: TargetId) -> Option<&Code> {
        self.codes.get(target.index())
    }

    /// Iterate codes in target order.
    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &Code)> {
        self.codes
            .iter()
            .enumerate()
            .map(|(index, code)| (TargetId::from(index), code))
    }
}

// ============================================================================
// Tests
// ============================================================================
