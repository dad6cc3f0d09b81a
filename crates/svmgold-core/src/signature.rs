//! Signature hashing.
//!
//! Gold files are keyed by a hash of the method's parameter and return type
//! names so that a file survives edits to the method body and keeps apart
//! overloads that share a name. The fold runs over UTF-16 code units with
//! wrapping 32-bit arithmetic; overflow is part of the definition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::descriptor::MethodDescriptor;
use crate::error::GoldError;

/// Multiplier applied at every folding step.
pub const HASH_MULTIPLIER: i32 = 314_159;

/// Initial-state rule for the fold. The two harness generations that produced
/// existing corpora disagree here, so the choice is configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashSeed {
    /// Start at zero.
    Zero,
    /// Start at the number of parameters.
    ParameterCount,
    /// Start at zero and add each type name's length before folding it.
    #[default]
    NameLength,
}

impl FromStr for HashSeed {
    type Err = GoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "zero" | "0" => Ok(Self::Zero),
            "parameter-count" | "param-count" => Ok(Self::ParameterCount),
            "name-length" => Ok(Self::NameLength),
            _ => Err(GoldError::UnknownToken {
                what: "hash seed",
                value: s.to_string(),
            }),
        }
    }
}

/// Hash of a method signature, rendered as signed decimal in file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureHash(pub i32);

impl fmt::Display for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SignatureHash {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Hash parameter type names followed by the return type name.
#[must_use]
pub fn signature_hash<S: AsRef<str>>(
    parameter_types: &[S],
    return_type: &str,
    seed: HashSeed,
) -> SignatureHash {
    let mut hash: i32 = match seed {
        HashSeed::ParameterCount => parameter_types.len() as i32,
        HashSeed::Zero | HashSeed::NameLength => 0,
    };
    let names = parameter_types
        .iter()
        .map(AsRef::as_ref)
        .chain(std::iter::once(return_type));
    for name in names {
        if seed == HashSeed::NameLength {
            hash = hash.wrapping_add(name.encode_utf16().count() as i32);
        }
        for unit in name.encode_utf16() {
            hash = hash.wrapping_mul(HASH_MULTIPLIER).wrapping_add(i32::from(unit));
        }
    }
    SignatureHash(hash)
}

/// Convenience wrapper over [`signature_hash`] for a descriptor.
#[must_use]
pub fn descriptor_hash(descriptor: &MethodDescriptor, seed: HashSeed) -> SignatureHash {
    signature_hash(&descriptor.parameters, &descriptor.return_type, seed)
}
