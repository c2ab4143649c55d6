// Copyright 2024 Six Days Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Response resolution: walks a fetched JSON document along the query's
//! field path and decodes the leaf into one of the on-chain-compatible
//! semantic types.

use std::str::FromStr;

use ethers::abi::Token;
use ethers::types::{Address, I256, U256};
use serde_json::Value;

use oracle_relayer_context::{RESPONSE_BYTES_FN, RESPONSE_UINT256_FN};
use oracle_relayer_utils::{Error, Result};

/// The closed set of semantic types a response value can take.
///
/// The expected type arrives over the wire as free-form text (the third
/// callback parameter); parsing it into this enum up front keeps the
/// unsupported-type path an explicit error instead of a silent fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// An arbitrary-precision unsigned integer.
    Uint256,
    /// A 64-bit unsigned integer.
    Uint64,
    /// An arbitrary-precision signed integer.
    Int256,
    /// A 64-bit signed integer.
    Int64,
    /// A 20-byte account address.
    Address,
    /// A UTF-8 string.
    String,
    /// A byte string.
    Bytes,
}

impl FromStr for ResponseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uint256" => Ok(Self::Uint256),
            "uint64" => Ok(Self::Uint64),
            "int256" => Ok(Self::Int256),
            "int64" => Ok(Self::Int64),
            "address" => Ok(Self::Address),
            "string" => Ok(Self::String),
            "bytes" => Ok(Self::Bytes),
            other => Err(Error::UnsupportedResponseType(other.to_owned())),
        }
    }
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uint256 => "uint256",
            Self::Uint64 => "uint64",
            Self::Int256 => "int256",
            Self::Int64 => "int64",
            Self::Address => "address",
            Self::String => "string",
            Self::Bytes => "bytes",
        };
        write!(f, "{name}")
    }
}

impl ResponseKind {
    /// The on-chain entry point able to receive this kind of value, if
    /// any. Only byte-string and uint256 responses have one.
    pub fn response_method(&self) -> Option<&'static str> {
        match self {
            Self::Bytes => Some(RESPONSE_BYTES_FN),
            Self::Uint256 => Some(RESPONSE_UINT256_FN),
            _ => None,
        }
    }

    /// The sentinel submitted with the failure status when the off-chain
    /// leg exhausts its retries. An empty byte string where the kind
    /// allows it; the kind's zero value otherwise, since an empty byte
    /// string cannot encode as a numeric parameter.
    pub fn empty_value(&self) -> ResolvedValue {
        match self {
            Self::Uint256 => ResolvedValue::Uint256(U256::zero()),
            Self::Uint64 => ResolvedValue::Uint64(0),
            Self::Int256 => ResolvedValue::Int256(I256::zero()),
            Self::Int64 => ResolvedValue::Int64(0),
            Self::Address => ResolvedValue::Address(Address::zero()),
            Self::String => ResolvedValue::String(Default::default()),
            Self::Bytes => ResolvedValue::Bytes(Vec::new()),
        }
    }
}

/// A response value decoded into one semantic type, ready to be encoded
/// into a callback transaction parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedValue {
    /// An arbitrary-precision unsigned integer.
    Uint256(U256),
    /// A 64-bit unsigned integer.
    Uint64(u64),
    /// An arbitrary-precision signed integer.
    Int256(I256),
    /// A 64-bit signed integer.
    Int64(i64),
    /// A 20-byte account address.
    Address(Address),
    /// A UTF-8 string.
    String(String),
    /// A byte string.
    Bytes(Vec<u8>),
}

impl ResolvedValue {
    /// Converts the value into its ABI token.
    pub fn into_token(self) -> Token {
        match self {
            Self::Uint256(v) => Token::Uint(v),
            Self::Uint64(v) => Token::Uint(v.into()),
            Self::Int256(v) => Token::Int(v.into_raw()),
            Self::Int64(v) => Token::Int(I256::from(v).into_raw()),
            Self::Address(v) => Token::Address(v),
            Self::String(v) => Token::String(v),
            Self::Bytes(v) => Token::Bytes(v),
        }
    }
}

/// Parses `body` as JSON, walks it along `field_path` and decodes the
/// terminal value as `kind_name`.
///
/// An empty field path means the whole document is the leaf. A missing
/// path segment, an unsupported kind name, or a leaf of the wrong shape
/// are all errors; the caller treats them as retryable fetch failures.
pub fn resolve_response(
    body: &[u8],
    field_path: &[String],
    kind_name: &str,
) -> Result<ResolvedValue> {
    let document: Value = serde_json::from_slice(body)?;
    let mut leaf = &document;
    for segment in field_path {
        leaf = leaf.get(segment).ok_or_else(|| {
            Error::MissingResponseField {
                segment: segment.clone(),
            }
        })?;
    }
    let kind = kind_name.parse::<ResponseKind>()?;
    decode(leaf, kind)
}

/// Converts a JSON leaf into the expected semantic type. A shape
/// mismatch is an error, never a silent coercion.
pub fn decode(leaf: &Value, kind: ResponseKind) -> Result<ResolvedValue> {
    let mismatch = || Error::ResponseTypeMismatch {
        kind: kind.to_string(),
        value: leaf.to_string(),
    };
    let value = match kind {
        ResponseKind::Uint256 => {
            ResolvedValue::Uint256(leaf.as_u64().map(U256::from).ok_or_else(mismatch)?)
        }
        ResponseKind::Uint64 => {
            ResolvedValue::Uint64(leaf.as_u64().ok_or_else(mismatch)?)
        }
        ResponseKind::Int256 => {
            ResolvedValue::Int256(leaf.as_i64().map(I256::from).ok_or_else(mismatch)?)
        }
        ResponseKind::Int64 => {
            ResolvedValue::Int64(leaf.as_i64().ok_or_else(mismatch)?)
        }
        ResponseKind::Address => {
            let s = leaf.as_str().ok_or_else(mismatch)?;
            ResolvedValue::Address(s.parse().map_err(|_| mismatch())?)
        }
        ResponseKind::String => {
            ResolvedValue::String(leaf.as_str().ok_or_else(mismatch)?.to_owned())
        }
        ResponseKind::Bytes => match leaf {
            Value::String(s) => ResolvedValue::Bytes(s.clone().into_bytes()),
            Value::Array(items) => {
                let bytes = items
                    .iter()
                    .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .ok_or_else(mismatch)?;
                ResolvedValue::Bytes(bytes)
            }
            _ => return Err(mismatch()),
        },
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "string": "join",
        "data": {
            "uint256": 100002334423,
            "uint64": 102334423,
            "int256": -100002334423,
            "int64": 102334423,
            "bytes": "testbytes",
            "score": {
                "score": 99,
                "address": "0x4E433Ad197a5bAb17274b26b3BE0B37AFE049ea3"
            }
        }
    }"#;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_the_whole_document_on_an_empty_path() {
        let value = resolve_response(b"56", &[], "uint256").unwrap();
        assert_eq!(value, ResolvedValue::Uint256(U256::from(56u64)));
    }

    #[test]
    fn resolves_every_supported_kind() {
        let cases: Vec<(Vec<String>, ResolvedValue)> = vec![
            (path(&["string"]), ResolvedValue::String("join".into())),
            (
                path(&["data", "uint256"]),
                ResolvedValue::Uint256(U256::from(100002334423u64)),
            ),
            (
                path(&["data", "uint64"]),
                ResolvedValue::Uint64(102334423),
            ),
            (
                path(&["data", "int256"]),
                ResolvedValue::Int256(I256::from(-100002334423i64)),
            ),
            (path(&["data", "int64"]), ResolvedValue::Int64(102334423)),
            (
                path(&["data", "bytes"]),
                ResolvedValue::Bytes(b"testbytes".to_vec()),
            ),
            (
                path(&["data", "score", "address"]),
                ResolvedValue::Address(
                    "0x4E433Ad197a5bAb17274b26b3BE0B37AFE049ea3"
                        .parse()
                        .unwrap(),
                ),
            ),
        ];
        for (field_path, expected) in cases {
            // the terminal segment doubles as the expected type name.
            let kind_name = field_path.last().unwrap().clone();
            let value =
                resolve_response(DOCUMENT.as_bytes(), &field_path, &kind_name)
                    .unwrap();
            assert_eq!(value, expected, "path {field_path:?}");
        }
    }

    #[test]
    fn rejects_an_unsupported_kind() {
        let res = resolve_response(b"56", &[], "float");
        assert!(matches!(
            res,
            Err(Error::UnsupportedResponseType(kind)) if kind == "float"
        ));
    }

    #[test]
    fn rejects_a_missing_path_segment() {
        let res = resolve_response(
            DOCUMENT.as_bytes(),
            &path(&["data", "missing", "uint256"]),
            "uint256",
        );
        assert!(matches!(
            res,
            Err(Error::MissingResponseField { segment }) if segment == "missing"
        ));
    }

    #[test]
    fn rejects_a_shape_mismatch() {
        // a string leaf cannot become an unsigned integer.
        let res = resolve_response(DOCUMENT.as_bytes(), &path(&["string"]), "uint256");
        assert!(matches!(res, Err(Error::ResponseTypeMismatch { .. })));
        // a negative number cannot become an unsigned integer.
        let res = resolve_response(
            DOCUMENT.as_bytes(),
            &path(&["data", "int256"]),
            "uint256",
        );
        assert!(matches!(res, Err(Error::ResponseTypeMismatch { .. })));
    }

    #[test]
    fn rejects_a_non_json_body() {
        assert!(resolve_response(b"<html>", &[], "uint256").is_err());
    }

    #[test]
    fn decodes_a_byte_array_leaf() {
        let leaf: Value = serde_json::from_str("[1, 2, 255]").unwrap();
        let value = decode(&leaf, ResponseKind::Bytes).unwrap();
        assert_eq!(value, ResolvedValue::Bytes(vec![1, 2, 255]));
    }

    #[test]
    fn only_bytes_and_uint256_have_an_entry_point() {
        assert_eq!(
            ResponseKind::Bytes.response_method(),
            Some(oracle_relayer_context::RESPONSE_BYTES_FN)
        );
        assert_eq!(
            ResponseKind::Uint256.response_method(),
            Some(oracle_relayer_context::RESPONSE_UINT256_FN)
        );
        assert_eq!(ResponseKind::Address.response_method(), None);
        assert_eq!(ResponseKind::String.response_method(), None);
    }
}
