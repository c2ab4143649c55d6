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

use ethers::abi::{Event, RawLog, Token};
use ethers::types::{Address, Log, U256};
use serde::Deserialize;

use oracle_relayer_utils::{Error, Result};

/// A single pending data query, decoded from the oracle contract's
/// query event. Immutable for the lifetime of its dispatch unit.
#[derive(Debug, Clone)]
pub struct OracleQuery {
    /// Unique identifier of the query, assigned by the oracle contract.
    pub query_id: [u8; 32],
    /// The account that requested the query.
    pub requester: Address,
    /// The fee escrowed for this query.
    pub fee: U256,
    /// The contract that will receive the resolved answer.
    pub callback_addr: Address,
    /// The callback function descriptor text, e.g.
    /// `cb(bytes32,uint64,uint256)`.
    pub callback_fun: String,
    /// The request payload; expected to be JSON.
    pub query_data: Vec<u8>,
}

impl OracleQuery {
    /// Decodes a raw event log against the known query-event schema.
    pub fn decode(event: &Event, log: &Log) -> Result<Self> {
        let raw = RawLog {
            topics: log.topics.clone(),
            data: log.data.to_vec(),
        };
        let decoded = event.parse_log(raw)?;
        let mut params = decoded.params.into_iter().map(|p| p.value);
        // the event carries exactly six non-indexed fields, in this order.
        let query_id = match params.next() {
            Some(Token::FixedBytes(bytes)) if bytes.len() == 32 => {
                let mut id = [0u8; 32];
                id.copy_from_slice(&bytes);
                id
            }
            _ => return Err(Error::Generic("query event: invalid queryId")),
        };
        let requester = match params.next() {
            Some(Token::Address(addr)) => addr,
            _ => return Err(Error::Generic("query event: invalid requester")),
        };
        let fee = match params.next() {
            Some(Token::Uint(fee)) => fee,
            _ => return Err(Error::Generic("query event: invalid fee")),
        };
        let callback_addr = match params.next() {
            Some(Token::Address(addr)) => addr,
            _ => {
                return Err(Error::Generic("query event: invalid callbackAddr"))
            }
        };
        let callback_fun = match params.next() {
            Some(Token::String(s)) => s,
            _ => return Err(Error::Generic("query event: invalid callbackFUN")),
        };
        let query_data = match params.next() {
            Some(Token::Bytes(bytes)) => bytes,
            _ => return Err(Error::Generic("query event: invalid queryData")),
        };
        Ok(Self {
            query_id,
            requester,
            fee,
            callback_addr,
            callback_fun,
            query_data,
        })
    }

    /// Parses the query payload into a [`RequestDescriptor`].
    pub fn request(&self) -> Result<RequestDescriptor> {
        let request = serde_json::from_slice(&self.query_data)?;
        Ok(request)
    }

    /// Parses and validates the callback function descriptor.
    pub fn callback(&self) -> Result<CallbackDescriptor> {
        CallbackDescriptor::parse(&self.callback_fun)
    }
}

/// Where the answer lives off-chain: the URL to fetch and the ordered
/// field path locating the answer within the fetched JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestDescriptor {
    /// The URL to issue a plain GET against. Requester-controlled.
    #[serde(default)]
    pub url: String,
    /// Ordered JSON object keys leading to the answer. The last segment
    /// doubles as the expected semantic type of the leaf value.
    #[serde(default, rename = "responseParams")]
    pub response_params: Vec<String>,
}

/// The validated callback function descriptor: exactly three formal
/// parameter type names between the outer parentheses, the first of which
/// must be the query identifier type.
#[derive(Debug, Clone)]
pub struct CallbackDescriptor {
    params: Vec<String>,
}

impl CallbackDescriptor {
    /// The fixed type of a callback's first parameter: the query id.
    pub const ID_TYPE: &'static str = "bytes32";

    /// Parses `callback_fun` and enforces the descriptor shape. Any
    /// violation is terminal for the query; no network or chain activity
    /// happens for a query with an invalid descriptor.
    pub fn parse(callback_fun: &str) -> Result<Self> {
        let invalid = || Error::InvalidCallbackFunction {
            callback_fun: callback_fun.to_owned(),
        };
        let open = callback_fun.find('(').ok_or_else(invalid)?;
        if !callback_fun.ends_with(')') {
            return Err(invalid());
        }
        let inner = &callback_fun[open + 1..callback_fun.len() - 1];
        let params: Vec<String> =
            inner.split(',').map(|p| p.trim().to_owned()).collect();
        if params.len() != 3 || params[0] != Self::ID_TYPE {
            return Err(invalid());
        }
        Ok(Self { params })
    }

    /// The name of the expected response value's semantic type: the
    /// descriptor's third parameter.
    pub fn response_type(&self) -> &str {
        &self.params[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_three_param_callback_with_id_first() {
        let descriptor =
            CallbackDescriptor::parse("cb(bytes32,uint64,uint256)").unwrap();
        assert_eq!(descriptor.response_type(), "uint256");
    }

    #[test]
    fn rejects_a_two_param_callback() {
        assert!(CallbackDescriptor::parse("cb(bytes32,uint64)").is_err());
    }

    #[test]
    fn rejects_a_callback_without_the_id_type_first() {
        assert!(
            CallbackDescriptor::parse("cb(uint64,uint64,uint256)").is_err()
        );
    }

    #[test]
    fn rejects_a_callback_without_parentheses() {
        assert!(CallbackDescriptor::parse("cb").is_err());
        assert!(CallbackDescriptor::parse("cb(bytes32,uint64,uint256").is_err());
    }

    #[test]
    fn parses_a_request_descriptor_payload() {
        let query = OracleQuery {
            query_id: [0u8; 32],
            requester: Address::zero(),
            fee: U256::zero(),
            callback_addr: Address::zero(),
            callback_fun: "cb(bytes32,uint64,uint256)".into(),
            query_data:
                br#"{"url":"http://svc/x","responseParams":["data","uint256"]}"#
                    .to_vec(),
        };
        let request = query.request().unwrap();
        assert_eq!(request.url, "http://svc/x");
        assert_eq!(request.response_params, vec!["data", "uint256"]);
    }

    #[test]
    fn rejects_a_non_json_payload() {
        let query = OracleQuery {
            query_id: [0u8; 32],
            requester: Address::zero(),
            fee: U256::zero(),
            callback_addr: Address::zero(),
            callback_fun: "cb(bytes32,uint64,uint256)".into(),
            query_data: b"not json".to_vec(),
        };
        assert!(query.request().is_err());
    }
}
