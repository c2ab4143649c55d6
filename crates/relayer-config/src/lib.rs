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

#![warn(missing_docs)]

//! # Oracle Relayer Configuration Module 🕸️
//!
//! A module for configuring the oracle relayer.
//!
//! ## Overview
//!
//! The configuration is loaded from TOML/JSON files in the config
//! directory, with an `ORACLE`-prefixed environment overlay. Three fields
//! are required and the process will not start without them:
//! * `contract-address`: the oracle contract that emits query events.
//! * `ws-endpoint`: a websocket-capable URL of the event source node.
//! * `private-key`: the relayer's signing key (hex string or `$ENV_VAR`).

/// CLI configuration
#[cfg(feature = "cli")]
pub mod cli;
/// Utils for processing configuration
pub mod utils;

use ethers::types::Address;
use oracle_relayer_types::{PrivateKey, RpcUrl};
use serde::{Deserialize, Serialize};

/// OracleRelayerConfig is the configuration for the oracle relayer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OracleRelayerConfig {
    /// Address of the oracle contract whose query events we relay.
    #[serde(rename(serialize = "contractAddress"))]
    pub contract_address: Address,
    /// Websocket endpoint of the node serving the event stream and
    /// accepting the callback transactions.
    #[serde(rename(serialize = "wsEndpoint"))]
    pub ws_endpoint: RpcUrl,
    /// The relayer's signing key, used for every callback transaction.
    #[serde(skip_serializing)]
    pub private_key: PrivateKey,
}

impl OracleRelayerConfig {
    /// Makes sure that the config is valid, by going
    /// through the whole config and doing some basic checks.
    pub fn verify(&self) -> oracle_relayer_utils::Result<()> {
        // the event subscription requires a pubsub transport, so anything
        // other than a websocket url would only fail later and worse.
        let scheme = self.ws_endpoint.scheme();
        if scheme != "ws" && scheme != "wss" {
            return Err(oracle_relayer_utils::Error::Generic(
                "ws-endpoint must be a websocket-capable url (ws:// or wss://)",
            ));
        }
        if self.contract_address == Address::zero() {
            return Err(oracle_relayer_utils::Error::Generic(
                "contract-address cannot be the zero address",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<OracleRelayerConfig, toml::de::Error> {
        toml::from_str(toml)
    }

    #[test]
    fn accepts_a_complete_config() {
        let config = parse(
            r#"
            contract-address = "0x4E433Ad197a5bAb17274b26b3BE0B37AFE049ea3"
            ws-endpoint = "ws://localhost:8546"
            private-key = "0x000000000000000000000000000000000000000000000000000000616c696365"
            "#,
        )
        .unwrap();
        config.verify().unwrap();
        assert_eq!(config.ws_endpoint.scheme(), "ws");
    }

    #[test]
    fn rejects_a_missing_field() {
        let res = parse(
            r#"
            contract-address = "0x4E433Ad197a5bAb17274b26b3BE0B37AFE049ea3"
            ws-endpoint = "ws://localhost:8546"
            "#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn rejects_a_non_websocket_endpoint() {
        let config = parse(
            r#"
            contract-address = "0x4E433Ad197a5bAb17274b26b3BE0B37AFE049ea3"
            ws-endpoint = "http://localhost:8545"
            private-key = "0x000000000000000000000000000000000000000000000000000000616c696365"
            "#,
        )
        .unwrap();
        assert!(config.verify().is_err());
    }
}
