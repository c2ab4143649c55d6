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
//! # Oracle Relayer Context Module 🕸️
//!
//! A module for managing the context of the relayer: the live websocket
//! client, the signing wallet, and the decoded oracle contract interface.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;

use ethers::abi::Abi;
use ethers::contract::Contract;
use ethers::core::k256::SecretKey;
use ethers::prelude::*;

use oracle_relayer_config::OracleRelayerConfig;
use oracle_relayer_utils::WsSignerClient;

/// The fixed path of the oracle contract interface description, relative
/// to the process working directory.
pub const ORACLE_INTERFACE_PATH: &str = "contract/Oracle.abi";
/// Name of the event the oracle contract emits for each pending query.
pub const QUERY_EVENT_NAME: &str = "QueryInfo";
/// The on-chain entry point receiving byte-string responses.
pub const RESPONSE_BYTES_FN: &str = "responseBytes";
/// The on-chain entry point receiving uint256 responses.
pub const RESPONSE_UINT256_FN: &str = "responseUint256";
/// Fixed gas-limit ceiling applied to every callback submission.
pub const DEFAULT_GAS_LIMIT: u64 = 6_000_000;

/// RelayerContext contains the relayer's configuration, its connection to
/// the chain and a shutdown signal.
#[derive(Clone)]
pub struct RelayerContext {
    /// The configuration of the relayer.
    pub config: OracleRelayerConfig,
    /// Broadcasts a shutdown signal to all active dispatch units.
    ///
    /// The initial `shutdown` trigger is provided by the `run` caller. When
    /// a graceful shutdown is initiated, a `()` value is sent via the
    /// broadcast::Sender and the watcher task reaches a safe terminal
    /// state.
    notify_shutdown: broadcast::Sender<()>,
    client: Arc<WsSignerClient>,
    contract: Contract<WsSignerClient>,
    query_event: ethers::abi::Event,
    http_client: reqwest::Client,
}

impl RelayerContext {
    /// Creates a new RelayerContext: connects to the configured websocket
    /// endpoint, sets up the signing wallet with the node's chain id, and
    /// loads the oracle interface description from its fixed path.
    ///
    /// Any failure here is startup-fatal.
    pub async fn new(
        config: OracleRelayerConfig,
    ) -> oracle_relayer_utils::Result<Self> {
        tracing::debug!(endpoint = %config.ws_endpoint, "Connecting to the node");
        let provider =
            Provider::<Ws>::connect(config.ws_endpoint.as_str()).await?;
        let chain_id = provider.get_chainid().await?;
        tracing::debug!(chain_id = %chain_id, "Connected");
        let key = SecretKey::from_bytes(config.private_key.as_bytes().into())?;
        let wallet = LocalWallet::from(key).with_chain_id(chain_id.as_u64());
        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        let abi = load_interface(ORACLE_INTERFACE_PATH)?;
        let query_event = abi.event(QUERY_EVENT_NAME)?.clone();
        // both callback entry points must exist before we accept any query.
        abi.function(RESPONSE_BYTES_FN)?;
        abi.function(RESPONSE_UINT256_FN)?;
        let contract =
            Contract::new(config.contract_address, abi, client.clone());

        let (notify_shutdown, _) = broadcast::channel(2);
        Ok(Self {
            config,
            notify_shutdown,
            client,
            contract,
            query_event,
            http_client: reqwest::Client::new(),
        })
    }

    /// Returns a broadcast receiver handle for the shutdown signal.
    pub fn shutdown_signal(&self) -> Shutdown {
        Shutdown::new(self.notify_shutdown.subscribe())
    }

    /// Sends a shutdown signal to all subscribed tasks/connections.
    pub fn shutdown(&self) {
        let _ = self.notify_shutdown.send(());
    }

    /// Returns the websocket client used for the event subscription and
    /// the callback submissions.
    pub fn client(&self) -> Arc<WsSignerClient> {
        self.client.clone()
    }

    /// Returns the bound oracle contract.
    pub fn contract(&self) -> &Contract<WsSignerClient> {
        &self.contract
    }

    /// Returns the decoded query event schema.
    pub fn query_event(&self) -> &ethers::abi::Event {
        &self.query_event
    }

    /// Returns the shared HTTP client used for off-chain fetches.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }
}

/// Reads and parses the oracle interface description from the given path.
///
/// A missing or empty file is an error; so is an unparseable one.
pub fn load_interface<P: AsRef<Path>>(
    path: P,
) -> oracle_relayer_utils::Result<Abi> {
    let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        tracing::error!(
            "Failed to read the oracle interface at {}: {}",
            path.as_ref().display(),
            e
        );
        oracle_relayer_utils::Error::MissingInterface {
            path: path.as_ref().display().to_string(),
        }
    })?;
    if raw.trim().is_empty() {
        tracing::error!(
            "The oracle interface at {} is empty",
            path.as_ref().display()
        );
        return Err(oracle_relayer_utils::Error::MissingInterface {
            path: path.as_ref().display().to_string(),
        });
    }
    let abi: Abi = serde_json::from_str(&raw)?;
    Ok(abi)
}

/// Listens for the relayer shutdown signal.
///
/// Shutdown is signalled using a `broadcast::Receiver`. Only a single value is
/// ever sent. Once a value has been sent via the broadcast channel, the
/// relayer should shutdown.
///
/// The `Shutdown` struct listens for the signal and tracks that the signal has
/// been received. Callers may query for whether the shutdown signal has been
/// received or not.
#[derive(Debug)]
pub struct Shutdown {
    /// `true` if the shutdown signal has been received
    shutdown: bool,

    /// The receive half of the channel used to listen for shutdown.
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Create a new `Shutdown` backed by the given `broadcast::Receiver`.
    pub fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            shutdown: false,
            notify,
        }
    }

    /// Receive the shutdown notice, waiting if necessary.
    pub async fn recv(&mut self) {
        // If the shutdown signal has already been received, then return
        // immediately.
        if self.shutdown {
            return;
        }

        // Cannot receive a "lag error" as only one value is ever sent.
        let _ = self.notify.recv().await;

        // Remember that the signal has been received.
        self.shutdown = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    #[tracing_test::traced_test]
    fn rejects_a_missing_interface_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = load_interface(dir.path().join("Oracle.abi"));
        assert!(matches!(
            res,
            Err(oracle_relayer_utils::Error::MissingInterface { .. })
        ));
        assert!(logs_contain("Failed to read the oracle interface"));
    }

    #[test]
    fn rejects_an_empty_interface_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Oracle.abi");
        std::fs::File::create(&path).unwrap();
        let res = load_interface(&path);
        assert!(matches!(
            res,
            Err(oracle_relayer_utils::Error::MissingInterface { .. })
        ));
    }

    #[test]
    fn parses_the_bundled_interface() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Oracle.abi");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(include_bytes!("../../../contract/Oracle.abi"))
            .unwrap();
        let abi = load_interface(&path).unwrap();
        assert!(abi.event(QUERY_EVENT_NAME).is_ok());
        assert!(abi.function(RESPONSE_BYTES_FN).is_ok());
        assert!(abi.function(RESPONSE_UINT256_FN).is_ok());
    }
}
