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

use ethers::core::k256::ecdsa::SigningKey;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Provider, Ws};
use ethers::signers::Wallet;

/// A module used for debugging relayer lifecycle, subscription state, or
/// other relayer state.
pub mod probe;
/// Retry functionality
pub mod retry;

/// Websocket client with a local signer, used for every on-chain callback.
pub type WsSignerClient = SignerMiddleware<Provider<Ws>, Wallet<SigningKey>>;

/// An enum of all possible errors that could be encountered during the
/// execution of the oracle relayer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON Error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Config loading error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Error while iterating over a glob pattern.
    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),
    /// Error from Glob Iterator.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
    /// Error while parsing a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// Error while parsing the config files.
    #[error("Config parse error: {}", _0)]
    ParseConfig(#[from] serde_path_to_error::Error<config::ConfigError>),
    /// Error in Http Provider (ethers client).
    #[error(transparent)]
    EthersProvider(#[from] ethers::providers::ProviderError),
    /// Ether wallet errors.
    #[error(transparent)]
    EtherWalletError(#[from] ethers::signers::WalletError),
    /// Elliptic Curve error.
    #[error(transparent)]
    EllipticCurve(#[from] ethers::core::k256::elliptic_curve::Error),
    /// Contract interface (ABI) error.
    #[error(transparent)]
    Abi(#[from] ethers::abi::Error),
    /// Error while encoding a contract call.
    #[error(transparent)]
    EthersContractAbi(#[from] ethers::contract::AbiError),
    /// Smart contract error.
    #[error(transparent)]
    EthersContractCall(
        #[from] ethers::contract::ContractError<WsSignerClient>,
    ),
    /// Reqwest error
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// Generic error.
    #[error("{}", _0)]
    Generic(&'static str),
    /// The oracle interface description file is missing or empty.
    #[error("Oracle interface file is missing or empty: {}", path)]
    MissingInterface {
        /// The fixed path the interface was expected at.
        path: String,
    },
    /// The callback function descriptor embedded in a query is malformed.
    #[error("Invalid callback function descriptor: {}", callback_fun)]
    InvalidCallbackFunction {
        /// The descriptor text, as received on-chain.
        callback_fun: String,
    },
    /// A field-path segment does not exist in the fetched document.
    #[error("Response data has no field for path segment: {}", segment)]
    MissingResponseField {
        /// The first segment that failed to resolve.
        segment: String,
    },
    /// The response leaf value does not have the shape the expected type
    /// requires.
    #[error("Cannot decode response value as {}: {}", kind, value)]
    ResponseTypeMismatch {
        /// The expected semantic type name.
        kind: String,
        /// The offending leaf value, rendered as JSON.
        value: String,
    },
    /// The expected response type is not one of the supported kinds.
    #[error("Unsupported response data type: {}", _0)]
    UnsupportedResponseType(String),
}

/// A type alias for the result for the oracle relayer, that uses the
/// `Error` enum.
pub type Result<T> = std::result::Result<T, Error>;
