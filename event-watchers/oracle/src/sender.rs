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

use async_trait::async_trait;

use ethers::abi::Token;
use ethers::contract::Contract;
use ethers::types::TxHash;

use oracle_relayer_context::DEFAULT_GAS_LIMIT;
use oracle_relayer_utils::retry::ConstantWithMaxRetryCount;
use oracle_relayer_utils::{probe, Error, Result, WsSignerClient};

use crate::query::OracleQuery;
use crate::resolver::{ResolvedValue, ResponseKind};
use crate::MAX_RETRY_COUNT;

/// Submits one built callback-response transaction.
#[async_trait]
pub trait ResponseSubmitter: Send + Sync {
    /// Invokes `method` on the oracle contract with `params`, returning
    /// the transaction hash once the node accepted the transaction.
    async fn submit_response(
        &self,
        method: &'static str,
        params: Vec<Token>,
    ) -> Result<TxHash>;
}

/// The production submitter: a dynamic call on the bound oracle
/// contract, signed by the relayer wallet. Every call carries its own
/// freshly-built transaction with the fixed gas-limit ceiling, so
/// concurrent dispatch units never share mutable transaction options.
#[derive(Clone)]
pub struct ContractSubmitter {
    contract: Contract<WsSignerClient>,
}

impl ContractSubmitter {
    /// Creates a submitter over the bound oracle contract.
    pub fn new(contract: Contract<WsSignerClient>) -> Self {
        Self { contract }
    }
}

#[async_trait]
impl ResponseSubmitter for ContractSubmitter {
    async fn submit_response(
        &self,
        method: &'static str,
        params: Vec<Token>,
    ) -> Result<TxHash> {
        let call = self
            .contract
            .method::<_, ()>(method, params.as_slice())?
            .gas(DEFAULT_GAS_LIMIT);
        // returns once the node accepted the transaction; confirmation
        // is not awaited.
        let pending = call.send().await?;
        Ok(*pending)
    }
}

/// Builds and submits the response transaction for a query, with bounded
/// immediate retry.
#[derive(Debug, Clone)]
pub struct CallbackSender<S> {
    submitter: S,
}

impl<S: ResponseSubmitter> CallbackSender<S> {
    /// Creates a new sender over the given submitter.
    pub fn new(submitter: S) -> Self {
        Self { submitter }
    }

    /// Selects the on-chain entry point for the expected response kind
    /// and submits the callback, retrying immediately up to
    /// [`MAX_RETRY_COUNT`] extra attempts.
    ///
    /// An unsupported response kind aborts before any attempt is made.
    /// Retry exhaustion is terminal: the error propagates and the
    /// query's outcome is never recorded on-chain.
    pub async fn submit(
        &self,
        query: &OracleQuery,
        status: u64,
        value: ResolvedValue,
        kind_name: &str,
    ) -> Result<TxHash> {
        let kind: ResponseKind = kind_name.parse()?;
        let method = kind.response_method().ok_or_else(|| {
            Error::UnsupportedResponseType(kind_name.to_owned())
        })?;
        let params = vec![
            Token::FixedBytes(query.query_id.to_vec()),
            Token::Address(query.callback_addr),
            Token::String(query.callback_fun.clone()),
            Token::Uint(status.into()),
            value.into_token(),
        ];
        let backoff = ConstantWithMaxRetryCount::immediate(MAX_RETRY_COUNT);
        let task = || async {
            self.submitter
                .submit_response(method, params.clone())
                .await
                .map_err(backoff::Error::transient)
        };
        let notify = |err, _| {
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::Retry,
                method = method,
                error = %err,
            );
        };
        let tx_hash =
            backoff::future::retry_notify(backoff, task, notify).await?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::TxSubmit,
            method = method,
            status = status,
            tx_hash = ?tx_hash,
        );
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::STATUS_RESOLVED;
    use ethers::types::{Address, U256};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// A submitter that fails its first `fail_first` calls and records
    /// the rest.
    #[derive(Clone, Default)]
    struct MockSubmitter {
        fail_first: usize,
        calls: Arc<AtomicUsize>,
        submissions: Arc<Mutex<Vec<(&'static str, Vec<Token>)>>>,
    }

    impl MockSubmitter {
        fn failing(fail_first: usize) -> Self {
            Self {
                fail_first,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ResponseSubmitter for MockSubmitter {
        async fn submit_response(
            &self,
            method: &'static str,
            params: Vec<Token>,
        ) -> Result<TxHash> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(Error::Generic("node unavailable"));
            }
            self.submissions.lock().unwrap().push((method, params));
            Ok(TxHash::zero())
        }
    }

    fn query() -> OracleQuery {
        OracleQuery {
            query_id: [7u8; 32],
            requester: Address::zero(),
            fee: U256::zero(),
            callback_addr: "0x4E433Ad197a5bAb17274b26b3BE0B37AFE049ea3"
                .parse()
                .unwrap(),
            callback_fun: "cb(bytes32,uint64,uint256)".into(),
            query_data: Vec::new(),
        }
    }

    #[tokio::test]
    async fn submits_a_uint256_response() {
        let submitter = MockSubmitter::default();
        let submissions = submitter.submissions.clone();
        let sender = CallbackSender::new(submitter);
        sender
            .submit(
                &query(),
                STATUS_RESOLVED,
                ResolvedValue::Uint256(U256::from(123u64)),
                "uint256",
            )
            .await
            .unwrap();
        let submissions = submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        let (method, params) = &submissions[0];
        assert_eq!(*method, oracle_relayer_context::RESPONSE_UINT256_FN);
        assert_eq!(params[0], Token::FixedBytes(vec![7u8; 32]));
        assert_eq!(params[3], Token::Uint(U256::from(1u64)));
        assert_eq!(params[4], Token::Uint(U256::from(123u64)));
    }

    #[tokio::test]
    async fn selects_the_bytes_entry_point_for_bytes() {
        let submitter = MockSubmitter::default();
        let submissions = submitter.submissions.clone();
        let sender = CallbackSender::new(submitter);
        sender
            .submit(
                &query(),
                STATUS_RESOLVED,
                ResolvedValue::Bytes(b"testbytes".to_vec()),
                "bytes",
            )
            .await
            .unwrap();
        let submissions = submissions.lock().unwrap();
        assert_eq!(
            submissions[0].0,
            oracle_relayer_context::RESPONSE_BYTES_FN
        );
    }

    #[tokio::test]
    async fn four_failures_are_terminal() {
        let submitter = MockSubmitter::failing(usize::MAX);
        let calls = submitter.calls.clone();
        let sender = CallbackSender::new(submitter);
        let res = sender
            .submit(
                &query(),
                STATUS_RESOLVED,
                ResolvedValue::Uint256(U256::from(123u64)),
                "uint256",
            )
            .await;
        assert!(res.is_err());
        // exactly four attempts, never a fifth.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn recovers_within_the_retry_budget() {
        let submitter = MockSubmitter::failing(3);
        let calls = submitter.calls.clone();
        let sender = CallbackSender::new(submitter);
        sender
            .submit(
                &query(),
                STATUS_RESOLVED,
                ResolvedValue::Uint256(U256::from(123u64)),
                "uint256",
            )
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // each failed attempt shows up as a retry probe event.
        assert!(logs_contain("retry"));
    }

    #[tokio::test]
    async fn an_unsupported_kind_aborts_without_any_attempt() {
        let submitter = MockSubmitter::default();
        let calls = submitter.calls.clone();
        let sender = CallbackSender::new(submitter);
        let res = sender
            .submit(
                &query(),
                STATUS_RESOLVED,
                ResolvedValue::Address(Address::zero()),
                "address",
            )
            .await;
        assert!(matches!(
            res,
            Err(Error::UnsupportedResponseType(kind)) if kind == "address"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
