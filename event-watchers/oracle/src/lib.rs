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

#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Oracle Query Event Watcher 🕸️
//!
//! Watches the oracle contract's query events over a live websocket
//! subscription and relays each query end-to-end: decode, validate the
//! callback descriptor, fetch the answer off-chain, and submit the
//! callback transaction.
//!
//! Every event gets its own independent dispatch unit; units share
//! nothing mutable, only the read-only [`RelayerContext`].

/// Off-chain fetch with bounded retry.
pub mod fetcher;
/// Query, request and callback-descriptor types.
pub mod query;
/// Response resolution and the semantic type codec.
pub mod resolver;
/// Callback transaction submission with bounded retry.
pub mod sender;

use std::sync::Arc;

use ethers::prelude::*;
use futures::StreamExt;

use oracle_relayer_context::RelayerContext;
use oracle_relayer_utils::probe;

use fetcher::{DataSource, HttpDataSource, OffChainFetcher};
use query::OracleQuery;
use sender::{CallbackSender, ContractSubmitter, ResponseSubmitter};

/// Bounded retry count shared by both query legs: 3 retries after the
/// first attempt, 4 attempts total, with no delay in between.
pub const MAX_RETRY_COUNT: usize = 3;
/// Status code recorded on-chain for a successfully resolved query.
pub const STATUS_RESOLVED: u64 = 1;
/// Status code recorded on-chain when resolution failed after retries.
pub const STATUS_FAILED: u64 = 0;

/// Watches the oracle contract for query events and spawns one dispatch
/// unit per event.
#[derive(Debug, Clone, Default)]
pub struct QueryWatcher;

impl QueryWatcher {
    /// A helper tag used to identify the watcher in the logs.
    pub const TAG: &'static str = "Oracle Query Watcher";

    /// Runs the watcher until shutdown.
    ///
    /// Failing to establish the very first subscription aborts startup.
    /// Once live, a lost subscription is re-established with no retry
    /// bound and no backoff; event intake blocks until it succeeds.
    #[tracing::instrument(
        skip_all,
        fields(
            address = %ctx.config.contract_address,
            tag = %Self::TAG,
        ),
    )]
    pub async fn run(
        &self,
        ctx: Arc<RelayerContext>,
    ) -> oracle_relayer_utils::Result<()> {
        let client = ctx.client();
        let filter = Filter::new()
            .address(ctx.config.contract_address)
            .topic0(ctx.query_event().signature());
        let mut stream = client.inner().subscribe_logs(&filter).await?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Subscription,
            established = true,
        );
        let mut shutdown_signal = ctx.shutdown_signal();
        loop {
            tokio::select! {
                maybe_log = stream.next() => match maybe_log {
                    Some(raw_log) => {
                        // one independent unit of work per event, no
                        // bound on in-flight units.
                        tokio::spawn(handle_query(ctx.clone(), raw_log));
                    }
                    None => {
                        tracing::warn!("query event subscription lost, resubscribing");
                        tracing::event!(
                            target: probe::TARGET,
                            tracing::Level::DEBUG,
                            kind = %probe::Kind::Subscription,
                            lost = true,
                        );
                        stream = loop {
                            match client.inner().subscribe_logs(&filter).await {
                                Ok(s) => break s,
                                Err(e) => {
                                    tracing::error!("failed to resubscribe to query events: {e}");
                                }
                            }
                        };
                        tracing::event!(
                            target: probe::TARGET,
                            tracing::Level::DEBUG,
                            kind = %probe::Kind::Subscription,
                            reestablished = true,
                        );
                    }
                },
                _ = shutdown_signal.recv() => {
                    tracing::trace!("shutting down the query watcher");
                    return Ok(());
                }
            }
        }
    }
}

/// One dispatch unit: processes exactly one query event end-to-end with
/// the production data source and submitter.
#[tracing::instrument(
    skip_all,
    fields(
        block = ?raw_log.block_number,
        tx = ?raw_log.transaction_hash,
    ),
)]
async fn handle_query(ctx: Arc<RelayerContext>, raw_log: Log) {
    let fetcher =
        OffChainFetcher::new(HttpDataSource::new(ctx.http_client().clone()));
    let sender =
        CallbackSender::new(ContractSubmitter::new(ctx.contract().clone()));
    process_query(ctx.query_event(), &raw_log, &fetcher, &sender).await;
}

/// Decode, validate, fetch and submit for a single raw event.
///
/// Factored out of [`handle_query`] so the pipeline can run over any
/// [`DataSource`] and [`ResponseSubmitter`]. Every outcome terminates
/// here via logging; nothing propagates to the watcher task.
pub async fn process_query<S, T>(
    event: &ethers::abi::Event,
    raw_log: &Log,
    fetcher: &OffChainFetcher<S>,
    sender: &CallbackSender<T>,
) where
    S: DataSource,
    T: ResponseSubmitter,
{
    let query = match OracleQuery::decode(event, raw_log) {
        Ok(query) => query,
        Err(e) => {
            tracing::warn!("dropping an undecodable query event: {e}");
            return;
        }
    };
    tracing::debug!(
        query_id = ?query.query_id,
        requester = ?query.requester,
        fee = %query.fee,
        callback_addr = ?query.callback_addr,
        callback_fun = %query.callback_fun,
        "decoded query event",
    );
    let request = match query.request() {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("dropping a query with a malformed payload: {e}");
            return;
        }
    };
    // descriptor validation happens before any network or chain activity.
    let callback = match query.callback() {
        Ok(callback) => callback,
        Err(e) => {
            tracing::warn!("dropping a query with an invalid callback: {e}");
            return;
        }
    };
    tracing::event!(
        target: probe::TARGET,
        tracing::Level::TRACE,
        kind = %probe::Kind::Query,
        query_id = ?query.query_id,
        url = %request.url,
    );
    let kind_name = callback.response_type();
    let (status, value) =
        fetcher.fetch_with_status(&request, kind_name).await;
    match sender.submit(&query, status, value, kind_name).await {
        Ok(tx_hash) => {
            tracing::info!(?tx_hash, status, "callback submitted");
        }
        Err(e) => {
            // terminal: this query's outcome is never recorded on-chain.
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::ERROR,
                kind = %probe::Kind::TxSubmit,
                query_id = ?query.query_id,
                error = %e,
                abandoned = true,
            );
            tracing::error!("callback submission abandoned: {e}");
        }
    }
}
