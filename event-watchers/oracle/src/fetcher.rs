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

use oracle_relayer_utils::retry::ConstantWithMaxRetryCount;
use oracle_relayer_utils::{probe, Result};

use crate::query::RequestDescriptor;
use crate::resolver::{self, ResolvedValue, ResponseKind};
use crate::{MAX_RETRY_COUNT, STATUS_FAILED, STATUS_RESOLVED};

/// An off-chain data source, addressable by URL.
///
/// The pipeline is generic over this so tests can drive the retry logic
/// without a network.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetches the raw response body at `url`.
    async fn fetch_body(&self, url: &str) -> Result<Vec<u8>>;
}

/// The production data source: a plain HTTP GET with the transport's
/// default timeout and no custom headers. A non-2xx response is a
/// failure.
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: reqwest::Client,
}

impl HttpDataSource {
    /// Creates a new `HttpDataSource` over the given client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch_body(&self, url: &str) -> Result<Vec<u8>> {
        let response =
            self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

/// Fetches a query's off-chain answer and resolves it, with bounded
/// immediate retry.
#[derive(Debug, Clone)]
pub struct OffChainFetcher<S> {
    source: S,
}

impl<S: DataSource> OffChainFetcher<S> {
    /// Creates a new fetcher over the given data source.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// One attempt: the HTTP fetch plus resolve/decode of the body. A
    /// failure on either half is retryable, since a transient malformed
    /// response is indistinguishable from a transient source glitch.
    async fn attempt(
        &self,
        request: &RequestDescriptor,
        kind_name: &str,
    ) -> Result<ResolvedValue> {
        let body = self.source.fetch_body(&request.url).await?;
        tracing::trace!(url = %request.url, "fetched off-chain response");
        resolver::resolve_response(&body, &request.response_params, kind_name)
    }

    /// Resolves `request`, retrying immediately up to [`MAX_RETRY_COUNT`]
    /// extra attempts. Exhaustion never propagates: it degrades to the
    /// failure status paired with the kind's empty value, so the outcome
    /// is still recorded on-chain.
    pub async fn fetch_with_status(
        &self,
        request: &RequestDescriptor,
        kind_name: &str,
    ) -> (u64, ResolvedValue) {
        let backoff = ConstantWithMaxRetryCount::immediate(MAX_RETRY_COUNT);
        let task = || async {
            self.attempt(request, kind_name)
                .await
                .map_err(backoff::Error::transient)
        };
        let notify = |err, _| {
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::Retry,
                url = %request.url,
                error = %err,
            );
        };
        match backoff::future::retry_notify(backoff, task, notify).await {
            Ok(value) => (STATUS_RESOLVED, value),
            Err(e) => {
                tracing::event!(
                    target: probe::TARGET,
                    tracing::Level::ERROR,
                    kind = %probe::Kind::Fetch,
                    url = %request.url,
                    error = %e,
                    exhausted = true,
                );
                tracing::error!(
                    "off-chain fetch exceeded retry bound for {}: {}",
                    request.url,
                    e
                );
                let empty = kind_name
                    .parse::<ResponseKind>()
                    .map(|kind| kind.empty_value())
                    .unwrap_or(ResolvedValue::Bytes(Vec::new()));
                (STATUS_FAILED, empty)
            }
        }
    }
}
