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

//! # Relayer Service Module 🕸️
//!
//! A module for starting the long-running query-watching task.

use std::sync::Arc;

use oracle_event_watcher::QueryWatcher;
use oracle_relayer_context::RelayerContext;

/// Starts the query event watcher as a background task.
///
/// The returned handle resolves when the watcher exits: `Ok(())` on
/// shutdown, or the startup error when the very first subscription to
/// the oracle contract cannot be established.
pub fn ignite(
    ctx: &Arc<RelayerContext>,
) -> tokio::task::JoinHandle<crate::Result<()>> {
    tracing::debug!(
        address = %ctx.config.contract_address,
        endpoint = %ctx.config.ws_endpoint,
        "Starting the oracle query watcher",
    );
    let ctx = ctx.clone();
    tokio::spawn(async move {
        let watcher = QueryWatcher;
        watcher.run(ctx).await
    })
}
