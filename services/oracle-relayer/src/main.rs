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

//! Oracle Relayer Binary.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;
use tokio::signal::unix;

use oracle_relayer_config::cli::{load_config, setup_logger, Opts};
use oracle_relayer_context::RelayerContext;

/// The main entry point for the relayer.
///
/// # Arguments
///
/// * `args` - The command line arguments.
#[paw::main]
#[tokio::main]
async fn main(args: Opts) -> anyhow::Result<()> {
    setup_logger(args.verbose, "oracle_relayer")?;
    match dotenv::dotenv() {
        Ok(_) => {
            tracing::trace!("Loaded .env file");
        }
        Err(e) => {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    // The configuration is validated and configured from the given directory
    let config = load_config(args.config_dir.clone())?;

    // The RelayerContext takes a configuration, and populates objects that
    // are needed throughout the lifetime of the relayer: the websocket
    // client, the signing wallet, the bound oracle contract, and the HTTP
    // client used for off-chain fetches.
    let ctx = Arc::new(RelayerContext::new(config).await?);

    // start the query watcher on a background task. this does not block.
    let mut watcher_handle = oracle_relayer::service::ignite(&ctx);
    tracing::event!(
        target: oracle_relayer_utils::probe::TARGET,
        tracing::Level::DEBUG,
        kind = %oracle_relayer_utils::probe::Kind::Lifecycle,
        started = true
    );
    // watch for signals
    let mut ctrlc_signal = unix::signal(unix::SignalKind::interrupt())?;
    let mut termination_signal = unix::signal(unix::SignalKind::terminate())?;
    let mut quit_signal = unix::signal(unix::SignalKind::quit())?;
    let shutdown = || {
        tracing::event!(
            target: oracle_relayer_utils::probe::TARGET,
            tracing::Level::DEBUG,
            kind = %oracle_relayer_utils::probe::Kind::Lifecycle,
            shutdown = true
        );
        tracing::warn!("Shutting down...");
        // send shutdown signal to all of the application.
        ctx.shutdown();
        std::thread::sleep(std::time::Duration::from_millis(300));
        tracing::info!("Clean Exit ..");
    };
    tokio::select! {
        res = &mut watcher_handle => {
            // the watcher only returns early when startup failed; that
            // is fatal for the whole relayer.
            match res {
                Ok(Ok(())) => {
                    tracing::warn!("Query watcher exited");
                }
                Ok(Err(e)) => {
                    tracing::error!("Query watcher failed: {e}");
                    shutdown();
                    return Err(e.into());
                }
                Err(e) => {
                    tracing::error!("Query watcher task panicked: {e}");
                    shutdown();
                    return Err(e.into());
                }
            }
        },
        _ = ctrlc_signal.recv() => {
            tracing::warn!("Interrupted (Ctrl+C) ...");
            shutdown();
        },
        _ = termination_signal.recv() => {
            tracing::warn!("Got Terminate signal ...");
            shutdown();
        },
        _ = quit_signal.recv() => {
            tracing::warn!("Quitting ...");
            shutdown();
        },
    }
    Ok(())
}
