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

//! # Oracle Relayer Crate 🕸️
//!
//! The oracle relayer bridges on-chain data queries with off-chain HTTP
//! data sources. It watches the oracle contract for query events,
//! fetches each query's answer from the URL the requester named,
//! resolves the answer out of the returned JSON document, and records
//! the outcome back on-chain through the contract's response entry
//! points.
//!
//! The binary wires together the long-running service in
//! [`service`]; all of the per-query relay logic lives in the
//! `oracle-event-watcher` crate.

/// Long-running background services.
pub mod service;

/// A type alias for the relayer's result type.
pub type Result<T> = oracle_relayer_utils::Result<T>;
