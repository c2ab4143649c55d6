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

use derive_more::Display;

/// Target for logger
pub const TARGET: &str = "oracle_probe";

/// The Kind of the Probe.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// When the Lifecycle of the Relayer changes, like starting or shutting down.
    #[display(fmt = "lifecycle")]
    Lifecycle,
    /// Query event subscription state: established, lost, re-established.
    #[display(fmt = "subscription")]
    Subscription,
    /// A query was decoded and is being processed by a dispatch unit.
    #[display(fmt = "query")]
    Query,
    /// Off-chain fetch state for a query.
    #[display(fmt = "fetch")]
    Fetch,
    /// Callback transaction submission state for a query.
    #[display(fmt = "tx_submit")]
    TxSubmit,
    /// When the relayer will retry to do something.
    #[display(fmt = "retry")]
    Retry,
}
