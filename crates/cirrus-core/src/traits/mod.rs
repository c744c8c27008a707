// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the engine and its collaborators.
//!
//! Every trait uses `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` and swapped for scripted doubles in tests.

pub mod collector;
pub mod credentials;
pub mod directory;
pub mod storage;

pub use collector::Collector;
pub use credentials::CredentialProvider;
pub use directory::AccountDirectory;
pub use storage::{FreshnessLedger, InventoryStore, ReplaceOutcome, StorageAdapter};
