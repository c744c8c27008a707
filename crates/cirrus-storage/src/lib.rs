// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Cirrus inventory engine.
//!
//! Provides the Inventory Store and Freshness Ledger over one WAL-mode
//! database with embedded migrations. All statements run on tokio-rusqlite's
//! single writer thread, so a triple replacement is one transaction that
//! readers observe either entirely or not at all.

pub mod adapter;
mod codec;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
