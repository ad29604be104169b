// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.

//! Durable Store backends.
//!
//! The core never owns persistence; it reads and writes through the
//! [`traits::DurableStore`] abstraction. Two backends ship with the crate:
//! [`memory::InMemoryStore`] for tests and degraded sessions, and
//! [`file::FileStore`] for real on-device durability.

pub mod file;
pub mod memory;
pub mod traits;
