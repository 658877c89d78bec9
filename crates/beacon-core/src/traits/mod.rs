// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Backends extend [`PluginAdapter`] and use `#[async_trait]` for dynamic
//! dispatch compatibility.

pub mod adapter;
pub mod counter;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use counter::CounterStore;
pub use provider::SmsProvider;
pub use storage::{NotificationStore, PolicyStore, StorageAdapter};
