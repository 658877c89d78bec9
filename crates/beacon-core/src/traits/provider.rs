// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS provider trait.

use async_trait::async_trait;

use crate::traits::adapter::PluginAdapter;
use crate::types::{OutboundSms, ProviderError, ProviderReceipt};

/// Adapter for an external SMS gateway.
///
/// Implementations map every transport or API failure onto a
/// [`ProviderError`] so the dispatcher can classify it as transient or
/// permanent without knowing the provider.
#[async_trait]
pub trait SmsProvider: PluginAdapter {
    /// Hand one message to the provider.
    async fn send_message(&self, message: &OutboundSms) -> Result<ProviderReceipt, ProviderError>;
}
