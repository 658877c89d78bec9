// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS body templates, one per notification kind.
//!
//! Composition is pure and total; length and content checks belong to the
//! compliance validator, which runs on the composed body.

use beacon_core::types::NotificationParams;
use rust_decimal::Decimal;

/// Compose the body for any notification.
pub fn compose(params: &NotificationParams) -> String {
    match params {
        NotificationParams::BidAlert {
            nft_name,
            bid_amount,
            bidder,
            ..
        } => bid_alert(nft_name, bid_amount, bidder),
        NotificationParams::AuctionAlert {
            nft_name,
            time_remaining,
            current_bid,
            ..
        } => auction_alert(nft_name, current_bid, time_remaining),
        NotificationParams::TwoFactorAuth { code } => two_factor_auth(code),
        NotificationParams::TransactionConfirmation {
            transaction_type,
            nft_name,
            amount,
            tx_hash,
            ..
        } => transaction_confirmation(transaction_type, nft_name, amount, tx_hash),
    }
}

pub fn bid_alert(nft_name: &str, bid_amount: &Decimal, bidder: &str) -> String {
    format!(
        "New bid on {nft_name}! {bidder} bid {bid_amount} ETH. \
         Check your NFTopia dashboard to respond."
    )
}

pub fn auction_alert(nft_name: &str, current_bid: &Decimal, time_remaining: &str) -> String {
    format!(
        "Auction ending soon! {nft_name} - Current bid: {current_bid} ETH. \
         Time left: {time_remaining}. Act now!"
    )
}

pub fn two_factor_auth(code: &str) -> String {
    format!(
        "Your NFTopia verification code is: {code}. \
         This code expires in 10 minutes. Do not share this code."
    )
}

pub fn transaction_confirmation(
    transaction_type: &str,
    nft_name: &str,
    amount: &Decimal,
    tx_hash: &str,
) -> String {
    format!(
        "{transaction_type} confirmed! {nft_name} - {amount} ETH. \
         TX: {}. View on NFTopia.",
        shorten_hash(tx_hash)
    )
}

/// `0x1234...abcd`: first six and last four characters of long hashes.
fn shorten_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= 10 {
        return hash.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
