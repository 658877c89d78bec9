// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number masking for log output.

/// Digits kept visible at the end of a masked number.
const VISIBLE_SUFFIX: usize = 4;

/// Mask a phone number for logging, keeping the country prefix and the last
/// four digits: `+14155550123` becomes `+1******0123`.
///
/// Inputs too short to mask meaningfully are fully replaced.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.trim().chars().collect();
    let prefix_len = if chars.first() == Some(&'+') { 2 } else { 0 };
    if chars.len() <= prefix_len + VISIBLE_SUFFIX {
        return "*".repeat(chars.len().max(1));
    }
    let masked = chars.len() - prefix_len - VISIBLE_SUFFIX;
    let mut out = String::with_capacity(chars.len());
    out.extend(&chars[..prefix_len]);
    out.push_str(&"*".repeat(masked));
    out.extend(&chars[chars.len() - VISIBLE_SUFFIX..]);
    out
}
