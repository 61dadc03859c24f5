use crate::domain::conversation::Platform;

/// WhatsApp closes the free-form reply window 24 hours after the last
/// customer message; Instagram and Messenger allow 7 days, which is also the
/// default for unknown channels.
pub const WHATSAPP_WINDOW_SECS: u64 = 86_400;
pub const DEFAULT_WINDOW_SECS: u64 = 604_800;

pub fn window_seconds(platform: Platform) -> u64 {
    match platform {
        Platform::Whatsapp => WHATSAPP_WINDOW_SECS,
        _ => DEFAULT_WINDOW_SECS,
    }
}

/// Seconds left before the reply window expires, floored at zero.
pub fn remaining_seconds(window_secs: u64, last_message_ms: i64, now_ms: i64) -> u64 {
    let elapsed_secs = (now_ms.saturating_sub(last_message_ms)).max(0) / 1_000;
    window_secs.saturating_sub(elapsed_secs as u64)
}

/// Same computation expressed against a precomputed deadline.
pub fn remaining_from_deadline(deadline_ms: i64, now_ms: i64) -> u64 {
    (deadline_ms.saturating_sub(now_ms).max(0) / 1_000) as u64
}

pub fn deadline_ms(window_secs: u64, last_message_ms: i64) -> i64 {
    last_message_ms.saturating_add((window_secs as i64).saturating_mul(1_000))
}
