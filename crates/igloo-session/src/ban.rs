//! Ban classification and the escalation ladder.
//!
//! Repeat offenders get longer bans: the n-th offense maps through
//! `min(n, 4)` to 24 hours, 7 days, 30 days and finally a permanent ban.
//! The offense counter only goes up, so the ladder never regresses.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use igloo_protocol::ErrorCode;

/// Message shown for a permanent ban with no recorded reason.
pub const PERMANENT_BAN_MESSAGE: &str = "This account has been permanently banned.";

/// Temporary or permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanKind {
    /// Lifts at a known time (code 600).
    Temporary,
    /// Lifts only when cleared by hand (code 680).
    Permanent,
}

impl BanKind {
    /// The result code sent to a banned client.
    pub fn error_code(self) -> ErrorCode {
        match self {
            Self::Temporary => ErrorCode::TemporaryBan,
            Self::Permanent => ErrorCode::PermanentBan,
        }
    }
}

/// An active ban as reported at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanStatus {
    pub kind: BanKind,
    /// Text sent as the error payload.
    pub message: String,
}

/// Result of issuing an escalating ban.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanOutcome {
    pub kind: BanKind,
    /// `None` for permanent bans.
    pub expires_at: Option<DateTime<Utc>>,
}

impl BanOutcome {
    /// The expiry in ISO-8601 with milliseconds, e.g.
    /// `2025-01-02T03:04:05.678Z`, as sent with code 600.
    pub fn expires_at_iso(&self) -> Option<String> {
        self.expires_at
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Ban length for the given offense count; `None` means permanent.
pub fn ladder_duration(offense_count: u32) -> Option<Duration> {
    match offense_count.clamp(1, 4) {
        1 => Some(Duration::hours(24)),
        2 => Some(Duration::days(7)),
        3 => Some(Duration::days(30)),
        _ => None,
    }
}

/// Builds the login-time status for an active ban.
///
/// Temporary bans show `reason\nYYYY-MM-DD HH:MM` (UTC), or just the date
/// when there is no reason. Permanent bans show the reason, falling back
/// to [`PERMANENT_BAN_MESSAGE`].
pub fn describe(reason: &str, expires_at: Option<DateTime<Utc>>) -> BanStatus {
    match expires_at {
        Some(at) => {
            let formatted = at.format("%Y-%m-%d %H:%M").to_string();
            let message = if reason.is_empty() {
                formatted
            } else {
                format!("{reason}\n{formatted}")
            };
            BanStatus {
                kind: BanKind::Temporary,
                message,
            }
        }
        None => BanStatus {
            kind: BanKind::Permanent,
            message: if reason.is_empty() {
                PERMANENT_BAN_MESSAGE.to_string()
            } else {
                reason.to_string()
            },
        },
    }
}
