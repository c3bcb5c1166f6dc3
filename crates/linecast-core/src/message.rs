//! Outbound broadcast messages.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;

use crate::DisplayName;

/// `strftime` pattern for RFC 1123 dates, always rendered in UTC.
///
/// Produces e.g. `Mon, 02 Jan 2006 15:04:05 UTC`.
pub const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S UTC";

/// Formats a timestamp the way broadcast lines carry it.
pub fn format_rfc1123(at: &DateTime<Utc>) -> String {
    at.format(RFC1123_FORMAT).to_string()
}

/// Parses a timestamp produced by [`format_rfc1123`].
pub fn parse_rfc1123(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, RFC1123_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// A chat line ready for fan-out.
///
/// Built once by the read loop that received the text, then shared
/// read-only with every recipient. The rendered line is
/// `[<name>] [<timestamp>] - <text>\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    sender: DisplayName,
    received_at: DateTime<Utc>,
    line: Arc<str>,
}

impl OutboundMessage {
    pub fn new(sender: DisplayName, text: &str, received_at: DateTime<Utc>) -> Self {
        let line = format!(
            "[{}] [{}] - {}\n",
            sender,
            format_rfc1123(&received_at),
            text
        );
        Self {
            sender,
            received_at,
            line: Arc::from(line),
        }
    }

    /// Builds a message stamped with the current time.
    pub fn now(sender: DisplayName, text: &str) -> Self {
        Self::new(sender, text, Utc::now())
    }

    pub fn sender(&self) -> &DisplayName {
        &self.sender
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// The rendered wire line, newline included.
    pub fn as_line(&self) -> &str {
        &self.line
    }

    /// A cheap handle to the rendered line for per-recipient queues.
    pub fn shared_line(&self) -> Arc<str> {
        Arc::clone(&self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap()
    }

    #[test]
    fn test_format_rfc1123() {
        assert_eq!(format_rfc1123(&fixed_time()), "Mon, 02 Jan 2006 15:04:05 UTC");
    }

    #[test]
    fn test_parse_rfc1123_accepts_formatted_output() {
        let parsed = parse_rfc1123("Mon, 02 Jan 2006 15:04:05 UTC");
        assert_eq!(parsed, Some(fixed_time()));
    }

    #[test]
    fn test_parse_rfc1123_rejects_garbage() {
        assert!(parse_rfc1123("yesterday").is_none());
        assert!(parse_rfc1123("").is_none());
    }

    #[test]
    fn test_outbound_message_line_format() {
        let msg = OutboundMessage::new(DisplayName::from("alice"), "hi", fixed_time());
        assert_eq!(msg.as_line(), "[alice] [Mon, 02 Jan 2006 15:04:05 UTC] - hi\n");
        assert_eq!(msg.sender().as_str(), "alice");
        assert_eq!(msg.received_at(), fixed_time());
    }

    #[test]
    fn test_outbound_message_with_empty_sender() {
        let msg = OutboundMessage::new(DisplayName::default(), "anyone?", fixed_time());
        assert!(msg.as_line().starts_with("[] ["));
        assert!(msg.as_line().ends_with("] - anyone?\n"));
    }

    #[test]
    fn test_shared_line_points_at_same_text() {
        let msg = OutboundMessage::now(DisplayName::from("bob"), "hello");
        let a = msg.shared_line();
        let b = msg.shared_line();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&*a, msg.as_line());
    }
}
