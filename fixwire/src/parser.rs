//! Inbound field extraction and message validation.
//!
//! Every `parse_*` helper is tolerant of the field's absence and returns
//! `None` rather than failing. Fields are located by scanning for their
//! `<SOH>tag=` anchor (BeginString, always first, anchors at the start of
//! the message instead).

use crate::messages::{checksum, FixOrdType, FixSide, MsgType};
use crate::{FIX_VERSION, SOH};

/// Value of the field anchored by `pat` (e.g. `"\x0149="`), up to the next
/// SOH.
fn field<'a>(msg: &'a str, pat: &str) -> Option<&'a str> {
    let start = msg.find(pat)? + pat.len();
    let end = msg[start..].find(SOH)? + start;
    Some(&msg[start..end])
}

/// First character of the field anchored by `pat`. Used for the
/// single-character code fields (35, 54, 40).
fn field_char(msg: &str, pat: &str) -> Option<char> {
    let start = msg.find(pat)? + pat.len();
    msg[start..].chars().next()
}

/// 8: BeginString, always the first field of a message.
pub fn parse_begin_string(msg: &str) -> Option<&str> {
    let start = msg.find('=')? + 1;
    let end = msg.find(SOH)?;
    if end < start {
        return None;
    }
    Some(&msg[start..end])
}

/// 10: CheckSum as stated by the message trailer.
pub fn parse_checksum(msg: &str) -> Option<u32> {
    field(msg, "\x0110=")?.parse().ok()
}

/// 9: BodyLength as stated by the message.
pub fn parse_body_length(msg: &str) -> Option<u64> {
    field(msg, "\x019=")?.parse().ok()
}

/// 35: MsgType.
pub fn parse_msg_type(msg: &str) -> Option<MsgType> {
    MsgType::from_wire(field_char(msg, "\x0135=")?)
}

/// 49: SenderCompID, the firm sending the message.
pub fn parse_sender(msg: &str) -> Option<&str> {
    field(msg, "\x0149=")
}

/// 56: TargetCompID, the firm the message is addressed to.
pub fn parse_target(msg: &str) -> Option<&str> {
    field(msg, "\x0156=")
}

/// 34: MsgSeqNum.
pub fn parse_seq_num(msg: &str) -> Option<u64> {
    field(msg, "\x0134=")?.parse().ok()
}

/// 108: heartbeat interval in seconds.
pub fn parse_heartbeat(msg: &str) -> Option<i32> {
    field(msg, "\x01108=")?.parse().ok()
}

/// 11: ClOrdID, the client's own order identifier.
pub fn parse_client_id(msg: &str) -> Option<&str> {
    field(msg, "\x0111=")
}

/// 55: ticker symbol.
pub fn parse_symbol(msg: &str) -> Option<&str> {
    field(msg, "\x0155=")
}

/// 54: order side.
pub fn parse_side(msg: &str) -> Option<FixSide> {
    FixSide::from_wire(field_char(msg, "\x0154=")?)
}

/// 38: number of shares ordered.
pub fn parse_order_qty(msg: &str) -> Option<f64> {
    field(msg, "\x0138=")?.parse().ok()
}

/// 40: order type.
pub fn parse_ord_type(msg: &str) -> Option<FixOrdType> {
    FixOrdType::from_wire(field_char(msg, "\x0140=")?)
}

/// 44: limit price.
pub fn parse_price(msg: &str) -> Option<f64> {
    field(msg, "\x0144=")?.parse().ok()
}

fn valid_version(msg: &str) -> bool {
    parse_begin_string(msg) == Some(FIX_VERSION)
}

fn valid_length(msg: &str) -> bool {
    let stated = match parse_body_length(msg) {
        Some(len) => len,
        None => return false,
    };

    // Actual body spans from the character after the SOH terminating tag
    // 9's value through the SOH preceding the checksum field.
    let nine = match msg.find("\x019=") {
        Some(idx) => idx,
        None => return false,
    };
    let body_start = match msg[nine + 1..].find(SOH) {
        Some(idx) => nine + 1 + idx + 1,
        None => return false,
    };
    let body_end = match msg.find("\x0110=") {
        Some(idx) => idx + 1,
        None => return false,
    };

    body_end >= body_start && stated == (body_end - body_start) as u64
}

fn valid_checksum(msg: &str) -> bool {
    let stated = match parse_checksum(msg) {
        Some(cks) => cks,
        None => return false,
    };
    let trailer = match msg.find("\x0110=") {
        Some(idx) => idx,
        None => return false,
    };

    stated == checksum(&msg.as_bytes()[..trailer + 1])
}

/// A message is valid iff its BeginString is the known protocol version,
/// its stated BodyLength matches the actual body span, and its stated
/// checksum matches the computed one. All three checks are evaluated.
pub fn is_message_valid(msg: &str) -> bool {
    let version = valid_version(msg);
    let length = valid_length(msg);
    let cks = valid_checksum(msg);
    version && length && cks
}
