//! Outbound message construction.
//!
//! A transmitted message is header, then payload, then trailer. The header
//! carries tags 8/9/35/49/56/34/52, the payload is a previously built field block
//! (possibly empty), and the trailer is the `10=NNN` checksum over
//! everything before it.

use chrono::Utc;

use crate::{FIX_VERSION, SOH};

/// Message types, FIX 4.2 page 154. The wire encodes each type as a single
/// character starting at '0'; the discriminants here are that character
/// minus '0', so `Logon = 17` encodes as 'A' and `NewOrderSingle = 20`
/// as 'D'.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MsgType {
    Heartbeat = 0,
    TestRequest = 1,
    ResendRequest = 2,
    Reject = 3,
    SeqReset = 4,
    Logout = 5,
    IndicationOfInterest = 6,
    Advertisement = 7,
    ExecutionReport = 8,
    OrderCancelReject = 9,
    Logon = 17,
    NewOrderSingle = 20,
    OrderCancelRequest = 22,
    OrderCancelReplaceRequest = 23,
    OrderStatusRequest = 24,
    Private = 37,
}

impl MsgType {
    pub fn to_wire(self) -> char {
        (b'0' + self as u8) as char
    }

    pub fn from_wire(c: char) -> Option<Self> {
        match (c as i32) - ('0' as i32) {
            0 => Some(MsgType::Heartbeat),
            1 => Some(MsgType::TestRequest),
            2 => Some(MsgType::ResendRequest),
            3 => Some(MsgType::Reject),
            4 => Some(MsgType::SeqReset),
            5 => Some(MsgType::Logout),
            6 => Some(MsgType::IndicationOfInterest),
            7 => Some(MsgType::Advertisement),
            8 => Some(MsgType::ExecutionReport),
            9 => Some(MsgType::OrderCancelReject),
            17 => Some(MsgType::Logon),
            20 => Some(MsgType::NewOrderSingle),
            22 => Some(MsgType::OrderCancelRequest),
            23 => Some(MsgType::OrderCancelReplaceRequest),
            24 => Some(MsgType::OrderStatusRequest),
            37 => Some(MsgType::Private),
            _ => None,
        }
    }
}

/// Order side, tag 54. Single-digit wire values starting at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixSide {
    Buy = 1,
    Sell = 2,
    BuyMinus = 3,
    SellPlus = 4,
    SellShort = 5,
    SellShortExempt = 6,
    Undisclosed = 7,
    Cross = 8,
    CrossShort = 9,
}

impl FixSide {
    pub fn to_wire(self) -> char {
        (b'0' + self as u8) as char
    }

    pub fn from_wire(c: char) -> Option<Self> {
        match (c as i32) - ('0' as i32) {
            1 => Some(FixSide::Buy),
            2 => Some(FixSide::Sell),
            3 => Some(FixSide::BuyMinus),
            4 => Some(FixSide::SellPlus),
            5 => Some(FixSide::SellShort),
            6 => Some(FixSide::SellShortExempt),
            7 => Some(FixSide::Undisclosed),
            8 => Some(FixSide::Cross),
            9 => Some(FixSide::CrossShort),
            _ => None,
        }
    }
}

/// Order type, tag 40. Same `'0'`-relative encoding as [`MsgType`]:
/// values past 9 use the following ASCII characters ('H' for OnClose, …).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixOrdType {
    Market = 1,
    Limit = 2,
    Stop = 3,
    StopLimit = 4,
    MarketOnClose = 5,
    WithOrWithout = 6,
    LimitOrBetter = 7,
    LimitWithOrWithout = 8,
    OnBasis = 9,
    OnClose = 17,
    LimitOnClose = 18,
    ForexMarket = 19,
    PrevQuoted = 20,
    PrevIndicated = 21,
    ForexLimit = 22,
    ForexSwap = 23,
    ForexPrevQuoted = 24,
    Funari = 25,
    Pegged = 32,
}

impl FixOrdType {
    pub fn to_wire(self) -> char {
        (b'0' + self as u8) as char
    }

    pub fn from_wire(c: char) -> Option<Self> {
        match (c as i32) - ('0' as i32) {
            1 => Some(FixOrdType::Market),
            2 => Some(FixOrdType::Limit),
            3 => Some(FixOrdType::Stop),
            4 => Some(FixOrdType::StopLimit),
            5 => Some(FixOrdType::MarketOnClose),
            6 => Some(FixOrdType::WithOrWithout),
            7 => Some(FixOrdType::LimitOrBetter),
            8 => Some(FixOrdType::LimitWithOrWithout),
            9 => Some(FixOrdType::OnBasis),
            17 => Some(FixOrdType::OnClose),
            18 => Some(FixOrdType::LimitOnClose),
            19 => Some(FixOrdType::ForexMarket),
            20 => Some(FixOrdType::PrevQuoted),
            21 => Some(FixOrdType::PrevIndicated),
            22 => Some(FixOrdType::ForexLimit),
            23 => Some(FixOrdType::ForexSwap),
            24 => Some(FixOrdType::ForexPrevQuoted),
            25 => Some(FixOrdType::Funari),
            32 => Some(FixOrdType::Pegged),
            _ => None,
        }
    }
}

/// Logon encryption method, tag 98.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptMethod {
    None = 0,
    Pkcs = 1,
    Des = 2,
    PkcsDes = 3,
    PgpDes = 4,
    PgpDesMd5 = 5,
    PemDesMd5 = 6,
}

/// Order handling instruction, tag 21.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlInst {
    AutoPrivate = 1,
    AutoPublic = 2,
    Manual = 3,
}

impl HandlInst {
    pub fn to_wire(self) -> char {
        (b'0' + self as u8) as char
    }
}

/// Sum of all bytes mod 256. The FIX checksum covers every byte of the
/// message up to and including the SOH that precedes the `10=` field.
pub fn checksum(buf: &[u8]) -> u32 {
    buf.iter().fold(0u32, |cks, &b| cks.wrapping_add(b as u32)) % 256
}

/// Tag 52 / tag 60 timestamp: `YYYYMMDD-HH:MM:SS`, UTC.
pub fn utc_timestamp() -> String {
    Utc::now().format("%Y%m%d-%H:%M:%S").to_string()
}

/// Builds the standard header: `8=FIX.4.2|9=L|35=T|49=…|56=…|34=…|52=…|`.
///
/// `payload_len` is the byte length of the field block that will follow the
/// header; BodyLength covers everything after the SOH terminating tag 9's
/// value up to and including the SOH before the checksum, so it is the
/// header fields from tag 35 on plus the payload.
pub fn build_header(
    msg_type: MsgType,
    payload_len: usize,
    sender_comp_id: &str,
    target_comp_id: &str,
    msg_seq_num: u64,
) -> String {
    let body = format!(
        "35={}{SOH}49={}{SOH}56={}{SOH}34={}{SOH}52={}{SOH}",
        msg_type.to_wire(),
        sender_comp_id,
        target_comp_id,
        msg_seq_num,
        utc_timestamp(),
    );

    format!(
        "8={FIX_VERSION}{SOH}9={}{SOH}{body}",
        body.len() + payload_len
    )
}

/// Builds the trailer for an assembled header + payload: `10=NNN|` with
/// the checksum zero-padded to three digits.
pub fn build_trailer(header_and_payload: &str) -> String {
    format!("10={:03}{SOH}", checksum(header_and_payload.as_bytes()))
}

/// Logon payload: `98=…|108=…|`.
pub fn build_logon(encrypt_method: EncryptMethod, heart_bt_int: i32) -> String {
    format!(
        "98={}{SOH}108={}{SOH}",
        encrypt_method as i32, heart_bt_int
    )
}

/// NewOrderSingle payload: tags 11, 21, 55, 54, 60, 38, 40, 44 in that
/// order. Quantity and price are rendered with four decimal places.
pub fn build_new_order_single(
    cl_ord_id: &str,
    handl_inst: HandlInst,
    symbol: &str,
    side: FixSide,
    order_qty: f64,
    ord_type: FixOrdType,
    price: f64,
) -> String {
    format!(
        "11={}{SOH}21={}{SOH}55={}{SOH}54={}{SOH}60={}{SOH}38={:.4}{SOH}40={}{SOH}44={:.4}{SOH}",
        cl_ord_id,
        handl_inst.to_wire(),
        symbol,
        side.to_wire(),
        utc_timestamp(),
        order_qty,
        ord_type.to_wire(),
        price,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn wire_chars_use_ascii_offsets() {
        assert_eq!(MsgType::Heartbeat.to_wire(), '0');
        assert_eq!(MsgType::Logout.to_wire(), '5');
        // 17 past '0' lands on 'A', 20 on 'D'
        assert_eq!(MsgType::Logon.to_wire(), 'A');
        assert_eq!(MsgType::NewOrderSingle.to_wire(), 'D');
        assert_eq!(FixSide::Buy.to_wire(), '1');
        assert_eq!(FixOrdType::Limit.to_wire(), '2');

        assert_eq!(MsgType::from_wire('A'), Some(MsgType::Logon));
        assert_eq!(MsgType::from_wire('D'), Some(MsgType::NewOrderSingle));
        assert_eq!(MsgType::from_wire('z'), None);
        assert_eq!(FixSide::from_wire('2'), Some(FixSide::Sell));
        assert_eq!(FixOrdType::from_wire('1'), Some(FixOrdType::Market));
    }

    #[test]
    fn checksum_is_byte_sum_mod_256() {
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(b"8="), (b'8' as u32 + b'=' as u32) % 256);

        // 256 'A's wrap back to zero
        let buf = vec![1u8; 256];
        assert_eq!(checksum(&buf), 0);
    }

    #[test]
    fn header_body_length_covers_fields_after_tag_9() {
        let header = build_header(MsgType::Logon, 0, "CLIENT1", "FERX", 1);

        assert!(header.starts_with("8=FIX.4.2\x019="));
        let stated = parser::parse_body_length(&header).expect("body length field");

        // Everything after the SOH terminating tag 9's value.
        let after_nine = header.find("\x0135=").expect("35 follows 9") + 1;
        assert_eq!(stated as usize, header.len() - after_nine);
    }

    #[test]
    fn header_carries_payload_length() {
        let payload = build_logon(EncryptMethod::None, 30);
        let bare = build_header(MsgType::Logon, 0, "A", "B", 7);
        let with_payload = build_header(MsgType::Logon, payload.len(), "A", "B", 7);

        let bare_len = parser::parse_body_length(&bare).unwrap();
        let full_len = parser::parse_body_length(&with_payload).unwrap();
        assert_eq!(full_len - bare_len, payload.len() as u64);
    }

    #[test]
    fn trailer_is_three_digit_checksum() {
        let trailer = build_trailer("8=FIX.4.2\x01");
        assert_eq!(trailer.len(), 8); // "10=" + 3 digits + SOH
        assert!(trailer.starts_with("10="));
        assert!(trailer.ends_with('\x01'));

        let digits = &trailer[3..6];
        assert_eq!(digits.parse::<u32>().unwrap(), checksum(b"8=FIX.4.2\x01"));
    }

    #[test]
    fn logon_payload_fields() {
        assert_eq!(
            build_logon(EncryptMethod::None, 0),
            "98=0\x01108=0\x01"
        );
        assert_eq!(
            build_logon(EncryptMethod::Des, 30),
            "98=2\x01108=30\x01"
        );
    }

    #[test]
    fn new_order_single_payload_fields() {
        let payload = build_new_order_single(
            "ORD-1",
            HandlInst::AutoPrivate,
            "AAPL",
            FixSide::Buy,
            100.0,
            FixOrdType::Limit,
            10.0,
        );

        assert!(payload.starts_with("11=ORD-1\x0121=1\x0155=AAPL\x0154=1\x0160="));
        assert!(payload.contains("\x0138=100.0000\x0140=2\x0144=10.0000\x01"));
    }

    #[test]
    fn assembled_message_round_trips() {
        let payload = build_logon(EncryptMethod::None, 0);
        let mut msg = build_header(MsgType::Logon, payload.len(), "ACME", "FERX", 1);
        msg.push_str(&payload);
        let trailer = build_trailer(&msg);
        msg.push_str(&trailer);

        assert!(parser::is_message_valid(&msg));
    }

    #[test]
    fn sending_time_format() {
        let ts = utc_timestamp();
        // YYYYMMDD-HH:MM:SS
        assert_eq!(ts.len(), 17);
        assert_eq!(ts.as_bytes()[8], b'-');
        assert_eq!(ts.as_bytes()[11], b':');
        assert_eq!(ts.as_bytes()[14], b':');
    }
}
