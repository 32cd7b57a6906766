//! Frame detection inside a raw receive buffer.
//!
//! TCP gives the session reader an arbitrary byte stream; a frame runs
//! from a `8=` anchor through the SOH terminating the `10=XXX` trailer.
//! The scanner is resynchronization-tolerant: bytes before the anchor are
//! treated as noise and consumed along with the frame.

use std::ops::Range;

/// `<SOH>10=XXX<SOH>` is exactly eight bytes.
pub const TRAILER_LEN: usize = 8;

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|idx| from + idx)
}

/// Locates the first complete frame in `buf`, returning its byte range.
/// Returns `None` until a full `8=…<SOH>10=XXX<SOH>` span has been
/// buffered.
pub fn scan(buf: &[u8]) -> Option<Range<usize>> {
    let start = find(buf, b"8=", 0)?;
    let trailer = find(buf, b"\x0110=", start)?;
    if buf.len() - trailer < TRAILER_LEN {
        // Trailer digits still in flight.
        return None;
    }
    Some(start..trailer + TRAILER_LEN)
}

/// Extracts the first complete frame from `buf`, draining the frame and
/// any leading noise. The frame is returned as text (the protocol is
/// ASCII; anything else would fail validation downstream anyway).
pub fn extract(buf: &mut Vec<u8>) -> Option<String> {
    let range = scan(buf)?;
    let msg = String::from_utf8_lossy(&buf[range.start..range.end]).into_owned();
    buf.drain(..range.end);
    Some(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{build_header, build_logon, build_trailer, EncryptMethod, MsgType};

    fn logon_frame(seq: u64) -> String {
        let payload = build_logon(EncryptMethod::None, 0);
        let mut msg = build_header(MsgType::Logon, payload.len(), "ACME", "FERX", seq);
        msg.push_str(&payload);
        let trailer = build_trailer(&msg);
        msg.push_str(&trailer);
        msg
    }

    #[test]
    fn incomplete_buffer_yields_nothing() {
        let msg = logon_frame(1);

        // No byte prefix of the frame short of the whole thing scans.
        for cut in 0..msg.len() {
            assert_eq!(scan(msg[..cut].as_bytes()), None, "cut at {cut}");
        }
        assert!(scan(msg.as_bytes()).is_some());
    }

    #[test]
    fn extract_returns_exact_frame() {
        let msg = logon_frame(1);
        let mut buf = msg.clone().into_bytes();

        assert_eq!(extract(&mut buf), Some(msg));
        assert!(buf.is_empty());
    }

    #[test]
    fn leading_noise_is_dropped() {
        let msg = logon_frame(1);
        let mut buf = b"\r\nGARBAGE".to_vec();
        buf.extend_from_slice(msg.as_bytes());

        assert_eq!(extract(&mut buf), Some(msg));
        assert!(buf.is_empty());
    }

    #[test]
    fn back_to_back_frames_come_out_in_order() {
        let first = logon_frame(1);
        let second = logon_frame(2);
        let mut buf = format!("{first}{second}").into_bytes();

        assert_eq!(extract(&mut buf), Some(first));
        assert_eq!(extract(&mut buf), Some(second));
        assert_eq!(extract(&mut buf), None);
    }

    #[test]
    fn partial_second_frame_stays_buffered() {
        let first = logon_frame(1);
        let second = logon_frame(2);
        let split = second.len() / 2;
        let mut buf = format!("{first}{}", &second[..split]).into_bytes();

        assert_eq!(extract(&mut buf), Some(first));
        assert_eq!(extract(&mut buf), None);

        buf.extend_from_slice(second[split..].as_bytes());
        assert_eq!(extract(&mut buf), Some(second));
    }
}
