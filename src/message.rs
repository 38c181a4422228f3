use crate::header::HEADER_NAME;
use crate::DKIMError;
use mailparse::{parse_headers, MailHeader};

/// An ordered, duplicate-preserving view over a raw RFC 5322 message: the
/// header list in original order plus the body span. `mailparse` supplies
/// the header/value split; the header/body boundary is located
/// independently (see [`locate_body_start`]) so the tolerated terminator
/// variants below are honored the way a real verifier needs.
pub struct Message<'a> {
    raw: &'a [u8],
    headers: Vec<MailHeader<'a>>,
    body_start: usize,
}

impl<'a> Message<'a> {
    pub fn parse(raw: &'a [u8]) -> Result<Self, DKIMError> {
        let (headers, _) = parse_headers(raw)
            .map_err(|err| DKIMError::Unknown(format!("failed to parse message headers: {err}")))?;
        let body_start = locate_body_start(raw);
        Ok(Self {
            raw,
            headers,
            body_start,
        })
    }

    pub fn headers(&self) -> &[MailHeader<'a>] {
        &self.headers
    }

    pub fn body(&self) -> &'a [u8] {
        let start = self.body_start.min(self.raw.len());
        &self.raw[start..]
    }

    /// Raw values of every `DKIM-Signature` header present, in message
    /// order. Each one is independently verifiable: per RFC 6376 section
    /// 5.2, one message can carry several signatures and each is checked
    /// with its own fresh context.
    pub fn dkim_signature_headers(&self) -> Vec<&'a str> {
        self.headers
            .iter()
            .filter(|h| h.get_key_ref().eq_ignore_ascii_case(HEADER_NAME))
            .map(|h| std::str::from_utf8(h.get_value_raw()).unwrap_or(""))
            .collect()
    }
}

/// Finds the first byte after the header/body separator, tolerating
/// `\r\n\r\n`, `\n\n`, `\r\r` and `\n\r` as equally valid terminators. If
/// none is found, the body is empty.
fn locate_body_start(raw: &[u8]) -> usize {
    let mut i = 0;
    while i < raw.len() {
        if raw[i..].starts_with(b"\r\n\r\n") {
            return i + 4;
        }
        if i + 1 < raw.len() {
            let pair = &raw[i..i + 2];
            if pair == b"\n\n" || pair == b"\r\r" || pair == b"\n\r" {
                return i + 2;
            }
        }
        i += 1;
    }
    raw.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_body_start_crlf() {
        assert_eq!(locate_body_start(b"a: b\r\n\r\nbody"), 8);
    }

    #[test]
    fn test_locate_body_start_lf() {
        assert_eq!(locate_body_start(b"a: b\n\nbody"), 6);
    }

    #[test]
    fn test_locate_body_start_cr() {
        assert_eq!(locate_body_start(b"a: b\r\rbody"), 6);
    }

    #[test]
    fn test_locate_body_start_mixed() {
        assert_eq!(locate_body_start(b"a: b\n\rbody"), 6);
    }

    #[test]
    fn test_locate_body_start_none_is_empty_body() {
        let raw = b"a: b";
        assert_eq!(locate_body_start(raw), raw.len());
    }

    #[test]
    fn test_message_body() {
        let message = Message::parse(b"Subject: hi\r\n\r\nhello\r\n").unwrap();
        assert_eq!(message.body(), b"hello\r\n");
        assert_eq!(message.headers().len(), 1);
    }

    #[test]
    fn test_dkim_signature_headers_collects_all_in_order() {
        let raw = b"DKIM-Signature: v=1; a\r\nSubject: hi\r\nDkim-Signature: v=1; b\r\n\r\nbody"
            .to_vec();
        let message = Message::parse(&raw).unwrap();
        let values = message.dkim_signature_headers();
        assert_eq!(values.len(), 2);
        assert!(values[0].contains("v=1; a"));
        assert!(values[1].contains("v=1; b"));
    }
}
