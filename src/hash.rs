use crate::canonicalization::Type;
use crate::header::{SignatureHeader, HEADER_NAME};
use crate::message::Message;
use sha1::{Digest as _, Sha1};
use sha2::Sha256;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgo {
    RsaSha1,
    RsaSha256,
}

impl HashAlgo {
    pub fn algo_name(&self) -> &'static str {
        match self {
            Self::RsaSha1 => "rsa-sha1",
            Self::RsaSha256 => "rsa-sha256",
        }
    }

    /// Expected `bh` length in bytes: 20 for SHA-1, 32 for SHA-256.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::RsaSha1 => 20,
            Self::RsaSha256 => 32,
        }
    }
}

pub(crate) struct LimitHasher {
    pub limit: usize,
    pub hashed: usize,
    pub hasher: HashImpl,
}

impl LimitHasher {
    pub fn hash(&mut self, bytes: &[u8]) {
        let remain = self.limit.saturating_sub(self.hashed);
        let len = bytes.len().min(remain);
        self.hasher.hash(&bytes[..len]);
        self.hashed += len;
    }

    pub fn finalize_bytes(self) -> Vec<u8> {
        self.hasher.finalize_bytes()
    }
}

pub(crate) enum HashImpl {
    Sha1(Sha1),
    Sha256(Sha256),
    #[cfg(test)]
    Copy(Vec<u8>),
}

impl HashImpl {
    pub fn from_algo(algo: HashAlgo) -> Self {
        match algo {
            HashAlgo::RsaSha1 => Self::Sha1(Sha1::new()),
            HashAlgo::RsaSha256 => Self::Sha256(Sha256::new()),
        }
    }

    #[cfg(test)]
    pub fn copy_data() -> Self {
        Self::Copy(vec![])
    }

    pub fn hash(&mut self, bytes: &[u8]) {
        match self {
            Self::Sha1(hasher) => hasher.update(bytes),
            Self::Sha256(hasher) => hasher.update(bytes),
            #[cfg(test)]
            Self::Copy(data) => data.extend_from_slice(bytes),
        }
    }

    pub fn finalize_bytes(self) -> Vec<u8> {
        match self {
            Self::Sha1(hasher) => hasher.finalize().to_vec(),
            Self::Sha256(hasher) => hasher.finalize().to_vec(),
            #[cfg(test)]
            Self::Copy(data) => data,
        }
    }
}

/// Computes the body hash (`bh`).
/// <https://datatracker.ietf.org/doc/html/rfc6376#section-3.7>
pub(crate) fn compute_body_hash(
    body_canon: Type,
    length_limit: Option<usize>,
    hash_algo: HashAlgo,
    body: &[u8],
) -> Vec<u8> {
    let mut hasher = LimitHasher {
        hasher: HashImpl::from_algo(hash_algo),
        limit: length_limit.unwrap_or(usize::MAX),
        hashed: 0,
    };

    body_canon.canon_body(body, &mut hasher);

    hasher.finalize_bytes()
}

/// Fetches, bottom-up per name, the header occurrences listed in `h=`.
/// When the list names a header twice, the first list entry matches the
/// last occurrence in the message, the second the second-to-last, and so
/// on. Returns the name of the first listed header with no remaining
/// occurrence in the message, since that signature cannot be evaluated
/// (RECORD_ERROR at the `check` layer).
fn select_headers<'a>(
    h_list: &str,
    message: &'a Message<'a>,
) -> Result<Vec<(String, &'a [u8])>, String> {
    let mut signed_headers = vec![];

    let headers = message.headers();
    let num_headers = headers.len();
    let mut last_index: HashMap<String, usize> = HashMap::new();

    for name in h_list.split(':').map(|h| h.trim()) {
        let lname = name.to_ascii_lowercase();
        let index = *last_index.get(&lname).unwrap_or(&num_headers);

        let mut found = false;
        for (header_index, header) in headers.iter().enumerate().rev().skip(num_headers - index) {
            if header.get_key_ref().eq_ignore_ascii_case(name) {
                signed_headers.push((header.get_key(), header.get_value_raw()));
                last_index.insert(lname.clone(), header_index);
                found = true;
                break;
            }
        }

        if !found {
            return Err(name.to_owned());
        }
    }

    Ok(signed_headers)
}

/// Elides the `b=` tag's value from a DKIM-Signature header's raw text,
/// replacing it with nothing while leaving everything else byte-exact.
/// <https://datatracker.ietf.org/doc/html/rfc6376#section-3.7>
fn elide_signature_value(dkim_header: &SignatureHeader) -> String {
    match dkim_header.get_raw_tag("b") {
        Some(b) if !b.is_empty() => dkim_header.raw_value().replace(b, ""),
        _ => dkim_header.raw_value().to_owned(),
    }
}

/// Computes the headers hash that feeds RSA verification: the listed
/// headers in `h=`, each canonicalized, followed by the DKIM-Signature
/// header itself with its `b=` value elided.
pub(crate) fn compute_headers_hash<'a>(
    header_canon: Type,
    h_list: &str,
    hash_algo: HashAlgo,
    dkim_header: &SignatureHeader,
    message: &'a Message<'a>,
) -> Result<Vec<u8>, String> {
    let mut input = Vec::new();

    for (key, value) in select_headers(h_list, message)? {
        header_canon.canon_header_into(&key, value, &mut input);
    }

    {
        let elided = elide_signature_value(dkim_header);
        let mut canonicalized = vec![];
        header_canon.canon_header_into(HEADER_NAME, elided.as_bytes(), &mut canonicalized);

        // The signature header is not followed by a final CRLF in the feed.
        canonicalized.truncate(canonicalized.len().saturating_sub(2));
        input.extend_from_slice(&canonicalized);
    }

    tracing::debug!("headers fed to headers-hash: {} bytes", input.len());

    let mut hasher = HashImpl::from_algo(hash_algo);
    hasher.hash(&input);
    Ok(hasher.finalize_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonicalization;

    fn dkim_header() -> SignatureHeader {
        SignatureHeader::parse("v=1; a=rsa-sha256; q=dns/txt; c=relaxed/relaxed; s=smtp; d=test.com; t=1641506955; h=content-type:to: subject:date:from:mime-version:sender; bh=PU2XIErWsXvhvt1W96ntPWZ2VImjVZ3vBY2T/A+wA3A=; b=PIO0A014nyntOGKdTdtvCJor9ZxvP1M3hoLeEh8HqZ+RvAyEKdAc7VOg+/g/OTaZgsmw6U sZCoN0YNVp+2o9nkaeUslsVz3M4I55HcZnarxl+fhplIMcJ/3s0nIhXL51MfGPRqPbB7/M Gjg9/07/2vFoid6Kitg6Z+CfoD2wlSRa8xDfmeyA2cHpeVuGQhGxu7BXuU8kGbeM4+weit Ql3t9zalhikEPI5Pr7dzYFrgWNOEO6w6rQfG7niKON1BimjdbJlGanC7cO4UL361hhXT4X iXLnC9TG39xKFPT/+4nkHy8pp6YvWkD3wKlBjwkYNm0JvKGwTskCMDeTwxXhAg==").unwrap()
    }

    fn sample_email() -> Vec<u8> {
        r#"To: test@sauleau.com
Subject: subject
From: Sven Sauleau <sven@cloudflare.com>

Hello Alice
        "#
        .replace('\n', "\r\n")
        .into_bytes()
    }

    #[test]
    fn test_compute_body_hash_simple() {
        let email = sample_email();
        let message = Message::parse(&email).unwrap();

        assert_eq!(
            compute_body_hash(
                canonicalization::Type::Simple,
                None,
                HashAlgo::RsaSha1,
                message.body()
            ),
            base64::engine::general_purpose::STANDARD
                .decode("ya82MJvChLGBNSxeRvrSat5LliQ=")
                .unwrap()
        );
        assert_eq!(
            compute_body_hash(
                canonicalization::Type::Simple,
                None,
                HashAlgo::RsaSha256,
                message.body()
            ),
            base64::engine::general_purpose::STANDARD
                .decode("KXQwQpX2zFwgixPbV6Dd18ZMJU04lLeRnwqzUp8uGwI=")
                .unwrap()
        );
    }

    #[test]
    fn test_compute_body_hash_relaxed() {
        let email = sample_email();
        let message = Message::parse(&email).unwrap();

        assert_eq!(
            compute_body_hash(
                canonicalization::Type::Relaxed,
                None,
                HashAlgo::RsaSha1,
                message.body()
            ),
            base64::engine::general_purpose::STANDARD
                .decode("wpj48VhihzV7I31ZZZUp1UpTyyM=")
                .unwrap()
        );
    }

    #[test]
    fn test_compute_body_hash_length_cap() {
        let email = sample_email();
        let message = Message::parse(&email).unwrap();

        assert_eq!(
            compute_body_hash(
                canonicalization::Type::Relaxed,
                Some(3),
                HashAlgo::RsaSha1,
                message.body()
            ),
            base64::engine::general_purpose::STANDARD
                .decode("28LR/tDcN6cK6g83aVjIAu3cBVk=")
                .unwrap()
        );
    }

    #[test]
    fn test_compute_body_hash_empty_body_hashes_as_crlf() {
        let email = b"Subject: nothing\r\n\r\n".to_vec();
        let message = Message::parse(&email).unwrap();

        assert_eq!(
            compute_body_hash(
                canonicalization::Type::Simple,
                None,
                HashAlgo::RsaSha1,
                message.body()
            ),
            base64::engine::general_purpose::STANDARD
                .decode("uoq1oCgLlTqpdDX/iUbLy7J1Wic=")
                .unwrap()
        );
        assert_eq!(
            compute_body_hash(
                canonicalization::Type::Relaxed,
                None,
                HashAlgo::RsaSha1,
                message.body()
            ),
            base64::engine::general_purpose::STANDARD
                .decode("2jmj7l5rSw0yVb/vlWAYkK/YBwk=")
                .unwrap()
        );
    }

    #[test]
    fn test_select_headers_bottom_up() {
        let raw = b"from: biz\r\nfoo: bar\r\nfrom: baz\r\nsubject: boring\r\n\r\ntest".to_vec();
        let message = Message::parse(&raw).unwrap();

        let result = select_headers("from:subject:from", &message).unwrap();
        assert_eq!(
            result,
            vec![
                ("from".to_owned(), &b"baz"[..]),
                ("subject".to_owned(), &b"boring"[..]),
                ("from".to_owned(), &b"biz"[..]),
            ]
        );
    }

    #[test]
    fn test_select_headers_missing_is_error() {
        let raw = b"subject: boring\r\n\r\ntest".to_vec();
        let message = Message::parse(&raw).unwrap();

        let err = select_headers("from", &message).unwrap_err();
        assert_eq!(err, "from");
    }

    #[test]
    fn test_elide_signature_value() {
        let header = dkim_header();
        let elided = elide_signature_value(&header);
        assert!(!elided.contains("PIO0A014nyntOGKdTdtvCJor9ZxvP1M3hoLeEh8HqZ"));
        assert!(elided.contains("b="));
    }
}
