use crate::canonicalization::{self, Type};
use crate::hash::HashAlgo;
use crate::header::SignatureHeader;
use crate::DKIMError;
use base64::engine::general_purpose;
use base64::Engine;

pub(crate) const DNS_NAMESPACE: &str = "_domainkey";

/// State accumulated from one `DKIM-Signature` header: the verifier context
/// described in RFC 6376 section 3.5, ready to be checked once its public
/// key has been fetched.
pub struct Context {
    pub(crate) domain: String,
    pub(crate) selector: String,
    pub(crate) hash_algo: HashAlgo,
    pub(crate) header_canon: Type,
    pub(crate) body_canon: Type,
    pub(crate) h_list: String,
    pub(crate) signature: Vec<u8>,
    pub(crate) body_hash: Vec<u8>,
    pub(crate) length_limit: Option<usize>,
    pub(crate) dns_key_name: String,
    pub(crate) header: SignatureHeader,
}

impl Context {
    /// Parses a raw `DKIM-Signature` header value (the bytes after
    /// `DKIM-Signature:`) into a context, or fails with a specific error.
    /// <https://datatracker.ietf.org/doc/html/rfc6376#section-3.5>
    pub fn create(signature_header_value: &str) -> Result<Self, DKIMError> {
        let header = SignatureHeader::parse(signature_header_value)?;

        match header.get_tag("v") {
            None => return Err(DKIMError::EmptyV),
            Some("1") => {}
            Some(_) => return Err(DKIMError::Version),
        }

        let domain = header.get_tag("d").ok_or(DKIMError::EmptyD)?.to_owned();
        let selector = header.get_tag("s").ok_or(DKIMError::EmptyS)?.to_owned();

        let h_list = header.get_tag("h").ok_or(DKIMError::EmptyH)?.to_owned();
        if !h_list
            .split(':')
            .any(|h| h.trim().eq_ignore_ascii_case("from"))
        {
            return Err(DKIMError::InvalidH(
                "\"h\" tag must include \"from\"".to_owned(),
            ));
        }

        let a_tag = header
            .get_tag("a")
            .ok_or_else(|| DKIMError::InvalidA("\"a\" tag is missing".to_owned()))?;
        let hash_algo = crate::parser::parse_hash_algo(a_tag)?;

        let (header_canon, body_canon) = canonicalization::parse(header.get_tag("c"))?;

        let signature = decode_tag_b64(header.get_tag("b").ok_or(DKIMError::EmptyB)?, "b")?;

        let body_hash = decode_tag_b64(header.get_tag("bh").ok_or(DKIMError::EmptyBh)?, "bh")?;
        if body_hash.len() != hash_algo.digest_len() {
            return Err(DKIMError::BadSig(format!(
                "\"bh\" is {} bytes, {} needs {}",
                body_hash.len(),
                hash_algo.algo_name(),
                hash_algo.digest_len()
            )));
        }

        let length_limit = match header.get_tag("l") {
            None => None,
            Some(v) => Some(v.parse::<usize>().map_err(|err| {
                DKIMError::InvalidL(format!("invalid \"l\" tag \"{v}\": {err}"))
            })?),
        };

        let now = chrono::Utc::now().timestamp();
        if let Some(t) = header.get_tag("t") {
            let t: i64 = t
                .parse()
                .map_err(|err| DKIMError::Unknown(format!("invalid \"t\" tag \"{t}\": {err}")))?;
            if t > now {
                return Err(DKIMError::Future);
            }
        }
        if let Some(x) = header.get_tag("x") {
            let x: i64 = x
                .parse()
                .map_err(|err| DKIMError::Unknown(format!("invalid \"x\" tag \"{x}\": {err}")))?;
            if x < now {
                return Err(DKIMError::Expired);
            }
        }

        let dns_key_name = format!("{selector}.{DNS_NAMESPACE}.{domain}");

        Ok(Context {
            domain,
            selector,
            hash_algo,
            header_canon,
            body_canon,
            h_list,
            signature,
            body_hash,
            length_limit,
            dns_key_name,
            header,
        })
    }

    /// The name to issue a DNS TXT query for:
    /// `<selector>._domainkey.<domain>`.
    pub fn dns_key_name(&self) -> &str {
        &self.dns_key_name
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }
}

fn decode_tag_b64(value: &str, tag_name: &str) -> Result<Vec<u8>, DKIMError> {
    general_purpose::STANDARD
        .decode(value)
        .map_err(|err| DKIMError::BadSig(format!("failed to decode \"{tag_name}\": {err}")))
}
