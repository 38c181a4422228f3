use crate::parser::parse_tag_list;
use crate::DKIMError;
use base64::engine::general_purpose;
use base64::Engine;
use rsa::{pkcs1, pkcs8, RsaPublicKey};

/// A parsed RSA public key together with the raw DER it was decoded from.
/// Owned by the result of a key fetch and passed to the verifier; dropped
/// once the verdict has been produced.
pub struct PublicKey {
    pub(crate) rsa: RsaPublicKey,
    der: Vec<u8>,
}

impl PublicKey {
    /// The raw DER bytes this key was decoded from (the base64-decoded
    /// `p=` tag value).
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

/// Parses one TXT record body, RFC 6376 section 3.6.1: scans for a `p=`
/// tag (first occurrence; other tags in the record are ignored by this
/// verifier). A present but empty `p=` means the key has been revoked.
pub(crate) fn parse_record(txt: &str) -> Result<PublicKey, DKIMError> {
    let tags = parse_tag_list(txt)
        .map_err(|err| DKIMError::KeyFail(format!("malformed key record: {err}")))?;

    let p_tag = tags.iter().find(|t| t.name.eq_ignore_ascii_case("p"));

    let value = match p_tag {
        None => {
            return Err(DKIMError::KeyFail(
                "no \"p=\" tag in key record".to_owned(),
            ))
        }
        Some(t) if t.value.is_empty() => return Err(DKIMError::KeyRevoked),
        Some(t) => t.value.as_str(),
    };

    let der = general_purpose::STANDARD
        .decode(value)
        .map_err(|err| DKIMError::KeyFail(format!("invalid base64 in \"p=\": {err}")))?;

    let rsa = pkcs8::DecodePublicKey::from_public_key_der(&der)
        .or_else(|_| pkcs1::DecodeRsaPublicKey::from_pkcs1_der(&der))
        .map_err(|err| DKIMError::KeyFail(format!("failed to parse RSA public key: {err}")))?;

    Ok(PublicKey { rsa, der })
}

/// Tries each returned TXT record in order and uses the first one that
/// yields a valid key; if none do, surfaces the last error seen (RFC 6376
/// section 3.6.2.2 allows multiple TXT records at a key's selector, e.g.
/// during key rotation).
pub(crate) fn parse_any_record(records: &[String]) -> Result<PublicKey, DKIMError> {
    let mut last_err = DKIMError::KeyFail("no usable TXT record".to_owned());
    for txt in records {
        match parse_record(txt) {
            Ok(key) => return Ok(key),
            Err(err) => last_err = err,
        }
    }
    Err(last_err)
}
