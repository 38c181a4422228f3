/// Coarse severity a caller can use to decide `permerror` vs `temperror`
/// when folding a [`DKIMError`] into an `Authentication-Results` header.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Severity {
    Permfail,
    Tempfail,
}

quick_error! {
    /// Error taxonomy surfaced by context creation, key retrieval and
    /// verification. Each variant corresponds to one of the DKIM verifier
    /// error kinds.
    #[derive(Debug, PartialEq, Clone)]
    pub enum DKIMError {
        InvalidA(detail: String) {
            display("invalid signing or canonicalization algorithm: {}", detail)
        }
        InvalidH(detail: String) {
            display("invalid header list: {}", detail)
        }
        InvalidL(detail: String) {
            display("invalid body length: {}", detail)
        }
        Version {
            display("\"v\" tag is missing or not \"1\"")
        }
        EmptyB {
            display("\"b\" tag is missing")
        }
        EmptyBh {
            display("\"bh\" tag is missing")
        }
        EmptyD {
            display("\"d\" tag is missing")
        }
        EmptyS {
            display("\"s\" tag is missing")
        }
        EmptyV {
            display("\"v\" tag is missing")
        }
        EmptyH {
            display("\"h\" tag is missing")
        }
        BadSig(detail: String) {
            display("signature is inconsistent with its declared algorithm: {}", detail)
        }
        Future {
            display("signature timestamp (t=) is in the future")
        }
        Expired {
            display("signature has expired (x=)")
        }
        NoKey {
            display("no DNS key record for selector")
        }
        KeyFail(detail: String) {
            display("key record unusable: {}", detail)
        }
        KeyRevoked {
            display("key has been revoked (empty p=)")
        }
        Unknown(detail: String) {
            display("malformed signature tag stream: {}", detail)
        }
    }
}

impl DKIMError {
    /// Classifies this error for the purposes of retry policy: a
    /// `Tempfail` may succeed if retried later (a transient DNS failure or
    /// an unparseable-but-possibly-fixed key record); a `Permfail` will not.
    pub fn severity(&self) -> Severity {
        match self {
            DKIMError::NoKey | DKIMError::KeyFail(_) => Severity::Tempfail,
            _ => Severity::Permfail,
        }
    }
}

/// Why a signature failed cryptographic verification.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RejectReason {
    BodyHashMismatch,
    RsaVerifyFailed,
}

/// The three outcomes of [`crate::check`].
///
/// Cryptographic mismatch is deliberately not a `Result::Err`: it is a
/// verdict like any other, distinct from the tag-parser and DNS errors that
/// prevent verification from running at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Continue,
    Reject(RejectReason),
    RecordError { missing_header: String },
}

impl Verdict {
    pub fn is_continue(&self) -> bool {
        matches!(self, Verdict::Continue)
    }
}
