//! Verifier for DKIM (DomainKeys Identified Mail) signatures attached to
//! RFC 5322 email messages, RFC 6376.
//!
//! The public surface is the three operations RFC 6376 section 6.1
//! describes: [`create_context`] parses a `DKIM-Signature` header value,
//! [`fetch_key`] resolves the signer's published key over DNS, and
//! [`check`] runs the byte-exact canonicalization and RSA verification
//! that decides the [`Verdict`]. Each signature on a message is verified
//! independently with a fresh [`Context`]; this crate does not compose
//! multiple signatures into one policy decision, and it does not sign
//! (create) signatures.

#[macro_use]
extern crate quick_error;

mod canonicalization;
mod context;
pub mod dns;
mod errors;
mod hash;
mod header;
mod message;
mod parser;
mod public_key;
mod verifier;

pub use canonicalization::Type as Canonicalization;
pub use context::Context;
pub use errors::{DKIMError, RejectReason, Severity, Verdict};
pub use hash::HashAlgo;
pub use message::Message;
pub use public_key::PublicKey;

/// Parses a raw `DKIM-Signature` header value (the bytes after
/// `DKIM-Signature:`) into a verifier context, RFC 6376 section 3.5.
pub fn create_context(signature_header_value: &str) -> Result<Context, DKIMError> {
    Context::create(signature_header_value)
}

/// Issues a DNS TXT query for the context's `<selector>._domainkey.<domain>`
/// name and parses the resulting key record, RFC 6376 section 6.1.2.
pub async fn fetch_key(ctx: &Context, resolver: &dyn dns::Lookup) -> Result<PublicKey, DKIMError> {
    dns::fetch_key(ctx, resolver).await
}

/// Runs the verifier's six-step check against a raw message: compares the
/// body digest to `bh`, then verifies the headers digest against `b` under
/// `key`, RFC 6376 section 6.1.3.
pub fn check(ctx: &Context, key: &PublicKey, message: &Message) -> Verdict {
    verifier::check(ctx, key, message)
}
