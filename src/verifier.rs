use crate::context::Context;
use crate::errors::{RejectReason, Verdict};
use crate::hash::{self, HashAlgo};
use crate::message::Message;
use crate::public_key::PublicKey;
use rsa::Pkcs1v15Sign;
use sha1::Sha1;
use sha2::Sha256;

/// Runs the six-step check of RFC 6376 section 6.1.3: canonicalize the
/// body and compare it to `bh`, then canonicalize the signed headers
/// (including the signature header itself, `b=` elided) and verify the
/// signature against the published key.
///
/// Body canonicalization always runs before header canonicalization, and
/// the DKIM-Signature header is always the last header fed into the
/// headers hash.
pub(crate) fn check(ctx: &Context, key: &PublicKey, message: &Message) -> Verdict {
    let computed_body_hash = hash::compute_body_hash(
        ctx.body_canon,
        ctx.length_limit,
        ctx.hash_algo,
        message.body(),
    );
    tracing::debug!("computed body hash: {} bytes", computed_body_hash.len());
    if computed_body_hash != ctx.body_hash {
        return Verdict::Reject(RejectReason::BodyHashMismatch);
    }

    let headers_hash = match hash::compute_headers_hash(
        ctx.header_canon,
        &ctx.h_list,
        ctx.hash_algo,
        &ctx.header,
        message,
    ) {
        Ok(digest) => digest,
        Err(missing_header) => return Verdict::RecordError { missing_header },
    };

    let scheme = match ctx.hash_algo {
        HashAlgo::RsaSha1 => Pkcs1v15Sign::new::<Sha1>(),
        HashAlgo::RsaSha256 => Pkcs1v15Sign::new::<Sha256>(),
    };

    match key.rsa.verify(scheme, &headers_hash, &ctx.signature) {
        Ok(()) => Verdict::Continue,
        Err(err) => {
            tracing::warn!("RSA signature verification failed: {err}");
            Verdict::Reject(RejectReason::RsaVerifyFailed)
        }
    }
}
