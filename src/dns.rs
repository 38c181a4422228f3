use crate::public_key::{parse_any_record, PublicKey};
use crate::{Context, DKIMError};
use futures::future::BoxFuture;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::TokioAsyncResolver;

/// Performs the single DNS TXT query a key fetch needs, RFC 6376 section
/// 3.6.2.2. A natural async reshape of the source's single-shot completion
/// callback: one future, one result, no re-entry.
pub trait Lookup: Sync + Send {
    fn lookup_txt<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<String>, DKIMError>>;
}

fn to_lookup_error(err: ResolveError) -> DKIMError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => DKIMError::NoKey,
        _ => DKIMError::KeyFail(format!("DNS query failed: {err}")),
    }
}

impl Lookup for TokioAsyncResolver {
    fn lookup_txt<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<String>, DKIMError>> {
        Box::pin(async move {
            self.txt_lookup(name)
                .await
                .map_err(to_lookup_error)?
                .into_iter()
                .map(|txt| {
                    Ok(txt
                        .iter()
                        .map(|data| String::from_utf8_lossy(data))
                        .collect())
                })
                .collect()
        })
    }
}

/// Issues a TXT query for `<selector>._domainkey.<domain>` and parses the
/// first returned record that yields a usable key.
/// <https://datatracker.ietf.org/doc/html/rfc6376#section-6.1.2>
pub async fn fetch_key(ctx: &Context, resolver: &dyn Lookup) -> Result<PublicKey, DKIMError> {
    let records = resolver.lookup_txt(ctx.dns_key_name()).await?;
    if records.is_empty() {
        return Err(DKIMError::NoKey);
    }
    parse_any_record(&records)
}
