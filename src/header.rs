use crate::parser::{self, Tag};
use crate::DKIMError;
use indexmap::IndexMap;

pub const HEADER_NAME: &str = "DKIM-Signature";

/// Syntactic container for a raw `DKIM-Signature` header value: the
/// tag=value pairs in the order seen, with no semantic validation. Required
/// tags, clock bounds, algorithm and canonicalization validity are
/// [`crate::Context::create`]'s job.
#[derive(Clone, Debug)]
pub(crate) struct SignatureHeader {
    tags: IndexMap<String, Tag>,
    raw_value: String,
}

impl SignatureHeader {
    /// <https://datatracker.ietf.org/doc/html/rfc6376#section-3.5>
    pub fn parse(value: &str) -> Result<Self, DKIMError> {
        let tags = parser::parse_tag_list(value)?;
        parser::validate_signature_tag_names(&tags)?;

        let mut tags_map = IndexMap::new();
        for tag in tags {
            tags_map.insert(tag.name.to_ascii_lowercase(), tag);
        }

        Ok(Self {
            tags: tags_map,
            raw_value: value.to_owned(),
        })
    }

    pub fn get_tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(|t| t.value.as_str())
    }

    pub fn get_raw_tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(|t| t.raw_value.as_str())
    }

    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }
}
