use crate::DKIMError;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::alpha1;
use nom::combinator::opt;
use nom::multi::fold_many0;
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::IResult;

#[derive(Clone, Debug, PartialEq)]
/// A single `tag=value` pair out of a tag-value list, RFC 6376 section 3.2.
pub(crate) struct Tag {
    /// Name of the tag (v, i, a, h, ...), case as seen in the input.
    pub name: String,
    /// Value of the tag with folding whitespace removed.
    pub value: String,
    /// Value of the tag as seen in the text, whitespace preserved.
    pub raw_value: String,
}

/// Tag names a DKIM-Signature header may use, RFC 6376 section 3.5. The
/// key-record grammar (section 3.6.1) shares the tag-value syntax but has
/// its own tag set (`k`, `p`, `n`, ...) and is not restricted here.
const SIGNATURE_TAGS_ONE_LETTER: &str = "vabcdhilqstxz";
const SIGNATURE_TAGS_TWO_LETTER: &[&str] = &["bh"];

/// Parses a tag-value list as specified in
/// <https://datatracker.ietf.org/doc/html/rfc6376#section-3.6.1>.
/// tag-list  =  tag-spec *( ";" tag-spec ) [ ";" ]
pub(crate) fn parse_tag_list(input: &str) -> Result<Vec<Tag>, DKIMError> {
    let (_, tags) =
        tag_list(input).map_err(|err| DKIMError::Unknown(format!("malformed tag list: {err}")))?;
    Ok(tags)
}

/// Restricts a parsed tag list to the DKIM-Signature tag set. Unknown
/// one-letter or two-letter tag names fail rather than being silently
/// ignored, per RFC 6376's source behavior.
pub(crate) fn validate_signature_tag_names(tags: &[Tag]) -> Result<(), DKIMError> {
    for t in tags {
        let lower = t.name.to_ascii_lowercase();
        let known = match lower.len() {
            1 => SIGNATURE_TAGS_ONE_LETTER.contains(lower.as_str()),
            2 => SIGNATURE_TAGS_TWO_LETTER.contains(&lower.as_str()),
            _ => false,
        };
        if !known {
            return Err(DKIMError::Unknown(format!(
                "unrecognized signature tag \"{}\"",
                t.name
            )));
        }
    }
    Ok(())
}

fn tag_list(input: &str) -> IResult<&str, Vec<Tag>> {
    let (input, start) = tag_spec(input)?;

    terminated(
        fold_many0(
            preceded(tag(";"), tag_spec),
            move || vec![start.clone()],
            |mut acc: Vec<Tag>, item| {
                acc.push(item);
                acc
            },
        ),
        opt(tag(";")),
    )(input)
}

/// tag-spec  =  [FWS] tag-name [FWS] "=" [FWS] tag-value [FWS]
fn tag_spec(input: &str) -> IResult<&str, Tag> {
    let (input, name) = delimited(opt(fws), tag_name, opt(fws))(input)?;
    let (input, _) = tag("=")(input)?;

    // Parse twice to keep the original text alongside the folded value.
    let value_input = input;
    let (_, raw_value) = delimited(opt(fws), raw_tag_value, opt(fws))(value_input)?;
    let (input, value) = delimited(opt(fws), tag_value, opt(fws))(value_input)?;

    Ok((
        input,
        Tag {
            name: name.to_owned(),
            value,
            raw_value,
        },
    ))
}

/// tag-name  =  ALPHA *ALNUMPUNC
fn tag_name(input: &str) -> IResult<&str, &str> {
    alpha1(input)
}

/// tag-value =  [ tval *( 1*(WSP / FWS) tval ) ]
/// tval      =  1*VALCHAR
/// VALCHAR   =  %x21-3A / %x3C-7E
fn tag_value(input: &str) -> IResult<&str, String> {
    let is_valchar = |c| ('!'..=':').contains(&c) || ('<'..='~').contains(&c);
    match opt(take_while1(is_valchar))(input)? {
        (input, Some(start)) => fold_many0(
            preceded(fws, take_while1(is_valchar)),
            || start.to_owned(),
            |mut acc: String, item| {
                acc += item;
                acc
            },
        )(input),
        (input, None) => Ok((input, "".to_string())),
    }
}

fn raw_tag_value(input: &str) -> IResult<&str, String> {
    let is_valchar = |c| ('!'..=':').contains(&c) || ('<'..='~').contains(&c);
    match opt(take_while1(is_valchar))(input)? {
        (input, Some(start)) => fold_many0(
            pair(fws, take_while1(is_valchar)),
            || start.to_owned(),
            |mut acc: String, item| {
                acc += &(item.0.to_owned() + item.1);
                acc
            },
        )(input),
        (input, None) => Ok((input, "".to_string())),
    }
}

/// FWS is folding whitespace: it allows multiple lines separated by CRLF
/// followed by at least one whitespace, to be joined.
fn fws(input: &str) -> IResult<&str, &str> {
    take_while1(|c| c == ' ' || c == '\t' || c == '\r' || c == '\n')(input)
}

pub(crate) fn parse_hash_algo(value: &str) -> Result<crate::hash::HashAlgo, DKIMError> {
    use crate::hash::HashAlgo;
    match value {
        "rsa-sha1" => Ok(HashAlgo::RsaSha1),
        "rsa-sha256" => Ok(HashAlgo::RsaSha256),
        other => Err(DKIMError::InvalidA(format!(
            "unsupported signing algorithm: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_list() {
        assert_eq!(
            tag_list("a = a/1@.-:= ").unwrap(),
            (
                "",
                vec![Tag {
                    name: "a".to_string(),
                    value: "a/1@.-:=".to_string(),
                    raw_value: "a/1@.-:=".to_string()
                }]
            )
        );
        assert_eq!(
            tag_list("a= a ; b = a\n    bc").unwrap(),
            (
                "",
                vec![
                    Tag {
                        name: "a".to_string(),
                        value: "a".to_string(),
                        raw_value: "a".to_string()
                    },
                    Tag {
                        name: "b".to_string(),
                        value: "abc".to_string(),
                        raw_value: "a\n    bc".to_string()
                    }
                ]
            )
        );
    }

    #[test]
    fn test_tag_spec() {
        assert_eq!(
            tag_spec("a=b").unwrap(),
            (
                "",
                Tag {
                    name: "a".to_string(),
                    value: "b".to_string(),
                    raw_value: "b".to_string()
                }
            )
        );
        assert_eq!(
            tag_spec("a=b c d e f").unwrap(),
            (
                "",
                Tag {
                    name: "a".to_string(),
                    value: "bcdef".to_string(),
                    raw_value: "b c d e f".to_string()
                }
            )
        );
    }

    #[test]
    fn test_tag_list_dns() {
        assert_eq!(
            tag_list("k=rsa; p=kEy+/").unwrap(),
            (
                "",
                vec![
                    Tag {
                        name: "k".to_string(),
                        value: "rsa".to_string(),
                        raw_value: "rsa".to_string()
                    },
                    Tag {
                        name: "p".to_string(),
                        value: "kEy+/".to_string(),
                        raw_value: "kEy+/".to_string()
                    }
                ]
            )
        );
    }

    #[test]
    fn test_validate_signature_tag_names_rejects_unknown() {
        let tags = parse_tag_list("v=1; k=rsa").unwrap();
        assert!(validate_signature_tag_names(&tags).is_err());
    }

    #[test]
    fn test_validate_signature_tag_names_accepts_bh() {
        let tags = parse_tag_list("v=1; bh=abc").unwrap();
        assert!(validate_signature_tag_names(&tags).is_ok());
    }

    #[test]
    fn test_parse_hash_algo() {
        assert!(matches!(
            parse_hash_algo("rsa-sha1").unwrap(),
            crate::hash::HashAlgo::RsaSha1
        ));
        assert!(matches!(
            parse_hash_algo("rsa-sha256").unwrap(),
            crate::hash::HashAlgo::RsaSha256
        ));
        assert!(parse_hash_algo("ed25519-sha256").is_err());
    }
}
