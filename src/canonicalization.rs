use crate::hash::LimitHasher;
use memchr::memmem::Finder;
use once_cell::sync::Lazy;

#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub enum Type {
    Simple,
    Relaxed,
}

impl Type {
    pub fn canon_name(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Relaxed => "relaxed",
        }
    }
}

/// Parses the `c=` tag value into (header canon, body canon).
/// A bare `X` sets the header canonicalization and defaults the body to
/// `simple`, per RFC 6376 section 3.5.
pub(crate) fn parse(value: Option<&str>) -> Result<(Type, Type), crate::DKIMError> {
    use Type::{Relaxed, Simple};
    match value {
        None => Ok((Simple, Simple)),
        Some(s) => match s {
            "simple/simple" | "simple" => Ok((Simple, Simple)),
            "relaxed/simple" | "relaxed" => Ok((Relaxed, Simple)),
            "simple/relaxed" => Ok((Simple, Relaxed)),
            "relaxed/relaxed" => Ok((Relaxed, Relaxed)),
            v => Err(crate::DKIMError::InvalidA(format!(
                "unsupported canonicalization: {v}"
            ))),
        },
    }
}

/// Strips trailing empty lines, per
/// <https://datatracker.ietf.org/doc/html/rfc6376#section-3.4.3>.
fn strip_trailing_empty_lines(mut body: &[u8]) -> &[u8] {
    while body.ends_with(b"\r\n\r\n") {
        body = &body[..body.len() - 2];
    }
    body
}

/// Canonicalize body using the simple canonicalization algorithm.
/// <https://datatracker.ietf.org/doc/html/rfc6376#section-3.4.1>
pub(crate) fn body_simple(body: &[u8], hasher: &mut LimitHasher) {
    if body.is_empty() {
        hasher.hash(b"\r\n");
        return;
    }
    let body = strip_trailing_empty_lines(body);
    if body.is_empty() {
        hasher.hash(b"\r\n");
        return;
    }
    hasher.hash(body);
    if !body.ends_with(b"\r\n") {
        hasher.hash(b"\r\n");
    }
}

/// Iterates over `\r\n`-terminated lines of a byte slice, including a
/// trailing partial line with no terminator if present.
struct IterLines<'haystack> {
    haystack: &'haystack [u8],
    inner: memchr::memmem::FindIter<'haystack, 'static>,
    start: usize,
    done: bool,
}

impl<'haystack> Iterator for IterLines<'haystack> {
    type Item = &'haystack [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.inner.next() {
            Some(idx) => {
                let line = &self.haystack[self.start..idx + 2];
                self.start = idx + 2;
                Some(line)
            }
            None => {
                self.done = true;
                let line = &self.haystack[self.start..];
                if line.is_empty() {
                    None
                } else {
                    Some(line)
                }
            }
        }
    }
}

fn iter_lines(haystack: &[u8]) -> IterLines {
    static CRLF: Lazy<Finder> = Lazy::new(|| memchr::memmem::Finder::new("\r\n"));
    IterLines {
        haystack,
        inner: CRLF.find_iter(haystack),
        start: 0,
        done: false,
    }
}

/// Canonicalize body using the relaxed canonicalization algorithm.
/// <https://datatracker.ietf.org/doc/html/rfc6376#section-3.4.4>
///
/// Runs over the whole in-memory body in one pass, so the "previous byte was
/// WSP" state naturally carries across the entire body rather than resetting
/// at an arbitrary chunk boundary.
pub(crate) fn body_relaxed(body: &[u8], hasher: &mut LimitHasher) {
    let body = strip_trailing_empty_lines(body);
    if body.is_empty() {
        hasher.hash(b"\r\n");
        return;
    }

    for mut line in iter_lines(body) {
        line = trim_ws_end(line);

        let mut prior = 0;
        for idx in memchr::memchr2_iter(b' ', b'\t', line) {
            if prior > 0 && idx == prior {
                // Part of a run already collapsed; skip.
                prior = idx + 1;
                continue;
            }
            hasher.hash(&line[prior..idx]);
            hasher.hash(b" ");
            prior = idx + 1;
        }
        hasher.hash(&line[prior..]);
        hasher.hash(b"\r\n");
    }
}

impl Type {
    pub(crate) fn canon_body(&self, body: &[u8], hasher: &mut LimitHasher) {
        match self {
            Self::Simple => body_simple(body, hasher),
            Self::Relaxed => body_relaxed(body, hasher),
        }
    }

    pub(crate) fn canon_header_into(&self, key: &str, value: &[u8], out: &mut Vec<u8>) {
        match self {
            Self::Simple => canonicalize_header_simple(key, value, out),
            Self::Relaxed => canonicalize_header_relaxed(key, value, out),
        }
    }
}

/// <https://datatracker.ietf.org/doc/html/rfc6376#section-3.4.1>
pub(crate) fn canonicalize_header_simple(key: &str, value: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(key.as_bytes());
    out.extend_from_slice(b":");
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
}

/// <https://datatracker.ietf.org/doc/html/rfc6376#section-3.4.2>
pub(crate) fn canonicalize_header_relaxed(key: &str, value: &[u8], out: &mut Vec<u8>) {
    let key = key.to_lowercase();
    let key = key.trim_end();

    out.extend_from_slice(key.as_bytes());
    out.extend_from_slice(b":");

    let value = trim_ws_start(trim_ws_end(value));
    let mut space_run = false;
    for &c in value {
        match c {
            b'\r' | b'\n' => {}
            b' ' | b'\t' => {
                if space_run {
                    continue;
                }
                space_run = true;
                out.push(b' ');
            }
            _ => {
                space_run = false;
                out.push(c);
            }
        }
    }

    out.extend_from_slice(b"\r\n");
}

fn trim_ws_start(mut line: &[u8]) -> &[u8] {
    while let Some(c) = line.first() {
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => line = &line[1..],
            _ => break,
        }
    }
    line
}

fn trim_ws_end(mut line: &[u8]) -> &[u8] {
    while let Some(c) = line.last() {
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                line = &line[0..line.len() - 1];
            }
            _ => break,
        }
    }
    line
}
