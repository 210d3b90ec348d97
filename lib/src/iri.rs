//! Minting of IRIs from a namespace and a free-text local name.
//!
//! Labels taken from spreadsheets contain spaces, quotes, stray `%` signs and other
//! characters that are not allowed in an IRI. [`mint`] replaces those with `_` (or
//! percent-encodes a bare `%`) so that the result always parses as an absolute IRI.
//! The mapping is not injective: `"a b"` and `"a_b"` end up as the same IRI.

use crate::errors::InputError;
use lazy_static::lazy_static;
use oxigraph::model::NamedNode;
use regex::Regex;

lazy_static! {
    static ref SCHEME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap();
}

fn is_hex(b: Option<&u8>) -> bool {
    b.map(|b| b.is_ascii_hexdigit()).unwrap_or(false)
}

fn is_forbidden(c: char) -> bool {
    if c.is_whitespace() || c.is_control() {
        return true;
    }
    if matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`' | '[' | ']') {
        return true;
    }
    // private use area and noncharacters are not ucschar
    matches!(c as u32, 0xE000..=0xF8FF | 0xFFF0..=0xFFFF | 0xF0000..=0x10FFFF)
}

/// Rewrites `candidate` so that it only contains characters allowed in an IRI.
/// The scheme is left untouched; the rest is normalized character by character.
pub fn bake(candidate: &str) -> String {
    let candidate = candidate.trim();
    let scheme_len = SCHEME.find(candidate).map(|m| m.end()).unwrap_or(0);
    let (scheme, rest) = candidate.split_at(scheme_len);

    let bytes = rest.as_bytes();
    let mut out = String::with_capacity(candidate.len() + 8);
    out.push_str(scheme);
    let mut seen_fragment = false;
    for (i, c) in rest.char_indices() {
        match c {
            '%' if is_hex(bytes.get(i + 1)) && is_hex(bytes.get(i + 2)) => out.push('%'),
            '%' => out.push_str("%25"),
            '#' if seen_fragment => out.push('_'),
            '#' => {
                seen_fragment = true;
                out.push('#');
            }
            c if is_forbidden(c) => out.push('_'),
            c => out.push(c),
        }
    }
    out
}

/// Normalizes `candidate` and parses it as an absolute IRI.
pub fn to_iri(candidate: &str) -> Result<NamedNode, InputError> {
    let baked = bake(candidate);
    if !SCHEME.is_match(&baked) {
        return Err(InputError::InvalidIri {
            field: "iri".to_string(),
            value: candidate.to_string(),
        });
    }
    NamedNode::new(baked).map_err(|_| InputError::InvalidIri {
        field: "iri".to_string(),
        value: candidate.to_string(),
    })
}

/// Concatenates `namespace` and `local` into a safe absolute IRI.
///
/// Fails only when the namespace itself is not an absolute IRI.
pub fn mint(namespace: &str, local: &str) -> Result<NamedNode, InputError> {
    to_iri(&format!("{namespace}{local}"))
}

/// Parses an IRI that was supplied by the caller, without rewriting it.
/// `field` names the offending input in the error.
pub fn parse_iri(field: &str, value: &str) -> Result<NamedNode, InputError> {
    if value.trim().is_empty() {
        return Err(InputError::InvalidIri {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    NamedNode::new(value).map_err(|_| InputError::InvalidIri {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Joins a base IRI and a path segment with exactly one `/` between them.
pub fn namespace_of(base: &str) -> String {
    format!("{}/", base.trim_end_matches('/'))
}
