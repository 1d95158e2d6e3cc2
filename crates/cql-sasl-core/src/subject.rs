//! Certificate subject distinguished names.
//!
//! Parses the string form of an X.509 subject DN (`CN=alice, OU=Eng,
//! O=Example`) into its typed attributes, preserving the order in which the
//! certificate presents them.
//!
//! # Grammar
//!
//! The accepted grammar is the RFC 2253 string representation: attributes
//! are `type=value` pairs separated by `,` (or `+` within a multi-valued
//! RDN), and a backslash escapes the following character or introduces a
//! two-digit hex escape for a single byte of the UTF-8 value. Whitespace
//! around separators is tolerated because DN renderers disagree about it.

use thiserror::Error;

/// A single typed attribute of a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectAttribute {
    /// Attribute type tag as written, e.g. `CN` or `2.5.4.3`.
    pub attr_type: String,
    /// Attribute value with escape sequences resolved.
    pub value: String,
}

/// Ordered attributes of a certificate subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectName {
    attributes: Vec<SubjectAttribute>,
}

impl SubjectName {
    /// Parse the string form of a distinguished name.
    ///
    /// # Errors
    ///
    /// Returns an error if any attribute lacks an `=` separator or a type
    /// tag, or if an escape sequence is truncated or decodes to invalid
    /// UTF-8.
    pub fn parse(dn: &str) -> Result<Self, SubjectParseError> {
        // An empty subject is legal for a certificate; it simply has no
        // attributes to offer.
        if dn.trim().is_empty() {
            return Ok(Self {
                attributes: Vec::new(),
            });
        }

        let mut attributes = Vec::new();
        for component in split_components(dn) {
            let component = component.trim();
            if component.is_empty() {
                return Err(SubjectParseError::EmptyAttribute);
            }
            attributes.push(parse_attribute(component)?);
        }
        Ok(Self { attributes })
    }

    /// The attributes in the order the certificate presents them.
    #[must_use]
    pub fn attributes(&self) -> &[SubjectAttribute] {
        &self.attributes
    }

    /// Value of the first attribute carrying exactly this type tag.
    ///
    /// The match is case-sensitive: `CN` finds `CN=..`, not `cn=..`.
    #[must_use]
    pub fn first_value(&self, attr_type: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.attr_type == attr_type)
            .map(|attribute| attribute.value.as_str())
    }
}

/// Split a DN into raw attribute components at unescaped `,` and `+`.
fn split_components(dn: &str) -> Vec<&str> {
    let mut components = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ',' | '+' => {
                components.push(&dn[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    components.push(&dn[start..]);
    components
}

fn parse_attribute(component: &str) -> Result<SubjectAttribute, SubjectParseError> {
    let (raw_type, raw_value) = split_type_value(component)?;
    let attr_type = raw_type.trim();
    if attr_type.is_empty() {
        return Err(SubjectParseError::EmptyType(component.to_string()));
    }
    let value = unescape(raw_value.trim_start())?;
    Ok(SubjectAttribute {
        attr_type: attr_type.to_string(),
        value,
    })
}

fn split_type_value(component: &str) -> Result<(&str, &str), SubjectParseError> {
    let mut escaped = false;
    for (i, c) in component.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' => return Ok((&component[..i], &component[i + 1..])),
            _ => {}
        }
    }
    Err(SubjectParseError::MissingSeparator(component.to_string()))
}

/// Resolve backslash escapes in an attribute value.
///
/// Escapes operate on bytes: `\2c` is a comma, and a multi-byte UTF-8
/// character may arrive as consecutive hex escapes, so the value is
/// assembled as bytes and validated as UTF-8 at the end.
fn unescape(raw: &str) -> Result<String, SubjectParseError> {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut buf = [0_u8; 4];
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            None => return Err(SubjectParseError::TruncatedEscape),
            Some(h1) if h1.is_ascii_hexdigit() => match chars.next() {
                Some(h2) if h2.is_ascii_hexdigit() => {
                    bytes.push((hex_value(h1) << 4) | hex_value(h2));
                }
                _ => return Err(SubjectParseError::TruncatedEscape),
            },
            Some(escaped) => {
                bytes.extend_from_slice(escaped.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    String::from_utf8(bytes).map_err(|_| SubjectParseError::InvalidUtf8)
}

fn hex_value(c: char) -> u8 {
    // The caller has already checked for an ASCII hex digit.
    c.to_digit(16).map_or(0, |digit| digit as u8)
}

/// Errors from parsing a distinguished name string.
#[derive(Error, Debug, Clone)]
pub enum SubjectParseError {
    /// Two separators with nothing between them, or a trailing separator.
    #[error("empty attribute in subject name")]
    EmptyAttribute,

    /// An attribute without an `=` separator.
    #[error("attribute '{0}' has no '=' separator")]
    MissingSeparator(String),

    /// An attribute whose type tag is empty.
    #[error("attribute '{0}' has an empty type")]
    EmptyType(String),

    /// A backslash escape cut short by the end of the input.
    #[error("truncated escape sequence in subject name")]
    TruncatedEscape,

    /// Hex escapes decoded to bytes that are not valid UTF-8.
    #[error("subject name contains invalid UTF-8 after unescaping")]
    InvalidUtf8,
}
