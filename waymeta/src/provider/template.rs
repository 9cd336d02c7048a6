//! Tile URL templates with `${x}`, `${y}` and `${z}` placeholders.
//!
//! Templates follow shell-style substitution: `${name}` or `$name` is
//! replaced, `$$` is a literal dollar sign. Only `x`, `y` and `z` are known
//! placeholders; anything else is rejected when the template is parsed so a
//! typo fails at startup rather than on the first fetch.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::coord::TileIndex;

/// Errors from parsing a URL template.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder ${{{name}}} at byte {position}")]
    UnknownPlaceholder { name: String, position: usize },

    #[error("invalid placeholder at byte {0}")]
    InvalidPlaceholder(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    X,
    Y,
    Z,
}

/// A parsed tile URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    /// Parses a template string.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = raw.char_indices().peekable();

        while let Some((position, c)) = rest.next() {
            if c != '$' {
                literal.push(c);
                continue;
            }

            let name = match rest.peek().copied() {
                Some((_, '$')) => {
                    rest.next();
                    literal.push('$');
                    continue;
                }
                Some((_, '{')) => {
                    rest.next();
                    let mut name = String::new();
                    loop {
                        match rest.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => name.push(c),
                            None => return Err(TemplateError::InvalidPlaceholder(position)),
                        }
                    }
                    name
                }
                Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some((_, c)) = rest.peek().copied() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            rest.next();
                        } else {
                            break;
                        }
                    }
                    name
                }
                _ => return Err(TemplateError::InvalidPlaceholder(position)),
            };

            let segment = match name.as_str() {
                "x" => Segment::X,
                "y" => Segment::Y,
                "z" => Segment::Z,
                _ => return Err(TemplateError::UnknownPlaceholder { name, position }),
            };
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Substitutes the tile coordinates as decimal integers.
    pub fn render(&self, tile: TileIndex) -> String {
        let mut url = String::with_capacity(self.raw.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => url.push_str(s),
                Segment::X => url.push_str(&tile.x.to_string()),
                Segment::Y => url.push_str(&tile.y.to_string()),
                Segment::Z => url.push_str(&tile.zoom.to_string()),
            }
        }
        url
    }

    /// The template as originally written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for UrlTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
