//! Skel values
//!
//! A skel is either an atom (a byte string) or a list of skels. Every record
//! the filesystem persists (node revisions, revisions, transactions) is a skel
//! written in the textual syntax below:
//!
//! ```text
//! SKEL     ::= ATOM | LIST
//! LIST     ::= "(" [SKEL (SPACE SKEL)*] ")"
//! ATOM     ::= IMPLICIT | EXPLICIT
//! IMPLICIT ::= letter name-char*          ; no whitespace or brackets
//! EXPLICIT ::= decimal-length SPACE bytes
//! ```

use crate::error::{FsError, Result};
use bytes::Bytes;

/// Atoms longer than this are always written with an explicit length.
const MAX_IMPLICIT_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Skel {
    Atom(Bytes),
    List(Vec<Skel>),
}

fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0c)
}

fn is_paren(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'[' | b']')
}

impl Skel {
    pub fn atom(data: impl Into<Bytes>) -> Self {
        Skel::Atom(data.into())
    }

    pub fn str_atom(s: &str) -> Self {
        Skel::Atom(Bytes::copy_from_slice(s.as_bytes()))
    }

    pub fn list(items: Vec<Skel>) -> Self {
        Skel::List(items)
    }

    pub fn empty_list() -> Self {
        Skel::List(Vec::new())
    }

    pub fn as_atom(&self) -> Option<&Bytes> {
        match self {
            Skel::Atom(data) => Some(data),
            Skel::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Skel]> {
        match self {
            Skel::List(items) => Some(items),
            Skel::Atom(_) => None,
        }
    }

    /// Number of elements, or `None` for an atom.
    pub fn list_len(&self) -> Option<usize> {
        self.as_list().map(<[Skel]>::len)
    }

    /// True if this is an atom whose bytes equal `s`.
    pub fn matches_atom(&self, s: &str) -> bool {
        self.as_atom().is_some_and(|data| data.as_ref() == s.as_bytes())
    }

    /// Atom contents as UTF-8.
    pub fn atom_str(&self) -> Result<&str> {
        let data = self
            .as_atom()
            .ok_or_else(|| FsError::malformed("expected an atom, found a list"))?;
        std::str::from_utf8(data).map_err(|_| FsError::malformed("atom is not valid UTF-8"))
    }

    /// Parse exactly one skel, optionally surrounded by whitespace.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut parser = Parser { data, pos: 0 };
        parser.skip_space();
        let skel = parser.skel()?;
        parser.skip_space();
        if parser.pos != data.len() {
            return Err(FsError::malformed(format!(
                "trailing data at byte {}",
                parser.pos
            )));
        }
        Ok(skel)
    }

    /// Textual form of the skel.
    pub fn unparse(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Skel::Atom(data) => {
                if use_implicit(data) {
                    out.extend_from_slice(data);
                } else {
                    out.extend_from_slice(data.len().to_string().as_bytes());
                    out.push(b' ');
                    out.extend_from_slice(data);
                }
            }
            Skel::List(items) => {
                out.push(b'(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    item.write_to(out);
                }
                out.push(b')');
            }
        }
    }
}

fn use_implicit(data: &[u8]) -> bool {
    !data.is_empty()
        && data.len() < MAX_IMPLICIT_LEN
        && data[0].is_ascii_alphabetic()
        && data.iter().all(|&c| !is_space(c) && !is_paren(c))
}

struct Parser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn skip_space(&mut self) {
        while self.peek().is_some_and(is_space) {
            self.pos += 1;
        }
    }

    fn skel(&mut self) -> Result<Skel> {
        match self.peek() {
            None => Err(FsError::malformed("unexpected end of input")),
            Some(b'(') => self.list(),
            Some(c) if c.is_ascii_digit() => self.explicit_atom(),
            Some(c) if c.is_ascii_alphabetic() => Ok(self.implicit_atom()),
            Some(c) => Err(FsError::malformed(format!(
                "unexpected byte 0x{:02x} at {}",
                c, self.pos
            ))),
        }
    }

    fn list(&mut self) -> Result<Skel> {
        // Consume '('
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_space();
            match self.peek() {
                None => return Err(FsError::malformed("unterminated list")),
                Some(b')') => {
                    self.pos += 1;
                    return Ok(Skel::List(items));
                }
                Some(_) => items.push(self.skel()?),
            }
        }
    }

    fn implicit_atom(&mut self) -> Skel {
        let start = self.pos;
        while self.peek().is_some_and(|c| !is_space(c) && !is_paren(c)) {
            self.pos += 1;
        }
        Skel::Atom(Bytes::copy_from_slice(&self.data[start..self.pos]))
    }

    fn explicit_atom(&mut self) -> Result<Skel> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let len: usize = std::str::from_utf8(&self.data[start..self.pos])
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| FsError::malformed(format!("bad atom length at {}", start)))?;

        // Exactly one whitespace byte separates the length from the data.
        match self.peek() {
            Some(c) if is_space(c) => self.pos += 1,
            _ => return Err(FsError::malformed(format!("missing space after length at {}", start))),
        }

        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| FsError::malformed(format!("truncated atom at {}", start)))?;
        let atom = Bytes::copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(Skel::Atom(atom))
    }
}
