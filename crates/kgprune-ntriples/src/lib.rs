//! Line-oriented N-Triples grammar for kgprune.
//!
//! Dumps are processed one line at a time: each line is handed to rio's
//! N-Triples parser and the single triple it yields is copied into an owned
//! [`Triple`]. A malformed line therefore costs one [`ParseError`] and nothing
//! else.
//!
//! - subjects are `<iri>` or `_:label`
//! - predicates are `<iri>`
//! - objects are `<iri>`, `_:label`, or a literal with an optional `@lang` or
//!   `^^<datatype>` suffix
//!
//! Literal values are stored decoded. [`Triple`]'s `Display` goes back through
//! rio's term model, so a kept triple is written in canonical N-Triples.

pub mod row;
pub mod vocab;

use rio_api::model::{self as rio, NamedNode};
use rio_api::parser::TriplesParser;
use rio_turtle::{NTriplesParser, TurtleError};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, BufRead};

pub use row::{normalize_object, Row};

/// Why a line (or row) could not be turned into a triple.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("missing {0} field")]
    MissingField(&'static str),
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("line holds no triple")]
    Empty,
    #[error("line holds more than one triple")]
    MultipleTriples,
    #[error("unsupported term: {0}")]
    UnsupportedTerm(String),
}

impl From<TurtleError> for ParseError {
    fn from(err: TurtleError) -> Self {
        ParseError::Syntax(err.to_string())
    }
}

// ============================================================================
// Term model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    /// Decoded lexical form.
    pub value: String,
    pub language: Option<String>,
    pub datatype: Option<String>,
}

impl Literal {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn is_english(&self) -> bool {
        self.language().is_some_and(vocab::is_english)
    }

    fn as_rio(&self) -> rio::Literal<'_> {
        let value = self.value.as_str();
        match (&self.language, &self.datatype) {
            (Some(language), _) => rio::Literal::LanguageTaggedString { value, language },
            (None, Some(iri)) => rio::Literal::Typed {
                value,
                datatype: NamedNode { iri },
            },
            (None, None) => rio::Literal::Simple { value },
        }
    }

    /// The value as a quoted, escaped N-Triples string without tag or datatype.
    pub fn quoted(&self) -> String {
        rio::Literal::Simple { value: &self.value }.to_string()
    }
}

/// One position of a triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    Iri(String),
    BlankNode(String),
    Literal(Literal),
}

impl Atom {
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Atom::Iri(iri) => Some(iri.as_str()),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Atom::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Atom::Literal(_))
    }

    fn as_rio(&self) -> rio::Term<'_> {
        match self {
            Atom::Iri(iri) => rio::Term::NamedNode(NamedNode { iri }),
            Atom::BlankNode(id) => rio::Term::BlankNode(rio::BlankNode { id }),
            Atom::Literal(lit) => rio::Term::Literal(lit.as_rio()),
        }
    }

    fn from_subject(subject: rio::Subject<'_>) -> Result<Self, ParseError> {
        match subject {
            rio::Subject::NamedNode(node) => Ok(Atom::Iri(node.iri.to_owned())),
            rio::Subject::BlankNode(node) => Ok(Atom::BlankNode(node.id.to_owned())),
            rio::Subject::Triple(_) => Err(ParseError::UnsupportedTerm(subject.to_string())),
        }
    }

    fn from_term(term: rio::Term<'_>) -> Result<Self, ParseError> {
        match term {
            rio::Term::NamedNode(node) => Ok(Atom::Iri(node.iri.to_owned())),
            rio::Term::BlankNode(node) => Ok(Atom::BlankNode(node.id.to_owned())),
            rio::Term::Literal(rio::Literal::Simple { value }) => {
                Ok(Atom::Literal(Literal::plain(value)))
            }
            rio::Term::Literal(rio::Literal::LanguageTaggedString { value, language }) => {
                Ok(Atom::Literal(Literal {
                    value: value.to_owned(),
                    language: Some(language.to_owned()),
                    datatype: None,
                }))
            }
            rio::Term::Literal(rio::Literal::Typed { value, datatype }) => {
                Ok(Atom::Literal(Literal {
                    value: value.to_owned(),
                    language: None,
                    datatype: Some(datatype.iri.to_owned()),
                }))
            }
            rio::Term::Triple(_) => Err(ParseError::UnsupportedTerm(term.to_string())),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_rio(), f)
    }
}

/// A parsed `subject predicate object .` line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Atom,
    /// Predicate IRI without angle brackets.
    pub predicate: String,
    pub object: Atom,
}

impl Triple {
    fn from_rio(triple: rio::Triple<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            subject: Atom::from_subject(triple.subject)?,
            predicate: triple.predicate.iri.to_owned(),
            object: Atom::from_term(triple.object)?,
        })
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let predicate = NamedNode {
            iri: &self.predicate,
        };
        write!(f, "{} {} {} .", self.subject, predicate, self.object)
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Split a raw line into `(subject, predicate, rest)` on the first two spaces.
///
/// `rest` still carries the ` .` terminator; only the line ending is removed.
pub fn split_fields(line: &str) -> Option<(&str, &str, &str)> {
    let line = line.trim_end_matches(['\n', '\r']);
    let (subject, rest) = line.split_once(' ')?;
    let (predicate, object) = rest.split_once(' ')?;
    Some((subject, predicate, object))
}

/// Parse exactly one triple from one line.
pub fn parse_line(line: &str) -> Result<Triple, ParseError> {
    let mut parsed: Option<Triple> = None;
    NTriplesParser::new(line.as_bytes()).parse_all(&mut |triple| -> Result<(), ParseError> {
        if parsed.is_some() {
            return Err(ParseError::MultipleTriples);
        }
        parsed = Some(Triple::from_rio(triple)?);
        Ok(())
    })?;
    parsed.ok_or(ParseError::Empty)
}

// ============================================================================
// Line streaming
// ============================================================================

/// Streams a dump line by line, reusing one buffer.
///
/// Line endings are stripped; bytes that are not valid UTF-8 are replaced
/// rather than failing the whole pass.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    line_no: u64,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(512),
            line_no: 0,
        }
    }

    /// Next `(1-based line number, line)`, or `None` at end of input.
    pub fn next_line(&mut self) -> io::Result<Option<(u64, Cow<'_, str>)>> {
        self.buf.clear();
        if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        Ok(Some((self.line_no, String::from_utf8_lossy(&self.buf))))
    }

    pub fn lines_read(&self) -> u64 {
        self.line_no
    }
}
