//! Normalized row format: `subject,predicate,object`.
//!
//! Rows carry dataset ids with the namespace stripped (`Q42`, `P31-7`) and
//! literals re-quoted without their language tag or datatype. Only the first
//! two commas separate fields; the object may contain commas.

use crate::vocab;
use crate::{Atom, ParseError};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Row {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let (subject, rest) = line
            .split_once(',')
            .ok_or(ParseError::MissingField("predicate"))?;
        let (predicate, object) = rest
            .split_once(',')
            .ok_or(ParseError::MissingField("object"))?;
        if subject.is_empty() {
            return Err(ParseError::MissingField("subject"));
        }
        if predicate.is_empty() {
            return Err(ParseError::MissingField("predicate"));
        }
        Ok(Self::new(subject, predicate, object.trim()))
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.subject, self.predicate, self.object)
    }
}

/// Strip the namespace from a subject or predicate IRI.
pub fn normalize_iri(iri: &str) -> &str {
    vocab::local_id(iri)
}

pub fn normalize_object(atom: &Atom) -> String {
    match atom {
        Atom::Iri(iri) if vocab::is_dataset_iri(iri) => vocab::local_id(iri).to_string(),
        Atom::Iri(iri) => iri.clone(),
        Atom::BlankNode(label) => format!("_:{label}"),
        Atom::Literal(lit) => lit.quoted(),
    }
}

/// Normalize any subject atom (IRIs lose their namespace, blank nodes keep their label).
pub fn normalize_subject(atom: &Atom) -> String {
    match atom {
        Atom::Iri(iri) => normalize_iri(iri).to_string(),
        other => normalize_object(other),
    }
}
