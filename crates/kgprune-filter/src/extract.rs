//! Side-table extraction.
//!
//! Runs before the exclusion chain: label triples use ontology predicates
//! (`schema:name`, `skos:altLabel`, …) that the chain drops, and Wikipedia
//! sitelinks have non-entity subjects.

use kgprune_ntriples::vocab;
use kgprune_ntriples::Triple;
use kgprune_storage::SideTables;

/// `<https://en.wikipedia.org/wiki/Title> schema:about <entity>`.
pub fn extract_wikipedia_mapping(triple: &Triple, tables: &mut SideTables) -> bool {
    if triple.predicate != vocab::SCHEMA_ABOUT {
        return false;
    }
    let Some(title) = triple
        .subject
        .as_iri()
        .and_then(|iri| iri.strip_prefix(vocab::WIKIPEDIA_EN_ARTICLE))
    else {
        return false;
    };
    let Some(entity) = triple.object.as_iri().filter(|iri| vocab::is_entity_ref(iri)) else {
        return false;
    };
    tables.add_wikipedia_mapping(title, vocab::local_id(entity));
    true
}

/// Entity id of an entity- or statement-reference subject.
pub fn entity_subject(triple: &Triple) -> Option<&str> {
    triple
        .subject
        .as_iri()
        .filter(|iri| vocab::is_entity_ref(iri))
        .map(vocab::local_id)
}

/// Labels, aliases and descriptions of one entity-subject triple.
pub fn extract_entity_tables(entity_id: &str, triple: &Triple, tables: &mut SideTables) {
    let Some(lit) = triple.object.as_literal().filter(|lit| lit.is_english()) else {
        return;
    };
    let text = lit.value.as_str();
    let predicate = triple.predicate.as_str();

    if predicate == vocab::SCHEMA_NAME || predicate.ends_with("altLabel") {
        tables.add_label(entity_id, text);
    }
    if vocab::local_id(predicate).contains("abel") {
        tables.add_alias(entity_id, text);
    }
    if predicate == vocab::SCHEMA_DESCRIPTION {
        tables.set_description(entity_id, text);
    }
}
