//! Wikidata dump vocabulary.
//!
//! Only the handful of IRIs the pruning pipeline branches on live here; the
//! tool is not a general RDF vocabulary registry.

pub const DATASET_NS: &str = "http://www.wikidata.org/";
pub const ENTITY_NS: &str = "http://www.wikidata.org/entity/";
pub const STATEMENT_NS: &str = "http://www.wikidata.org/entity/statement/";
pub const VALUE_NS: &str = "http://www.wikidata.org/value/";
pub const REFERENCE_NS: &str = "http://www.wikidata.org/reference/";

pub const PROPERTY_TYPE: &str = "http://wikiba.se/ontology#propertyType";
pub const EXTERNAL_ID_TYPE: &str = "http://wikiba.se/ontology#ExternalId";
pub const GEO_SHAPE_TYPE: &str = "http://wikiba.se/ontology#GeoShape";
pub const GLOBE_COORDINATE_TYPE: &str = "http://wikiba.se/ontology#GlobeCoordinate";

pub const SCHEMA_NAME: &str = "http://schema.org/name";
pub const SCHEMA_DESCRIPTION: &str = "http://schema.org/description";
pub const SCHEMA_ABOUT: &str = "http://schema.org/about";

pub const WIKIPEDIA_EN_ARTICLE: &str = "https://en.wikipedia.org/wiki/";

/// Namespaces whose predicates describe the schema rather than domain facts.
pub const ONTOLOGY_NAMESPACES: [&str; 3] =
    ["http://www.w3.org", "http://wikiba.se", "http://schema.org"];

/// Normalized id of the "instance of" property.
pub const INSTANCE_OF: &str = "P31";

/// Path marker of skolemized unknown-value nodes.
pub const GENID_MARKER: &str = "/.well-known/genid/";

/// Segment after the last `/`.
pub fn local_id(iri: &str) -> &str {
    iri.rsplit_once('/').map_or(iri, |(_, id)| id)
}

/// Local id of an entity or statement reference (`Q42`, `Q42-0`, `P31`, ...).
pub fn entity_local(iri: &str) -> Option<&str> {
    iri.strip_prefix(STATEMENT_NS)
        .or_else(|| iri.strip_prefix(ENTITY_NS))
}

pub fn is_dataset_iri(iri: &str) -> bool {
    iri.starts_with(DATASET_NS)
}

/// Entity references, statement references included.
pub fn is_entity_ref(iri: &str) -> bool {
    iri.starts_with(ENTITY_NS)
}

pub fn is_statement_ref(iri: &str) -> bool {
    iri.starts_with(STATEMENT_NS)
}

/// An entity (or one of its statements) that is itself a property.
pub fn is_property_ref(iri: &str) -> bool {
    entity_local(iri).is_some_and(|id| id.starts_with(['P', 'p']))
}

/// An item (`Q…`) or a statement about an item (`Q…-…` / `q…-…`).
pub fn is_item_ref(iri: &str) -> bool {
    let Some(id) = entity_local(iri) else {
        return false;
    };
    if is_statement_ref(iri) {
        id.starts_with(['Q', 'q'])
    } else {
        id.starts_with('Q')
    }
}

pub fn is_value_ref(iri: &str) -> bool {
    iri.starts_with(VALUE_NS)
}

pub fn is_reference_ref(iri: &str) -> bool {
    iri.starts_with(REFERENCE_NS)
}

pub fn is_ontology_predicate(iri: &str) -> bool {
    ONTOLOGY_NAMESPACES.iter().any(|ns| iri.starts_with(ns))
}

pub fn is_genid(iri: &str) -> bool {
    iri.contains(GENID_MARKER)
}

/// Primary language subtag is `en` (`en`, `en-gb`, `EN-US`).
pub fn is_english(lang: &str) -> bool {
    let primary = lang.split('-').next().unwrap_or(lang);
    primary.eq_ignore_ascii_case("en")
}
