//! The exclusion chain applied to every entity-subject triple.
//!
//! Rules are independent: a triple is kept iff no rule matches. Evaluation
//! order only decides which rule gets the drop attributed in [`ShardReport`].
//!
//! [`ShardReport`]: crate::shard::ShardReport

use kgprune_ntriples::vocab;
use kgprune_ntriples::{Atom, Triple};
use kgprune_storage::SpecialPredicates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterRule {
    /// Subject is a property (or a statement about one).
    PropertySubject,
    /// Predicate belongs to an ontology/vocabulary namespace.
    OntologyPredicate,
    /// Object is a `wdv:` value node.
    ValueNode,
    /// Object is a literal tagged with a two-letter non-English language.
    ForeignLabel,
    /// Object is a `wdref:` reference node.
    ReferenceNode,
    /// Object is an IRI outside the dataset namespace.
    ExternalIri,
    /// Object is a literal tagged with any non-English language.
    NonEnglishLiteral,
    /// Predicate is an external-identifier property.
    ExternalIdPredicate,
    /// Object is an unknown-value (blank / skolem) node.
    UnknownValue,
    /// Predicate is a geo-shape or coordinate property.
    GeoPredicate,
    /// Object is neither a literal nor an item/statement reference.
    OtherObject,
}

impl FilterRule {
    pub const ALL: [FilterRule; 11] = [
        FilterRule::PropertySubject,
        FilterRule::OntologyPredicate,
        FilterRule::ValueNode,
        FilterRule::ForeignLabel,
        FilterRule::ReferenceNode,
        FilterRule::ExternalIri,
        FilterRule::NonEnglishLiteral,
        FilterRule::ExternalIdPredicate,
        FilterRule::UnknownValue,
        FilterRule::GeoPredicate,
        FilterRule::OtherObject,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterRule::PropertySubject => "property_subject",
            FilterRule::OntologyPredicate => "ontology_predicate",
            FilterRule::ValueNode => "value_node",
            FilterRule::ForeignLabel => "foreign_label",
            FilterRule::ReferenceNode => "reference_node",
            FilterRule::ExternalIri => "external_iri",
            FilterRule::NonEnglishLiteral => "non_english_literal",
            FilterRule::ExternalIdPredicate => "external_id_predicate",
            FilterRule::UnknownValue => "unknown_value",
            FilterRule::GeoPredicate => "geo_predicate",
            FilterRule::OtherObject => "other_object",
        }
    }

    pub fn matches(self, triple: &Triple, special: &SpecialPredicates) -> bool {
        let object_iri = triple.object.as_iri();
        let language = triple.object.as_literal().and_then(|lit| lit.language());
        match self {
            FilterRule::PropertySubject => triple
                .subject
                .as_iri()
                .is_some_and(vocab::is_property_ref),
            FilterRule::OntologyPredicate => vocab::is_ontology_predicate(&triple.predicate),
            FilterRule::ValueNode => object_iri.is_some_and(vocab::is_value_ref),
            FilterRule::ForeignLabel => language.is_some_and(|lang| {
                let mut head = lang.bytes().take(2);
                let two_lowercase = matches!(
                    (head.next(), head.next()),
                    (Some(a), Some(b)) if a.is_ascii_lowercase() && b.is_ascii_lowercase()
                );
                two_lowercase && !vocab::is_english(lang)
            }),
            FilterRule::ReferenceNode => object_iri.is_some_and(vocab::is_reference_ref),
            FilterRule::ExternalIri => object_iri.is_some_and(|iri| !vocab::is_dataset_iri(iri)),
            FilterRule::NonEnglishLiteral => language.is_some_and(|lang| !vocab::is_english(lang)),
            FilterRule::ExternalIdPredicate => {
                special.is_external_id(vocab::local_id(&triple.predicate))
            }
            FilterRule::UnknownValue => match &triple.object {
                Atom::BlankNode(_) => true,
                Atom::Iri(iri) => vocab::is_genid(iri),
                Atom::Literal(_) => false,
            },
            FilterRule::GeoPredicate => special.is_geo(vocab::local_id(&triple.predicate)),
            FilterRule::OtherObject => match &triple.object {
                Atom::Literal(_) => false,
                Atom::Iri(iri) => !vocab::is_item_ref(iri),
                Atom::BlankNode(_) => true,
            },
        }
    }
}

/// First rule (in chain order) that excludes `triple`.
pub fn first_matching_rule(
    triple: &Triple,
    special: &SpecialPredicates,
) -> Option<FilterRule> {
    FilterRule::ALL
        .into_iter()
        .find(|rule| rule.matches(triple, special))
}
