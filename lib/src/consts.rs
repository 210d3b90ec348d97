//! Defines constant NamedNodeRefs for the fixed vocabularies a nanopublication is written in:
//! RDF, RDFS, XSD, the RDF Data Cube, SKOS, PROV-O, the nanopublication schema and FOAF.

use oxigraph::model::NamedNodeRef;

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
pub const QB_NS: &str = "http://purl.org/linked-data/cube#";
pub const SKOS_NS: &str = "http://www.w3.org/2004/02/skos/core#";
pub const PROV_NS: &str = "http://www.w3.org/ns/prov#";
pub const NP_NS: &str = "http://www.nanopub.org/nschema#";
pub const FOAF_NS: &str = "http://xmlns.com/foaf/0.1/";

/// Prefixes written at the top of every TriG document.
pub const STANDARD_PREFIXES: [(&str, &str); 8] = [
    ("rdf", RDF_NS),
    ("rdfs", RDFS_NS),
    ("xsd", XSD_NS),
    ("qb", QB_NS),
    ("skos", SKOS_NS),
    ("prov", PROV_NS),
    ("np", NP_NS),
    ("foaf", FOAF_NS),
];

/// The software that generates the nanopublications.
pub const DEFAULT_TOOL_IRI: &str = "https://github.com/CLARIAH/qber.git";

// rdf
pub const TYPE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
// rdfs
pub const LABEL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#label");
pub const COMMENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#comment");
pub const SUB_PROPERTY_OF: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#subPropertyOf");
// xsd
pub const XSD_STRING: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#string");
pub const XSD_DATE_TIME: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#dateTime");

// data cube classes
pub const QB_DATASET: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#DataSet");
pub const QB_DATA_STRUCTURE_DEFINITION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#DataStructureDefinition");
pub const QB_DIMENSION_PROPERTY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#DimensionProperty");
pub const QB_MEASURE_PROPERTY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#MeasureProperty");
pub const QB_ATTRIBUTE_PROPERTY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#AttributeProperty");
pub const QB_CODED_PROPERTY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#CodedProperty");
// data cube properties
pub const QB_STRUCTURE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#structure");
pub const QB_COMPONENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#component");
pub const QB_DIMENSION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#dimension");
pub const QB_MEASURE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#measure");
pub const QB_ATTRIBUTE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#attribute");
pub const QB_CODE_LIST: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/linked-data/cube#codeList");

// skos
pub const SKOS_COLLECTION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#Collection");
pub const SKOS_CONCEPT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#Concept");
pub const SKOS_MEMBER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#member");
pub const SKOS_PREF_LABEL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#prefLabel");
pub const SKOS_EXACT_MATCH: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#exactMatch");

// prov
pub const PROV_WAS_DERIVED_FROM: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/prov#wasDerivedFrom");
pub const PROV_GENERATED_AT_TIME: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/prov#generatedAtTime");
pub const PROV_WAS_ATTRIBUTED_TO: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/prov#wasAttributedTo");
pub const PROV_WAS_GENERATED_BY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/prov#wasGeneratedBy");

// nanopublication schema
pub const NP_NANOPUBLICATION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.nanopub.org/nschema#Nanopublication");
pub const NP_ASSERTION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.nanopub.org/nschema#Assertion");
pub const NP_PROVENANCE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.nanopub.org/nschema#Provenance");
pub const NP_PUBLICATION_INFO: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.nanopub.org/nschema#PublicationInfo");
pub const NP_HAS_ASSERTION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.nanopub.org/nschema#hasAssertion");
pub const NP_HAS_PROVENANCE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.nanopub.org/nschema#hasProvenance");
pub const NP_HAS_PUBLICATION_INFO: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.nanopub.org/nschema#hasPublicationInfo");

// foaf
pub const FOAF_PERSON: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/Person");
pub const FOAF_NAME: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/name");
pub const FOAF_EMAIL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/email");
pub const FOAF_DEPICTION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://xmlns.com/foaf/0.1/depiction");

// local names in the tool vocabulary (appended to Config::vocab_base)
pub const VOCAB_PATH: &str = "path";
pub const VOCAB_SHA1_HASH: &str = "sha1_hash";
pub const VOCAB_GOOGLE_ID: &str = "googleId";
