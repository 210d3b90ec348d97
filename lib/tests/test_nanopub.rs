use chrono::prelude::*;
use oxigraph::model::{GraphNameRef, NamedNodeRef, NamedOrBlankNodeRef, QuadRef, TermRef};
use qber::consts::*;
use qber::trig::parse_trig;
use qber::{AuthorProfile, Config, Nanopublication, Variables};

const DATASET: &str = "http://example.org/resource/census";
const HASH: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

const SEX: &str = r#"{
    "sex": {
        "original": {"uri": "http://example.org/resource/census/variable/sex", "label": "sex"},
        "uri": "http://example.org/resource/census/variable/sex",
        "label": "sex",
        "description": "Sex of the respondent",
        "category": "identifier",
        "type": "http://purl.org/linked-data/cube#DimensionProperty",
        "values": [
            {"original": {"uri": "http://example.org/resource/census/value/sex/male", "label": "male"},
             "uri": "http://example.org/resource/census/value/sex/male", "label": "male", "count": 12},
            {"original": {"uri": "http://example.org/resource/census/value/sex/female", "label": "female"},
             "uri": "http://example.org/resource/census/value/sex/female", "label": "female", "count": 9}
        ]
    }
}"#;

const OCCUPATION: &str = r#"{
    "occupation": {
        "original": {"uri": "http://example.org/resource/census/variable/occupation", "label": "occupation"},
        "uri": "http://example.org/vocab/hisco",
        "label": "HISCO occupation",
        "category": "coded",
        "type": "http://purl.org/linked-data/cube#DimensionProperty",
        "codelist": {
            "original": {"uri": "http://example.org/resource/census/codelist/occupation", "label": "occupations"},
            "uri": "http://example.org/resource/census/codelist/occupation",
            "label": "occupations"
        },
        "values": [
            {"original": {"uri": "http://example.org/resource/census/value/occupation/smith", "label": "smith"},
             "uri": "http://example.org/vocab/hisco/83110", "label": "Blacksmith, General"}
        ]
    }
}"#;

fn build(variables: &str, timestamp: DateTime<Utc>) -> Nanopublication {
    let config = Config::default();
    Nanopublication::builder(&config)
        .profile(AuthorProfile::new("Jane Doe", "jane@example.org"))
        .dataset_name("census")
        .dataset_uri(DATASET)
        .source_path("data/census.csv")
        .source_hash(HASH)
        .variables(Variables::from_json(variables).unwrap())
        .timestamp(timestamp)
        .build()
        .unwrap()
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 3, 1, 12, 0, 0).unwrap()
}

fn count_in(np: &Nanopublication, predicate: NamedNodeRef<'_>) -> usize {
    let assertion: GraphNameRef<'_> = np.assertion().into();
    np.dataset()
        .quads_for_graph_name(assertion)
        .filter(|q| q.predicate == predicate)
        .count()
}

fn typed(np: &Nanopublication, class: NamedNodeRef<'_>) -> usize {
    let class = TermRef::from(class);
    np.dataset()
        .iter()
        .filter(|q| q.predicate == TYPE && q.object == class)
        .count()
}

#[test]
fn identifier_variable_without_edits() {
    let np = build(SEX, noon());
    let assertion: GraphNameRef<'_> = np.assertion().into();
    let dataset = np.dataset();
    let sex = NamedNodeRef::new("http://example.org/resource/census/variable/sex").unwrap();
    let ds = NamedNodeRef::new(DATASET).unwrap();

    assert!(dataset.contains(QuadRef::new(ds, TYPE, QB_DATASET, assertion)));
    assert_eq!(typed(&np, QB_DATA_STRUCTURE_DEFINITION), 1);
    assert_eq!(count_in(&np, QB_COMPONENT), 1);
    assert!(dataset.contains(QuadRef::new(sex, TYPE, QB_DIMENSION_PROPERTY, assertion)));
    assert!(!dataset.contains(QuadRef::new(sex, TYPE, QB_CODED_PROPERTY, assertion)));
    assert_eq!(typed(&np, SKOS_CONCEPT), 2);
    assert_eq!(count_in(&np, SKOS_EXACT_MATCH), 0);
    assert_eq!(count_in(&np, SUB_PROPERTY_OF), 0);
    // identifiers are not grouped into a collection
    assert_eq!(count_in(&np, SKOS_MEMBER), 0);
    assert_eq!(typed(&np, SKOS_COLLECTION), 0);
}

#[test]
fn coded_variable_with_edits() {
    let np = build(OCCUPATION, noon());
    let assertion: GraphNameRef<'_> = np.assertion().into();
    let dataset = np.dataset();
    let hisco = NamedNodeRef::new("http://example.org/vocab/hisco").unwrap();
    let original =
        NamedNodeRef::new("http://example.org/resource/census/variable/occupation").unwrap();
    let smith =
        NamedNodeRef::new("http://example.org/resource/census/value/occupation/smith").unwrap();
    let blacksmith = NamedNodeRef::new("http://example.org/vocab/hisco/83110").unwrap();

    assert_eq!(count_in(&np, SUB_PROPERTY_OF), 1);
    assert!(dataset.contains(QuadRef::new(hisco, SUB_PROPERTY_OF, original, assertion)));
    assert!(dataset.contains(QuadRef::new(hisco, TYPE, QB_CODED_PROPERTY, assertion)));
    assert_eq!(typed(&np, SKOS_COLLECTION), 1);
    assert_eq!(typed(&np, SKOS_CONCEPT), 1);
    assert_eq!(count_in(&np, SKOS_MEMBER), 1);
    assert_eq!(count_in(&np, SKOS_EXACT_MATCH), 1);
    assert!(dataset.contains(QuadRef::new(smith, SKOS_EXACT_MATCH, blacksmith, assertion)));
    assert!(dataset.contains(QuadRef::new(
        blacksmith,
        LABEL,
        oxigraph::model::LiteralRef::new_simple_literal("Blacksmith, General"),
        assertion
    )));
    // the codelist was not edited
    assert_eq!(count_in(&np, PROV_WAS_DERIVED_FROM), 0);
    // the component keeps the original label
    let component =
        NamedNodeRef::new("http://example.org/resource/census/component/occupation").unwrap();
    assert!(dataset.contains(QuadRef::new(component, QB_DIMENSION, hisco, assertion)));
}

#[test]
fn same_hash_twice_shares_dataset_version() {
    let first = build(SEX, noon());
    let second = build(SEX, noon() + chrono::Duration::seconds(90));

    assert_ne!(first.uri(), second.uri());
    assert_ne!(first.assertion(), second.assertion());
    assert_ne!(first.provenance(), second.provenance());
    assert_ne!(first.pubinfo(), second.pubinfo());
    assert_eq!(first.dataset_version(), second.dataset_version());

    for np in [&first, &second] {
        let provenance: GraphNameRef<'_> = np.provenance().into();
        assert!(np.dataset().contains(QuadRef::new(
            np.assertion(),
            PROV_WAS_DERIVED_FROM,
            np.dataset_version(),
            provenance
        )));
    }
}

#[test]
fn assertion_graph_is_deterministic() {
    let first = build(OCCUPATION, noon());
    let second = build(OCCUPATION, noon() + chrono::Duration::days(1));
    let triples = |np: &Nanopublication| {
        let assertion: GraphNameRef<'_> = np.assertion().into();
        let mut triples: Vec<String> = np
            .dataset()
            .quads_for_graph_name(assertion)
            .map(|q| format!("{} {} {}", q.subject, q.predicate, q.object))
            .collect();
        triples.sort();
        triples
    };
    assert_eq!(triples(&first), triples(&second));
}

#[test]
fn serialized_nanopublication_roundtrips() {
    let np = build(OCCUPATION, noon());
    let text = np.to_trig(&Config::default()).unwrap();
    let parsed = parse_trig(&text).unwrap();
    assert_eq!(&parsed, np.dataset());
    for graph in np.graphs() {
        let name: GraphNameRef<'_> = graph.into();
        assert_eq!(
            parsed.quads_for_graph_name(name).count(),
            np.dataset().quads_for_graph_name(name).count()
        );
    }
}

#[test]
fn unknown_category_is_rejected() {
    let input = SEX.replace("\"identifier\"", "\"ordinal\"");
    assert!(Variables::from_json(&input).is_err());
    let input = SEX.replace("cube#DimensionProperty", "cube#SliceKey");
    assert!(Variables::from_json(&input).is_err());
}

#[test]
fn invalid_variables_fail_before_emission() {
    let config = Config::default();
    let input = OCCUPATION.replace("\"uri\": \"http://example.org/vocab/hisco\"", "\"uri\": \"hisco\"");
    let err = Nanopublication::builder(&config)
        .profile(AuthorProfile::new("Jane Doe", "jane@example.org"))
        .dataset_name("census")
        .dataset_uri(DATASET)
        .source_path("data/census.csv")
        .source_hash(HASH)
        .variables(Variables::from_json(&input).unwrap())
        .build()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<qber::InputError>(),
        Some(qber::InputError::InvalidIri { .. })
    ));
}

#[test]
fn identifier_variable_ignores_codelist() {
    let with_codelist = SEX.replace(
        r#""category": "identifier","#,
        r#""category": "identifier",
        "codelist": {
            "original": {"uri": "http://example.org/resource/census/codelist/sex", "label": "sexes"},
            "uri": "http://example.org/resource/census/codelist/sex",
            "label": "sexes"
        },"#,
    );
    let np = build(&with_codelist, noon());
    assert_eq!(typed(&np, SKOS_COLLECTION), 0);
    assert_eq!(count_in(&np, SKOS_MEMBER), 0);
    assert_eq!(count_in(&np, QB_CODE_LIST), 0);
    assert_eq!(typed(&np, SKOS_CONCEPT), 2);
    assert!(!np
        .dataset()
        .iter()
        .any(|q| q.object.to_string() == "\"sexes\""));
}

#[test]
fn relabelled_value_keeps_original_identity() {
    let relabelled = SEX.replace(
        r#""label": "male", "count": 12"#,
        r#""label": "Male respondent", "count": 12"#,
    );
    let np = build(&relabelled, noon());
    let assertion: GraphNameRef<'_> = np.assertion().into();
    let male = NamedNodeRef::new("http://example.org/resource/census/value/sex/male").unwrap();

    assert_eq!(count_in(&np, SKOS_EXACT_MATCH), 0);
    assert_eq!(typed(&np, SKOS_CONCEPT), 2);
    let labels: Vec<String> = np
        .dataset()
        .quads_for_graph_name(assertion)
        .filter(|q| q.subject == NamedOrBlankNodeRef::from(male))
        .filter(|q| q.predicate == SKOS_PREF_LABEL || q.predicate == LABEL)
        .map(|q| q.object.to_string())
        .collect();
    assert_eq!(labels, vec!["\"male\"".to_string()]);
    assert!(!np
        .dataset()
        .iter()
        .any(|q| q.object.to_string() == "\"Male respondent\""));
}
