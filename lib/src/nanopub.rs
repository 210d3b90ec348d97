//! Assembly of a nanopublication around a Data Cube structure definition.
//!
//! A nanopublication consists of three named graphs: the assertion (the structure
//! definition itself), its provenance (which revision of which source file it was derived
//! from, by whom, when) and the publication info (which tool generated the wrapper). The
//! framing triples linking the three graphs, the author and the dataset version live in the
//! default graph.
//!
//! Every submission creates a fresh nanopublication: graph IRIs embed both the content hash
//! of the source file and the submission timestamp. The dataset-version resource only embeds
//! the content hash and is therefore shared between submissions of the same file revision.

use crate::config::Config;
use crate::consts::*;
use crate::errors::InputError;
use crate::iri::{mint, namespace_of, parse_iri};
use crate::model::{AuthorProfile, Variables};
use crate::structure::{emit_structure_definition, DatasetDescription, GraphWriter};
use crate::trig::TrigSerializer;
use anyhow::Result;
use chrono::prelude::*;
use log::{debug, info};
use oxigraph::model::{Dataset, GraphNameRef, LiteralRef, NamedNode, NamedNodeRef};

/// A freshly built nanopublication and the IRIs identifying its parts.
#[derive(Debug, Clone)]
pub struct Nanopublication {
    dataset: Dataset,
    uri: NamedNode,
    assertion: NamedNode,
    provenance: NamedNode,
    pubinfo: NamedNode,
    dataset_uri: NamedNode,
    dataset_version: NamedNode,
    author: NamedNode,
    timestamp: DateTime<Utc>,
}

impl Nanopublication {
    pub fn builder(config: &Config) -> NanopublicationBuilder<'_> {
        NanopublicationBuilder::new(config)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    pub fn uri(&self) -> NamedNodeRef<'_> {
        self.uri.as_ref()
    }

    pub fn assertion(&self) -> NamedNodeRef<'_> {
        self.assertion.as_ref()
    }

    pub fn provenance(&self) -> NamedNodeRef<'_> {
        self.provenance.as_ref()
    }

    pub fn pubinfo(&self) -> NamedNodeRef<'_> {
        self.pubinfo.as_ref()
    }

    /// The dataset as a Data Cube subject, stable across nanopublications.
    pub fn dataset_uri(&self) -> NamedNodeRef<'_> {
        self.dataset_uri.as_ref()
    }

    /// The revision of the source file the assertion was derived from.
    pub fn dataset_version(&self) -> NamedNodeRef<'_> {
        self.dataset_version.as_ref()
    }

    pub fn author(&self) -> NamedNodeRef<'_> {
        self.author.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The three named graphs in publication order.
    pub fn graphs(&self) -> [NamedNodeRef<'_>; 3] {
        [self.assertion(), self.provenance(), self.pubinfo()]
    }

    /// Renders the whole store as TriG, declaring the configured namespaces as prefixes.
    pub fn to_trig(&self, config: &Config) -> Result<String> {
        trig_serializer(config)?.serialize(&self.dataset)
    }
}

/// A TriG serializer with `qbr:` and `qbrv:` bound to the configured namespaces.
pub fn trig_serializer(config: &Config) -> Result<TrigSerializer> {
    TrigSerializer::new()
        .with_prefix("qbr", &config.resource_base)?
        .with_prefix("qbrv", &config.vocab_base)
}

/// The ISO-8601 form used both in graph IRIs and in `prov:generatedAtTime`.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Collects the inputs of a nanopublication. Nothing is emitted until [`build`] has checked
/// that every required input is present and well-formed.
///
/// [`build`]: NanopublicationBuilder::build
pub struct NanopublicationBuilder<'a> {
    config: &'a Config,
    profile: Option<AuthorProfile>,
    dataset_name: Option<String>,
    dataset_uri: Option<String>,
    source_path: Option<String>,
    source_hash: Option<String>,
    variables: Variables,
    timestamp: Option<DateTime<Utc>>,
}

impl<'a> NanopublicationBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            profile: None,
            dataset_name: None,
            dataset_uri: None,
            source_path: None,
            source_hash: None,
            variables: Variables::new(),
            timestamp: None,
        }
    }

    pub fn profile(mut self, profile: AuthorProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }

    pub fn dataset_uri(mut self, uri: impl Into<String>) -> Self {
        self.dataset_uri = Some(uri.into());
        self
    }

    pub fn source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn source_hash(mut self, hash: impl Into<String>) -> Self {
        self.source_hash = Some(hash.into());
        self
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Fixes the submission instant instead of using the current time.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Result<Nanopublication> {
        let profile = self.profile.ok_or(InputError::MissingField("profile"))?;
        profile.validate()?;
        let dataset_uri = required(self.dataset_uri, "dataset_uri")?;
        let dataset_iri = parse_iri("dataset_uri", &dataset_uri)?;
        let dataset_name = required(self.dataset_name, "dataset_name")?;
        let source_path = required(self.source_path, "source_path")?;
        let source_hash = required(self.source_hash, "source_hash")?;
        self.variables.validate()?;
        self.config.validate()?;

        let timestamp = self.timestamp.unwrap_or_else(Utc::now);
        let stamp = format_timestamp(&timestamp);
        let hash_part = format!("{}/{}", source_hash, stamp);
        let base = namespace_of(&dataset_uri);

        let assertion = mint(&base, &format!("assertion/{hash_part}"))?;
        let provenance = mint(&base, &format!("provenance/{hash_part}"))?;
        let pubinfo = mint(&base, &format!("pubinfo/{hash_part}"))?;
        let uri = mint(&base, &format!("nanopublication/{hash_part}"))?;
        let dataset_version = mint(&base, &source_hash)?;
        let author = self.config.resource(&format!("person/{}", profile.email.trim()))?;
        let tool = self.config.tool()?;
        let path_term = self.config.vocab(VOCAB_PATH)?;
        let hash_term = self.config.vocab(VOCAB_SHA1_HASH)?;
        let id_term = self.config.vocab(VOCAB_GOOGLE_ID)?;

        info!("Building nanopublication {}", uri);
        let mut dataset = Dataset::new();
        let generated_at = LiteralRef::new_typed_literal(&stamp, XSD_DATE_TIME);

        {
            debug!("Emitting author {}", author);
            let mut default = GraphWriter::new(&mut dataset, GraphNameRef::DefaultGraph);
            let author = author.as_ref();
            default.add(author, TYPE, FOAF_PERSON);
            if !profile.name.is_empty() {
                default.add_label(author, FOAF_NAME, &profile.name);
            }
            default.add_label(author, FOAF_EMAIL, profile.email.trim());
            if !profile.id.is_empty() {
                default.add_label(author, id_term.as_ref(), &profile.id);
            }
            if let Some(image) = profile.image.as_deref().filter(|i| !i.is_empty()) {
                let image = parse_iri("profile.image", image)?;
                default.add(author, FOAF_DEPICTION, image.as_ref());
            }

            let version = dataset_version.as_ref();
            default.add(
                version,
                path_term.as_ref(),
                LiteralRef::new_typed_literal(&source_path, XSD_STRING),
            );
            default.add(
                version,
                hash_term.as_ref(),
                LiteralRef::new_typed_literal(&source_hash, XSD_STRING),
            );

            let np = uri.as_ref();
            default.add(np, TYPE, NP_NANOPUBLICATION);
            default.add(np, NP_HAS_ASSERTION, assertion.as_ref());
            default.add(assertion.as_ref(), TYPE, NP_ASSERTION);
            default.add(np, NP_HAS_PROVENANCE, provenance.as_ref());
            default.add(provenance.as_ref(), TYPE, NP_PROVENANCE);
            default.add(np, NP_HAS_PUBLICATION_INFO, pubinfo.as_ref());
            default.add(pubinfo.as_ref(), TYPE, NP_PUBLICATION_INFO);
        }

        {
            debug!("Emitting provenance graph {}", provenance);
            let mut graph = GraphWriter::new(&mut dataset, provenance.as_ref().into());
            graph.add(
                assertion.as_ref(),
                PROV_WAS_DERIVED_FROM,
                dataset_version.as_ref(),
            );
            graph.add(
                dataset_iri.as_ref(),
                PROV_WAS_DERIVED_FROM,
                dataset_version.as_ref(),
            );
            graph.add(assertion.as_ref(), PROV_GENERATED_AT_TIME, generated_at);
            graph.add(assertion.as_ref(), PROV_WAS_ATTRIBUTED_TO, author.as_ref());
        }

        {
            debug!("Emitting publication info graph {}", pubinfo);
            let mut graph = GraphWriter::new(&mut dataset, pubinfo.as_ref().into());
            graph.add(uri.as_ref(), PROV_WAS_GENERATED_BY, tool.as_ref());
            graph.add(uri.as_ref(), PROV_GENERATED_AT_TIME, generated_at);
            graph.add(uri.as_ref(), PROV_WAS_ATTRIBUTED_TO, author.as_ref());
        }

        debug!("Emitting assertion graph {}", assertion);
        let description = DatasetDescription {
            name: &dataset_name,
            iri: dataset_iri.as_ref(),
        };
        emit_structure_definition(
            &mut dataset,
            assertion.as_ref(),
            &description,
            &self.variables,
        )?;

        info!(
            "Built nanopublication {} with {} quads",
            uri,
            dataset.len()
        );
        Ok(Nanopublication {
            dataset,
            uri,
            assertion,
            provenance,
            pubinfo,
            dataset_uri: dataset_iri,
            dataset_version,
            author,
            timestamp,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, InputError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(InputError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{Literal, QuadRef, TermRef};

    fn builder(config: &Config) -> NanopublicationBuilder<'_> {
        let mut profile = AuthorProfile::new("Jane Doe", "jane@example.org");
        profile.id = "1234".to_string();
        profile.image = Some("http://example.org/jane.png".to_string());
        Nanopublication::builder(config)
            .profile(profile)
            .dataset_name("census")
            .dataset_uri("http://example.org/resource/census")
            .source_path("data/census.csv")
            .source_hash("3f786850e387550fdab836ed7e6dc881de23001b")
            .timestamp(Utc.with_ymd_and_hms(2016, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_graph_identifiers() {
        let config = Config::default();
        let np = builder(&config).build().unwrap();
        let hash_part = "3f786850e387550fdab836ed7e6dc881de23001b/2016-03-01T12:00:00.000000Z";
        assert_eq!(
            np.assertion().as_str(),
            format!("http://example.org/resource/census/assertion/{hash_part}")
        );
        assert_eq!(
            np.provenance().as_str(),
            format!("http://example.org/resource/census/provenance/{hash_part}")
        );
        assert_eq!(
            np.pubinfo().as_str(),
            format!("http://example.org/resource/census/pubinfo/{hash_part}")
        );
        assert_eq!(
            np.uri().as_str(),
            format!("http://example.org/resource/census/nanopublication/{hash_part}")
        );
        assert_eq!(
            np.dataset_version().as_str(),
            "http://example.org/resource/census/3f786850e387550fdab836ed7e6dc881de23001b"
        );
    }

    #[test]
    fn test_framing_and_author() {
        let config = Config::default();
        let np = builder(&config).build().unwrap();
        let dataset = np.dataset();
        let default = GraphNameRef::DefaultGraph;
        assert!(dataset.contains(QuadRef::new(np.uri(), TYPE, NP_NANOPUBLICATION, default)));
        assert!(dataset.contains(QuadRef::new(
            np.uri(),
            NP_HAS_ASSERTION,
            np.assertion(),
            default
        )));
        assert!(dataset.contains(QuadRef::new(np.pubinfo(), TYPE, NP_PUBLICATION_INFO, default)));
        assert_eq!(
            np.author().as_str(),
            "http://data.socialhistory.org/resource/person/jane@example.org"
        );
        assert!(dataset.contains(QuadRef::new(
            np.author(),
            FOAF_EMAIL,
            LiteralRef::new_simple_literal("jane@example.org"),
            default
        )));
        let google_id = config.vocab(VOCAB_GOOGLE_ID).unwrap();
        assert!(dataset.contains(QuadRef::new(
            np.author(),
            google_id.as_ref(),
            LiteralRef::new_simple_literal("1234"),
            default
        )));
    }

    #[test]
    fn test_provenance_and_pubinfo_graphs() {
        let config = Config::default();
        let np = builder(&config).build().unwrap();
        let dataset = np.dataset();
        let provenance: GraphNameRef<'_> = np.provenance().into();
        let pubinfo: GraphNameRef<'_> = np.pubinfo().into();
        assert_eq!(dataset.quads_for_graph_name(provenance).count(), 4);
        assert_eq!(dataset.quads_for_graph_name(pubinfo).count(), 3);
        assert!(dataset.contains(QuadRef::new(
            np.dataset_uri(),
            PROV_WAS_DERIVED_FROM,
            np.dataset_version(),
            provenance
        )));
        let stamp = Literal::new_typed_literal("2016-03-01T12:00:00.000000Z", XSD_DATE_TIME);
        assert!(dataset.contains(QuadRef::new(
            np.uri(),
            PROV_GENERATED_AT_TIME,
            stamp.as_ref(),
            pubinfo
        )));
        assert!(dataset.contains(QuadRef::new(
            np.uri(),
            PROV_WAS_GENERATED_BY,
            NamedNodeRef::new(DEFAULT_TOOL_IRI).unwrap(),
            pubinfo
        )));
    }

    #[test]
    fn test_missing_email_fails_before_emission() {
        let config = Config::default();
        let err = builder(&config)
            .profile(AuthorProfile::new("Jane", " "))
            .build()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<InputError>(),
            Some(&InputError::MissingField("profile.email"))
        );
    }

    #[test]
    fn test_missing_dataset_uri() {
        let config = Config::default();
        let err = builder(&config).dataset_uri("").build().unwrap_err();
        assert_eq!(
            err.downcast_ref::<InputError>(),
            Some(&InputError::MissingField("dataset_uri"))
        );
        let err = builder(&config).dataset_uri("census").build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::InvalidIri { .. })
        ));
    }

    #[test]
    fn test_missing_profile() {
        let config = Config::default();
        let err = Nanopublication::builder(&config)
            .dataset_uri("http://example.org/ds")
            .build()
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<InputError>(),
            Some(&InputError::MissingField("profile"))
        );
    }

    #[test]
    fn test_image_is_optional() {
        let config = Config::default();
        let np = builder(&config)
            .profile(AuthorProfile::new("Jane", "jane@example.org"))
            .build()
            .unwrap();
        assert!(!np.dataset().iter().any(|q| q.predicate == FOAF_DEPICTION));
    }

    #[test]
    fn test_to_trig_uses_configured_prefixes() {
        let config = Config::default();
        let np = builder(&config).build().unwrap();
        let text = np.to_trig(&config).unwrap();
        assert!(text.contains("@prefix qbrv: <http://data.socialhistory.org/vocab/> ."));
        assert!(text.contains("qbrv:sha1_hash"));
        assert!(text.contains(&format!("GRAPH <{}> {{", np.assertion().as_str())));
        assert!(!text.contains(&format!("GRAPH <{}>", np.uri().as_str())));
        let object = TermRef::from(np.dataset_version());
        assert!(np.dataset().iter().any(|q| q.object == object));
    }
}
