//! Talking to the SPARQL store nanopublications are published to.
//!
//! The HTTP side lives in [`SparqlClient`]; everything built on top of it (publishing,
//! listing, deletion) is written against the [`QueryEndpoint`] and [`UpdateEndpoint`] traits
//! so it can run against any store.

use crate::config::Config;
use crate::consts::{NP_NS, PROV_NS, QB_NS, RDFS_NS, RDF_NS, SKOS_NS};
use crate::errors::{InputError, TransportError};
use crate::iri::parse_iri;
use crate::nanopub::Nanopublication;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use oxigraph::model::{Dataset, GraphNameRef, NamedNode};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::time::Duration;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// One solution of a SELECT query, variable name to lexical value.
pub type Row = BTreeMap<String, String>;

pub trait QueryEndpoint {
    /// Runs a query and returns the raw SPARQL JSON results document.
    fn query(&self, query: &str) -> Result<String>;
}

pub trait UpdateEndpoint: Sync {
    fn update(&self, update: &str) -> Result<()>;
}

/// Blocking HTTP client for a SPARQL 1.1 protocol service.
pub struct SparqlClient {
    client: Client,
    query_url: String,
    update_url: String,
    credentials: Option<(String, Option<String>)>,
}

impl SparqlClient {
    pub fn new(query_url: &str, update_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            query_url: query_url.to_string(),
            update_url: update_url.to_string(),
            credentials: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let query_url = config
            .query_endpoint()
            .ok_or_else(|| anyhow!("No SPARQL endpoint configured (set endpoint_url)"))?;
        let update_url = config.update_endpoint().unwrap_or(query_url);
        let mut client = Self::new(
            query_url,
            update_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        if let Some((user, password)) = config.credentials() {
            client = client.with_credentials(user, password);
        }
        Ok(client)
    }

    pub fn with_credentials(mut self, user: &str, password: Option<&str>) -> Self {
        self.credentials = Some((user.to_string(), password.map(str::to_string)));
        self
    }

    pub fn query_url(&self) -> &str {
        &self.query_url
    }

    pub fn update_url(&self) -> &str {
        &self.update_url
    }

    fn post(&self, url: &str, field: &str, body: &str) -> Result<String> {
        let mut request = self
            .client
            .post(url)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[(field, body)]);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_ref());
        }
        let response = request.send().map_err(|e| TransportError {
            url: url.to_string(),
            status: None,
            message: e.to_string(),
        })?;
        let status = response.status();
        let text = response.text().map_err(|e| TransportError {
            url: url.to_string(),
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(TransportError {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: text,
            }
            .into());
        }
        Ok(text)
    }

    pub fn select(&self, query: &str) -> Result<Vec<Row>> {
        select(self, query)
    }

    pub fn ask(&self, query: &str) -> Result<bool> {
        ask(self, query)
    }

    pub fn publish(&self, nanopub: &Nanopublication) -> Result<()> {
        publish(self, nanopub)
    }

    pub fn list_datasets(&self) -> Result<Vec<DatasetListing>> {
        list_datasets(self)
    }

    pub fn delete_nanopublication(&self, uri: &str) -> Result<Option<DeletionReport>> {
        delete_nanopublication(self, uri)
    }

    pub fn get_definition(&self, uri: &str) -> Result<Option<PropertyDefinition>> {
        get_definition(self, uri)
    }

    pub fn get_concepts(&self, scheme: &str) -> Result<Vec<Concept>> {
        get_concepts(self, scheme)
    }

    pub fn get_schemes(&self) -> Result<Vec<LabelledResource>> {
        get_schemes(self)
    }

    pub fn get_dimensions(&self) -> Result<Vec<LabelledResource>> {
        get_dimensions(self)
    }
}

impl QueryEndpoint for SparqlClient {
    fn query(&self, query: &str) -> Result<String> {
        debug!("Querying {}", self.query_url);
        self.post(&self.query_url, "query", query)
    }
}

impl UpdateEndpoint for SparqlClient {
    fn update(&self, update: &str) -> Result<()> {
        debug!("Updating {}", self.update_url);
        self.post(&self.update_url, "update", update)?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ResultsDocument {
    #[serde(default)]
    results: Option<Bindings>,
    #[serde(default)]
    boolean: Option<bool>,
}

#[derive(Deserialize)]
struct Bindings {
    bindings: Vec<HashMap<String, Binding>>,
}

#[derive(Deserialize)]
struct Binding {
    value: String,
}

/// Parses a SPARQL JSON results document into rows. Unbound variables are absent from a row.
pub fn parse_results(json: &str) -> Result<Vec<Row>> {
    let document: ResultsDocument =
        serde_json::from_str(json).context("Malformed SPARQL JSON results")?;
    let bindings = document
        .results
        .ok_or_else(|| anyhow!("SPARQL JSON results have no bindings"))?;
    Ok(bindings
        .bindings
        .into_iter()
        .map(|solution| {
            solution
                .into_iter()
                .map(|(var, binding)| (var, binding.value))
                .collect()
        })
        .collect())
}

pub fn parse_boolean(json: &str) -> Result<bool> {
    let document: ResultsDocument =
        serde_json::from_str(json).context("Malformed SPARQL JSON results")?;
    document
        .boolean
        .ok_or_else(|| anyhow!("SPARQL JSON results have no boolean"))
}

pub fn select<E: QueryEndpoint + ?Sized>(endpoint: &E, query: &str) -> Result<Vec<Row>> {
    parse_results(&endpoint.query(query)?)
}

pub fn ask<E: QueryEndpoint + ?Sized>(endpoint: &E, query: &str) -> Result<bool> {
    parse_boolean(&endpoint.query(query)?)
}

/// `INSERT DATA` for the triples of one graph, `None` when the graph is empty.
pub fn insert_data_query(dataset: &Dataset, graph: GraphNameRef<'_>) -> Result<Option<String>> {
    let mut body = String::new();
    for quad in dataset.quads_for_graph_name(graph) {
        writeln!(body, "    {} {} {} .", quad.subject, quad.predicate, quad.object)?;
    }
    if body.is_empty() {
        return Ok(None);
    }
    Ok(Some(match graph {
        GraphNameRef::DefaultGraph => format!("INSERT DATA {{\n{body}}}"),
        named => format!("INSERT DATA {{ GRAPH {named} {{\n{body}}} }}"),
    }))
}

/// Parses an IRI that is about to be written into a query. Anything that is not a single
/// absolute IRI is rejected, so it cannot alter the structure of the query.
fn query_iri(field: &str, value: &str) -> Result<NamedNode, InputError> {
    parse_iri(field, value.trim())
}

pub fn clear_graph_query(graph: &str) -> Result<String, InputError> {
    Ok(format!("CLEAR SILENT GRAPH {}", query_iri("graph", graph)?))
}

/// Removes the framing triples of a nanopublication from the default graph.
pub fn delete_publication_query(uri: &str) -> Result<String, InputError> {
    let uri = query_iri("nanopublication", uri)?;
    Ok(format!(
        "PREFIX np: <{NP_NS}>
DELETE WHERE {{
    {uri} a np:Nanopublication ;
        np:hasAssertion ?assertion_uri ;
        np:hasPublicationInfo ?pubinfo_uri ;
        np:hasProvenance ?provenance_uri .
    ?assertion_uri a np:Assertion .
    ?pubinfo_uri a np:PublicationInfo .
    ?provenance_uri a np:Provenance .
}}"
    ))
}

pub fn find_graphs_query(uri: &str) -> Result<String, InputError> {
    let uri = query_iri("nanopublication", uri)?;
    Ok(format!(
        "PREFIX np: <{NP_NS}>
SELECT DISTINCT ?assertion_uri ?pubinfo_uri ?provenance_uri WHERE {{
    {uri} a np:Nanopublication ;
        np:hasAssertion ?assertion_uri ;
        np:hasPublicationInfo ?pubinfo_uri ;
        np:hasProvenance ?provenance_uri .
}}"
    ))
}

pub fn list_datasets_query() -> String {
    format!(
        "PREFIX rdf: <{RDF_NS}>
PREFIX rdfs: <{RDFS_NS}>
PREFIX np: <{NP_NS}>
PREFIX qb: <{QB_NS}>
PREFIX prov: <{PROV_NS}>
SELECT DISTINCT ?uri ?label ?owner ?nanopublication WHERE {{
    ?nanopublication a np:Nanopublication ;
        np:hasAssertion ?assertion_uri ;
        np:hasPublicationInfo ?pubinfo_uri .
    GRAPH ?assertion_uri {{
        ?uri a qb:DataSet ;
            rdfs:label ?label .
    }}
    GRAPH ?pubinfo_uri {{
        ?nanopublication prov:wasAttributedTo ?owner .
    }}
}}"
    )
}

/// Sends every graph of the nanopublication, the default graph first.
pub fn publish<E: UpdateEndpoint + ?Sized>(endpoint: &E, nanopub: &Nanopublication) -> Result<()> {
    info!("Publishing nanopublication {}", nanopub.uri());
    let dataset = nanopub.dataset();
    let mut graphs = vec![GraphNameRef::DefaultGraph];
    graphs.extend(nanopub.graphs().into_iter().map(GraphNameRef::from));
    for graph in graphs {
        if let Some(update) = insert_data_query(dataset, graph)? {
            endpoint
                .update(&update)
                .with_context(|| format!("Failed to publish graph {}", graph))?;
        }
    }
    Ok(())
}

/// A dataset structure definition found in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetListing {
    pub uri: String,
    pub label: String,
    pub owner: String,
    pub nanopublication: String,
}

pub fn list_datasets<E: QueryEndpoint + ?Sized>(endpoint: &E) -> Result<Vec<DatasetListing>> {
    let rows = select(endpoint, &list_datasets_query())?;
    let mut listings = Vec::with_capacity(rows.len());
    for mut row in rows {
        listings.push(DatasetListing {
            uri: take(&mut row, "uri", "Dataset listing")?,
            label: take(&mut row, "label", "Dataset listing")?,
            owner: take(&mut row, "owner", "Dataset listing")?,
            nanopublication: take(&mut row, "nanopublication", "Dataset listing")?,
        });
    }
    debug!("Found {} datasets", listings.len());
    Ok(listings)
}

fn take(row: &mut Row, var: &str, what: &str) -> Result<String> {
    row.remove(var)
        .ok_or_else(|| anyhow!("{} is missing ?{}", what, var))
}

pub fn definition_exists_query(uri: &str) -> Result<String, InputError> {
    let uri = query_iri("property", uri)?;
    Ok(format!(
        "PREFIX rdfs: <{RDFS_NS}>
ASK {{ {uri} rdfs:label ?label . }}"
    ))
}

pub fn definition_query(uri: &str) -> Result<String, InputError> {
    let uri = query_iri("property", uri)?;
    Ok(format!(
        "PREFIX rdfs: <{RDFS_NS}>
PREFIX qb: <{QB_NS}>
SELECT ?type ?label ?description WHERE {{
    OPTIONAL {{ {uri} rdfs:label ?label . }}
    OPTIONAL {{ {uri} rdfs:comment ?description . }}
    OPTIONAL {{
        {uri} a qb:DimensionProperty .
        BIND(qb:DimensionProperty AS ?type)
    }}
    OPTIONAL {{
        {uri} a qb:MeasureProperty .
        BIND(qb:MeasureProperty AS ?type)
    }}
    OPTIONAL {{
        {uri} a qb:AttributeProperty .
        BIND(qb:AttributeProperty AS ?type)
    }}
}}"
    ))
}

pub fn definition_codelist_query(uri: &str) -> Result<String, InputError> {
    let uri = query_iri("property", uri)?;
    Ok(format!(
        "PREFIX rdfs: <{RDFS_NS}>
PREFIX qb: <{QB_NS}>
SELECT DISTINCT ?uri ?label WHERE {{
    {uri} a qb:CodedProperty ;
        qb:codeList ?uri .
    ?uri rdfs:label ?label .
}}"
    ))
}

/// Concepts of a scheme: members of a `skos:ConceptScheme` or, transitively, of a
/// `skos:Collection`.
pub fn concepts_query(scheme: &str) -> Result<String, InputError> {
    let scheme = query_iri("scheme", scheme)?;
    Ok(format!(
        "PREFIX skos: <{SKOS_NS}>
SELECT DISTINCT ?uri ?label ?notation WHERE {{
    {{ ?uri skos:inScheme {scheme} . }}
    UNION
    {{ {scheme} skos:member+ ?uri . }}
    ?uri skos:prefLabel ?label .
    OPTIONAL {{ ?uri skos:notation ?notation . }}
}}"
    ))
}

pub fn schemes_query() -> String {
    format!(
        "PREFIX rdfs: <{RDFS_NS}>
PREFIX skos: <{SKOS_NS}>
SELECT DISTINCT ?uri ?label WHERE {{
    {{
        ?concept skos:inScheme ?uri .
        ?uri rdfs:label ?label .
    }}
    UNION
    {{
        ?uri skos:member ?concept .
        ?uri rdfs:label ?label .
    }}
}}"
    )
}

pub fn dimensions_query() -> String {
    format!(
        "PREFIX rdf: <{RDF_NS}>
PREFIX rdfs: <{RDFS_NS}>
PREFIX qb: <{QB_NS}>
SELECT DISTINCT ?uri ?label WHERE {{
    {{ ?uri a qb:DimensionProperty . }}
    UNION
    {{ ?uri a qb:MeasureProperty . }}
    UNION
    {{ ?uri a qb:AttributeProperty . }}
    ?uri rdfs:label ?label .
}}"
    )
}

/// A resource and its label, as offered to the user to pick from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelledResource {
    pub uri: String,
    pub label: String,
}

/// What the store knows about a component property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub uri: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codelist: Option<LabelledResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub uri: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notation: Option<String>,
}

fn labelled_resources(rows: Vec<Row>, what: &str) -> Result<Vec<LabelledResource>> {
    let mut resources = Vec::with_capacity(rows.len());
    for mut row in rows {
        resources.push(LabelledResource {
            uri: take(&mut row, "uri", what)?,
            label: take(&mut row, "label", what)?,
        });
    }
    Ok(resources)
}

/// Looks up the definition of a property. Returns `None` when the store has no label for it;
/// only the first codelist is reported.
pub fn get_definition<E: QueryEndpoint + ?Sized>(
    endpoint: &E,
    uri: &str,
) -> Result<Option<PropertyDefinition>> {
    let uri = uri.trim();
    if !ask(endpoint, &definition_exists_query(uri)?)? {
        debug!("No definition of {} in the store", uri);
        return Ok(None);
    }
    let mut row = select(endpoint, &definition_query(uri)?)?
        .into_iter()
        .next()
        .unwrap_or_default();
    let codelist = labelled_resources(
        select(endpoint, &definition_codelist_query(uri)?)?,
        "Codelist",
    )?
    .into_iter()
    .next();
    if codelist.is_none() {
        debug!("No codelist for {}", uri);
    }
    Ok(Some(PropertyDefinition {
        uri: uri.to_string(),
        component_type: row.remove("type"),
        label: row.remove("label"),
        description: row.remove("description"),
        codelist,
    }))
}

pub fn get_concepts<E: QueryEndpoint + ?Sized>(endpoint: &E, scheme: &str) -> Result<Vec<Concept>> {
    let rows = select(endpoint, &concepts_query(scheme)?)?;
    let mut concepts = Vec::with_capacity(rows.len());
    for mut row in rows {
        concepts.push(Concept {
            uri: take(&mut row, "uri", "Concept")?,
            label: take(&mut row, "label", "Concept")?,
            notation: row.remove("notation"),
        });
    }
    debug!("Found {} concepts in {}", concepts.len(), scheme.trim());
    Ok(concepts)
}

/// Concept schemes and collections, ordered by label.
pub fn get_schemes<E: QueryEndpoint + ?Sized>(endpoint: &E) -> Result<Vec<LabelledResource>> {
    let mut schemes = labelled_resources(select(endpoint, &schemes_query())?, "Scheme")?;
    schemes.sort_by(|a, b| (&a.label, &a.uri).cmp(&(&b.label, &b.uri)));
    schemes.dedup();
    Ok(schemes)
}

/// Dimension, measure and attribute properties, ordered by label.
pub fn get_dimensions<E: QueryEndpoint + ?Sized>(endpoint: &E) -> Result<Vec<LabelledResource>> {
    let mut dimensions = labelled_resources(select(endpoint, &dimensions_query())?, "Dimension")?;
    dimensions.sort_by(|a, b| (&a.label, &a.uri).cmp(&(&b.label, &b.uri)));
    dimensions.dedup();
    Ok(dimensions)
}

/// Outcome of deleting a nanopublication: which operations succeeded and which did not.
#[derive(Debug, Default)]
pub struct DeletionReport {
    pub nanopublication: String,
    pub completed: Vec<String>,
    pub failures: Vec<(String, anyhow::Error)>,
}

impl DeletionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Clears the three graphs of a nanopublication and removes its framing triples.
///
/// The four updates are independent and run concurrently; all of them are awaited before
/// the report is returned. Returns `None` when the store holds no such nanopublication.
pub fn delete_nanopublication<E>(endpoint: &E, uri: &str) -> Result<Option<DeletionReport>>
where
    E: QueryEndpoint + UpdateEndpoint + ?Sized,
{
    let uri = uri.trim();
    let rows = select(endpoint, &find_graphs_query(uri)?)?;
    let Some(row) = rows.into_iter().next() else {
        info!("No nanopublication found for {}", uri);
        return Ok(None);
    };

    let mut operations = Vec::with_capacity(4);
    for var in ["assertion_uri", "provenance_uri", "pubinfo_uri"] {
        let graph = row
            .get(var)
            .ok_or_else(|| anyhow!("Nanopublication {} is missing ?{}", uri, var))?;
        operations.push((format!("clear {}", graph), clear_graph_query(graph)?));
    }
    operations.push((format!("delete {}", uri), delete_publication_query(uri)?));

    let results: Vec<(String, Result<()>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = operations
            .iter()
            .map(|(label, update)| {
                debug!("Starting {}", label);
                (label, scope.spawn(move || endpoint.update(update)))
            })
            .collect();
        handles
            .into_iter()
            .map(|(label, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("Update thread panicked")));
                (label.clone(), result)
            })
            .collect()
    });

    let mut report = DeletionReport {
        nanopublication: uri.to_string(),
        ..Default::default()
    };
    for (label, result) in results {
        match result {
            Ok(()) => report.completed.push(label),
            Err(e) => {
                warn!("Failed to {}: {}", label, e);
                report.failures.push((label, e));
            }
        }
    }
    Ok(Some(report))
}
