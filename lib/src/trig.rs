//! TriG serialization of a multi-graph dataset.
//!
//! Every graph is written with oxigraph's Turtle serializer. The default graph goes at the top
//! level, every named graph is indented and wrapped in a `GRAPH <g> { ... }` block. Triples
//! are sorted before serialization, so a dataset always serializes to the same text.

use crate::consts::STANDARD_PREFIXES;
use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{Dataset, GraphNameRef, NamedNode, TripleRef};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::Write;

lazy_static! {
    static ref PREFIX_NAME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_\-]*$").unwrap();
}

const INDENT: &str = "    ";

#[derive(Debug, Clone)]
pub struct TrigSerializer {
    prefixes: Vec<(String, String)>,
}

impl Default for TrigSerializer {
    fn default() -> Self {
        Self {
            prefixes: STANDARD_PREFIXES
                .iter()
                .map(|(p, ns)| (p.to_string(), ns.to_string()))
                .collect(),
        }
    }
}

impl TrigSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an additional prefix. A prefix that is already declared is rebound.
    pub fn with_prefix(mut self, prefix: &str, namespace: &str) -> Result<Self> {
        if !PREFIX_NAME.is_match(prefix) {
            return Err(anyhow!("Invalid prefix name: {prefix}"));
        }
        NamedNode::new(namespace)
            .with_context(|| format!("Invalid IRI for prefix {prefix}: {namespace}"))?;
        self.prefixes.retain(|(p, _)| p != prefix);
        self.prefixes.push((prefix.to_string(), namespace.to_string()));
        Ok(self)
    }

    /// Serializes the whole dataset. Any failure aborts the document as a whole.
    pub fn serialize(&self, dataset: &Dataset) -> Result<String> {
        let mut out = String::new();
        for (prefix, namespace) in &self.prefixes {
            writeln!(out, "@prefix {prefix}: <{namespace}> .")?;
        }
        out.push('\n');

        let default_graph = self
            .serialize_graph(dataset, GraphNameRef::DefaultGraph)
            .context("Failed to serialize the default graph")?;
        if !default_graph.is_empty() {
            out.push_str(&default_graph);
            out.push('\n');
        }

        for graph_name in graph_names(dataset) {
            let body = self
                .serialize_graph(dataset, graph_name)
                .with_context(|| format!("Failed to serialize graph {}", graph_name))?;
            writeln!(out, "GRAPH {} {{", graph_name)?;
            for line in body.lines() {
                if line.is_empty() {
                    out.push('\n');
                } else {
                    writeln!(out, "{INDENT}{line}")?;
                }
            }
            out.push_str("}\n\n");
        }
        Ok(out)
    }

    /// Turtle for the triples of one graph, without prefix declarations (those are written
    /// once at the top of the document, where TriG allows them).
    fn serialize_graph(&self, dataset: &Dataset, graph_name: GraphNameRef<'_>) -> Result<String> {
        let mut triples: Vec<(String, TripleRef<'_>)> = dataset
            .quads_for_graph_name(graph_name)
            .map(|q| {
                let triple = TripleRef::new(q.subject, q.predicate, q.object);
                (triple.to_string(), triple)
            })
            .collect();
        if triples.is_empty() {
            return Ok(String::new());
        }
        triples.sort_by(|a, b| a.0.cmp(&b.0));

        let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle);
        for (prefix, namespace) in &self.prefixes {
            serializer = serializer
                .with_prefix(prefix.as_str(), namespace.as_str())
                .with_context(|| format!("Invalid IRI for prefix {prefix}: {namespace}"))?;
        }
        let mut writer = serializer.for_writer(Vec::new());
        for (_, triple) in triples {
            writer.serialize_triple(triple)?;
        }
        let turtle = String::from_utf8(writer.finish()?)?;

        let mut out = String::new();
        for line in turtle.lines() {
            let directive = line.trim_start();
            if directive.starts_with("@prefix") || directive.starts_with("PREFIX") {
                continue;
            }
            if line.trim().is_empty() && out.is_empty() {
                continue;
            }
            writeln!(out, "{line}")?;
        }
        Ok(out)
    }
}

/// Named graphs of the dataset, ordered by their textual form.
fn graph_names(dataset: &Dataset) -> Vec<GraphNameRef<'_>> {
    let mut names: BTreeMap<String, GraphNameRef<'_>> = BTreeMap::new();
    for quad in dataset.iter() {
        if !quad.graph_name.is_default_graph() {
            names
                .entry(quad.graph_name.to_string())
                .or_insert(quad.graph_name);
        }
    }
    names.into_values().collect()
}

/// Serializes a dataset with the standard prefixes.
pub fn serialize_trig(dataset: &Dataset) -> Result<String> {
    TrigSerializer::default().serialize(dataset)
}

/// Parses a TriG document back into a dataset.
pub fn parse_trig(text: &str) -> Result<Dataset> {
    let mut dataset = Dataset::new();
    for quad in RdfParser::from_format(RdfFormat::TriG).for_reader(text.as_bytes()) {
        dataset.insert(&quad?);
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{LABEL, QB_DATASET, TYPE, XSD_DATE_TIME};
    use oxigraph::model::{BlankNode, Literal, Quad};

    fn sample() -> Dataset {
        let mut dataset = Dataset::new();
        let s = NamedNode::new("http://example.org/ds").unwrap();
        let g = NamedNode::new("http://example.org/ds/assertion/abc/2020-01-01T00:00:00Z").unwrap();
        dataset.insert(&Quad::new(
            s.clone(),
            TYPE.into_owned(),
            QB_DATASET.into_owned(),
            g.clone(),
        ));
        dataset.insert(&Quad::new(
            s.clone(),
            LABEL.into_owned(),
            Literal::new_simple_literal("A \"quoted\"\nlabel"),
            g.clone(),
        ));
        dataset.insert(&Quad::new(
            s.clone(),
            LABEL.into_owned(),
            Literal::new_language_tagged_literal("volkstelling", "nl").unwrap(),
            g,
        ));
        dataset.insert(&Quad::new(
            s.clone(),
            NamedNode::new("http://www.w3.org/ns/prov#generatedAtTime").unwrap(),
            Literal::new_typed_literal("2020-01-01T00:00:00Z", XSD_DATE_TIME),
            oxigraph::model::GraphName::DefaultGraph,
        ));
        dataset
    }

    #[test]
    fn test_graph_blocks() {
        let text = serialize_trig(&sample()).unwrap();
        assert!(text.starts_with("@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> ."));
        assert_eq!(text.matches("@prefix rdf:").count(), 1);
        assert!(text.contains(
            "GRAPH <http://example.org/ds/assertion/abc/2020-01-01T00:00:00Z> {\n    <http://example.org/ds> a qb:DataSet"
        ));
        assert!(text.contains("\"volkstelling\"@nl"));

        // every line of the block is indented
        let block: Vec<&str> = text
            .lines()
            .skip_while(|l| !l.starts_with("GRAPH "))
            .skip(1)
            .take_while(|l| *l != "}")
            .collect();
        assert!(!block.is_empty());
        assert!(block.iter().all(|l| l.is_empty() || l.starts_with("    ")));

        // the default graph is not wrapped in a block
        let default_line = text
            .lines()
            .find(|l| l.contains("prov:generatedAtTime"))
            .unwrap();
        assert!(default_line.starts_with("<http://example.org/ds>"));
        assert!(default_line.contains("\"2020-01-01T00:00:00Z\"^^"));
    }

    #[test]
    fn test_roundtrip() {
        let dataset = sample();
        let text = serialize_trig(&dataset).unwrap();
        let parsed = parse_trig(&text).unwrap();
        assert_eq!(parsed, dataset);
    }

    #[test]
    fn test_blank_node_graph_roundtrip() {
        let mut dataset = Dataset::new();
        let g = BlankNode::new("g1").unwrap();
        dataset.insert(&Quad::new(
            NamedNode::new("http://example.org/a").unwrap(),
            LABEL.into_owned(),
            Literal::new_simple_literal("a"),
            g,
        ));
        let parsed = parse_trig(&serialize_trig(&dataset).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed.iter().all(|q| matches!(q.graph_name, GraphNameRef::BlankNode(_))));
    }

    #[test]
    fn test_deterministic_output() {
        let a = serialize_trig(&sample()).unwrap();
        let b = serialize_trig(&sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_with_prefix() {
        let serializer = TrigSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .unwrap();
        let text = serializer.serialize(&sample()).unwrap();
        assert!(text.contains("ex:ds a qb:DataSet"));
        assert!(TrigSerializer::new().with_prefix("1x", "http://example.org/").is_err());
        assert!(TrigSerializer::new().with_prefix("ex", "not an iri").is_err());
    }

    #[test]
    fn test_unsafe_local_names_are_not_abbreviated() {
        let serializer = TrigSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .unwrap();
        let text = serializer.serialize(&sample()).unwrap();
        assert!(text.contains("GRAPH <http://example.org/ds/assertion/abc/2020-01-01T00:00:00Z>"));
    }

    #[test]
    fn test_empty_dataset() {
        let text = serialize_trig(&Dataset::new()).unwrap();
        assert!(!text.contains("GRAPH"));
        assert!(parse_trig(&text).unwrap().is_empty());
    }
}
