//! Emits the Data Cube data structure definition of a dataset into the assertion graph of a
//! nanopublication.
//!
//! Every variable becomes a component of the structure. Edits made by the user never replace
//! the original identities: a specialized variable is linked to the property it refines with
//! `rdfs:subPropertyOf`, a remapped value with `skos:exactMatch`, a derived codelist with
//! `prov:wasDerivedFrom`.

use crate::consts::*;
use crate::iri::{mint, namespace_of};
use crate::model::{Category, ComponentType, Value, Variable, Variables};
use anyhow::Result;
use log::debug;
use oxigraph::model::{
    Dataset, GraphNameRef, LiteralRef, NamedNode, NamedNodeRef, QuadRef, TermRef,
};

/// Writes triples into a single named graph of a dataset.
pub struct GraphWriter<'a> {
    dataset: &'a mut Dataset,
    graph: GraphNameRef<'a>,
}

impl<'a> GraphWriter<'a> {
    pub fn new(dataset: &'a mut Dataset, graph: GraphNameRef<'a>) -> Self {
        Self { dataset, graph }
    }

    pub fn add<'b>(
        &mut self,
        subject: NamedNodeRef<'b>,
        predicate: NamedNodeRef<'b>,
        object: impl Into<TermRef<'b>>,
    ) where
        'a: 'b,
    {
        self.dataset
            .insert(QuadRef::new(subject, predicate, object, self.graph));
    }

    pub fn add_label(&mut self, subject: NamedNodeRef<'_>, predicate: NamedNodeRef<'_>, label: &str) {
        self.add(subject, predicate, LiteralRef::new_simple_literal(label));
    }
}

/// Identity of the dataset whose structure is described.
#[derive(Debug, Clone)]
pub struct DatasetDescription<'a> {
    pub name: &'a str,
    pub iri: NamedNodeRef<'a>,
}

impl DatasetDescription<'_> {
    /// The namespace resources of this dataset are minted in, `{dataset iri}/`.
    pub fn namespace(&self) -> String {
        namespace_of(self.iri.as_str())
    }

    pub fn structure_iri(&self) -> Result<NamedNode> {
        Ok(mint(&self.namespace(), "structure")?)
    }

    /// The component IRI is minted from the original label so that it stays stable when the
    /// user relabels the variable.
    pub fn component_iri(&self, variable: &Variable) -> Result<NamedNode> {
        Ok(mint(
            &self.namespace(),
            &format!("component/{}", variable.original.label),
        )?)
    }
}

/// Emits the structure definition for `variables` into `assertion`.
///
/// The variables are validated first; nothing is written when any of them is malformed.
/// Emission is deterministic, so two runs over the same input produce the same set of triples.
pub fn emit_structure_definition(
    dataset: &mut Dataset,
    assertion: NamedNodeRef<'_>,
    description: &DatasetDescription<'_>,
    variables: &Variables,
) -> Result<()> {
    variables.validate()?;
    let structure = description.structure_iri()?;
    let components = variables
        .iter()
        .map(|(_, variable)| description.component_iri(variable))
        .collect::<Result<Vec<_>>>()?;
    let mut graph = GraphWriter::new(dataset, assertion.into());

    graph.add(description.iri, TYPE, QB_DATASET);
    graph.add_label(description.iri, LABEL, description.name);
    graph.add(structure.as_ref(), TYPE, QB_DATA_STRUCTURE_DEFINITION);
    graph.add(description.iri, QB_STRUCTURE, structure.as_ref());

    for ((id, variable), component) in variables.iter().zip(components) {
        debug!(
            "Emitting {} {:?} variable '{}'",
            variable.category, variable.component_type, id
        );
        emit_variable(&mut graph, structure.as_ref(), component.as_ref(), variable);
    }
    Ok(())
}

fn emit_variable(
    graph: &mut GraphWriter<'_>,
    structure: NamedNodeRef<'_>,
    component: NamedNodeRef<'_>,
    variable: &Variable,
) {
    let property = variable.iri();
    let property = property.as_ref();

    graph.add(structure, QB_COMPONENT, component);
    graph.add_label(property, LABEL, &variable.label);
    if let Some(description) = variable.description() {
        graph.add_label(property, COMMENT, description);
    }
    if variable.is_specialized() {
        let original = variable.original_iri();
        graph.add(property, SUB_PROPERTY_OF, original.as_ref());
    }

    graph.add(property, TYPE, variable.component_type.iri());
    match variable.component_type {
        ComponentType::Dimension => {
            graph.add(component, QB_DIMENSION, property);
            if variable.category == Category::Coded {
                graph.add(property, TYPE, QB_CODED_PROPERTY);
            }
        }
        ComponentType::Measure => graph.add(component, QB_MEASURE, property),
        // not produced by the editor yet, accepted anyway
        ComponentType::Attribute => graph.add(component, QB_ATTRIBUTE, property),
    }

    match variable.category {
        Category::Coded => {
            let Some(codelist) = variable.codelist() else {
                return;
            };
            let codelist_iri = NamedNode::new_unchecked(codelist.uri.clone());
            let codelist_iri = codelist_iri.as_ref();
            graph.add(codelist_iri, TYPE, SKOS_COLLECTION);
            graph.add_label(codelist_iri, LABEL, &codelist.label);
            graph.add(property, QB_CODE_LIST, codelist_iri);
            if codelist.is_derived() {
                let source = NamedNode::new_unchecked(codelist.original.uri.clone());
                graph.add(codelist_iri, PROV_WAS_DERIVED_FROM, source.as_ref());
            }
            for value in variable.values() {
                emit_concept(graph, value, Some(codelist_iri));
            }
        }
        Category::Identifier => {
            for value in variable.values() {
                emit_concept(graph, value, None);
            }
        }
        // literal values are produced when the data itself is converted
        Category::Other => {}
    }
}

fn emit_concept(graph: &mut GraphWriter<'_>, value: &Value, collection: Option<NamedNodeRef<'_>>) {
    // the concept is the value as it occurs in the data
    let concept = NamedNode::new_unchecked(value.original.uri.clone());
    let concept = concept.as_ref();
    graph.add(concept, TYPE, SKOS_CONCEPT);
    graph.add_label(concept, SKOS_PREF_LABEL, &value.original.label);
    if let Some(collection) = collection {
        graph.add(collection, SKOS_MEMBER, concept);
    }
    if value.is_remapped() {
        let target = NamedNode::new_unchecked(value.uri.clone());
        graph.add(concept, SKOS_EXACT_MATCH, target.as_ref());
        graph.add_label(target.as_ref(), LABEL, &value.label);
    }
}
