//! Input records describing the columns of an annotated dataset.
//!
//! The records mirror the JSON the annotation editor sends: every variable, value and
//! codelist carries the `original` identity derived from the source file next to the
//! (possibly edited) `uri`/`label` chosen by the user.

use crate::consts::{QB_ATTRIBUTE_PROPERTY, QB_DIMENSION_PROPERTY, QB_MEASURE_PROPERTY};
use crate::errors::InputError;
use crate::iri::parse_iri;
use log::debug;
use oxigraph::model::{NamedNode, NamedNodeRef};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

// labels coming out of a spreadsheet are frequently numbers
fn label_de<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number as label, found {}",
            other
        ))),
    }
}

/// Identity of a resource as it was first derived from the source file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Original {
    pub uri: String,
    #[serde(deserialize_with = "label_de")]
    pub label: String,
}

impl Original {
    pub fn new(uri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            label: label.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Coded,
    Identifier,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Category::Coded => write!(f, "coded"),
            Category::Identifier => write!(f, "identifier"),
            Category::Other => write!(f, "other"),
        }
    }
}

/// The Data Cube component property class a variable is declared as.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    #[serde(rename = "http://purl.org/linked-data/cube#DimensionProperty")]
    Dimension,
    #[serde(rename = "http://purl.org/linked-data/cube#MeasureProperty")]
    Measure,
    #[serde(rename = "http://purl.org/linked-data/cube#AttributeProperty")]
    Attribute,
}

impl ComponentType {
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            ComponentType::Dimension => QB_DIMENSION_PROPERTY,
            ComponentType::Measure => QB_MEASURE_PROPERTY,
            ComponentType::Attribute => QB_ATTRIBUTE_PROPERTY,
        }
    }
}

/// One distinct value of a coded or identifier variable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub original: Original,
    pub uri: String,
    #[serde(deserialize_with = "label_de")]
    pub label: String,
    /// Occurrence frequency in the source file. Never asserted into a graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl Value {
    /// A value that has not been edited: current identity equals the original.
    pub fn unchanged(uri: impl Into<String>, label: impl Into<String>) -> Self {
        let original = Original::new(uri, label);
        Self {
            uri: original.uri.clone(),
            label: original.label.clone(),
            original,
            count: None,
        }
    }

    pub fn is_remapped(&self) -> bool {
        self.uri != self.original.uri
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Codelist {
    pub original: Original,
    pub uri: String,
    #[serde(deserialize_with = "label_de")]
    pub label: String,
}

impl Codelist {
    pub fn unchanged(uri: impl Into<String>, label: impl Into<String>) -> Self {
        let original = Original::new(uri, label);
        Self {
            uri: original.uri.clone(),
            label: original.label.clone(),
            original,
        }
    }

    pub fn is_derived(&self) -> bool {
        self.uri != self.original.uri
    }
}

/// A column of the dataset being annotated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub original: Original,
    pub uri: String,
    #[serde(deserialize_with = "label_de")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: Category,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codelist: Option<Codelist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

impl Variable {
    pub fn new(
        uri: impl Into<String>,
        label: impl Into<String>,
        category: Category,
        component_type: ComponentType,
    ) -> Self {
        let original = Original::new(uri, label);
        Self {
            uri: original.uri.clone(),
            label: original.label.clone(),
            original,
            description: None,
            category,
            component_type,
            codelist: None,
            values: None,
        }
    }

    /// True when the user replaced the community-defined property by their own.
    pub fn is_specialized(&self) -> bool {
        self.uri != self.original.uri
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    /// The values relevant for the variable's category; empty for `other`.
    pub fn values(&self) -> &[Value] {
        match self.category {
            Category::Coded | Category::Identifier => self.values.as_deref().unwrap_or(&[]),
            Category::Other => &[],
        }
    }

    /// The codelist, only for coded variables.
    pub fn codelist(&self) -> Option<&Codelist> {
        match self.category {
            Category::Coded => self.codelist.as_ref(),
            _ => None,
        }
    }

    /// Checks the record is complete for its category and that every IRI parses.
    /// `id` names the variable in errors.
    pub fn validate(&self, id: &str) -> Result<(), InputError> {
        parse_iri(&format!("{id}.original.uri"), &self.original.uri)?;
        parse_iri(&format!("{id}.uri"), &self.uri)?;
        match self.category {
            Category::Coded => {
                let codelist = self.codelist.as_ref().ok_or(InputError::MissingCodelist {
                    variable: id.to_string(),
                })?;
                parse_iri(&format!("{id}.codelist.original.uri"), &codelist.original.uri)?;
                parse_iri(&format!("{id}.codelist.uri"), &codelist.uri)?;
            }
            Category::Identifier | Category::Other => {
                if self.codelist.is_some() {
                    debug!("Ignoring codelist of {} variable '{}'", self.category, id);
                }
            }
        }
        match self.category {
            Category::Coded | Category::Identifier => {
                let values = self.values.as_ref().ok_or(InputError::MissingValues {
                    variable: id.to_string(),
                })?;
                for (i, value) in values.iter().enumerate() {
                    parse_iri(&format!("{id}.values[{i}].original.uri"), &value.original.uri)?;
                    parse_iri(&format!("{id}.values[{i}].uri"), &value.uri)?;
                }
            }
            Category::Other => {
                if self.values.is_some() {
                    debug!("Ignoring values of other variable '{}'", id);
                }
            }
        }
        Ok(())
    }

    // only called on variables that passed `validate`
    pub(crate) fn iri(&self) -> NamedNode {
        NamedNode::new_unchecked(self.uri.clone())
    }

    pub(crate) fn original_iri(&self) -> NamedNode {
        NamedNode::new_unchecked(self.original.uri.clone())
    }
}

/// Ordered mapping from variable id (usually the column name) to its description.
///
/// Serialized as a JSON object; document order is preserved and duplicate ids are
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    entries: Vec<(String, Variable)>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a variable. Fails on a duplicate id.
    pub fn insert(&mut self, id: impl Into<String>, variable: Variable) -> Result<(), InputError> {
        let id = id.into();
        if self.get(&id).is_some() {
            return Err(InputError::DuplicateVariable(id));
        }
        self.entries.push((id, variable));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Variable> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Variable> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == id)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn validate(&self) -> Result<(), InputError> {
        for (id, variable) in self.iter() {
            variable.validate(id)?;
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Serialize for Variables {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, variable) in &self.entries {
            map.serialize_entry(id, variable)?;
        }
        map.end()
    }
}

struct VariablesVisitor;

impl<'de> Visitor<'de> for VariablesVisitor {
    type Value = Variables;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a map from variable id to variable")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Variables, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((id, variable)) = access.next_entry::<String, Variable>()? {
            if !seen.insert(id.clone()) {
                return Err(serde::de::Error::custom(InputError::DuplicateVariable(id)));
            }
            entries.push((id, variable));
        }
        Ok(Variables { entries })
    }
}

impl<'de> Deserialize<'de> for Variables {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(VariablesVisitor)
    }
}

/// The person submitting the annotation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Opaque account identifier of the sign-in provider.
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl AuthorProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.email.trim().is_empty() {
            return Err(InputError::MissingField("profile.email"));
        }
        if let Some(image) = self.image.as_deref().filter(|i| !i.is_empty()) {
            parse_iri("profile.image", image)?;
        }
        Ok(())
    }
}
