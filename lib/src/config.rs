//! Defines the configuration for building and publishing nanopublications: the namespaces
//! resources are minted in and the SPARQL endpoints they are sent to.

use crate::consts::DEFAULT_TOOL_IRI;
use crate::errors::InputError;
use crate::iri::{mint, parse_iri};
use anyhow::Result;
use derive_builder::Builder;
use oxigraph::model::NamedNode;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;

pub const DEFAULT_RESOURCE_BASE: &str = "http://data.socialhistory.org/resource/";
pub const DEFAULT_VOCAB_BASE: &str = "http://data.socialhistory.org/vocab/";
pub const DEFAULT_CONFIG_FILE: &str = "qber.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Builder)]
#[builder(default, setter(into))]
#[serde(default)]
pub struct Config {
    /// Namespace for persons, datasets and other minted resources
    pub resource_base: String,
    /// Namespace for the tool's own vocabulary terms
    pub vocab_base: String,
    /// IRI of the software recorded as generator of every nanopublication
    pub tool_iri: String,
    /// SPARQL query endpoint
    #[builder(setter(into, strip_option))]
    pub endpoint_url: Option<String>,
    /// SPARQL update endpoint; falls back to the query endpoint
    #[builder(setter(into, strip_option))]
    pub update_url: Option<String>,
    #[builder(setter(into, strip_option))]
    pub username: Option<String>,
    #[builder(setter(into, strip_option))]
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resource_base: DEFAULT_RESOURCE_BASE.to_string(),
            vocab_base: DEFAULT_VOCAB_BASE.to_string(),
            tool_iri: DEFAULT_TOOL_IRI.to_string(),
            endpoint_url: None,
            update_url: None,
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), InputError> {
        parse_iri("resource_base", &self.resource_base)?;
        parse_iri("vocab_base", &self.vocab_base)?;
        parse_iri("tool_iri", &self.tool_iri)?;
        Ok(())
    }

    /// A term in the tool vocabulary, e.g. `path` or `sha1_hash`.
    pub fn vocab(&self, local: &str) -> Result<NamedNode, InputError> {
        mint(&self.vocab_base, local)
    }

    /// A resource minted under the resource namespace.
    pub fn resource(&self, local: &str) -> Result<NamedNode, InputError> {
        mint(&self.resource_base, local)
    }

    pub fn tool(&self) -> Result<NamedNode, InputError> {
        parse_iri("tool_iri", &self.tool_iri)
    }

    pub fn query_endpoint(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }

    pub fn update_endpoint(&self) -> Option<&str> {
        self.update_url.as_deref().or(self.endpoint_url.as_deref())
    }

    pub fn credentials(&self) -> Option<(&str, Option<&str>)> {
        self.username
            .as_deref()
            .map(|user| (user, self.password.as_deref()))
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `file` if it exists, otherwise returns the defaults.
    pub fn load_or_default(file: &Path) -> Result<Self> {
        if file.exists() {
            Self::from_file(file)
        } else {
            Ok(Self::default())
        }
    }

    /// Prints out the current Config in a clear and readable way for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Resource base: {}", self.resource_base);
        println!("  Vocabulary base: {}", self.vocab_base);
        println!("  Tool: {}", self.tool_iri);
        println!(
            "  Query endpoint: {}",
            self.query_endpoint().unwrap_or("(not configured)")
        );
        println!(
            "  Update endpoint: {}",
            self.update_endpoint().unwrap_or("(not configured)")
        );
        if let Some((user, _)) = self.credentials() {
            println!("  User: {}", user);
        }
        println!("  Timeout: {}s", self.timeout_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builder_defaults() {
        let config = Config::builder()
            .endpoint_url("http://localhost:8890/sparql")
            .build()
            .unwrap();
        assert_eq!(config.resource_base, DEFAULT_RESOURCE_BASE);
        assert_eq!(config.update_endpoint(), Some("http://localhost:8890/sparql"));
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_vocab_terms() {
        let config = Config::default();
        assert_eq!(
            config.vocab("sha1_hash").unwrap().as_str(),
            "http://data.socialhistory.org/vocab/sha1_hash"
        );
        assert_eq!(
            config.resource("person/jane@example.org").unwrap().as_str(),
            "http://data.socialhistory.org/resource/person/jane@example.org"
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let config = Config::builder()
            .resource_base("http://example.org/resource/")
            .update_url("http://localhost:3030/ds/update")
            .username("admin")
            .password("secret")
            .build()
            .unwrap();
        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.credentials(), Some(("admin", Some("secret"))));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, r#"{"endpoint_url": "http://localhost/sparql"}"#).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.vocab_base, DEFAULT_VOCAB_BASE);
        assert_eq!(loaded.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, r#"{"resource_base": "not a base"}"#).unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, Config::default());
    }
}
