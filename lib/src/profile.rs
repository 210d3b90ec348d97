//! Profiling of tabular source files into an initial set of variables.
//!
//! Every column becomes a coded dimension with a codelist generated from its distinct
//! values. The result is the starting point the user edits before building a
//! nanopublication.

use crate::config::Config;
use crate::iri::to_iri;
use crate::model::{Category, Codelist, ComponentType, Value, Variable, Variables};
use crate::util::{hash_file, read_json};
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use oxigraph::model::NamedNode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SNIFF_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    Csv { delimiter: u8 },
    Tsv,
}

impl TabularFormat {
    pub const CSV: TabularFormat = TabularFormat::Csv { delimiter: b',' };

    pub fn delimiter(self) -> u8 {
        match self {
            TabularFormat::Csv { delimiter } => delimiter,
            TabularFormat::Tsv => b'\t',
        }
    }

    /// Guesses the format from the start of a file, looking at its first line.
    /// Anything that is not clearly tab- or semicolon-separated is read as CSV.
    pub fn sniff(sample: &[u8]) -> Self {
        let sample = &sample[..sample.len().min(SNIFF_LEN)];
        let line = sample
            .split(|b| *b == b'\n')
            .next()
            .unwrap_or_default();
        let count = |needle: u8| line.iter().filter(|b| **b == needle).count();
        let (tabs, semicolons, commas) = (count(b'\t'), count(b';'), count(b','));
        if tabs > 0 && tabs >= semicolons && tabs >= commas {
            TabularFormat::Tsv
        } else if semicolons > commas {
            TabularFormat::Csv { delimiter: b';' }
        } else {
            TabularFormat::CSV
        }
    }
}

// `csv`, `tsv`, or `csv:<delimiter>` for delimiters other than a comma
impl fmt::Display for TabularFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TabularFormat::Csv { delimiter: b',' } => write!(f, "csv"),
            TabularFormat::Csv { delimiter } => write!(f, "csv:{}", *delimiter as char),
            TabularFormat::Tsv => write!(f, "tsv"),
        }
    }
}

impl Serialize for TabularFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TabularFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for TabularFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "csv" => Ok(TabularFormat::CSV),
            "tsv" | "tab" => Ok(TabularFormat::Tsv),
            other => match other.strip_prefix("csv:").map(str::as_bytes) {
                Some([delimiter]) if delimiter.is_ascii() => Ok(TabularFormat::Csv {
                    delimiter: *delimiter,
                }),
                _ => Err(anyhow!("Unsupported tabular format: {}", s)),
            },
        }
    }
}

/// The profile of one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub name: String,
    pub uri: String,
    /// The source file, as given by the caller
    pub file: String,
    pub format: TabularFormat,
    pub variables: Variables,
}

/// Profiles the file at `path`. The dataset is named after the file stem and minted under
/// the configured resource namespace.
pub fn profile_file(
    path: &Path,
    config: &Config,
    format: Option<TabularFormat>,
) -> Result<DatasetProfile> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Cannot derive a dataset name from {}", path.display()))?
        .to_string();
    let uri = config.resource(&name)?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let format = format.unwrap_or_else(|| TabularFormat::sniff(&bytes));
    info!("Profiling {} as {}", path.display(), format);
    let variables = profile_reader(bytes.as_slice(), format, &name, &uri)?;
    Ok(DatasetProfile {
        name,
        uri: uri.into_string(),
        file: path.display().to_string(),
        format,
        variables,
    })
}

/// The sidecar file a profile is cached in: `{path}.cache.json`.
pub fn cache_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".cache.json");
    PathBuf::from(name)
}

#[derive(Serialize, Deserialize)]
struct CachedProfile {
    /// blake3 hash of the source file the profile was built from
    hash: String,
    dataset: DatasetProfile,
}

/// Reads the cached profile of `path`. Returns `None` when there is no cache, when it cannot
/// be read, or when the source file changed since it was written.
pub fn read_cache(path: &Path, hash: &str) -> Option<DatasetProfile> {
    let cache = cache_path(path);
    if !cache.exists() {
        return None;
    }
    let cached: CachedProfile = match read_json(&cache) {
        Ok(cached) => cached,
        Err(e) => {
            warn!("Ignoring unreadable profile cache {}: {:#}", cache.display(), e);
            return None;
        }
    };
    if cached.hash != hash {
        debug!("Source {} changed since it was cached", path.display());
        return None;
    }
    Some(cached.dataset)
}

pub fn write_cache(path: &Path, hash: &str, profile: &DatasetProfile) -> Result<()> {
    let cache = cache_path(path);
    let cached = CachedProfile {
        hash: hash.to_string(),
        dataset: profile.clone(),
    };
    let json = serde_json::to_string_pretty(&cached)?;
    std::fs::write(&cache, json).with_context(|| format!("Failed to write {}", cache.display()))?;
    debug!("Written profile of {} to {}", path.display(), cache.display());
    Ok(())
}

/// Profiles `path`, reusing the profile cached next to it while the file is unchanged.
///
/// A forced `format` that differs from the cached one rebuilds the profile. Failing to write
/// the cache is logged and does not fail the call.
pub fn load(path: &Path, config: &Config, format: Option<TabularFormat>) -> Result<DatasetProfile> {
    let hash = hash_file(path)?;
    if let Some(profile) = read_cache(path, &hash) {
        if format.map(|f| f == profile.format).unwrap_or(true) {
            info!("Returning profile of {} from cache", path.display());
            return Ok(profile);
        }
    }
    info!("Building new profile for {}", path.display());
    let profile = profile_file(path, config, format)?;
    if let Err(e) = write_cache(path, &hash, &profile) {
        warn!("Could not cache the profile of {}: {:#}", path.display(), e);
    }
    Ok(profile)
}

/// Profiles tabular data with a header row. Columns keep their header order; empty cells
/// are not counted as values.
pub fn profile_reader<R: Read>(
    reader: R,
    format: TabularFormat,
    dataset_name: &str,
    dataset_uri: &NamedNode,
) -> Result<Variables> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(format.delimiter())
        .flexible(true)
        .from_reader(reader);
    let header = unique_headers(
        reader
            .headers()
            .context("Failed to read the header row")?
            .iter()
            .map(|h| h.trim().to_string()),
    );

    let mut columns: Vec<ValueCounts> = header.iter().map(|_| ValueCounts::default()).collect();
    let mut rows = 0usize;
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read row {}", rows + 1))?;
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            let cell = cell.trim();
            if !cell.is_empty() {
                column.add(cell);
            }
        }
        rows += 1;
    }
    debug!("Read {} rows and {} columns", rows, header.len());

    let mut variables = Variables::new();
    for (column, counts) in header.iter().zip(columns) {
        let variable = column_variable(dataset_name, dataset_uri.as_str(), column, counts)?;
        variables.insert(column.clone(), variable)?;
    }
    Ok(variables)
}

/// Repeated column names get a `.1`, `.2`, ... suffix, the first occurrence keeps its name.
fn unique_headers(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut header = Vec::new();
    for name in names {
        let mut unique = name.clone();
        let mut n = 1;
        while !seen.insert(unique.clone()) {
            unique = format!("{name}.{n}");
            n += 1;
        }
        if unique != name {
            debug!("Renamed duplicate column '{}' to '{}'", name, unique);
        }
        header.push(unique);
    }
    header
}

fn column_variable(
    dataset_name: &str,
    dataset_uri: &str,
    column: &str,
    counts: ValueCounts,
) -> Result<Variable> {
    let variable_uri = to_iri(&format!("{dataset_uri}/variable/{column}"))?;
    let codelist_uri = to_iri(&format!("{dataset_uri}/codelist/{column}"))?;

    let mut values = Vec::with_capacity(counts.values.len());
    for (label, count) in counts.into_sorted() {
        let uri = to_iri(&format!("{dataset_uri}/value/{column}/{label}"))?;
        let mut value = Value::unchanged(uri.into_string(), label);
        value.count = Some(count);
        values.push(value);
    }

    let mut variable = Variable::new(
        variable_uri.into_string(),
        column,
        Category::Coded,
        ComponentType::Dimension,
    );
    variable.description = Some(format!(
        "The variable '{column}' as taken from the '{dataset_name}' dataset."
    ));
    variable.codelist = Some(Codelist::unchanged(
        codelist_uri.into_string(),
        format!("Codelist generated from the values for '{column}'"),
    ));
    variable.values = Some(values);
    Ok(variable)
}

/// Distinct values of a column with their frequencies, in order of first appearance.
#[derive(Default)]
struct ValueCounts {
    values: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl ValueCounts {
    fn add(&mut self, value: &str) {
        match self.index.get(value) {
            Some(&i) => self.values[i].1 += 1,
            None => {
                self.index.insert(value.to_string(), self.values.len());
                self.values.push((value.to_string(), 1));
            }
        }
    }

    /// Most frequent first; the sort is stable so ties keep their first appearance.
    fn into_sorted(mut self) -> Vec<(String, u64)> {
        self.values.sort_by(|a, b| b.1.cmp(&a.1));
        self.values
    }
}
