use anyhow::{Context, Result};

use std::io::{BufReader, Read, Write};
use std::path::Path;

use oxigraph::model::Dataset;
use serde::de::DeserializeOwned;

use crate::trig::{parse_trig, TrigSerializer};

use log::{debug, info};

pub fn write_trig_to_file(dataset: &Dataset, serializer: &TrigSerializer, file: &Path) -> Result<()> {
    info!(
        "Writing dataset to file: {} with length {}",
        file.display(),
        dataset.len()
    );
    let text = serializer.serialize(dataset)?;
    let mut file = std::fs::File::create(file)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

pub fn read_trig_file(file: &Path) -> Result<Dataset> {
    debug!("Reading file: {}", file.display());
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    parse_trig(&text).with_context(|| format!("Failed to parse {} as TriG", file.display()))
}

pub fn read_json<T: DeserializeOwned>(file: &Path) -> Result<T> {
    debug!("Reading JSON file: {}", file.display());
    let reader = BufReader::new(
        std::fs::File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    serde_json::from_reader(reader).with_context(|| format!("Failed to parse {}", file.display()))
}

/// Content hash of a file, hex encoded. Identifies a revision of a source file when the
/// caller has no hash from version control.
pub fn hash_file(file: &Path) -> Result<String> {
    let mut reader = BufReader::new(
        std::fs::File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
