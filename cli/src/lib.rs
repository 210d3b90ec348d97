use anyhow::{anyhow, Error, Result};
use chrono::prelude::*;
use clap::{Parser, Subcommand};
use log::{debug, info};
use qber::config::DEFAULT_CONFIG_FILE;
use qber::profile::{self, TabularFormat};
use qber::sparql::SparqlClient;
use qber::util::{hash_file, read_json, write_trig_to_file};
use qber::nanopub::trig_serializer;
use qber::{AuthorProfile, Config, Nanopublication, Variables};
use std::env::current_dir;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "qber")]
#[command(about = "Annotate tabular datasets with Data Cube structure and publish them as nanopublications")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
    /// Configuration file, defaults to 'qber.json' in the current directory
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
struct BuildArgs {
    /// JSON file with the variable descriptions, or the output of `qber profile`
    #[clap(long)]
    variables: PathBuf,
    /// JSON file with the author profile (name, email, id, image)
    #[clap(long)]
    profile: PathBuf,
    /// Name of the dataset, defaults to the name recorded by `qber profile`
    #[clap(long)]
    name: Option<String>,
    /// IRI of the dataset, defaults to the IRI recorded by `qber profile`
    #[clap(long)]
    dataset_uri: Option<String>,
    /// Path of the source file as recorded in the provenance
    #[clap(long)]
    source_path: String,
    /// Content hash of the source file revision; computed from --source-path if omitted
    #[clap(long)]
    source_hash: Option<String>,
    /// Submission time (RFC 3339), defaults to now
    #[clap(long)]
    timestamp: Option<String>,
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration.
    Show,
    /// Write the default configuration file.
    Init {
        /// Overwrite an existing configuration file
        #[clap(long, action, default_value = "false")]
        overwrite: bool,
    },
    /// Get a configuration value.
    Get {
        /// The configuration key to get.
        key: String,
    },
    /// Set a configuration value.
    Set {
        /// The configuration key to set.
        key: String,
        /// The value to set for the key.
        value: String,
    },
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Profile a CSV/TSV file into an editable set of variables
    Profile {
        /// The tabular file to profile
        file: PathBuf,
        /// Force the file format ('csv' or 'tsv') instead of sniffing it
        #[clap(long, short)]
        format: Option<String>,
        /// The file to write the profile to, defaults to stdout
        #[clap(long, short)]
        output: Option<PathBuf>,
        /// Ignore the profile cached next to the file and profile it again
        #[clap(long, action, default_value = "false")]
        refresh: bool,
    },
    /// Build a nanopublication and write it as TriG
    Build {
        #[clap(flatten)]
        args: BuildArgs,
        /// The file to write the TriG to, defaults to stdout
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Build a nanopublication and send it to the configured SPARQL update endpoint
    Publish {
        #[clap(flatten)]
        args: BuildArgs,
    },
    /// List the datasets published to the configured SPARQL endpoint
    List {
        /// Output JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
    },
    /// Delete a nanopublication and its graphs from the configured SPARQL endpoint
    Delete {
        /// The IRI of the nanopublication
        uri: String,
    },
    /// Look up the definition of a dimension or measure in the configured SPARQL endpoint
    Definition {
        /// The IRI of the property
        uri: String,
    },
    /// List the concepts of a concept scheme in the configured SPARQL endpoint
    Concepts {
        /// The IRI of the concept scheme
        scheme: String,
    },
    /// List the concept schemes known to the configured SPARQL endpoint
    Schemes,
    /// List the dimensions known to the configured SPARQL endpoint
    Dimensions,
    /// Print the IRI minted from a namespace and a local name
    Mint {
        namespace: String,
        local: String,
    },
    /// Manage qber configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

pub fn run() -> Result<()> {
    qber::init_logging();
    let cmd = Cli::parse();
    execute(cmd)
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    qber::init_logging();
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    execute(cmd)
}

fn execute(cmd: Cli) -> Result<()> {
    // The RUST_LOG env var is set by `init_logging` if QBER_LOG is present.
    // CLI flags for verbosity take precedence. If nothing is set, we default to "warn".
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    let config_path = match &cmd.config {
        Some(path) => path.clone(),
        None => current_dir()?.join(DEFAULT_CONFIG_FILE),
    };

    if let Commands::Config(config_cmd) = cmd.command {
        return handle_config_command(config_cmd, &config_path, cmd.config.is_some());
    }

    let config = if cmd.config.is_some() {
        Config::from_file(&config_path)?
    } else {
        Config::load_or_default(&config_path)?
    };
    debug!("Using configuration from {}", config_path.display());
    if cmd.verbose || cmd.debug {
        config.print();
    }

    match cmd.command {
        Commands::Profile {
            file,
            format,
            output,
            refresh,
        } => {
            let format = format.map(|f| f.parse::<TabularFormat>()).transpose()?;
            let profile = if refresh {
                let profile = profile::profile_file(&file, &config, format)?;
                profile::write_cache(&file, &hash_file(&file)?, &profile)?;
                profile
            } else {
                profile::load(&file, &config, format)?
            };
            info!(
                "Profiled {} variables of dataset {}",
                profile.variables.len(),
                profile.uri
            );
            let json = serde_json::to_string_pretty(&profile)?;
            match output {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{}", json),
            }
        }
        Commands::Build { args, output } => {
            let nanopub = build_nanopublication(&args, &config)?;
            match output {
                Some(path) => {
                    let serializer = trig_serializer(&config)?;
                    write_trig_to_file(nanopub.dataset(), &serializer, &path)?;
                    println!("{}", nanopub.uri());
                }
                None => print!("{}", nanopub.to_trig(&config)?),
            }
        }
        Commands::Publish { args } => {
            let client = SparqlClient::from_config(&config)?;
            let nanopub = build_nanopublication(&args, &config)?;
            client.publish(&nanopub)?;
            println!("Published {}", nanopub.uri());
        }
        Commands::List { json } => {
            let client = SparqlClient::from_config(&config)?;
            let datasets = client.list_datasets()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&datasets)?);
            } else {
                for dataset in datasets {
                    println!(
                        "{}\t{}\t{}\t{}",
                        dataset.label, dataset.uri, dataset.owner, dataset.nanopublication
                    );
                }
            }
        }
        Commands::Delete { uri } => {
            let client = SparqlClient::from_config(&config)?;
            match client.delete_nanopublication(&uri)? {
                None => println!("No matching nanopublication found"),
                Some(report) => {
                    for done in &report.completed {
                        println!("ok: {}", done);
                    }
                    for (label, err) in &report.failures {
                        eprintln!("failed: {}: {}", label, err);
                    }
                    if !report.is_complete() {
                        return Err(anyhow!(
                            "{} of {} deletion steps failed for {}",
                            report.failures.len(),
                            report.failures.len() + report.completed.len(),
                            report.nanopublication
                        ));
                    }
                }
            }
        }
        Commands::Definition { uri } => {
            let client = SparqlClient::from_config(&config)?;
            match client.get_definition(&uri)? {
                Some(definition) => println!("{}", serde_json::to_string_pretty(&definition)?),
                None => return Err(anyhow!("No definition found for {}", uri)),
            }
        }
        Commands::Concepts { scheme } => {
            let client = SparqlClient::from_config(&config)?;
            let concepts = client.get_concepts(&scheme)?;
            println!("{}", serde_json::to_string_pretty(&concepts)?);
        }
        Commands::Schemes => {
            let client = SparqlClient::from_config(&config)?;
            println!("{}", serde_json::to_string_pretty(&client.get_schemes()?)?);
        }
        Commands::Dimensions => {
            let client = SparqlClient::from_config(&config)?;
            println!("{}", serde_json::to_string_pretty(&client.get_dimensions()?)?);
        }
        Commands::Mint { namespace, local } => {
            println!("{}", qber::iri::mint(&namespace, &local)?.as_str());
        }
        Commands::Config(..) => {
            // handled before the configuration is loaded
        }
    }

    Ok(())
}

/// Variables plus the dataset name and IRI when the file is the output of `qber profile`.
fn load_variables(path: &Path) -> Result<(Variables, Option<String>, Option<String>)> {
    let json: serde_json::Value = read_json(path)?;
    let is_profile = json.get("format").is_some()
        && json.get("uri").map(|v| v.is_string()).unwrap_or(false)
        && json.get("variables").map(|v| v.is_object()).unwrap_or(false);
    if !is_profile {
        let variables: Variables = serde_json::from_value(json)?;
        return Ok((variables, None, None));
    }
    let name = json.get("name").and_then(|v| v.as_str()).map(str::to_string);
    let uri = json.get("uri").and_then(|v| v.as_str()).map(str::to_string);
    let variables = json
        .get("variables")
        .cloned()
        .ok_or_else(|| anyhow!("Profile has no variables"))?;
    let variables: Variables = serde_json::from_value(variables)?;
    Ok((variables, name, uri))
}

fn build_nanopublication(args: &BuildArgs, config: &Config) -> Result<Nanopublication> {
    let (variables, profiled_name, profiled_uri) = load_variables(&args.variables)?;
    let profile: AuthorProfile = read_json(&args.profile)?;
    let name = args
        .name
        .clone()
        .or(profiled_name)
        .ok_or_else(|| anyhow!("No dataset name given (use --name)"))?;
    let dataset_uri = args
        .dataset_uri
        .clone()
        .or(profiled_uri)
        .ok_or_else(|| anyhow!("No dataset IRI given (use --dataset-uri)"))?;
    let source_hash = match &args.source_hash {
        Some(hash) => hash.clone(),
        None => hash_file(Path::new(&args.source_path))?,
    };

    let mut builder = Nanopublication::builder(config)
        .profile(profile)
        .dataset_name(name)
        .dataset_uri(dataset_uri)
        .source_path(args.source_path.clone())
        .source_hash(source_hash)
        .variables(variables);
    if let Some(timestamp) = &args.timestamp {
        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|e| anyhow!("Invalid timestamp '{}': {}", timestamp, e))?
            .with_timezone(&Utc);
        builder = builder.timestamp(timestamp);
    }
    builder.build()
}

const SETTABLE_KEYS: [&str; 8] = [
    "resource_base",
    "vocab_base",
    "tool_iri",
    "endpoint_url",
    "update_url",
    "username",
    "password",
    "timeout_secs",
];

fn handle_config_command(config_cmd: ConfigCommands, config_path: &Path, explicit: bool) -> Result<()> {
    match config_cmd {
        ConfigCommands::Show => {
            let config = if explicit {
                Config::from_file(config_path)?
            } else {
                Config::load_or_default(config_path)?
            };
            config.print();
            return Ok(());
        }
        ConfigCommands::Init { overwrite } => {
            if config_path.exists() && !overwrite {
                return Err(anyhow!(
                    "{} already exists. Use --overwrite to replace it.",
                    config_path.display()
                ));
            }
            Config::default().save_to_file(config_path)?;
            println!("Wrote {}", config_path.display());
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load_or_default(config_path)?;
    let mut config_json = serde_json::to_value(&config)?;
    let object = config_json
        .as_object_mut()
        .ok_or_else(|| anyhow!("Invalid config format: not a JSON object."))?;

    match config_cmd {
        ConfigCommands::Get { key } => {
            match object.get(&key) {
                Some(serde_json::Value::String(s)) => println!("{}", s),
                Some(serde_json::Value::Null) | None => {
                    println!("Configuration key '{}' not set.", key)
                }
                Some(value) => println!("{}", value),
            }
            return Ok(());
        }
        ConfigCommands::Set { key, value } => {
            if !SETTABLE_KEYS.contains(&key.as_str()) {
                return Err(anyhow!(
                    "Setting configuration for '{}' is not supported.",
                    key
                ));
            }
            let parsed = if key == "timeout_secs" {
                let secs = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("Invalid number of seconds for {}: {}", key, value))?;
                serde_json::Value::from(secs)
            } else {
                serde_json::Value::String(value.clone())
            };
            object.insert(key.clone(), parsed);
            let config: Config = serde_json::from_value(config_json)?;
            config.validate()?;
            config.save_to_file(config_path)?;
            println!("Set {} to {}", key, value);
        }
        _ => unreachable!(), // Show and Init are handled above
    }

    Ok(())
}
