//! Build RDF Data Cube structure definitions for annotated tabular datasets and wrap them
//! in nanopublications.
//!
//! The usual flow is: profile a source file into [`Variables`], let the user edit them,
//! build a [`Nanopublication`] from the edited variables and an [`AuthorProfile`], then
//! serialize it as TriG or publish it to a SPARQL store.

extern crate derive_builder;

pub mod config;
pub mod consts;
pub mod errors;
pub mod iri;
pub mod model;
pub mod nanopub;
pub mod profile;
pub mod sparql;
pub mod structure;
pub mod trig;
pub mod util;

pub use config::Config;
pub use errors::{InputError, TransportError};
pub use model::{
    AuthorProfile, Category, Codelist, ComponentType, Original, Value, Variable, Variables,
};
pub use nanopub::{Nanopublication, NanopublicationBuilder};
pub use trig::{serialize_trig, TrigSerializer};

/// Initializes logging for the qber library.
///
/// This function checks for the `QBER_LOG` environment variable. If it is set,
/// `RUST_LOG` is set to its value. `QBER_LOG` takes precedence over `RUST_LOG`.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("QBER_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
