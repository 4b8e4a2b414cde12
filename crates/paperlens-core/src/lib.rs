//! # paperlens-core
//!
//! Core library behind the paper-annotation viewer.
//!
//! This library provides:
//! - Reading `.bib` files and normalizing their entries into [`BibEntry`] values
//! - The fixed taxonomy of human–GenAI interaction entities and its diagram layout
//! - Read-only access to saved pattern metadata
//!
//! ## Features
//!
//! - `remote` (default): load `Patterns.json` over HTTP
//!
//! ## Example
//!
//! ```
//! use paperlens_core::bibtex;
//!
//! let entries = bibtex::parse_bibtex_file(
//!     "@article{a1, title = {{My Paper}}, year = {2023}}",
//! );
//! assert_eq!(entries[0].id, "a1");
//! assert_eq!(entries[0].title, "My Paper");
//! ```

pub mod bibtex;
pub mod error;
pub mod graph;
pub mod parser;
pub mod patterns;
pub mod types;

// Re-export commonly used types
pub use types::{
    AnnotationTemplate, BibEntry, Entity, EntityType, GraphEdge, GraphNode, LinkedEntity, Paper,
    PaperAnnotation,
};

pub use bibtex::{
    NormalizedBatch, bib_entry_to_paper, clean_bibtex_string, generate_id, normalize_json_records,
    normalize_records, parse_bibtex_file,
};
pub use error::{RecordError, SyntaxError, UnknownEntityType};
pub use graph::{ENTITIES, GRAPH_LAYOUT, GraphLayout, default_edges, relation, relations, to_mermaid};
pub use parser::{RawField, RawRecord, parse_records};
pub use patterns::{
    DisplayPatternStore, PatternMetadata, PatternMetadataStorage, PatternSource, PatternStore,
};
