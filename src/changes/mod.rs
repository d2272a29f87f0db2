//! The changelog pipeline
//!
//! Release notes are extracted from each qualifying PR, matched to category
//! paths, collected per repository and finally rendered by the assembler.
//! The category tree itself lives in the `types` module.

pub mod assembler;
pub mod matcher;
pub mod policy;
pub mod processor;
pub mod release_note;

pub use assembler::{LINE_BREAK, assemble, contributors, format_pr_line};
pub use matcher::{
    CategoryMatch, MatchReason, MislabelWarning, category_override, describe_match,
    match_pull_request,
};
pub use policy::{DateWindow, InclusionPolicy, PolicyContext};
pub use processor::{RepositoryBatch, collect, process_repository};
pub use release_note::{display_text, extract, extract_release_note};
