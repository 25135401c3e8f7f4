//! Intent extraction
//!
//! Free text in, typed [`Intent`] out.

pub mod extractor;
pub mod lexicon;
pub mod types;

pub use extractor::{build_prompt, IntentExtractor, INTENT_SCHEMA};
pub use types::{Intent, IntentFlag, IntentSource, ResourceKind, Verb, KNOWN_KINDS, READ_ONLY_VERBS};
