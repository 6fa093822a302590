//! roster-core — Player records, descriptor comparison, and the boundary
//! to the external face-recognition model.
//!
//! Descriptors are compared by Euclidean distance against a fixed
//! threshold; producing them is delegated to a [`DescriptorExtractor`]
//! behind a [`ModelGate`].

pub mod command;
pub mod extractor;
pub mod types;

pub use command::CommandExtractor;
pub use extractor::{DescriptorExtractor, ExtractorError, GateState, ModelGate};
pub use types::{
    Descriptor, DescriptorError, EuclideanMatcher, MatchResult, Matcher, PlayerRecord,
    MATCH_THRESHOLD,
};
