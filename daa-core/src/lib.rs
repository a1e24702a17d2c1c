//! DAA core library: finding ingestion, normalization, matching, and
//! hierarchical resolution between two revisions of a package.
//!
//! The main entry point is [`pipeline::DaaPipeline`], which indexes both
//! revisions through a [`revision::RevisionSource`] and produces a
//! [`report::ResolutionReport`].

pub mod config;
pub mod error;
pub mod finding;
pub mod hierarchy;
pub mod matching;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod revision;
