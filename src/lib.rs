//! QC Report Plugins
//!
//! Parsers for bioinformatics tool logs that feed a report-aggregation host.
//!
//! This library provides two independent plugins:
//! - Adapter Removal: trimming statistics and read-length distributions
//!   from `[Section]`-delimited settings files
//! - SCS-Collect: genome-type counts and RNA composition from YAML output
//!
//! The host owns file discovery, chart rendering, and section layout; those
//! collaborators enter through [`LogFile`], [`plot::Renderer`], and
//! [`report::ReportSink`].

pub mod adapter_removal;
pub mod blocks;
pub mod plot;
pub mod report;
pub mod scs_collect;

use thiserror::Error;

/// Sample display name, unique within a report run.
pub type Sample = String;

/// One discovered input file: the host-resolved sample name plus a
/// readable line source.
pub struct LogFile<R> {
    pub sample: String,
    pub reader: R,
}

impl<R> LogFile<R> {
    pub fn new(sample: impl Into<String>, reader: R) -> Self {
        Self {
            sample: sample.into(),
            reader,
        }
    }
}

/// Why a discovered file was skipped instead of parsed.
///
/// Every variant is recoverable at file granularity: the per-file loop logs
/// the reason and moves on to the next file.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("required block [{0}] is missing")]
    MissingBlock(&'static str),
    #[error("single-end collapsed output is not supported")]
    UnsupportedLayout,
    #[error("malformed field: {0}")]
    MalformedField(String),
    #[error("unreadable input: {0}")]
    Unreadable(String),
}
