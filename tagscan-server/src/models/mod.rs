//! Data models for the scan pipeline

pub mod scan;

pub use scan::{
    BatchResult, DetailLevel, ErrorKind, ExtractionOutcome, ImageItem, OutcomeError, ScanContext,
};
