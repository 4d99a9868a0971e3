//! `tabmatch-recon`: key-pair matching and merge reconciliation.
//!
//! Pure engine crate: receives two pre-loaded record sets, returns merged,
//! classified rows. No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod output;
pub mod reconcile;

pub use config::{MatchPolicy, Preset, ReconConfig};
pub use engine::run;
pub use error::ReconError;
pub use model::{Classification, MatchKeySpec, RecordSet, ReconResult, Value};
