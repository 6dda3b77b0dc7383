//! `guestlist-recon` — Guest-list reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records, returns classified
//! discrepancies. Name identity is approximate (normalization, token
//! overlap, fuzzy similarity) but drives exact set arithmetic across
//! collections. No CLI or report-formatting dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod headcount;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod summary;

pub use config::ReconConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{RawRecord, ReconInput, ReconReport};
