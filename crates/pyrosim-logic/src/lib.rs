//! Pure process-simulator logic.
//!
//! This crate holds the parts of the simulator that carry no state of their
//! own: noise envelopes applied to sensor readings, alarm tier
//! classification, the lab assay formulas, and sim-clock formatting.
//! Functions take plain data (and an RNG where noise is involved) and return
//! results, so they can be unit-tested without an engine.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`alarm`] | Per-signal alarm thresholds and tier classification |
//! | [`assay`] | Biochar quality assay derived from upstream purity |
//! | [`clock`] | `HH:MM:SS` formatting of simulated time |
//! | [`noise`] | Bounded multiplicative/additive noise helpers |

pub mod alarm;
pub mod assay;
pub mod clock;
pub mod noise;
