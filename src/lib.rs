//! cohortstat - movement-sensor cohort statistics
//!
//! This library reads per-subject movement logs, reduces each subject to a
//! `(mean, stdev)` pair, groups subjects into four sex x condition cohorts,
//! persists those cohorts as tables and compares control against condition
//! groups with a variance ratio and a two-sample t-test.

pub mod analysis;
pub mod chart;
pub mod cli;
pub mod cohort;
pub mod config;
pub mod inference;
pub mod metadata;
pub mod persistence;
pub mod pipeline;
pub mod record_reader;
pub mod stats;
