//! tpacalc: stand-level trees-per-acre estimation
//!
//! Architecture:
//! - `domain`: measurement, aggregation, estimation and report formatting
//! - `application`: the stand pipeline service over I/O boundary traits
//! - `infrastructure`: HTTP catalog, GeoJSON loading, SVG chart, DI container
//! - `cli`: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
