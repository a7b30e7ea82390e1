//! # mdblock Core Library
//!
//! A workflow block that configures and launches a molecular dynamics pipeline
//! (solvation, force-field parameterization, energy minimization, production
//! simulation) implemented by an external toolkit running in its own isolated
//! environment.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same layered split used across our scientific tooling:
//!
//! - **[`core`]: The Foundation.** Stateless data models: the simulation
//!   parameter record and its JSON parameter file, the declarative block schema,
//!   and the line-oriented result protocol spoken between worker and launcher.
//!
//! - **[`engine`]: The Launcher.** Host-side orchestration. Builds the command
//!   that runs the worker inside a named environment, spawns exactly one child
//!   with its stdout and stderr merged, streams the output line by line and
//!   captures the result sentinels.
//!
//! - **[`worker`]: The Child Side.** Validates the parameter file, drives the
//!   external toolkit through its stages in strict order, resolves the produced
//!   artifacts (with fallback search) and reports them back on stdout.
//!
//! - **[`workflows`]: The Public API.** The block action a host invokes. It reads
//!   typed inputs through a small adapter trait, applies the schema defaults,
//!   launches the pipeline and publishes the two output paths.

pub mod core;
pub mod engine;
pub mod worker;
pub mod workflows;
