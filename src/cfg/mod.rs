// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading, CLI path resolution, and structured logging —
//! the ambient stack around the core router (`spec.md` §1 scopes
//! "configuration loading ... metrics exposition, CLI flags" as external
//! collaborators; they still need a concrete, idiomatic implementation
//! to run the binary).

pub mod cli;
pub mod config;
pub mod logger;

pub use config::RouterConfig;
