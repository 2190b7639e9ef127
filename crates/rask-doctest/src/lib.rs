// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Verification of Rask documentation snippets.
//!
//! A snippet is highlighted for the page, then (unless only a syntax check
//! was asked for) written into a throwaway workspace and handed to the
//! `rask` toolchain. What the toolchain did is compared with what the
//! documentation claims should happen.

pub mod error;
pub mod operation;
mod process;
pub mod record;
pub mod render;
pub mod report;
pub mod runner;
pub mod toolchain;
pub mod verify;
pub mod workspace;

pub use error::{DoctestError, ErrorClass, Result};
pub use operation::{ArtifactFormat, BuildConfig, ExpectedOutcome, Operation, RunConfig, TestConfig};
pub use record::{ExecutionRecord, Termination};
pub use report::{JsonReport, Report};
pub use runner::{run_doctest, Snippet, VerifyOptions, DEFAULT_NAME, SOURCE_EXTENSION};
pub use toolchain::{Toolchain, DEFAULT_TOOLCHAIN};
pub use verify::{verify, FailReason, Verdict};
pub use workspace::{Workspace, DEFAULT_PREFIX};
