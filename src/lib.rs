//! Condition mutation testing for Rust source files
//!
//! This library finds the relational and logical expressions inside `if` and
//! `while` conditions of a source file, mutates them one at a time, reruns
//! the file's tests against each mutant and reports which mutants the tests
//! caught.
//!
//! # Example Configuration
//!
//! ```yaml
//! version: "1.0"
//! settings:
//!   timeout: 30
//!   failure_marker: "test result: FAILED"
//!   harness:
//!     kind: rustc
//!     edition: "2021"
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use mutest::{run_mutation_tests, Config};
//! use std::path::{Path, PathBuf};
//!
//! let config = Config::load(Path::new("mutest.yaml")).unwrap();
//! let report = run_mutation_tests(
//!     Path::new("src/max.rs"),
//!     &[PathBuf::from("src/max_test.rs")],
//!     &config.settings,
//! )
//! .unwrap();
//! report.print();
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod harness;
pub mod mutator;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod workspace;

// Re-export main types at crate root
pub use codegen::{SourceUnit, TestFile};
pub use config::{Config, HarnessConfig, Settings};
pub use error::{MutationError, Result};
pub use harness::{CommandHarness, HarnessOutput, RustcHarness, TestHarness};
pub use mutator::{MutationOperator, MutationRecord, SwapOperator};
pub use report::MutationReport;
pub use runner::{run_mutation_tests, Classifier, MutationStatus, Orchestrator, TrialOutcome};
pub use scanner::{scan, Candidate, CandidateContext, CandidateKind, CandidateSet};
