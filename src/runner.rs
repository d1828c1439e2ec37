//! Test runner for mutation testing
//!
//! This module coordinates the mutation testing process. For each candidate,
//! one after another, it:
//! - Applies the mutation to the in-memory tree
//! - Writes the mutated source and the test files to the workspace
//! - Runs the harness and classifies the result
//! - Reverts the mutation and empties the workspace
//!
//! The tree and the workspace are single shared resources, so trials never
//! overlap.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::codegen::{SourceUnit, TestFile};
use crate::config::Settings;
use crate::error::{MutationError, Result};
use crate::harness::{self, HarnessOutput, TestHarness};
use crate::mutator::{MutationOperator, SwapOperator};
use crate::report::MutationReport;
use crate::scanner::{scan, Candidate, CandidateSet};
use crate::workspace::Workspace;

/// Status of a mutation after testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    /// Tests failed with the failure marker - mutation was detected (good!)
    Killed,
    /// Tests passed - mutation was NOT detected (bad!)
    Survived,
    /// Failure without the marker, or the harness could not run
    Errored,
}

/// Result of running a single mutation
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub candidate: Candidate,
    pub status: MutationStatus,
    /// Operator before the mutation, e.g. `>`
    pub before: String,
    /// Operator after the mutation, e.g. `<=`
    pub after: String,
    /// Raw harness output, or the reason the harness could not run
    pub output: String,
    pub duration: Duration,
}

impl TrialOutcome {
    pub fn description(&self) -> String {
        format!(
            "{} -> {} in `{}` ({})",
            self.before, self.after, self.candidate.snippet, self.candidate.context
        )
    }
}

/// Maps harness results onto mutation statuses
#[derive(Debug, Clone)]
pub struct Classifier {
    marker: String,
}

impl Classifier {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Classify one harness run, returning the diagnostic text alongside
    pub fn classify(&self, result: io::Result<HarnessOutput>) -> (MutationStatus, String) {
        match result {
            Ok(run) if run.success => (MutationStatus::Survived, run.output),
            Ok(run) if self.is_marked_failure(&run.output) => (MutationStatus::Killed, run.output),
            Ok(run) => (MutationStatus::Errored, run.output),
            Err(e) => (
                MutationStatus::Errored,
                format!("Failed to run test harness: {}", e),
            ),
        }
    }

    fn is_marked_failure(&self, output: &str) -> bool {
        output
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim_start().starts_with(&self.marker))
            .unwrap_or(false)
    }
}

/// Drives one trial per candidate against a single source unit
pub struct Orchestrator<'a> {
    operator: &'a dyn MutationOperator,
    harness: &'a dyn TestHarness,
    classifier: Classifier,
    baseline: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        operator: &'a dyn MutationOperator,
        harness: &'a dyn TestHarness,
        classifier: Classifier,
    ) -> Self {
        Self {
            operator,
            harness,
            classifier,
            baseline: false,
        }
    }

    /// Require the unmutated sources to pass before any mutant runs
    pub fn with_baseline(mut self, baseline: bool) -> Self {
        self.baseline = baseline;
        self
    }

    /// Run every candidate in order
    ///
    /// The workspace is created for this call and removed before it returns.
    /// On success `unit` renders exactly as it did on entry.
    pub fn run(
        &self,
        unit: &mut SourceUnit,
        candidates: &CandidateSet,
        tests: &[TestFile],
    ) -> Result<Vec<TrialOutcome>> {
        let workspace = Workspace::create()?;
        let outcomes = self.run_in(&workspace, unit, candidates, tests);
        let closed = workspace.close();

        let outcomes = outcomes?;
        closed?;
        Ok(outcomes)
    }

    fn run_in(
        &self,
        workspace: &Workspace,
        unit: &mut SourceUnit,
        candidates: &CandidateSet,
        tests: &[TestFile],
    ) -> Result<Vec<TrialOutcome>> {
        let original = unit.render();

        if self.baseline {
            self.check_baseline(workspace, unit, tests)?;
        }

        let mut outcomes = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.iter().enumerate() {
            info!(
                "[{}/{}] mutating {}:{}:{} `{}`",
                index + 1,
                candidates.len(),
                unit.path().display(),
                candidate.line,
                candidate.column,
                candidate.snippet
            );
            outcomes.push(self.trial(workspace, unit, &original, candidate, tests)?);
        }
        Ok(outcomes)
    }

    fn check_baseline(
        &self,
        workspace: &Workspace,
        unit: &SourceUnit,
        tests: &[TestFile],
    ) -> Result<()> {
        info!(harness = self.harness.name(), "running baseline");
        let executed = workspace
            .materialize(unit, tests)
            .map(|()| self.harness.run(workspace.path()));
        let cleared = workspace.clear();

        let result = executed?;
        cleared?;

        match result {
            Ok(run) if run.success => Ok(()),
            Ok(run) => Err(MutationError::BaselineFailed { output: run.output }),
            Err(e) => Err(MutationError::BaselineFailed {
                output: format!("Failed to run test harness: {}", e),
            }),
        }
    }

    fn trial(
        &self,
        workspace: &Workspace,
        unit: &mut SourceUnit,
        original: &str,
        candidate: &Candidate,
        tests: &[TestFile],
    ) -> Result<TrialOutcome> {
        let start = Instant::now();

        let record = self.operator.mutate(unit.tree_mut(), candidate)?;
        debug!(
            candidate = record.candidate,
            before = %record.before,
            after = %record.after,
            "applied mutation"
        );

        let executed = workspace
            .materialize(unit, tests)
            .map(|()| self.harness.run(workspace.path()));

        // Revert and clean up before surfacing any write error
        let reverted = self.operator.unmutate(unit.tree_mut(), candidate);
        let cleared = workspace.clear();

        let result = executed?;
        reverted?;
        cleared?;

        if unit.render() != original {
            return Err(MutationError::RestoreMismatch {
                candidate: candidate.id,
                snippet: candidate.snippet.clone(),
            });
        }

        let (status, output) = self.classifier.classify(result);
        match status {
            MutationStatus::Killed => info!("killed"),
            MutationStatus::Survived => warn!(
                "survived: {} -> {} at line {}",
                record.before, record.after, candidate.line
            ),
            MutationStatus::Errored => warn!(
                "errored: {} -> {} at line {} (no `{}` in final output line)",
                record.before,
                record.after,
                candidate.line,
                self.classifier.marker()
            ),
        }

        Ok(TrialOutcome {
            candidate: candidate.clone(),
            status,
            before: record.before,
            after: record.after,
            output,
            duration: start.elapsed(),
        })
    }
}

/// Run mutation testing on one source file against its tests
pub fn run_mutation_tests(
    code: &Path,
    tests: &[PathBuf],
    settings: &Settings,
) -> Result<MutationReport> {
    let mut unit = SourceUnit::load(code)?;
    let tests = load_tests(&unit, tests)?;

    let candidates = scan(unit.tree());
    info!(
        "found {} candidate(s) in {}",
        candidates.len(),
        unit.path().display()
    );

    let harness = harness::from_config(&settings.harness, tests[0].file_name(), settings.timeout());
    let operator = SwapOperator;
    let orchestrator = Orchestrator::new(
        &operator,
        harness.as_ref(),
        Classifier::new(settings.failure_marker.clone()),
    )
    .with_baseline(settings.baseline);

    let outcomes = orchestrator.run(&mut unit, &candidates, &tests)?;
    Ok(MutationReport::new(outcomes))
}

fn load_tests(unit: &SourceUnit, paths: &[PathBuf]) -> Result<Vec<TestFile>> {
    if paths.is_empty() {
        return Err(MutationError::ConfigError {
            message: "at least one test file is required".to_string(),
        });
    }

    let tests = paths
        .iter()
        .map(|path| TestFile::load(path))
        .collect::<Result<Vec<_>>>()?;

    for (i, test) in tests.iter().enumerate() {
        let clashes = test.file_name() == unit.file_name()
            || tests[..i].iter().any(|t| t.file_name() == test.file_name());
        if clashes {
            return Err(MutationError::ConfigError {
                message: format!(
                    "'{}' is used by more than one file in the workspace",
                    test.file_name().to_string_lossy()
                ),
            });
        }
    }

    Ok(tests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays scripted results and records what each run could see
    struct FakeHarness {
        script: RefCell<VecDeque<io::Result<HarnessOutput>>>,
        seen: RefCell<Vec<Seen>>,
    }

    #[derive(Debug)]
    struct Seen {
        workspace: PathBuf,
        files: Vec<String>,
        source: String,
    }

    impl FakeHarness {
        fn new(script: Vec<io::Result<HarnessOutput>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl TestHarness for FakeHarness {
        fn name(&self) -> &str {
            "fake"
        }

        fn run(&self, workspace: &Path) -> io::Result<HarnessOutput> {
            let mut files: Vec<String> = std::fs::read_dir(workspace)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            files.sort();
            let source = std::fs::read_to_string(workspace.join("max.rs")).unwrap();
            self.seen.borrow_mut().push(Seen {
                workspace: workspace.to_path_buf(),
                files,
                source,
            });

            // Leave an artifact behind, like a build would
            std::fs::write(workspace.join("artifact.bin"), "x").unwrap();

            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(passed()))
        }
    }

    fn passed() -> HarnessOutput {
        HarnessOutput {
            success: true,
            code: Some(0),
            output: "test result: ok. 1 passed; 0 failed".to_string(),
        }
    }

    fn failed(output: &str) -> HarnessOutput {
        HarnessOutput {
            success: false,
            code: Some(101),
            output: output.to_string(),
        }
    }

    const MAX: &str = r#"
pub fn max(a: i32, b: i32) -> i32 {
    if a > b && !(a == b) { a } else { b }
}
"#;

    fn fixture() -> (SourceUnit, CandidateSet, Vec<TestFile>) {
        let unit = SourceUnit::parse("src/max.rs", MAX).unwrap();
        let candidates = scan(unit.tree());
        let tests = vec![TestFile::new("max_test.rs", "mod max;\n")];
        (unit, candidates, tests)
    }

    #[test]
    fn test_classification_mapping() {
        let classifier = Classifier::new("test result: FAILED");

        let (status, _) = classifier.classify(Ok(passed()));
        assert_eq!(status, MutationStatus::Survived);

        let killed = "running 1 test\ntest t ... FAILED\n\ntest result: FAILED. 0 passed; 1 failed\n\n";
        let (status, output) = classifier.classify(Ok(failed(killed)));
        assert_eq!(status, MutationStatus::Killed);
        assert_eq!(output, killed);

        let broken = "error[E0308]: mismatched types\nerror: aborting due to 1 previous error\n";
        let (status, output) = classifier.classify(Ok(failed(broken)));
        assert_eq!(status, MutationStatus::Errored);
        assert_eq!(output, broken);

        // Marker present but not on the last line
        let (status, _) = classifier.classify(Ok(failed("test result: FAILED\npanicked\n")));
        assert_eq!(status, MutationStatus::Errored);

        let (status, _) = classifier.classify(Ok(failed("")));
        assert_eq!(status, MutationStatus::Errored);

        let missing = io::Error::new(io::ErrorKind::NotFound, "no such program");
        let (status, output) = classifier.classify(Err(missing));
        assert_eq!(status, MutationStatus::Errored);
        assert!(output.contains("no such program"));
    }

    #[test]
    fn test_outcomes_follow_candidate_order() {
        let (mut unit, candidates, tests) = fixture();
        assert_eq!(candidates.len(), 3);
        let original = unit.render();

        let harness = FakeHarness::new(vec![
            Ok(failed("test result: FAILED. 0 passed; 1 failed")),
            Ok(passed()),
            Err(io::Error::new(io::ErrorKind::NotFound, "gone")),
        ]);
        let orchestrator =
            Orchestrator::new(&SwapOperator, &harness, Classifier::new("test result: FAILED"));

        let outcomes = orchestrator.run(&mut unit, &candidates, &tests).unwrap();

        let statuses: Vec<MutationStatus> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                MutationStatus::Killed,
                MutationStatus::Survived,
                MutationStatus::Errored
            ]
        );
        let ids: Vec<usize> = outcomes.iter().map(|o| o.candidate.id).collect();
        let expected: Vec<usize> = candidates.iter().map(|c| c.id).collect();
        assert_eq!(ids, expected);

        assert_eq!(outcomes[0].before, ">");
        assert_eq!(outcomes[0].after, "<=");
        assert_eq!(outcomes[1].before, "!");
        assert_eq!(outcomes[1].after, "!!");
        assert_eq!(outcomes[2].before, "&&");
        assert_eq!(outcomes[2].after, "||");
        assert!(outcomes[2].output.contains("gone"));

        assert_eq!(unit.render(), original);
    }

    #[test]
    fn test_each_trial_sees_one_mutation() {
        let (mut unit, candidates, tests) = fixture();
        let original = unit.render();
        let harness = FakeHarness::new(Vec::new());
        let orchestrator =
            Orchestrator::new(&SwapOperator, &harness, Classifier::new("test result: FAILED"));

        orchestrator.run(&mut unit, &candidates, &tests).unwrap();

        let seen = harness.seen.borrow();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].source.contains("a <= b && !(a == b)"));
        assert!(seen[1].source.contains("a > b && !!(a == b)"));
        assert!(seen[2].source.contains("a > b || !(a == b)"));
        for run in seen.iter() {
            assert_ne!(run.source, original);
        }
    }

    #[test]
    fn test_workspace_isolation() {
        let (mut unit, candidates, tests) = fixture();
        let harness = FakeHarness::new(Vec::new());
        let orchestrator =
            Orchestrator::new(&SwapOperator, &harness, Classifier::new("test result: FAILED"))
                .with_baseline(true);

        orchestrator.run(&mut unit, &candidates, &tests).unwrap();

        let seen = harness.seen.borrow();
        // Baseline plus one run per candidate
        assert_eq!(seen.len(), 4);
        for run in seen.iter() {
            assert_eq!(run.files, vec!["max.rs", "max_test.rs"]);
            assert_eq!(run.workspace, seen[0].workspace);
        }
        assert!(!seen[0].workspace.exists());
    }

    #[test]
    fn test_baseline_failure_aborts() {
        let (mut unit, candidates, tests) = fixture();
        let harness = FakeHarness::new(vec![Ok(failed("test result: FAILED. 0 passed; 1 failed"))]);
        let orchestrator =
            Orchestrator::new(&SwapOperator, &harness, Classifier::new("test result: FAILED"))
                .with_baseline(true);

        let result = orchestrator.run(&mut unit, &candidates, &tests);
        assert!(matches!(result, Err(MutationError::BaselineFailed { .. })));
        assert_eq!(harness.seen.borrow().len(), 1);
        assert!(!harness.seen.borrow()[0].workspace.exists());
    }

    #[test]
    fn test_empty_candidate_set() {
        let mut unit = SourceUnit::parse("max.rs", "pub fn max(a: i32) -> i32 { a }").unwrap();
        let candidates = scan(unit.tree());
        let harness = FakeHarness::new(Vec::new());
        let orchestrator =
            Orchestrator::new(&SwapOperator, &harness, Classifier::new("test result: FAILED"));

        let outcomes = orchestrator
            .run(&mut unit, &candidates, &[TestFile::new("max_test.rs", "")])
            .unwrap();
        assert!(outcomes.is_empty());
        assert!(harness.seen.borrow().is_empty());
    }

    #[test]
    fn test_operator_fault_aborts() {
        struct Broken;

        impl MutationOperator for Broken {
            fn name(&self) -> &str {
                "broken"
            }

            fn mutate(
                &self,
                _ast: &mut syn::File,
                candidate: &Candidate,
            ) -> Result<crate::mutator::MutationRecord> {
                Err(MutationError::UnsupportedOperator {
                    operator: "broken".to_string(),
                    found: candidate.operator.clone(),
                    candidate: candidate.id,
                })
            }

            fn unmutate(&self, _ast: &mut syn::File, _candidate: &Candidate) -> Result<()> {
                Ok(())
            }
        }

        let (mut unit, candidates, tests) = fixture();
        let harness = FakeHarness::new(Vec::new());
        let orchestrator =
            Orchestrator::new(&Broken, &harness, Classifier::new("test result: FAILED"));

        let result = orchestrator.run(&mut unit, &candidates, &tests);
        assert!(matches!(
            result,
            Err(MutationError::UnsupportedOperator { .. })
        ));
        assert!(harness.seen.borrow().is_empty());
    }

    #[test]
    fn test_non_inverse_operator_is_caught() {
        /// Swaps on mutate but never reverts
        struct OneWay;

        impl MutationOperator for OneWay {
            fn name(&self) -> &str {
                "one-way"
            }

            fn mutate(
                &self,
                ast: &mut syn::File,
                candidate: &Candidate,
            ) -> Result<crate::mutator::MutationRecord> {
                SwapOperator.mutate(ast, candidate)
            }

            fn unmutate(&self, _ast: &mut syn::File, _candidate: &Candidate) -> Result<()> {
                Ok(())
            }
        }

        let (mut unit, candidates, tests) = fixture();
        let harness = FakeHarness::new(Vec::new());
        let orchestrator =
            Orchestrator::new(&OneWay, &harness, Classifier::new("test result: FAILED"));

        let result = orchestrator.run(&mut unit, &candidates, &tests);
        assert!(matches!(result, Err(MutationError::RestoreMismatch { .. })));
        assert!(!harness.seen.borrow()[0].workspace.exists());
    }

    #[test]
    fn test_write_failure_reverts_and_cleans_up() {
        let (mut unit, candidates, _) = fixture();
        let original = unit.render();
        let tests = vec![TestFile::new("missing_dir/max_test.rs", "mod max;\n")];
        let harness = FakeHarness::new(Vec::new());
        let orchestrator =
            Orchestrator::new(&SwapOperator, &harness, Classifier::new("test result: FAILED"));

        let result = orchestrator.run(&mut unit, &candidates, &tests);
        let file = match result {
            Err(MutationError::WriteError { file, .. }) => file,
            other => panic!("expected WriteError, got {:?}", other),
        };

        assert!(file.ends_with("missing_dir/max_test.rs"));
        assert_eq!(unit.render(), original);
        assert!(harness.seen.borrow().is_empty());

        let workspace = file.parent().and_then(Path::parent).unwrap();
        assert!(!workspace.exists(), "{}", workspace.display());
    }

    #[test]
    fn test_load_tests_rejects_name_clash() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("max.rs"), "").unwrap();
        std::fs::write(nested.join("max.rs"), "").unwrap();

        let unit = SourceUnit::parse("src/max.rs", "fn f() {}").unwrap();
        let result = load_tests(&unit, &[nested.join("max.rs")]);
        assert!(matches!(result, Err(MutationError::ConfigError { .. })));

        let result = load_tests(&unit, &[]);
        assert!(matches!(result, Err(MutationError::ConfigError { .. })));
    }
}
