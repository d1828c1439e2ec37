//! Report generation for mutation testing results
//!
//! This module collects trial outcomes and displays them.

use colored::Colorize;
use std::time::Duration;

use crate::runner::{MutationStatus, TrialOutcome};

/// Summary report of mutation testing
#[derive(Debug)]
pub struct MutationReport {
    pub results: Vec<TrialOutcome>,
    pub total_duration: Duration,
}

impl MutationReport {
    /// Create a new report from results, keeping their order
    pub fn new(results: Vec<TrialOutcome>) -> Self {
        let total_duration = results.iter().map(|r| r.duration).sum();
        Self {
            results,
            total_duration,
        }
    }

    fn count(&self, status: MutationStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Count of mutations that were killed (detected by tests)
    pub fn killed(&self) -> usize {
        self.count(MutationStatus::Killed)
    }

    /// Count of mutations that survived (not detected by tests)
    pub fn survived(&self) -> usize {
        self.count(MutationStatus::Survived)
    }

    /// Count of trials whose outcome could not be attributed
    pub fn errored(&self) -> usize {
        self.count(MutationStatus::Errored)
    }

    /// Total number of mutations
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Killed / (Killed + Survived) as a percentage; errored trials are
    /// left out. `None` when nothing could be scored.
    pub fn score(&self) -> Option<f64> {
        let testable = self.killed() + self.survived();
        if testable == 0 {
            return None;
        }
        Some((self.killed() as f64 / testable as f64) * 100.0)
    }

    /// Get surviving mutations (test gaps)
    pub fn survivors(&self) -> Vec<&TrialOutcome> {
        self.results
            .iter()
            .filter(|r| r.status == MutationStatus::Survived)
            .collect()
    }

    pub fn errors(&self) -> Vec<&TrialOutcome> {
        self.results
            .iter()
            .filter(|r| r.status == MutationStatus::Errored)
            .collect()
    }

    /// Print the report to stdout
    pub fn print(&self) {
        println!();
        println!("{}", "Mutation Testing Report".bold());
        println!("{}", "=".repeat(60));
        println!();

        if self.results.is_empty() {
            println!("{}", "No mutable conditions found.".dimmed());
        }

        for result in &self.results {
            let status_str = match result.status {
                MutationStatus::Killed => "[KILLED]".green().bold(),
                MutationStatus::Survived => "[SURVIVED]".red().bold(),
                MutationStatus::Errored => "[ERRORED]".yellow().bold(),
            };

            println!(
                "{} {} -> {} in `{}`",
                status_str, result.before, result.after, result.candidate.snippet
            );
            println!(
                "        {} {}",
                format!("{}:{}", result.candidate.line, result.candidate.column).dimmed(),
                result.candidate.context.to_string().dimmed()
            );
        }

        // Print summary
        println!();
        println!("{}", "Summary".bold());
        println!("{}", "-".repeat(40));
        println!("Total mutations:   {}", self.total());
        println!(
            "Killed:            {} {}",
            self.killed(),
            "(good - tests caught the mutation)".dimmed()
        );
        println!(
            "Survived:          {} {}",
            self.survived(),
            "(bad - tests missed the mutation)".dimmed()
        );
        println!(
            "Errored:           {} {}",
            self.errored(),
            "(not counted in the score)".dimmed()
        );

        println!();
        match self.score() {
            Some(score) => {
                let score_str = format!("{:.1}%", score);
                let score_colored = if score >= 90.0 {
                    score_str.green().bold()
                } else if score >= 70.0 {
                    score_str.yellow().bold()
                } else {
                    score_str.red().bold()
                };
                println!("Mutation Score:    {}", score_colored);
            }
            None => println!("Mutation Score:    {}", "n/a".dimmed()),
        }
        println!("Duration:          {}", format_duration(self.total_duration));

        // Print surviving mutations if any
        let survivors = self.survivors();
        if !survivors.is_empty() {
            println!();
            println!(
                "{}",
                "Surviving Mutations (improve your tests!)".red().bold()
            );
            println!("{}", "-".repeat(40));
            for mutation in survivors {
                println!(
                    "  • {} -> {}",
                    mutation.before.yellow(),
                    mutation.after.yellow()
                );
                println!(
                    "    in `{}` at line {}",
                    mutation.candidate.snippet, mutation.candidate.line
                );
            }
        }

        // Errored trials carry their full output so tooling noise can be
        // told apart from real gaps
        let errors = self.errors();
        if !errors.is_empty() {
            println!();
            println!("{}", "Errored Trials".yellow().bold());
            println!("{}", "-".repeat(40));
            for trial in errors {
                println!("  • {}", trial.description());
                for line in trial.output.lines() {
                    println!("    {}", line.dimmed());
                }
            }
        }
    }
}

/// Format duration in a human-readable way
fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining_secs)
    }
}
