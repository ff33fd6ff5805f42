//! Configurations that could not be measured

use std::fmt;
use std::process::ExitCode;

use kernelbench_backends::BenchError;

/// One aborted configuration.
#[derive(Debug)]
pub struct Failure {
    pub group: String,
    pub label: String,
    pub size: usize,
    pub error: BenchError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}: {}", self.group, self.label, self.size, self.error)
    }
}

/// Errors collected while registering benchmark groups.
#[derive(Debug, Default)]
pub struct FailureLog {
    failures: Vec<Failure>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, group: &str, label: &str, size: usize, error: BenchError) {
        self.failures.push(Failure {
            group: group.to_string(),
            label: label.to_string(),
            size,
            error,
        });
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Failure> {
        self.failures.iter()
    }

    /// Human readable summary, one line per failure.
    pub fn summary(&self) -> String {
        let mut out = format!("{} benchmark configuration(s) failed:", self.failures.len());
        for failure in &self.failures {
            out.push_str("\n  ");
            out.push_str(&failure.to_string());
        }
        out
    }

    /// Print the summary to stderr if anything failed and pick the exit code.
    pub fn finish(&self) -> ExitCode {
        if self.is_empty() {
            ExitCode::SUCCESS
        } else {
            eprintln!("{}", self.summary());
            ExitCode::FAILURE
        }
    }
}
