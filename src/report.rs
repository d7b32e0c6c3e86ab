//! Collected results of a dispatcher run.
//!
//! Checks never panic. A failed check records a [`Failure`] on the
//! [`ScenarioReport`] it was given and the next check runs. A check that
//! cannot continue records a fatal failure and returns [`Abort`], which
//! stops the remaining checks of that scenario only.

use std::fmt;

/// Returned by a check that cannot meaningfully continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    pub fatal: bool,
}

/// Failures of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub group: String,
    pub name: String,
    pub failures: Vec<Failure>,
    pub aborted: bool,
}

impl ScenarioReport {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            failures: Vec::new(),
            aborted: false,
        }
    }

    /// Records a failure; checks continue.
    pub fn error(&mut self, message: impl Into<String>) {
        self.failures.push(Failure {
            message: message.into(),
            fatal: false,
        });
    }

    /// Records a failure that ends the scenario.
    pub fn fatal(&mut self, message: impl Into<String>) -> Abort {
        self.failures.push(Failure {
            message: message.into(),
            fatal: true,
        });
        self.aborted = true;
        Abort
    }

    /// Records `message` unless `condition` holds. Returns `condition`.
    pub fn check(&mut self, condition: bool, message: impl FnOnce() -> String) -> bool {
        if !condition {
            self.error(message());
        }
        condition
    }

    /// Unwraps `value` or ends the scenario with `message`.
    pub fn require<T>(&mut self, value: Option<T>, message: impl FnOnce() -> String) -> Result<T, Abort> {
        value.ok_or_else(|| self.fatal(message()))
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed() { "ok" } else { "FAILED" };
        write!(f, "[{}] {}: {}", self.group, self.name, status)?;
        for failure in &self.failures {
            let marker = if failure.fatal { "fatal" } else { "error" };
            write!(f, "\n    {}: {}", marker, failure.message)?;
        }
        Ok(())
    }
}

/// Results of every scenario in one or more dispatcher runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scenario: ScenarioReport) {
        self.scenarios.push(scenario);
    }

    pub fn merge(&mut self, other: SuiteReport) {
        self.scenarios.extend(other.scenarios);
    }

    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    pub fn failure_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.failures.len()).sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.scenarios.iter().filter(|s| !s.passed())
    }

    pub fn scenario(&self, group: &str, name: &str) -> Option<&ScenarioReport> {
        self.scenarios
            .iter()
            .find(|s| s.group == group && s.name == name)
    }

    /// Panics with every failure when any scenario failed.
    #[track_caller]
    pub fn assert_passed(&self) {
        if !self.passed() {
            panic!("{}", self);
        }
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failed().count();
        write!(
            f,
            "{} scenarios, {} failed, {} failures",
            self.scenarios.len(),
            failed,
            self.failure_count()
        )?;
        for scenario in self.failed() {
            write!(f, "\n{}", scenario)?;
        }
        Ok(())
    }
}
