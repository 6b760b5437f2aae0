//! Process spawning collaborator.
//!
//! The evaluator never touches `std::process` directly: it hands each
//! expanded command to a [`Spawner`] and maps the [`SpawnOutcome`] to an
//! [`ExitStatus`]. [`SystemSpawner`] is the real implementation; tests
//! substitute a recording one.

mod jobs;
mod system;

use thiserror::Error;

use crate::interpreter::ExitStatus;

pub use jobs::{JobId, JobStatus, JobTable};
pub use system::{resolve_in_path, SystemSpawner};

/// One fully expanded command, ready to run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    pub argv: Vec<String>,
    /// The complete environment for the child, sorted by name.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(argv: Vec<String>, env: Vec<(String, String)>) -> Self {
        Self { argv, env }
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// How a spawned command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnOutcome {
    Exited(i32),
    Signaled(i32),
    NotFound,
    NotExecutable,
    /// The spawn itself failed for another reason.
    Failed(String),
}

impl SpawnOutcome {
    pub fn status(&self) -> ExitStatus {
        match self {
            SpawnOutcome::Exited(code) => ExitStatus(*code),
            SpawnOutcome::Signaled(signal) => ExitStatus::from_signal(*signal),
            SpawnOutcome::NotFound => ExitStatus::NOT_FOUND,
            SpawnOutcome::NotExecutable => ExitStatus::NOT_EXECUTABLE,
            SpawnOutcome::Failed(_) => ExitStatus::FAILURE,
        }
    }
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("pipeline has no stages")]
    EmptyPipeline,
    #[error("{0}: command not found")]
    NotFound(String),
    #[error("{0}: permission denied")]
    NotExecutable(String),
    #[error("failed to start {program}: {source}")]
    Start {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs expanded commands. Every call blocks until its outcome is known,
/// except [`Spawner::spawn_background`].
pub trait Spawner {
    /// Run one command with inherited stdio and wait for it.
    fn run(&mut self, invocation: &Invocation) -> SpawnOutcome;

    /// Run stages concurrently, each stage's stdout feeding the next stage's
    /// stdin, and wait for all of them. The outcome is the last stage's.
    fn run_pipeline(&mut self, stages: &[Invocation]) -> SpawnOutcome;

    /// Start stages like [`Spawner::run_pipeline`] without waiting.
    fn spawn_background(&mut self, stages: &[Invocation]) -> Result<JobId, SpawnError>;
}

impl<S: Spawner + ?Sized> Spawner for &mut S {
    fn run(&mut self, invocation: &Invocation) -> SpawnOutcome {
        (**self).run(invocation)
    }

    fn run_pipeline(&mut self, stages: &[Invocation]) -> SpawnOutcome {
        (**self).run_pipeline(stages)
    }

    fn spawn_background(&mut self, stages: &[Invocation]) -> Result<JobId, SpawnError> {
        (**self).spawn_background(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_status_mapping() {
        assert_eq!(SpawnOutcome::Exited(3).status(), ExitStatus(3));
        assert_eq!(SpawnOutcome::Signaled(15).status(), ExitStatus(143));
        assert_eq!(SpawnOutcome::NotFound.status(), ExitStatus::NOT_FOUND);
        assert_eq!(SpawnOutcome::NotExecutable.status(), ExitStatus::NOT_EXECUTABLE);
        assert_eq!(
            SpawnOutcome::Failed("boom".into()).status(),
            ExitStatus::FAILURE
        );
    }

    #[test]
    fn invocation_env_lookup() {
        let inv = Invocation::new(
            vec!["ls".into()],
            vec![("PATH".into(), "/bin".into())],
        );
        assert_eq!(inv.program(), Some("ls"));
        assert_eq!(inv.env_var("PATH"), Some("/bin"));
        assert_eq!(inv.env_var("HOME"), None);
    }
}
