//! Background job bookkeeping for pipelines started with `&`.

use std::collections::BTreeMap;
use std::fmt;
use std::process::Child;

use crate::interpreter::ExitStatus;

use super::system::outcome_from_status;
use super::SpawnOutcome;

/// Unique identifier for a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Done(ExitStatus),
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Done(status) => write!(f, "Done({status})"),
        }
    }
}

#[derive(Debug)]
struct Stage {
    child: Child,
    status: Option<ExitStatus>,
}

impl Stage {
    fn poll(&mut self) -> Option<ExitStatus> {
        if self.status.is_none() {
            self.status = match self.child.try_wait() {
                Ok(Some(status)) => Some(outcome_from_status(status).status()),
                Ok(None) => None,
                Err(err) => Some(SpawnOutcome::Failed(err.to_string()).status()),
            };
        }
        self.status
    }

    fn wait(&mut self) -> ExitStatus {
        if let Some(status) = self.status {
            return status;
        }
        let status = match self.child.wait() {
            Ok(status) => outcome_from_status(status).status(),
            Err(err) => SpawnOutcome::Failed(err.to_string()).status(),
        };
        self.status = Some(status);
        status
    }
}

/// A background pipeline.
#[derive(Debug)]
struct Job {
    command: String,
    stages: Vec<Stage>,
}

impl Job {
    /// The job is done when every stage is; its status is the last stage's.
    fn poll(&mut self) -> JobStatus {
        let mut last = ExitStatus::SUCCESS;
        for stage in &mut self.stages {
            match stage.poll() {
                Some(status) => last = status,
                None => return JobStatus::Running,
            }
        }
        JobStatus::Done(last)
    }

    fn wait(&mut self) -> ExitStatus {
        self.stages
            .iter_mut()
            .map(Stage::wait)
            .last()
            .unwrap_or(ExitStatus::SUCCESS)
    }
}

/// Running background jobs, keyed by id.
#[derive(Debug, Default)]
pub struct JobTable {
    next_id: u64,
    jobs: BTreeMap<JobId, Job>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record started children under a fresh id.
    pub fn insert(&mut self, command: impl Into<String>, children: Vec<Child>) -> JobId {
        self.next_id += 1;
        let id = JobId(self.next_id);
        let stages = children
            .into_iter()
            .map(|child| Stage {
                child,
                status: None,
            })
            .collect();
        self.jobs.insert(
            id,
            Job {
                command: command.into(),
                stages,
            },
        );
        id
    }

    /// Poll one job without blocking.
    pub fn status(&mut self, id: JobId) -> Option<JobStatus> {
        self.jobs.get_mut(&id).map(Job::poll)
    }

    /// The command line a job was started with.
    pub fn command(&self, id: JobId) -> Option<&str> {
        self.jobs.get(&id).map(|job| job.command.as_str())
    }

    /// Remove and return every finished job, in id order.
    pub fn reap(&mut self) -> Vec<(JobId, ExitStatus)> {
        let mut finished = Vec::new();
        for (id, job) in &mut self.jobs {
            if let JobStatus::Done(status) = job.poll() {
                finished.push((*id, status));
            }
        }
        for (id, status) in &finished {
            self.jobs.remove(id);
            tracing::debug!(job = %id, %status, "background job reaped");
        }
        finished
    }

    /// Block until a job finishes and remove it.
    ///
    /// Returns `None` for an unknown (or already reaped) id.
    pub fn wait(&mut self, id: JobId) -> Option<ExitStatus> {
        let mut job = self.jobs.remove(&id)?;
        let status = job.wait();
        tracing::debug!(job = %id, %status, "background job finished");
        Some(status)
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    fn spawn(script: &str) -> Child {
        Command::new("/bin/sh")
            .arg("-c")
            .arg(script)
            .spawn()
            .expect("spawn /bin/sh")
    }

    #[test]
    fn ids_are_sequential() {
        let mut table = JobTable::new();
        let a = table.insert("true", vec![spawn("exit 0")]);
        let b = table.insert("false", vec![spawn("exit 1")]);
        assert_eq!(a, JobId(1));
        assert_eq!(b, JobId(2));
        assert_eq!(table.command(b), Some("false"));
        assert_eq!(table.wait(a), Some(ExitStatus::SUCCESS));
        assert_eq!(table.wait(b), Some(ExitStatus::FAILURE));
        assert_eq!(table.wait(b), None);
    }

    #[test]
    fn status_is_last_stage() {
        let mut table = JobTable::new();
        let id = table.insert("a | b", vec![spawn("exit 3"), spawn("exit 0")]);
        assert_eq!(table.wait(id), Some(ExitStatus::SUCCESS));
    }

    #[test]
    fn reap_collects_finished_jobs() {
        let mut table = JobTable::new();
        let id = table.insert("exit 2", vec![spawn("exit 2")]);
        let mut reaped = Vec::new();
        for _ in 0..200 {
            reaped = table.reap();
            if !reaped.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(reaped, vec![(id, ExitStatus(2))]);
        assert!(table.is_empty());
    }
}
