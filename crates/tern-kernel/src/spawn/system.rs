//! `std::process` backed spawner.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::config::SpawnConfig;

use super::jobs::{JobId, JobTable};
use super::{Invocation, SpawnError, SpawnOutcome, Spawner};

/// Spawns real processes with inherited stdio.
#[derive(Debug, Default)]
pub struct SystemSpawner {
    config: SpawnConfig,
    jobs: JobTable,
}

/// Why a command could not be started.
enum Unresolved {
    NotFound,
    NotExecutable,
}

impl SystemSpawner {
    pub fn new(config: SpawnConfig) -> Self {
        Self {
            config,
            jobs: JobTable::new(),
        }
    }

    /// Background jobs started by this spawner.
    pub fn jobs(&mut self) -> &mut JobTable {
        &mut self.jobs
    }

    /// Find the executable for `program`, searching the invocation's `PATH`
    /// (or the configured default) unless the name contains a slash.
    fn resolve(&self, invocation: &Invocation, program: &str) -> Result<PathBuf, Unresolved> {
        if program.contains('/') {
            let path = Path::new(program);
            if !path.exists() {
                return Err(Unresolved::NotFound);
            }
            if !is_executable(path) {
                return Err(Unresolved::NotExecutable);
            }
            return Ok(path.to_path_buf());
        }

        let path_var = invocation
            .env_var("PATH")
            .unwrap_or(self.config.default_path.as_str());
        match resolve_in_path(program, path_var) {
            Some(found) => Ok(found),
            None if found_but_not_executable(program, path_var) => Err(Unresolved::NotExecutable),
            None => Err(Unresolved::NotFound),
        }
    }

    fn command(&self, invocation: &Invocation, executable: &Path) -> Command {
        let mut cmd = Command::new(executable);
        cmd.args(invocation.argv.iter().skip(1));
        if !self.config.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(invocation.env.iter().map(|(k, v)| (k, v)));
        cmd
    }

    /// Start every stage, wiring stdout to the next stage's stdin.
    ///
    /// On failure the stages already started are killed and reaped.
    fn start_stages(&self, stages: &[Invocation]) -> Result<Vec<Child>, SpawnError> {
        if stages.is_empty() {
            return Err(SpawnError::EmptyPipeline);
        }

        let mut children: Vec<Child> = Vec::with_capacity(stages.len());
        let last = stages.len() - 1;
        for (index, stage) in stages.iter().enumerate() {
            let started = self.start_stage(stage, index, last, children.last_mut());
            match started {
                Ok(child) => children.push(child),
                Err(err) => {
                    for mut child in children {
                        let _ = child.kill();
                        let _ = child.wait();
                    }
                    return Err(err);
                }
            }
        }
        Ok(children)
    }

    fn start_stage(
        &self,
        stage: &Invocation,
        index: usize,
        last: usize,
        upstream: Option<&mut Child>,
    ) -> Result<Child, SpawnError> {
        let program = stage.program().unwrap_or_default().to_string();
        let executable = self.resolve(stage, &program).map_err(|why| match why {
            Unresolved::NotFound => SpawnError::NotFound(program.clone()),
            Unresolved::NotExecutable => SpawnError::NotExecutable(program.clone()),
        })?;

        let mut cmd = self.command(stage, &executable);
        if index > 0 {
            let stdin = upstream
                .and_then(|child| child.stdout.take())
                .map(Stdio::from)
                .unwrap_or_else(Stdio::null);
            cmd.stdin(stdin);
        }
        if index < last {
            cmd.stdout(Stdio::piped());
        }

        tracing::debug!(stage = index, program = %program, executable = %executable.display(), "starting pipeline stage");
        cmd.spawn()
            .map_err(|source| SpawnError::Start { program, source })
    }
}

impl Spawner for SystemSpawner {
    #[tracing::instrument(level = "debug", skip(self, invocation), fields(argc = invocation.argv.len()))]
    fn run(&mut self, invocation: &Invocation) -> SpawnOutcome {
        let Some(program) = invocation.program() else {
            return SpawnOutcome::Failed("empty command".to_string());
        };

        let executable = match self.resolve(invocation, program) {
            Ok(path) => path,
            Err(Unresolved::NotFound) => {
                tracing::warn!(%program, "command not found");
                return SpawnOutcome::NotFound;
            }
            Err(Unresolved::NotExecutable) => {
                tracing::warn!(%program, "command not executable");
                return SpawnOutcome::NotExecutable;
            }
        };

        tracing::debug!(%program, executable = %executable.display(), "spawning");
        match self.command(invocation, &executable).status() {
            Ok(status) => outcome_from_status(status),
            Err(err) => outcome_from_io(program, err),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, stages), fields(stage_count = stages.len()))]
    fn run_pipeline(&mut self, stages: &[Invocation]) -> SpawnOutcome {
        let children = match self.start_stages(stages) {
            Ok(children) => children,
            Err(err) => return outcome_from_spawn_error(err),
        };

        let mut outcome = SpawnOutcome::Exited(0);
        for mut child in children {
            outcome = match child.wait() {
                Ok(status) => outcome_from_status(status),
                Err(err) => SpawnOutcome::Failed(err.to_string()),
            };
        }
        outcome
    }

    #[tracing::instrument(level = "debug", skip(self, stages), fields(stage_count = stages.len()))]
    fn spawn_background(&mut self, stages: &[Invocation]) -> Result<JobId, SpawnError> {
        let children = self.start_stages(stages)?;
        let description = stages
            .iter()
            .map(|stage| stage.argv.join(" "))
            .collect::<Vec<_>>()
            .join(" | ");
        let id = self.jobs.insert(description, children);
        tracing::debug!(job = %id, "background job started");
        Ok(id)
    }
}

/// Resolve a command name in PATH.
///
/// Searches each directory in `path_var` (colon-separated) for an executable
/// file named `name`. Returns the full path if found.
pub fn resolve_in_path(name: &str, path_var: &str) -> Option<PathBuf> {
    path_var
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(name))
        .find(|candidate| candidate.is_file() && is_executable(candidate))
}

fn found_but_not_executable(name: &str, path_var: &str) -> bool {
    path_var
        .split(':')
        .filter(|dir| !dir.is_empty())
        .any(|dir| Path::new(dir).join(name).is_file())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

pub(crate) fn outcome_from_status(status: std::process::ExitStatus) -> SpawnOutcome {
    if let Some(code) = status.code() {
        return SpawnOutcome::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return SpawnOutcome::Signaled(signal);
        }
    }
    SpawnOutcome::Failed(format!("unrecognized exit status: {status}"))
}

fn outcome_from_io(program: &str, err: io::Error) -> SpawnOutcome {
    tracing::warn!(%program, error = %err, "spawn failed");
    match err.kind() {
        io::ErrorKind::NotFound => SpawnOutcome::NotFound,
        io::ErrorKind::PermissionDenied => SpawnOutcome::NotExecutable,
        _ => SpawnOutcome::Failed(err.to_string()),
    }
}

fn outcome_from_spawn_error(err: SpawnError) -> SpawnOutcome {
    tracing::warn!(error = %err, "pipeline failed to start");
    match err {
        SpawnError::NotFound(_) => SpawnOutcome::NotFound,
        SpawnError::NotExecutable(_) => SpawnOutcome::NotExecutable,
        SpawnError::Start { program, source } => outcome_from_io(&program, source),
        SpawnError::EmptyPipeline => SpawnOutcome::Exited(0),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = env::temp_dir().join(format!("tern-spawn-test-{}-{}", std::process::id(), id));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn write_script(dir: &Path, name: &str, body: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod");
        path
    }

    fn sh(args: &[&str], env: &[(&str, &str)]) -> Invocation {
        Invocation::new(
            args.iter().map(|a| a.to_string()).collect(),
            env.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn resolve_in_path_skips_non_executables() {
        let dir = temp_dir();
        let other = temp_dir();
        write_script(&dir, "tool", "#!/bin/sh\n", 0o644);
        let exe = write_script(&other, "tool", "#!/bin/sh\n", 0o755);

        let path_var = format!("{}::{}", dir.display(), other.display());
        assert_eq!(resolve_in_path("tool", &path_var), Some(exe));
        assert_eq!(resolve_in_path("missing", &path_var), None);

        let _ = fs::remove_dir_all(&dir);
        let _ = fs::remove_dir_all(&other);
    }

    #[test]
    fn missing_and_unexecutable_commands() {
        let dir = temp_dir();
        write_script(&dir, "plain", "data\n", 0o644);
        let path_var = dir.display().to_string();

        let mut spawner = SystemSpawner::default();
        assert_eq!(
            spawner.run(&sh(&["nope-not-here"], &[("PATH", path_var.as_str())])),
            SpawnOutcome::NotFound
        );
        assert_eq!(
            spawner.run(&sh(&["plain"], &[("PATH", path_var.as_str())])),
            SpawnOutcome::NotExecutable
        );
        let direct = dir.join("plain").display().to_string();
        assert_eq!(spawner.run(&sh(&[direct.as_str()], &[])), SpawnOutcome::NotExecutable);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn exit_code_and_environment() {
        let check = "[ \"$GREETING\" = hello ] || exit 9; exit 3";

        let mut spawner = SystemSpawner::default();
        let outcome = spawner.run(&sh(&["/bin/sh", "-c", check], &[("GREETING", "hello")]));
        assert_eq!(outcome, SpawnOutcome::Exited(3));
        let outcome = spawner.run(&sh(&["/bin/sh", "-c", check], &[("GREETING", "bye")]));
        assert_eq!(outcome, SpawnOutcome::Exited(9));
    }

    #[test]
    fn pipeline_status_is_last_stage() {
        let dir = temp_dir();
        let out = dir.join("out");
        let store = format!("cat > '{}'", out.display());
        let path_var = "/bin:/usr/bin";

        let mut spawner = SystemSpawner::default();
        let outcome = spawner.run_pipeline(&[
            sh(&["sh", "-c", "echo piped; exit 4"], &[("PATH", path_var)]),
            sh(&["sh", "-c", store.as_str()], &[("PATH", path_var)]),
        ]);
        assert_eq!(outcome, SpawnOutcome::Exited(0));
        assert_eq!(fs::read_to_string(&out).expect("read output"), "piped\n");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn pipeline_with_missing_stage_reports_not_found() {
        let mut spawner = SystemSpawner::default();
        let outcome = spawner.run_pipeline(&[
            sh(&["/bin/sh", "-c", "exit 0"], &[]),
            sh(&["no-such-stage-xyz"], &[("PATH", "/nonexistent")]),
        ]);
        assert_eq!(outcome, SpawnOutcome::NotFound);
    }

    #[test]
    fn background_job_is_recorded() {
        let mut spawner = SystemSpawner::default();
        let id = spawner
            .spawn_background(&[sh(&["/bin/sh", "-c", "exit 5"], &[])])
            .expect("spawn background");
        assert_eq!(spawner.jobs().command(id), Some("/bin/sh -c exit 5"));
        assert_eq!(spawner.jobs().wait(id), Some(crate::interpreter::ExitStatus(5)));
        assert!(spawner.jobs().is_empty());
    }
}
