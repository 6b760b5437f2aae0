//! Tree evaluation for tern.
//!
//! The evaluator walks [`ShellNode`] trees, expanding argument words
//! through the scope and handing commands to a [`Spawner`]. Process
//! failures are data: they come back as [`ExitStatus`] values and flow
//! through the combinators. Only expansion faults (arithmetic errors, a
//! failed command substitution) and malformed pipelines are errors.
//!
//! Command substitution (`$(...)`, backquotes) needs something that can
//! parse and run a script, which lives above this layer; it is plugged in
//! through [`CommandSubstituter`].

use thiserror::Error;

use tern_glob::glob_match;

use crate::arithmetic::{self, ArithError};
use crate::ast::{
    Arg, ChainOp, CommandNode, IfNode, LoopKind, PipelineNode, ShellNode, Substitution,
    SUBSTITUTION_MARKER,
};
use crate::spawn::{Invocation, JobId, Spawner};

use super::scope::{FrameGuard, Scope};
use super::status::ExitStatus;

/// Faults that abort evaluation of the current tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithError),
    /// No substituter was installed.
    #[error("no command substituter available for `{0}`")]
    NoSubstituter(String),
    #[error("command substitution failed: {0}")]
    CommandFailed(String),
    #[error("{kind} cannot be a pipeline stage")]
    UnsupportedPipelineStage { kind: &'static str },
}

/// Result type for evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Runs the script of a command substitution and captures its output.
pub trait CommandSubstituter {
    /// Return everything `script` wrote to standard output.
    fn substitute(&mut self, script: &str, scope: &mut dyn Scope) -> EvalResult<String>;
}

impl<F> CommandSubstituter for F
where
    F: FnMut(&str, &mut dyn Scope) -> EvalResult<String>,
{
    fn substitute(&mut self, script: &str, scope: &mut dyn Scope) -> EvalResult<String> {
        self(script, scope)
    }
}

/// A substituter that always returns an error.
pub struct NoSubstitution;

impl CommandSubstituter for NoSubstitution {
    fn substitute(&mut self, script: &str, _scope: &mut dyn Scope) -> EvalResult<String> {
        Err(EvalError::NoSubstituter(script.to_string()))
    }
}

/// Tree evaluator.
///
/// Holds the spawner, the command substituter and the status of the last
/// evaluated node (`$?`). The scope is passed per call so one evaluator can
/// serve nested scopes.
pub struct Evaluator<'a, S: Spawner> {
    spawner: S,
    substituter: Box<dyn CommandSubstituter + 'a>,
    last_status: ExitStatus,
    last_background: Option<JobId>,
}

impl<'a, S: Spawner> Evaluator<'a, S> {
    /// Create an evaluator without command substitution.
    pub fn new(spawner: S) -> Self {
        Self {
            spawner,
            substituter: Box::new(NoSubstitution),
            last_status: ExitStatus::SUCCESS,
            last_background: None,
        }
    }

    pub fn with_substituter(mut self, substituter: impl CommandSubstituter + 'a) -> Self {
        self.substituter = Box::new(substituter);
        self
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn spawner_mut(&mut self) -> &mut S {
        &mut self.spawner
    }

    pub fn into_spawner(self) -> S {
        self.spawner
    }

    /// Status of the most recently evaluated node.
    pub fn last_status(&self) -> ExitStatus {
        self.last_status
    }

    /// Id of the most recently started background job.
    pub fn last_background(&self) -> Option<JobId> {
        self.last_background
    }

    /// Evaluate a node to its exit status.
    pub fn evaluate(&mut self, node: &ShellNode, scope: &mut dyn Scope) -> EvalResult<ExitStatus> {
        let status = match node {
            ShellNode::List(nodes) => self.eval_list(nodes, scope)?,
            ShellNode::AndOr { op, left, right } => {
                let left = self.evaluate(left, scope)?;
                match (op, left.success()) {
                    (ChainOp::And, true) | (ChainOp::Or, false) => self.evaluate(right, scope)?,
                    _ => left,
                }
            }
            ShellNode::Negate(inner) => self.evaluate(inner, scope)?.negate(),
            ShellNode::Loop {
                kind,
                condition,
                body,
            } => self.eval_loop(*kind, condition, body, scope)?,
            ShellNode::For { var, items, body } => self.eval_for(var, items, body, scope)?,
            ShellNode::If(node) => self.eval_if(node, scope)?,
            ShellNode::Case { subject, arms } => {
                let subject = self.expand(subject, scope)?;
                let mut status = ExitStatus::SUCCESS;
                'arms: for arm in arms {
                    for pattern in &arm.patterns {
                        let pattern = self.expand(pattern, scope)?;
                        if glob_match(&pattern, &subject) {
                            status = self.evaluate(&arm.body, scope)?;
                            break 'arms;
                        }
                    }
                }
                status
            }
            ShellNode::Command(cmd) => self.eval_command(cmd, scope)?,
            ShellNode::Arithmetic(expr) => {
                let value = arithmetic::evaluate(expr, scope)?;
                ExitStatus::from(value != 0)
            }
            ShellNode::Pipeline(pipeline) => self.eval_pipeline(pipeline, scope)?,
            ShellNode::Eof => ExitStatus::SUCCESS,
        };

        self.last_status = status;
        Ok(status)
    }

    fn eval_list(&mut self, nodes: &[ShellNode], scope: &mut dyn Scope) -> EvalResult<ExitStatus> {
        let mut status = ExitStatus::SUCCESS;
        for node in nodes {
            status = self.evaluate(node, scope)?;
        }
        Ok(status)
    }

    fn eval_loop(
        &mut self,
        kind: LoopKind,
        condition: &ShellNode,
        body: &ShellNode,
        scope: &mut dyn Scope,
    ) -> EvalResult<ExitStatus> {
        let mut status = ExitStatus::SUCCESS;
        loop {
            let test = self.evaluate(condition, scope)?;
            let proceed = match kind {
                LoopKind::While => test.success(),
                LoopKind::Until => !test.success(),
            };
            if !proceed {
                break;
            }
            status = self.evaluate(body, scope)?;
        }
        Ok(status)
    }

    /// Each word expands to exactly one value; there is no field splitting.
    fn eval_for(
        &mut self,
        var: &str,
        items: &[Arg],
        body: &ShellNode,
        scope: &mut dyn Scope,
    ) -> EvalResult<ExitStatus> {
        let values = items
            .iter()
            .map(|item| self.expand(item, scope))
            .collect::<EvalResult<Vec<_>>>()?;

        let mut status = ExitStatus::SUCCESS;
        for value in values {
            scope.set(var, value);
            status = self.evaluate(body, scope)?;
        }
        Ok(status)
    }

    fn eval_if(&mut self, node: &IfNode, scope: &mut dyn Scope) -> EvalResult<ExitStatus> {
        let Some(condition) = &node.condition else {
            return self.evaluate(&node.body, scope);
        };
        if self.evaluate(condition, scope)?.success() {
            self.evaluate(&node.body, scope)
        } else if let Some(alternative) = &node.else_branch {
            self.eval_if(alternative, scope)
        } else {
            Ok(ExitStatus::SUCCESS)
        }
    }

    #[tracing::instrument(level = "debug", skip(self, cmd, scope), fields(line = cmd.line, argc = cmd.args.len()))]
    fn eval_command(&mut self, cmd: &CommandNode, scope: &mut dyn Scope) -> EvalResult<ExitStatus> {
        if cmd.args.is_empty() {
            for assignment in &cmd.assignments {
                let value = self.expand(&assignment.value, scope)?;
                scope.set(&assignment.name, value);
            }
            return Ok(ExitStatus::SUCCESS);
        }

        let mut frame = FrameGuard::new(scope);
        let invocation = self.prepare(cmd, &mut *frame)?;
        let status = self.spawner.run(&invocation).status();
        drop(frame);

        tracing::debug!(program = ?invocation.program(), %status, "command finished");
        Ok(status)
    }

    /// Bind a command's assignments into the innermost frame and expand its
    /// words into an invocation.
    fn prepare(&mut self, cmd: &CommandNode, scope: &mut dyn Scope) -> EvalResult<Invocation> {
        for assignment in &cmd.assignments {
            let value = self.expand(&assignment.value, scope)?;
            scope.set_local(&assignment.name, value);
        }
        let argv = cmd
            .args
            .iter()
            .map(|arg| self.expand(arg, scope))
            .collect::<EvalResult<Vec<_>>>()?;
        Ok(Invocation::new(argv, scope.environ()))
    }

    #[tracing::instrument(level = "debug", skip(self, pipeline, scope), fields(background = pipeline.background, stage_count = pipeline.stages.len()))]
    fn eval_pipeline(&mut self, pipeline: &PipelineNode, scope: &mut dyn Scope) -> EvalResult<ExitStatus> {
        let commands = pipeline
            .stages
            .iter()
            .map(|stage| match stage {
                ShellNode::Command(cmd) if !cmd.args.is_empty() => Ok(cmd),
                other => Err(EvalError::UnsupportedPipelineStage {
                    kind: other.kind_name(),
                }),
            })
            .collect::<EvalResult<Vec<_>>>()?;

        if commands.is_empty() {
            return Ok(ExitStatus::SUCCESS);
        }
        if let [only] = commands.as_slice()
            && !pipeline.background
        {
            return self.eval_command(only, scope);
        }

        let mut stages = Vec::with_capacity(commands.len());
        for cmd in commands {
            let mut frame = FrameGuard::new(&mut *scope);
            stages.push(self.prepare(cmd, &mut *frame)?);
        }

        if !pipeline.background {
            return Ok(self.spawner.run_pipeline(&stages).status());
        }
        match self.spawner.spawn_background(&stages) {
            Ok(id) => {
                self.last_background = Some(id);
                Ok(ExitStatus::SUCCESS)
            }
            Err(err) => {
                tracing::warn!(error = %err, "background pipeline failed to start");
                Ok(ExitStatus::FAILURE)
            }
        }
    }

    /// Expand one word: splice each substitution's value in at its marker.
    pub fn expand(&mut self, arg: &Arg, scope: &mut dyn Scope) -> EvalResult<String> {
        if arg.subs.is_empty() {
            return Ok(arg.raw.clone());
        }

        let mut out = String::with_capacity(arg.raw.len());
        let mut subs = arg.subs.iter();
        for (index, piece) in arg.raw.split(SUBSTITUTION_MARKER).enumerate() {
            if index > 0 {
                let Some(sub) = subs.next() else {
                    panic!("argument {:?} has more markers than substitutions", arg.raw);
                };
                out.push_str(&self.resolve(sub, scope)?);
            }
            out.push_str(piece);
        }

        tracing::debug!(raw = ?arg.raw, expanded = %out, "expanded argument");
        Ok(out)
    }

    fn resolve(&mut self, sub: &Substitution, scope: &mut dyn Scope) -> EvalResult<String> {
        match sub {
            Substitution::Variable(name) if name == "?" => Ok(self.last_status.to_string()),
            Substitution::Variable(name) if name == "!" => Ok(self
                .last_background
                .map(|id| id.to_string())
                .unwrap_or_default()),
            Substitution::Variable(name) if name == "$" => Ok(std::process::id().to_string()),
            Substitution::Variable(name) => Ok(scope.get(name).unwrap_or_default().to_string()),
            Substitution::Arithmetic(expr) => Ok(arithmetic::evaluate(expr, scope)?.to_string()),
            Substitution::Command(script) => {
                let output = self.substituter.substitute(script, scope)?;
                Ok(output.trim_end_matches('\n').to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::VarScope;
    use crate::spawn::{SpawnError, SpawnOutcome};

    /// Succeeds for everything and records nothing.
    struct AlwaysOk;

    impl Spawner for AlwaysOk {
        fn run(&mut self, _invocation: &Invocation) -> SpawnOutcome {
            SpawnOutcome::Exited(0)
        }

        fn run_pipeline(&mut self, _stages: &[Invocation]) -> SpawnOutcome {
            SpawnOutcome::Exited(0)
        }

        fn spawn_background(&mut self, _stages: &[Invocation]) -> Result<JobId, SpawnError> {
            Ok(JobId(1))
        }
    }

    #[test]
    fn expand_literal_is_unchanged() {
        let mut eval = Evaluator::new(AlwaysOk);
        let mut scope = VarScope::new();
        assert_eq!(eval.expand(&Arg::literal("a b"), &mut scope).unwrap(), "a b");
    }

    #[test]
    fn expand_interleaves_substitutions() {
        let mut eval = Evaluator::new(AlwaysOk);
        let mut scope = VarScope::new();
        scope.set("X", "1".into());
        let arg = Arg::new(
            "<\u{1}|\u{1}|\u{1}>",
            vec![
                Substitution::Variable("X".into()),
                Substitution::Arithmetic("X + 1".into()),
                Substitution::Variable("UNSET".into()),
            ],
        );
        assert_eq!(eval.expand(&arg, &mut scope).unwrap(), "<1|2|>");
    }

    #[test]
    fn command_substitution_without_substituter() {
        let mut eval = Evaluator::new(AlwaysOk);
        let mut scope = VarScope::new();
        let arg = Arg::new("\u{1}", vec![Substitution::Command("date".into())]);
        assert_eq!(
            eval.expand(&arg, &mut scope),
            Err(EvalError::NoSubstituter("date".into()))
        );
    }

    #[test]
    fn command_substitution_trims_trailing_newlines() {
        let mut eval = Evaluator::new(AlwaysOk)
            .with_substituter(|script: &str, _: &mut dyn Scope| -> EvalResult<String> {
                Ok(format!("ran {script}\n\n"))
            });
        let mut scope = VarScope::new();
        let arg = Arg::new("[\u{1}]", vec![Substitution::Command("x".into())]);
        assert_eq!(eval.expand(&arg, &mut scope).unwrap(), "[ran x]");
    }

    #[test]
    fn eof_is_success() {
        let mut eval = Evaluator::new(AlwaysOk);
        let mut scope = VarScope::new();
        assert_eq!(
            eval.evaluate(&ShellNode::Eof, &mut scope).unwrap(),
            ExitStatus::SUCCESS
        );
    }
}
