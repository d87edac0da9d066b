//! Scripted collaborators for unit tests

use crate::context::Context;
use crate::error::Result;
use crate::prompt::Prompter;
use async_trait::async_trait;
use runway_config::Settings;
use runway_gcloud::{CommandOutput, CommandRunner, ExecOptions, Gcloud, GcloudError};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct Call {
    pub line: String,
    pub stdin: Option<String>,
}

#[derive(Debug, Clone)]
enum Canned {
    Stdout(String),
    Fail(String),
}

#[derive(Default)]
struct RunnerInner {
    responses: Mutex<Vec<(String, Canned)>>,
    calls: Mutex<Vec<Call>>,
}

/// Answers commands from canned responses keyed by command-line prefix
///
/// The most recently registered matching prefix wins. Unmatched commands
/// succeed with empty stdout, which list calls read as "nothing exists".
#[derive(Clone, Default)]
pub struct FakeRunner {
    inner: Arc<RunnerInner>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, prefix: &str, stdout: impl Into<String>) -> &Self {
        self.inner
            .responses
            .lock()
            .unwrap()
            .push((prefix.to_string(), Canned::Stdout(stdout.into())));
        self
    }

    pub fn fail(&self, prefix: &str, stderr: &str) -> &Self {
        self.inner
            .responses
            .lock()
            .unwrap()
            .push((prefix.to_string(), Canned::Fail(stderr.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().unwrap().len()
    }

    /// Number of recorded calls starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.line.starts_with(prefix))
            .count()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.line).collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> runway_gcloud::Result<CommandOutput> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.inner.calls.lock().unwrap().push(Call {
            line: line.clone(),
            stdin: options.stdin.clone(),
        });

        let canned = self
            .inner
            .responses
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, canned)| canned.clone());

        match canned {
            Some(Canned::Fail(stderr)) => Err(GcloudError::ExecutionFailed {
                command: line,
                exit_code: 1,
                stderr,
            }),
            Some(Canned::Stdout(stdout)) => Ok(CommandOutput {
                stdout,
                exit_code: 0,
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Answer {
    Select(usize),
    Text(String),
    /// Accept the pre-filled default of a text prompt
    Default,
    Password(String),
    Confirm(bool),
}

#[derive(Default)]
struct PrompterInner {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
}

/// Replays queued answers in order and records every prompt message
#[derive(Clone, Default)]
pub struct ScriptedPrompter {
    inner: Arc<PrompterInner>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        let prompter = Self::default();
        prompter
            .inner
            .answers
            .lock()
            .unwrap()
            .extend(answers);
        prompter
    }

    pub fn asked(&self) -> Vec<String> {
        self.inner.asked.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.inner.answers.lock().unwrap().len()
    }

    fn next(&self, message: &str) -> Answer {
        self.inner.asked.lock().unwrap().push(message.to_string());
        self.inner
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted answer for prompt: {message}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&self, message: &str, _options: &[String]) -> Result<usize> {
        match self.next(message) {
            Answer::Select(index) => Ok(index),
            other => panic!("expected Select for {message:?}, got {other:?}"),
        }
    }

    fn text(&self, message: &str, default: Option<&str>) -> Result<String> {
        match self.next(message) {
            Answer::Text(value) => Ok(value),
            Answer::Default => Ok(default.unwrap_or_default().to_string()),
            other => panic!("expected Text for {message:?}, got {other:?}"),
        }
    }

    fn password(&self, message: &str) -> Result<String> {
        match self.next(message) {
            Answer::Password(value) | Answer::Text(value) => Ok(value),
            other => panic!("expected Password for {message:?}, got {other:?}"),
        }
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        match self.next(message) {
            Answer::Confirm(value) => Ok(value),
            Answer::Default => Ok(default),
            other => panic!("expected Confirm for {message:?}, got {other:?}"),
        }
    }
}

pub fn context(runner: &FakeRunner, prompter: &ScriptedPrompter, workdir: &Path) -> Context {
    Context::new(
        Gcloud::new(Arc::new(runner.clone())),
        Box::new(prompter.clone()),
        Settings::default(),
        workdir,
    )
}

/// State with a bound project, as after the project steps
pub fn bound_state() -> crate::state::ProvisioningState {
    let mut state = crate::state::ProvisioningState::new(&Settings::default());
    state.project.id = "story-app".to_string();
    state.project.display_name = "Story App".to_string();
    state.project.number = "963664183424".to_string();
    state.project.account = "dev@example.com".to_string();
    state
}
