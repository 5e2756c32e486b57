use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use minici::errors::{MiniciError, Result};
use minici::exec::{ContextFactory, ExecutionContext, StashHandle};
use minici::types::BoxFuture;

/// Scripted result for commands containing a given fragment.
#[derive(Debug, Clone)]
struct Script {
    fragment: String,
    stdout: String,
    code: i32,
}

/// Everything fake contexts did, shared across all contexts of a run.
#[derive(Debug, Clone, Default)]
pub struct ContextLog {
    /// `(task, command)` in execution order.
    pub commands: Vec<(String, String)>,
    pub stashed: Vec<(String, String)>,
    pub unstashed: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct Shared {
    scripts: Vec<Script>,
    log: ContextLog,
}

/// Execution context that never touches the filesystem or spawns
/// processes. Commands without a matching script succeed with no output.
#[derive(Debug, Clone, Default)]
pub struct FakeContexts {
    shared: Arc<Mutex<Shared>>,
}

impl FakeContexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `fragment` print `stdout` and exit with `code`.
    pub fn on(self, fragment: &str, stdout: &str, code: i32) -> Self {
        self.shared.lock().unwrap().scripts.push(Script {
            fragment: fragment.to_string(),
            stdout: stdout.to_string(),
            code,
        });
        self
    }

    pub fn log(&self) -> ContextLog {
        self.shared.lock().unwrap().log.clone()
    }

    /// Commands run by `task`, in order.
    pub fn commands_of(&self, task: &str) -> Vec<String> {
        self.log()
            .commands
            .into_iter()
            .filter(|(t, _)| t == task)
            .map(|(_, c)| c)
            .collect()
    }

    pub fn context_for(&self, task: &str) -> FakeContext {
        FakeContext {
            task: task.to_string(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl ContextFactory for FakeContexts {
    fn create(&self, task: &str) -> Result<Box<dyn ExecutionContext>> {
        Ok(Box::new(self.context_for(task)))
    }
}

#[derive(Debug, Clone)]
pub struct FakeContext {
    task: String,
    shared: Arc<Mutex<Shared>>,
}

impl ExecutionContext for FakeContext {
    fn stash<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<StashHandle>> {
        Box::pin(async move {
            let mut shared = self.shared.lock().unwrap();
            shared
                .log
                .stashed
                .push((self.task.clone(), pattern.to_string()));
            Ok(StashHandle {
                id: format!("fake-{}", shared.log.stashed.len()),
                path: PathBuf::from("/fake/stash"),
                files: 0,
            })
        })
    }

    fn unstash<'a>(&'a self, handle: &'a StashHandle) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.shared
                .lock()
                .unwrap()
                .log
                .unstashed
                .push((self.task.clone(), handle.id.clone()));
            Ok(())
        })
    }

    fn run<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let mut shared = self.shared.lock().unwrap();
            shared
                .log
                .commands
                .push((self.task.clone(), command.to_string()));
            let script = shared
                .scripts
                .iter()
                .find(|s| command.contains(&s.fragment))
                .cloned();
            drop(shared);

            match script {
                None => Ok(Vec::new()),
                Some(s) if s.code == 0 => Ok(s.stdout.into_bytes()),
                Some(s) => Err(MiniciError::ToolExecution {
                    command: command.to_string(),
                    code: s.code,
                    stdout: s.stdout.into_bytes(),
                }),
            }
        })
    }
}
