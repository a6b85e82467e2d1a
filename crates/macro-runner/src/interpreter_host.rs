use crate::config::EngineConfig;

use macro_runner_core::{ExecutionFailure, HostFault, LaunchArgs, ScriptHost, ScriptRuntimeError};

use std::{process::Stdio, sync::LazyLock};

use regex::Regex;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, instrument, warn};

/// Environment variable carrying the host process id into macros.
pub(crate) const HOST_PID_ENV: &str = "MACRO_HOST_PID";
/// Environment variable carrying the host version into macros.
pub(crate) const HOST_VERSION_ENV: &str = "MACRO_HOST_VERSION";

static LOCATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r":\s?(\d+)(?::(\d+))?").ok());
static ERROR_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\w*Error: (.+?)\s*$").ok());

/// Runs each macro in a fresh interpreter process, feeding the script on stdin.
///
/// A nonzero exit is a script error parsed from stderr. Failing to start the
/// interpreter, or the interpreter dying from a signal, is a host fault.
#[derive(Debug, Clone)]
pub struct InterpreterScriptHost {
    interpreter: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl InterpreterScriptHost {
    /// Host for the configured interpreter, bound to the launching host.
    pub fn new(engine: &EngineConfig, launch: &LaunchArgs) -> Self {
        Self {
            interpreter: engine.interpreter.clone(),
            args: engine.args.clone(),
            envs: vec![
                (HOST_PID_ENV.to_string(), launch.host_pid.to_string()),
                (HOST_VERSION_ENV.to_string(), launch.host_version.clone()),
            ],
        }
    }

    fn fault(&self, message: String, stack_trace: String) -> ExecutionFailure {
        ExecutionFailure::Fatal(HostFault {
            message,
            stack_trace,
            target_site: self.interpreter.clone(),
        })
    }
}

impl ScriptHost for InterpreterScriptHost {
    #[instrument(skip(self, script), fields(interpreter = %self.interpreter, script_len = script.len()))]
    async fn execute(&mut self, script: &str) -> Result<(), ExecutionFailure> {
        let mut child = Command::new(&self.interpreter)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                self.fault(
                    format!("Failed to start {}: {}", self.interpreter, e),
                    String::new(),
                )
            })?;

        // Fed while stderr drains, so a chatty interpreter cannot stall the write.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // The interpreter may exit before reading everything.
                if let Err(e) = stdin.write_all(script.as_bytes()).await {
                    debug!(error = %e, "Interpreter closed stdin early");
                }
            }
        };

        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| {
            self.fault(
                format!("Failed to wait for {}: {}", self.interpreter, e),
                String::new(),
            )
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        match output.status.code() {
            Some(code) => {
                let error = parse_runtime_error(&stderr);
                debug!(code, line = error.line, "Macro raised a runtime error");
                Err(ExecutionFailure::Runtime(error))
            }
            None => {
                warn!(status = %output.status, "Interpreter terminated abnormally");
                Err(self.fault(
                    format!("{} terminated abnormally ({})", self.interpreter, output.status),
                    stderr.trim().to_string(),
                ))
            }
        }
    }
}

/// Pull line, column and description out of interpreter stderr.
pub(crate) fn parse_runtime_error(stderr: &str) -> ScriptRuntimeError {
    let (line, column) = LOCATION
        .as_ref()
        .and_then(|re| re.captures(stderr))
        .map(|caps| {
            let number = |i: usize| {
                caps.get(i)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(0)
            };
            (number(1), number(2))
        })
        .unwrap_or((0, 0));

    let description = ERROR_LINE
        .as_ref()
        .and_then(|re| re.captures(stderr))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| {
            stderr
                .lines()
                .map(str::trim)
                .rfind(|line| !line.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default();

    ScriptRuntimeError {
        line,
        column,
        description,
    }
}
