//! Subprocess-backed execution service.

use super::docker;
use super::{ExecutionOutcome, ExecutionRequest, ExecutionService};
use crate::error::{MdrunError, Result};
use crate::languages::{self, Invocation, LanguageSpec, TempFile};
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs blocks with the interpreters named in the language registry.
///
/// Temporary files are created in the request's work directory and removed
/// once the interpreter exits.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    timeout: Option<Duration>,
    /// Postgres container, looked up on first use.
    container: Option<Option<String>>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill interpreters that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn the first candidate command that exists and collect its output.
    pub(crate) fn run_invocation(
        &self,
        language: &str,
        invocation: &Invocation,
        work_dir: &Path,
    ) -> Result<ExecutionOutcome> {
        for argv in &invocation.candidates {
            let Some((program, args)) = argv.split_first() else {
                continue;
            };

            let stdin = if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            };
            let mut command = Command::new(program);
            command
                .args(args)
                .current_dir(work_dir)
                .stdin(stdin)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            #[cfg(unix)]
            {
                use std::os::unix::process::CommandExt;
                // Own group, so a timeout also reaches whatever the script starts.
                if self.timeout.is_some() {
                    command.process_group(0);
                }
            }

            match command.spawn() {
                Ok(child) => {
                    debug!(language, program = %program, "interpreter started");
                    return self.collect(child, invocation.stdin.as_deref());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(language, program = %program, "interpreter not found, trying next");
                }
                Err(e) => {
                    return Err(MdrunError::ExecutionError(format!(
                        "failed to start '{}' for '{}' block: {}\n\
                         Fix: check that '{}' is executable.",
                        program, language, e, program
                    )));
                }
            }
        }

        let programs: Vec<&str> = invocation
            .candidates
            .iter()
            .filter_map(|argv| argv.first().map(String::as_str))
            .collect();
        Err(MdrunError::MissingInterpreter {
            language: language.to_string(),
            program: programs.join(" or "),
        })
    }

    /// Run `invocation` inside a Postgres container. `None` when no
    /// container is running.
    fn run_in_container(
        &mut self,
        language: &str,
        invocation: &Invocation,
        work_dir: &Path,
    ) -> Result<Option<ExecutionOutcome>> {
        let container = self
            .container
            .get_or_insert_with(|| docker::find_postgres_container(work_dir))
            .clone();
        let (Some(container), Some(inner)) = (container, invocation.candidates.first()) else {
            return Ok(None);
        };

        let env = docker::forwarded_env(|name| std::env::var(name).ok());
        docker::check_required_env(&env)?;

        info!(language, container = %container, "running block inside Docker container");
        let wrapped = Invocation {
            candidates: vec![docker::exec_argv(&container, &env, inner)],
            stdin: invocation.stdin.clone(),
            output_path: invocation.output_path.clone(),
        };
        self.run_invocation(language, &wrapped, work_dir).map(Some)
    }

    fn collect(&self, mut child: Child, input: Option<&str>) -> Result<ExecutionOutcome> {
        let writer = match (child.stdin.take(), input) {
            (Some(mut pipe), Some(input)) => {
                let input = input.to_owned();
                Some(thread::spawn(move || pipe.write_all(input.as_bytes())))
            }
            _ => None,
        };
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let (exit_code, timed_out) = match self.timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout)?,
            None => {
                let status = child.wait().map_err(|e| {
                    MdrunError::ExecutionError(format!("failed to wait for interpreter: {}", e))
                })?;
                (status.code(), false)
            }
        };

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => {
                    warn!(error = %e, "failed to write block to interpreter stdin");
                }
                _ => {}
            }
        }

        let stdout = join_reader(stdout);
        let mut stderr = join_reader(stderr);
        if timed_out && let Some(timeout) = self.timeout {
            warn!(timeout_secs = timeout.as_secs_f64(), "interpreter timed out and was killed");
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&format!("timed out after {:?}", timeout));
        }

        Ok(ExecutionOutcome {
            stdout,
            stderr,
            exit_code,
            artifact_path: None,
        })
    }
}

impl ExecutionService for ProcessExecutor {
    fn execute(&mut self, request: &ExecutionRequest<'_>) -> Result<ExecutionOutcome> {
        let Some(spec) = languages::lookup(request.language) else {
            warn!(language = request.language, "unsupported language");
            return Ok(ExecutionOutcome::unsupported(request.language));
        };

        let work_dir = std::path::absolute(request.work_dir).map_err(|e| {
            MdrunError::ExecutionError(format!(
                "cannot resolve directory '{}': {}",
                request.work_dir.display(),
                e
            ))
        })?;

        info!(language = spec.name, "executing code block");

        let temp_file = create_temp_file(spec, request.content, &work_dir)?;
        let invocation = spec
            .invocation(
                request.content,
                temp_file.as_ref().map(NamedTempFile::path),
                request.options,
            )
            .map_err(|e| {
                MdrunError::ExecutionError(format!("cannot build '{}' command: {}", spec.name, e))
            })?;

        let mut outcome = match self.run_invocation(spec.name, &invocation, &work_dir) {
            Err(err @ MdrunError::MissingInterpreter { .. }) if spec.container_fallback => {
                debug!(language = spec.name, "no local interpreter, looking for a container");
                self.run_in_container(spec.name, &invocation, &work_dir)?
                    .ok_or(err)?
            }
            other => other?,
        };
        outcome.artifact_path = invocation.output_path.filter(|path| path.exists());

        if !outcome.is_success() {
            warn!(
                language = spec.name,
                status = %outcome.status_label(),
                "code block failed"
            );
        }

        Ok(outcome)
    }
}

/// Temporary script or scratch file for the interpreter, if it needs one.
fn create_temp_file(
    spec: &LanguageSpec,
    content: &str,
    work_dir: &Path,
) -> Result<Option<NamedTempFile>> {
    let (suffix, contents) = match spec.temp_file {
        TempFile::None => return Ok(None),
        TempFile::Script(suffix) => (suffix, content),
        TempFile::Scratch(suffix) => (suffix, ""),
    };

    let mut file = tempfile::Builder::new()
        .prefix(spec.name)
        .suffix(suffix)
        .tempfile_in(work_dir)
        .map_err(|e| {
            MdrunError::ExecutionError(format!(
                "failed to create temporary file in '{}': {}",
                work_dir.display(),
                e
            ))
        })?;

    file.write_all(contents.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| {
            MdrunError::ExecutionError(format!(
                "failed to write temporary file '{}': {}",
                file.path().display(),
                e
            ))
        })?;

    Ok(Some(file))
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = source.read_to_end(&mut buffer);
        buffer
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Wait for a child process, killing it once `timeout` has passed.
///
/// Returns (exit_code, timed_out).
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(Option<i32>, bool)> {
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status.code(), false)),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process_group(child);
                    return Ok((None, true));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(MdrunError::ExecutionError(format!(
                    "failed to check interpreter status: {}",
                    e
                )));
            }
        }
    }
}

/// Kill a child started in its own process group, along with everything
/// else in that group, and reap it.
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: plain syscall; a negative pid addresses the child's group.
            let res = unsafe { libc::kill(-pid, libc::SIGKILL) };
            if res != 0 {
                debug!(error = %io::Error::last_os_error(), "cannot signal process group");
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
