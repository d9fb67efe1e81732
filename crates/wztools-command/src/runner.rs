use parking_lot::Mutex;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use wztools_logging::Logger;

use crate::{CommandOptions, CommandOutput, RunStatus, STATUS_FAILED};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long each reader may take to drain after a timeout kill
const READER_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => write!(f, "stdout"),
            Stream::Stderr => write!(f, "stderr"),
        }
    }
}

/// State shared between the waiting thread and the two readers.
struct Shared {
    child: Mutex<Child>,
    stdout: Mutex<String>,
    stderr: Mutex<String>,
    stopped_by: Mutex<Option<String>>,
    read_error: Mutex<Option<String>>,
}

impl Shared {
    fn buffer(&self, stream: Stream) -> &Mutex<String> {
        match stream {
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        }
    }

    fn output(&self, status: RunStatus) -> CommandOutput {
        CommandOutput {
            status,
            stdout: self.stdout.lock().clone(),
            stderr: self.stderr.lock().clone(),
        }
    }

    fn kill(&self) {
        let mut child = self.child.lock();
        if let Err(e) = child.kill() {
            tracing::debug!("kill failed (process already gone?): {}", e);
        }
    }
}

/// Run `cmd`, streaming its output into `logger` (the default logger when
/// `None`), and return the status code and accumulated output.
pub fn run_cmd(cmd: &str, options: &CommandOptions, logger: Option<&Logger>) -> CommandOutput {
    let logger = logger.cloned().unwrap_or_else(wztools_logging::logger);

    logger.info(format!("Running command: {}", cmd));
    if let Some(cwd) = &options.cwd {
        logger.info(format!("Working directory: {}", cwd.display()));
    }

    let mut child = match build_command(cmd, options).and_then(|mut c| c.spawn()) {
        Ok(child) => child,
        Err(e) => {
            logger.error(format!("Failed to execute command: {}", e));
            return CommandOutput {
                status: RunStatus::Failed(e.to_string()),
                stdout: String::new(),
                stderr: format!("failed to execute: {}", e),
            };
        }
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let shared = Arc::new(Shared {
        child: Mutex::new(child),
        stdout: Mutex::new(String::new()),
        stderr: Mutex::new(String::new()),
        stopped_by: Mutex::new(None),
        read_error: Mutex::new(None),
    });

    let (done_tx, done_rx) = mpsc::channel();
    let mut readers = Vec::with_capacity(2);
    let spawned = stdout
        .map(|s| spawn_reader(s, Stream::Stdout, &shared, &logger, options, done_tx.clone()))
        .into_iter()
        .chain(stderr.map(|s| spawn_reader(s, Stream::Stderr, &shared, &logger, options, done_tx)));
    for handle in spawned {
        match handle {
            Ok(handle) => readers.push(handle),
            Err(e) => {
                logger.error(format!("Failed to start output reader: {}", e));
                shared.kill();
                return shared.output(RunStatus::Failed(e.to_string()));
            }
        }
    }

    let deadline = options.timeout.map(|t| Instant::now() + t);
    let exit_status = loop {
        match shared.child.lock().try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                logger.error(format!("Failed to wait for command: {}", e));
                shared.kill();
                return shared.output(RunStatus::Failed(e.to_string()));
            }
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            logger.error(format!(
                "Command timed out (>{:?}), killing it",
                options.timeout.unwrap_or_default()
            ));
            {
                let mut child = shared.child.lock();
                let _ = child.kill();
                let _ = child.wait();
            }
            // Bounded drain: a grandchild may still hold the pipes open
            for _ in 0..readers.len() {
                if done_rx.recv_timeout(READER_GRACE).is_err() {
                    break;
                }
            }
            return shared.output(RunStatus::TimedOut);
        }

        thread::sleep(POLL_INTERVAL);
    };

    for handle in readers {
        if handle.join().is_err() {
            shared
                .read_error
                .lock()
                .get_or_insert_with(|| "output reader panicked".to_string());
        }
    }

    if let Some(keyword) = shared.stopped_by.lock().clone() {
        logger.warn(format!("Command terminated by keyword '{}'", keyword));
        return shared.output(RunStatus::Stopped { keyword });
    }

    if let Some(err) = shared.read_error.lock().clone() {
        return shared.output(RunStatus::Failed(err));
    }

    let code = exit_code(&exit_status);
    logger.info(format!("Command finished with exit code {}", code));
    shared.output(RunStatus::Exited(code))
}

fn build_command(cmd: &str, options: &CommandOptions) -> io::Result<Command> {
    let mut command = if options.shell {
        shell_command(cmd)
    } else {
        let mut parts = cmd.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
        let mut command = Command::new(program);
        command.args(parts);
        command
    };

    if let Some(cwd) = &options.cwd {
        command.current_dir(cwd);
    }
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    Ok(command)
}

#[cfg(not(windows))]
fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    command
}

#[cfg(windows)]
fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(cmd);
    command
}

fn spawn_reader<R: Read + Send + 'static>(
    stream: R,
    kind: Stream,
    shared: &Arc<Shared>,
    logger: &Logger,
    options: &CommandOptions,
    done: mpsc::Sender<()>,
) -> io::Result<JoinHandle<()>> {
    let shared = Arc::clone(shared);
    let logger = logger.clone();
    let stop_keywords = options.stop_keywords.clone();

    thread::Builder::new()
        .name(format!("cmd-{}", kind))
        .spawn(move || {
            read_stream(stream, kind, &shared, &logger, &stop_keywords);
            let _ = done.send(());
        })
}

fn read_stream<R: Read>(
    stream: R,
    kind: Stream,
    shared: &Shared,
    logger: &Logger,
    stop_keywords: &[String],
) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                shared.buffer(kind).lock().push_str(&line);

                let trimmed = line.trim_end_matches(['\n', '\r']);
                match kind {
                    Stream::Stdout => logger.info(trimmed),
                    Stream::Stderr => logger.warn(trimmed),
                }

                if let Some(keyword) = stop_keywords.iter().find(|k| trimmed.contains(k.as_str())) {
                    logger.warn(format!(
                        "Detected keyword '{}', terminating command",
                        keyword
                    ));
                    shared
                        .stopped_by
                        .lock()
                        .get_or_insert_with(|| keyword.clone());
                    shared.kill();
                    return;
                }
            }
            Err(e) => {
                logger.error(format!("Error reading {}: {}", kind, e));
                shared.read_error.lock().get_or_insert(e.to_string());
                return;
            }
        }
    }
}

fn exit_code(status: &ExitStatus) -> i32 {
    status.code().unwrap_or_else(|| signal_code(status))
}

#[cfg(unix)]
fn signal_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map_or(STATUS_FAILED, |signal| -signal)
}

#[cfg(not(unix))]
fn signal_code(_status: &ExitStatus) -> i32 {
    STATUS_FAILED
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::{STATUS_FAILED, STATUS_STOPPED};
    use wztools_logging::{Level, LoggerOptions, LoggerRegistry};

    fn quiet_logger(name: &str) -> Logger {
        LoggerRegistry::new()
            .get_or_configure(&LoggerOptions::named(name).console(false))
            .unwrap()
    }

    fn run(cmd: &str, options: &CommandOptions) -> CommandOutput {
        run_cmd(cmd, options, Some(&quiet_logger("test-cmd")))
    }

    #[test]
    fn test_success_captures_stdout() {
        let out = run("echo hello; echo world", &CommandOptions::new());
        assert_eq!(out.status, RunStatus::Exited(0));
        assert!(out.success());
        assert_eq!(out.stdout, "hello\nworld\n");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn test_exit_code_and_stderr() {
        let out = run("echo oops 1>&2; exit 3", &CommandOptions::new());
        assert_eq!(out.code(), 3);
        assert_eq!(out.stderr, "oops\n");
    }

    #[test]
    fn test_lines_are_logged_by_stream() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("cmd.log");
        let logger = LoggerRegistry::new()
            .get_or_configure(
                &LoggerOptions::named("streams")
                    .console(false)
                    .log_file(&log_path)
                    .level(Level::INFO),
            )
            .unwrap();

        let out = run_cmd("echo to-out; echo to-err 1>&2", &CommandOptions::new(), Some(&logger));
        assert!(out.success());

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("INFO - to-out"), "{log}");
        assert!(log.contains("WARN - to-err"), "{log}");
    }

    #[test]
    fn test_stop_keyword_terminates() {
        let options = CommandOptions::new().stop_keywords(["STOP"]);
        let out = run("echo one; echo STOP; sleep 2; echo after", &options);

        assert_eq!(out.code(), STATUS_STOPPED);
        assert_eq!(
            out.status,
            RunStatus::Stopped {
                keyword: "STOP".to_string()
            }
        );
        assert!(out.stdout.starts_with("one\nSTOP\n"), "{:?}", out.stdout);
        assert!(!out.stdout.contains("after"));
    }

    #[test]
    fn test_keyword_on_stderr_also_stops() {
        let options = CommandOptions::new().stop_keywords(["FATAL"]);
        let out = run("echo 'FATAL: disk full' 1>&2; sleep 1; echo late", &options);
        assert_eq!(out.code(), STATUS_STOPPED);
        assert!(out.stderr.contains("FATAL: disk full"));
        assert!(!out.stdout.contains("late"));
    }

    #[test]
    fn test_timeout_kills_process() {
        let options = CommandOptions::new().timeout(Duration::from_millis(300));
        let started = Instant::now();
        // `exec` keeps the shell's pid, so the echoed pid is the sleeping process
        let out = run("echo $$; exec sleep 5", &options);

        assert_eq!(out.status, RunStatus::TimedOut);
        assert_eq!(out.code(), STATUS_FAILED);
        assert!(started.elapsed() < Duration::from_secs(4));

        let pid = out.stdout.trim();
        assert!(!pid.is_empty());
        let alive = Command::new("kill")
            .args(["-0", pid])
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success(), "process {pid} still running");
    }

    #[test]
    fn test_cwd_override() {
        let dir = tempfile::tempdir().unwrap();
        let out = run("pwd", &CommandOptions::new().cwd(dir.path()));
        assert!(out.success());
        assert_eq!(
            std::fs::canonicalize(out.stdout.trim()).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[test]
    fn test_without_shell() {
        let out = run("echo a   b", &CommandOptions::new().shell(false));
        assert_eq!(out.stdout, "a b\n");
    }

    #[test]
    fn test_launch_failure_is_status_not_error() {
        let out = run(
            "definitely-not-a-real-program-wz --flag",
            &CommandOptions::new().shell(false),
        );
        assert!(matches!(out.status, RunStatus::Failed(_)));
        assert_eq!(out.code(), STATUS_FAILED);
        assert!(out.stdout.is_empty());
        assert!(out.stderr.starts_with("failed to execute"));
    }

    #[test]
    fn test_signal_death_maps_to_negative_code() {
        let out = run("kill -9 $$", &CommandOptions::new());
        assert_eq!(out.code(), -9);
    }
}
