//! A single run of a bridge script
//!
//! The script gets the JSON payload on stdin and must answer with one JSON
//! document on stdout, exiting 0. Anything else resolves to an error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::Instrument;
use uuid::Uuid;

use super::Interpreter;
use crate::{Error, Result};

/// How the script process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit with a status code
    Code(i32),
    /// Killed without an exit code; carries the signal number when known
    Signal(Option<i32>),
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Termination::Code(code),
            None => Termination::Signal(signal_of(status)),
        }
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}

/// One execution of a script through its interpreter
///
/// `run` consumes the invocation, so each one launches exactly one process
/// and yields exactly one outcome.
#[derive(Debug)]
pub struct Invocation {
    id: Uuid,
    interpreter: Interpreter,
    script: PathBuf,
    working_dir: PathBuf,
}

impl Invocation {
    /// Create an invocation using the interpreter for the host OS
    pub fn new(script: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            interpreter: Interpreter::system_default(),
            script: script.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Override the interpreter
    pub fn with_interpreter(mut self, interpreter: Interpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run the script with `payload` on stdin and resolve its outcome
    pub async fn run<T>(self, payload: &T) -> Result<JsonValue>
    where
        T: Serialize + ?Sized,
    {
        let span = tracing::info_span!("invocation", id = %self.id);
        self.execute(payload).instrument(span).await
    }

    async fn execute<T>(self, payload: &T) -> Result<JsonValue>
    where
        T: Serialize + ?Sized,
    {
        let input = serde_json::to_vec(payload)?;
        let program = self.interpreter.resolve()?;

        tracing::info!(
            "Launching {:?} {:?} in {:?}",
            program,
            self.script,
            self.working_dir
        );

        let mut command = Command::new(&program);
        command
            .arg(&self.script)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Keep a console window from flashing up behind the GUI
        #[cfg(windows)]
        command.creation_flags(0x0800_0000);

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            Error::Launch(format!(
                "{} {}: {}",
                program.display(),
                self.script.display(),
                e
            ))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Launch("Failed to capture stdin".to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Launch("Failed to capture stdout".to_string()))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Launch("Failed to capture stderr".to_string()))?;

        let write_input = async move {
            let result = match stdin.write_all(&input).await {
                Ok(()) => stdin.shutdown().await,
                Err(e) => Err(e),
            };
            // Dropping the handle closes the pipe so the script sees EOF
            drop(stdin);
            result
        };

        let (written, stdout, stderr) =
            tokio::join!(write_input, drain(stdout), drain(stderr));

        let status = child.wait().await?;
        let elapsed = started.elapsed();

        match written {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                tracing::debug!("Script closed stdin before reading the whole payload");
            }
            Err(e) => return Err(Error::Io(e)),
        }

        let stdout = stdout?;
        let stderr = stderr?;

        tracing::info!(
            "Script exited with {} after {:?} ({} bytes stdout, {} bytes stderr)",
            status,
            elapsed,
            stdout.len(),
            stderr.len()
        );

        let outcome = resolve(Termination::from(status), &stdout, &stderr);
        if let Err(e) = &outcome {
            tracing::warn!("Invocation failed: {}", e);
        }
        outcome
    }
}

/// Run `script` once in `working_dir` with the default interpreter
pub async fn invoke<T>(script: &Path, working_dir: &Path, payload: &T) -> Result<JsonValue>
where
    T: Serialize + ?Sized,
{
    Invocation::new(script, working_dir).run(payload).await
}

async fn drain<R>(mut reader: R) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Turn the collected process state into the single outcome
pub(crate) fn resolve(termination: Termination, stdout: &[u8], stderr: &[u8]) -> Result<JsonValue> {
    match termination {
        Termination::Code(0) => {
            if !stderr.is_empty() {
                tracing::warn!(
                    "Script succeeded with stderr output: {}",
                    String::from_utf8_lossy(stderr)
                );
            }

            // Parse the raw bytes so invalid UTF-8 is rejected, not replaced
            match serde_json::from_slice(stdout) {
                Ok(value) => Ok(value),
                Err(e) => Err(Error::MalformedOutput {
                    raw: String::from_utf8_lossy(stdout).into_owned(),
                    reason: e.to_string(),
                }),
            }
        }
        _ if !stderr.is_empty() => Err(Error::ScriptFailed(
            String::from_utf8_lossy(stderr).into_owned(),
        )),
        Termination::Code(code) => Err(Error::ExitCode(code)),
        Termination::Signal(Some(signal)) => Err(Error::Terminated(format!("signal {}", signal))),
        Termination::Signal(None) => Err(Error::Terminated("unknown cause".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_success() {
        let value = resolve(Termination::Code(0), b"{\"result\": 84}\n", b"").unwrap();
        assert_eq!(value, json!({"result": 84}));
    }

    #[test]
    fn test_resolve_success_ignores_stderr() {
        let value = resolve(Termination::Code(0), b"[1, 2]", b"DeprecationWarning").unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn test_resolve_malformed_output_keeps_raw_text() {
        let err = resolve(Termination::Code(0), b"not json at all", b"").unwrap_err();
        match &err {
            Error::MalformedOutput { raw, reason } => {
                assert_eq!(raw, "not json at all");
                assert!(!reason.is_empty());
            }
            other => panic!("expected malformed output, got {:?}", other),
        }
        assert!(err.to_string().contains("not json at all"));
    }

    #[test]
    fn test_resolve_empty_output_is_malformed() {
        let err = resolve(Termination::Code(0), b"", b"").unwrap_err();
        assert!(matches!(err, Error::MalformedOutput { .. }));
    }

    #[test]
    fn test_resolve_invalid_utf8_is_malformed() {
        let err = resolve(Termination::Code(0), b"\"caf\xff\"", b"").unwrap_err();
        match err {
            Error::MalformedOutput { raw, .. } => assert_eq!(raw, "\"caf\u{fffd}\""),
            other => panic!("expected malformed output, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_trailing_document_is_malformed() {
        let err = resolve(Termination::Code(0), b"{} {}", b"").unwrap_err();
        assert!(matches!(err, Error::MalformedOutput { .. }));
    }

    #[test]
    fn test_resolve_nonzero_uses_stderr_verbatim() {
        let err = resolve(Termination::Code(1), b"{}", b"ValueError: bad input\n").unwrap_err();
        assert_eq!(err.to_string(), "ValueError: bad input\n");
    }

    #[test]
    fn test_resolve_nonzero_silent_names_code() {
        let err = resolve(Termination::Code(42), b"", b"").unwrap_err();
        assert!(matches!(err, Error::ExitCode(42)));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_resolve_signal() {
        let err = resolve(Termination::Signal(Some(9)), b"", b"").unwrap_err();
        assert!(err.to_string().contains("signal 9"));

        let err = resolve(Termination::Signal(None), b"", b"oom").unwrap_err();
        assert_eq!(err.to_string(), "oom");
    }

    #[test]
    fn test_invocations_get_distinct_ids() {
        let a = Invocation::new("a.py", ".");
        let b = Invocation::new("a.py", ".");
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_invoke_in_missing_directory_fails_to_launch() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let err = invoke(Path::new("predict.py"), &missing, &json!({"x": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Launch(_)));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use tempfile::TempDir;

        fn sh() -> Interpreter {
            Interpreter::new("sh")
        }

        fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            path
        }

        async fn run_sh(dir: &TempDir, body: &str, payload: &JsonValue) -> Result<JsonValue> {
            write_script(dir, "bridge.sh", body);
            Invocation::new("bridge.sh", dir.path())
                .with_interpreter(sh())
                .run(payload)
                .await
        }

        #[tokio::test]
        async fn test_echo_round_trip() {
            let dir = TempDir::new().unwrap();
            let payloads = [
                json!({"feature": 42}),
                json!([1, "two", null, true, 3.5]),
                json!("plain string"),
                json!({"nested": {"list": [{"a": 1}, {"b": [2, 3]}], "unicode": "héllo ✓"}}),
            ];

            for payload in payloads {
                let value = run_sh(&dir, "cat\n", &payload).await.unwrap();
                assert_eq!(value, payload);
            }
        }

        #[tokio::test]
        async fn test_feature_doubling_script() {
            let dir = TempDir::new().unwrap();
            let body = "n=$(sed 's/[^0-9]//g')\nprintf '{\"result\": %d}\\n' $((n * 2))\n";
            let value = run_sh(&dir, body, &json!({"feature": 42})).await.unwrap();
            assert_eq!(value, json!({"result": 84}));
        }

        #[tokio::test]
        async fn test_non_json_output_fails_with_raw_text() {
            let dir = TempDir::new().unwrap();
            let err = run_sh(&dir, "cat > /dev/null\necho 'hello world'\n", &json!({}))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::MalformedOutput { .. }));
            assert!(err.to_string().contains("hello world"));
        }

        #[tokio::test]
        async fn test_invalid_utf8_output_fails() {
            let dir = TempDir::new().unwrap();
            let err = run_sh(&dir, "printf '\"\\377\"'\n", &json!({}))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::MalformedOutput { .. }));
        }

        #[tokio::test]
        async fn test_nonzero_exit_with_stderr() {
            let dir = TempDir::new().unwrap();
            let body = "printf 'model file missing' >&2\nexit 2\n";
            let err = run_sh(&dir, body, &json!({})).await.unwrap_err();
            assert_eq!(err.to_string(), "model file missing");
        }

        #[tokio::test]
        async fn test_nonzero_exit_silent() {
            let dir = TempDir::new().unwrap();
            let err = run_sh(&dir, "exit 7\n", &json!({})).await.unwrap_err();
            assert!(matches!(err, Error::ExitCode(7)));
            assert!(err.to_string().contains('7'));
        }

        #[tokio::test]
        async fn test_chunked_streams_concatenate_in_order() {
            let dir = TempDir::new().unwrap();
            let body = "printf '{\"a\":'\nsleep 0.05\nprintf '[1,2,'\nsleep 0.05\nprintf '3]}'\n";
            let value = run_sh(&dir, body, &json!(null)).await.unwrap();
            assert_eq!(value, json!({"a": [1, 2, 3]}));

            let body = "printf 'line one\\n' >&2\nsleep 0.05\nprintf 'line two' >&2\nexit 3\n";
            let err = run_sh(&dir, body, &json!(null)).await.unwrap_err();
            assert_eq!(err.to_string(), "line one\nline two");
        }

        #[tokio::test]
        async fn test_payload_larger_than_pipe_buffer() {
            let dir = TempDir::new().unwrap();
            let payload = json!({"blob": "x".repeat(1024 * 1024)});
            let value = run_sh(&dir, "cat\n", &payload).await.unwrap();
            assert_eq!(value, payload);
        }

        #[tokio::test]
        async fn test_script_ignoring_stdin_still_resolves() {
            let dir = TempDir::new().unwrap();
            let payload = json!({"blob": "y".repeat(1024 * 1024)});
            let value = run_sh(&dir, "printf '{\"ok\": true}'\n", &payload)
                .await
                .unwrap();
            assert_eq!(value, json!({"ok": true}));
        }

        #[tokio::test]
        async fn test_runs_in_working_directory() {
            let dir = TempDir::new().unwrap();
            let value = run_sh(&dir, "printf '\"%s\"' \"$(pwd -P)\"\n", &json!({}))
                .await
                .unwrap();
            let expected = dir.path().canonicalize().unwrap();
            assert_eq!(value, json!(expected.to_string_lossy()));
        }

        #[tokio::test]
        async fn test_killed_by_signal() {
            let dir = TempDir::new().unwrap();
            let err = run_sh(&dir, "kill -9 $$\n", &json!({})).await.unwrap_err();
            assert!(matches!(err, Error::Terminated(_)));
            assert!(err.to_string().contains("signal 9"));
        }

        #[tokio::test]
        async fn test_missing_interpreter_is_launch_failure() {
            let dir = TempDir::new().unwrap();
            write_script(&dir, "bridge.sh", "cat\n");
            let err = Invocation::new("bridge.sh", dir.path())
                .with_interpreter(Interpreter::new("/nonexistent/python3"))
                .run(&json!({}))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Launch(_)));
        }

        #[tokio::test]
        async fn test_missing_working_directory_is_launch_failure() {
            let dir = TempDir::new().unwrap();
            let err = Invocation::new("bridge.sh", dir.path().join("gone"))
                .with_interpreter(sh())
                .run(&json!({}))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Launch(_)));
        }
    }
}
