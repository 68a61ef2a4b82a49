//! Running programs to completion and capturing what they write.
//!
//! Callers always get text back: a failing program yields the output it
//! produced before the failure followed by the error message.

use std::thread;

use log::{debug, info, warn};

use crate::interp::{EngineConfig, Interpreter};

/// Stack size of the thread programs are evaluated on. Deep user recursion
/// must reach the configured call depth limit before it reaches the end of
/// this stack.
pub const EVAL_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Evaluate `source` and return its output, with the error message appended
/// on failure.
///
/// Evaluation runs on a thread with an [`EVAL_STACK_SIZE`] stack. Where
/// threads are unavailable it runs on the caller's thread.
pub fn run_source(source: &str, config: &EngineConfig) -> String {
    thread::scope(|scope| {
        let spawned = thread::Builder::new()
            .name("blockscript-eval".to_string())
            .stack_size(EVAL_STACK_SIZE)
            .spawn_scoped(scope, || evaluate(source, config));
        match spawned {
            Ok(handle) => handle.join().unwrap_or_else(|_| {
                warn!("evaluation thread panicked");
                "Evaluation aborted unexpectedly\n".to_string()
            }),
            Err(err) => {
                debug!("no evaluation thread ({}), evaluating in place", err);
                evaluate(source, config)
            }
        }
    })
}

fn evaluate(source: &str, config: &EngineConfig) -> String {
    let mut out = Vec::new();
    let result = Interpreter::new(&mut out, config.clone()).run(source);

    let mut text = String::from_utf8_lossy(&out).into_owned();
    if let Err(err) = result {
        warn!("program failed: {}", err);
        text.push_str(&err.to_string());
        text.push('\n');
    }
    info!("program finished with {} byte(s) of output", text.len());
    text
}

#[cfg(feature = "cli")]
pub use isolated::{run_isolated, timeout_message, POLL_INTERVAL};

#[cfg(feature = "cli")]
mod isolated {
    use std::io::{Read, Write};
    use std::path::Path;
    use std::process::{Child, Command, Stdio};
    use std::thread;
    use std::time::{Duration, Instant};

    use log::{debug, warn};

    use crate::error::Result;

    /// How often a running worker is checked for completion.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Message returned instead of the output of a worker that ran too long.
    pub fn timeout_message(timeout: Duration) -> String {
        format!(
            "Program exceeded the time limit of {} seconds and was terminated.",
            timeout.as_secs_f64()
        )
    }

    /// Run `source` in a separate worker process and return its standard
    /// output followed by its standard error.
    ///
    /// The worker is `program --worker --precision <precision>` reading the
    /// source from standard input. A worker still running after `timeout` is
    /// killed and [`timeout_message`] is returned instead of its output.
    pub fn run_isolated(
        program: &Path,
        source: &str,
        timeout: Duration,
        precision: u32,
    ) -> Result<String> {
        let mut child = Command::new(program)
            .arg("--worker")
            .arg("--precision")
            .arg(precision.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        debug!("started worker {} (pid {})", program.display(), child.id());

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes())?;
        }

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        if !wait_with_timeout(&mut child, timeout)? {
            warn!("worker exceeded {:?}, killing it", timeout);
            child.kill()?;
            child.wait()?;
            return Ok(timeout_message(timeout));
        }

        let mut output = stdout.join().unwrap_or_default();
        output.push_str(&stderr.join().unwrap_or_default());
        Ok(output)
    }

    /// Wait for `child` to exit; `false` if it is still running at the deadline.
    fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                debug!("worker exited with {}", status);
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Read a pipe to the end on a separate thread so a chatty worker cannot
    /// block on a full pipe.
    fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            if let Some(mut pipe) = pipe {
                if let Err(err) = pipe.read_to_end(&mut bytes) {
                    warn!("failed to read worker output: {}", err);
                }
            }
            String::from_utf8_lossy(&bytes).into_owned()
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_timeout_message() {
            assert_eq!(
                timeout_message(Duration::from_secs(5)),
                "Program exceeded the time limit of 5 seconds and was terminated."
            );
            assert_eq!(
                timeout_message(Duration::from_millis(1500)),
                "Program exceeded the time limit of 1.5 seconds and was terminated."
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_is_captured() {
        let out = run_source("print(1 + 1)\nprint([1, 2])", &EngineConfig::default());
        assert_eq!(out, "2.0\n[1.0, 2.0]\n");
    }

    #[test]
    fn test_errors_become_text() {
        let out = run_source("print(1)\n1/0\nprint(2)", &EngineConfig::default());
        assert_eq!(out, "1.0\nArithmetic error: division by zero\n");
    }

    #[test]
    fn test_deep_recursion_hits_call_limit() {
        let source = "\
def f(a, b, n) {
  if n > 0 {
    return f(b, a+b, n-1)
  } else {
    return b
  }
}
print(1)
print(f(0, 1, 10000))
";
        let out = run_source(source, &EngineConfig::default());
        assert_eq!(out, "1.0\nMaximum call depth of 200 exceeded\n");
    }

    #[test]
    fn test_lexer_error_keeps_earlier_output() {
        let out = run_source("print(1)\n$", &EngineConfig::default());
        assert!(out.starts_with("1.0\nLexer error at line 2, column 1"));
    }
}
