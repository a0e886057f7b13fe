//! Subprocess execution.
//!
//! [`Commander`] is the seam between the [Unbound supervisor][crate::unbound] and the operating
//! system. [`TokioCommander`] runs programs with [`tokio::process`].

use crate::error::Error;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

/// `DynCommander` is a type alias for a [`Commander`] shared between consumers through an
/// [`Arc`].
#[allow(clippy::module_name_repetitions)]
pub type DynCommander = Arc<dyn Commander + Send + Sync>;

/// A running process started by [`Commander::start`].
///
/// Both line streams are unbounded and must be drained by the caller. `wait` yields `Ok(())`
/// on a successful exit and [`Error::ExitStatus`] otherwise, once every output line has been
/// delivered; it must be read to release the task tracking the process.
#[derive(Debug)]
pub struct Started {
    pub stdout: mpsc::UnboundedReceiver<String>,
    pub stderr: mpsc::UnboundedReceiver<String>,
    pub wait: oneshot::Receiver<Result<(), Error>>,
}

/// An async trait describing how programs are run.
#[async_trait::async_trait]
pub trait Commander {
    /// Spawn `program` with `args` and return immediately. Only spawn failures are errors, the
    /// outcome of the process itself arrives on [`Started::wait`].
    async fn start(&self, program: &Path, args: &[String]) -> Result<Started, Error>;

    /// Run `program` with `args` to completion and return its stdout followed by its stderr.
    async fn run(&self, program: &Path, args: &[String]) -> Result<String, Error>;
}

/// A [`Commander`] spawning real processes with [`tokio::process::Command`].
#[derive(Default, Debug, Clone, Copy)]
pub struct TokioCommander;

#[async_trait::async_trait]
impl Commander for TokioCommander {
    async fn start(&self, program: &Path, args: &[String]) -> Result<Started, Error> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (stdout_tx, stdout) = mpsc::unbounded_channel();
        let (stderr_tx, stderr) = mpsc::unbounded_channel();
        let (wait_tx, wait) = oneshot::channel();
        let stdout_task = child.stdout.take().map(|r| tokio::spawn(forward_lines(r, stdout_tx)));
        let stderr_task = child.stderr.take().map(|r| tokio::spawn(forward_lines(r, stderr_tx)));

        tokio::spawn(async move {
            let result = match child.wait().await {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(Error::ExitStatus(status)),
                Err(err) => Err(Error::IO(err)),
            };
            for task in [stdout_task, stderr_task].into_iter().flatten() {
                let _ = task.await;
            }
            // The receiver may be gone if the caller stopped caring.
            let _ = wait_tx.send(result);
        });

        Ok(Started {
            stdout,
            stderr,
            wait,
        })
    }

    async fn run(&self, program: &Path, args: &[String]) -> Result<String, Error> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            return Err(Error::Command {
                status: output.status,
                output: combined,
            });
        }
        Ok(combined)
    }
}

/// Send every line of `reader` to `tx`, invalid UTF-8 replaced. Keeps reading after the
/// receiver is dropped so the child never blocks on a full pipe, and never closes the pipe
/// before EOF.
async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let mut line = buf.as_slice();
                line = line.strip_suffix(b"\n").unwrap_or(line);
                line = line.strip_suffix(b"\r").unwrap_or(line);
                let _ = tx.send(String::from_utf8_lossy(line).into_owned());
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                tracing::debug!("discarding the rest of the process output: {err}");
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                break;
            }
        }
    }
}
