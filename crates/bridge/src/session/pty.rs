//! PTY-backed slave endpoint.
//!
//! Spawns a command on a fresh pseudo-terminal and exposes it as a
//! [`Slave`]. Reads run on the blocking pool since PTY handles only offer
//! blocking I/O.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;
use tokio::sync::Mutex;

use super::endpoint::{IoFuture, Slave};

/// Errors that can occur while managing the PTY process.
#[derive(Error, Debug)]
pub enum PtyError {
    /// Failed to open the PTY or start the command.
    #[error("failed to spawn PTY: {0}")]
    SpawnFailed(String),

    /// Failed to stop the command.
    #[error("failed to kill process: {0}")]
    KillFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// What to run on the PTY.
#[derive(Debug, Clone)]
pub struct PtyCommand {
    /// Program to execute.
    pub program: String,
    /// Program arguments.
    pub args: Vec<String>,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Working directory, inherited when unset.
    pub cwd: Option<PathBuf>,
}

impl PtyCommand {
    /// Runs `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }
}

/// A command running on a pseudo-terminal.
pub struct PtySlave {
    /// The PTY controlling side, used for resizing.
    pty: Mutex<Box<dyn MasterPty + Send>>,

    /// Reader shared with blocking read tasks.
    reader: Arc<std::sync::Mutex<Box<dyn Read + Send>>>,

    /// Terminal input.
    writer: Mutex<Box<dyn Write + Send>>,

    /// The child process.
    child: Mutex<Box<dyn Child + Send + Sync>>,

    /// Process ID.
    pid: Option<u32>,
}

impl PtySlave {
    /// Spawns `command` on a new PTY of the given size.
    pub fn spawn(command: &PtyCommand, cols: u16, rows: u16) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::SpawnFailed(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&command.program);
        cmd.args(&command.args);
        if let Some(ref dir) = command.cwd {
            cmd.cwd(dir);
        }
        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::SpawnFailed(e.to_string()))?;
        let pid = child.process_id();

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::SpawnFailed(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::SpawnFailed(e.to_string()))?;

        tracing::debug!(program = %command.program, ?pid, cols, rows, "Spawned PTY process");

        Ok(Self {
            pty: Mutex::new(pair.master),
            reader: Arc::new(std::sync::Mutex::new(reader)),
            writer: Mutex::new(writer),
            child: Mutex::new(child),
            pid,
        })
    }

    /// Returns the process ID of the command, if available.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Stops the command and returns its exit code.
    ///
    /// The PTY stays open until the slave is dropped, so blocked reads end
    /// with an error once the process is gone.
    pub async fn kill(&self) -> Result<u32, PtyError> {
        let mut child = self.child.lock().await;

        if let Some(status) = child.try_wait()? {
            return Ok(status.exit_code());
        }

        child
            .kill()
            .map_err(|e| PtyError::KillFailed(e.to_string()))?;
        let status = child
            .wait()
            .map_err(|e| PtyError::KillFailed(e.to_string()))?;

        tracing::debug!(pid = ?self.pid, code = status.exit_code(), "PTY process killed");
        Ok(status.exit_code())
    }

    /// Returns the exit code if the command has already exited.
    pub async fn try_wait(&self) -> Result<Option<u32>, PtyError> {
        let mut child = self.child.lock().await;
        Ok(child.try_wait()?.map(|status| status.exit_code()))
    }
}

impl Slave for PtySlave {
    fn read<'a>(&'a self, buf: &'a mut [u8]) -> IoFuture<'a, usize> {
        Box::pin(async move {
            let reader = Arc::clone(&self.reader);
            let len = buf.len();

            let chunk = tokio::task::spawn_blocking(move || -> io::Result<Vec<u8>> {
                let mut chunk = vec![0u8; len];
                let mut reader = reader
                    .lock()
                    .map_err(|_| io::Error::other("PTY reader lock poisoned"))?;
                let n = reader.read(&mut chunk)?;
                chunk.truncate(n);
                Ok(chunk)
            })
            .await
            .map_err(io::Error::other)??;

            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        })
    }

    fn write<'a>(&'a self, data: &'a [u8]) -> IoFuture<'a, usize> {
        Box::pin(async move {
            let mut writer = self.writer.lock().await;
            writer.write_all(data)?;
            writer.flush()?;
            Ok(data.len())
        })
    }

    fn resize<'a>(&'a self, columns: u16, rows: u16) -> IoFuture<'a, ()> {
        Box::pin(async move {
            let pty = self.pty.lock().await;
            pty.resize(PtySize {
                rows,
                cols: columns,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| io::Error::other(e.to_string()))?;

            tracing::debug!(columns, rows, "Resized PTY");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn sh() -> PtyCommand {
        PtyCommand::new("/bin/sh")
    }

    /// Reads until `marker` shows up in the output, the stream ends or five
    /// seconds pass.
    async fn read_until(slave: &PtySlave, marker: &str) -> bool {
        let search = async {
            let mut output = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                match slave.read(&mut buf).await {
                    Ok(0) | Err(_) => return false,
                    Ok(n) => {
                        output.extend_from_slice(&buf[..n]);
                        if String::from_utf8_lossy(&output).contains(marker) {
                            return true;
                        }
                    }
                }
            }
        };
        timeout(Duration::from_secs(5), search).await.unwrap_or(false)
    }

    #[tokio::test]
    async fn test_spawn() {
        let slave = PtySlave::spawn(&sh(), 80, 24);
        assert!(slave.is_ok(), "Failed to spawn: {:?}", slave.err());

        let slave = slave.unwrap();
        assert!(slave.pid().is_some());

        let _ = slave.kill().await;
    }

    #[tokio::test]
    async fn test_spawn_missing_program() {
        let result = PtySlave::spawn(&PtyCommand::new("/nonexistent/ptybridge-test"), 80, 24);
        assert!(matches!(result, Err(PtyError::SpawnFailed(_))));
    }

    #[tokio::test]
    async fn test_write_and_read_output() {
        let slave = PtySlave::spawn(&sh(), 80, 24).unwrap();

        slave.write(b"echo pty_output_marker\n").await.unwrap();
        assert!(
            read_until(&slave, "pty_output_marker").await,
            "Did not receive expected output"
        );

        let _ = slave.kill().await;
    }

    #[tokio::test]
    async fn test_env_and_args() {
        let command = PtyCommand {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "echo value=$PTYBRIDGE_TEST".to_string()],
            env: vec![("PTYBRIDGE_TEST".to_string(), "from_env".to_string())],
            cwd: None,
        };
        let slave = PtySlave::spawn(&command, 80, 24).unwrap();

        assert!(read_until(&slave, "value=from_env").await);

        let _ = slave.kill().await;
    }

    #[tokio::test]
    async fn test_resize() {
        let slave = PtySlave::spawn(&sh(), 80, 24).unwrap();

        let result = slave.resize(120, 40).await;
        assert!(result.is_ok(), "Failed to resize: {:?}", result.err());

        let _ = slave.kill().await;
    }

    #[tokio::test]
    async fn test_exit_code_after_exit() {
        let slave = PtySlave::spawn(&sh(), 80, 24).unwrap();
        assert!(slave.try_wait().await.unwrap().is_none());

        slave.write(b"exit 42\n").await.unwrap();

        let mut code = None;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            code = slave.try_wait().await.unwrap();
            if code.is_some() {
                break;
            }
        }
        assert_eq!(code, Some(42));
        assert_eq!(slave.kill().await.unwrap(), 42);
    }
}
