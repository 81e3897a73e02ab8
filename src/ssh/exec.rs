//! One-shot remote command execution over a fresh session channel

use std::future::Future;
use std::time::Duration;

use russh::client::{Handle, Msg};
use russh::{Channel, ChannelMsg};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::SshError;

use super::handler::ClientHandler;

/// Extended data type code for stderr (RFC 4254 section 5.2)
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Limits applied while waiting for a command to finish.
/// The default waits forever.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub deadline: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Merged stdout/stderr of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: String,
    /// `None` when the server closed the channel without reporting one,
    /// e.g. after the process was killed by a signal.
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

/// Whether the channel still has messages worth waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Done,
}

/// Accumulates channel output in arrival order
#[derive(Debug, Default)]
struct OutputCollector {
    buf: Vec<u8>,
    exit_status: Option<u32>,
}

impl OutputCollector {
    fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    fn set_exit_status(&mut self, status: u32) {
        self.exit_status = Some(status);
    }

    /// Fold one channel message into the collected output
    fn handle(&mut self, msg: ChannelMsg) -> Result<Flow, SshError> {
        match msg {
            ChannelMsg::Data { data } => self.push(&data),
            ChannelMsg::ExtendedData { data, ext } => {
                if ext != SSH_EXTENDED_DATA_STDERR {
                    tracing::debug!("Extended data of type {} merged into output", ext);
                }
                self.push(&data);
            }
            ChannelMsg::ExitStatus { exit_status } => self.set_exit_status(exit_status),
            ChannelMsg::ExitSignal { signal_name, .. } => {
                tracing::debug!("Remote process terminated by signal {:?}", signal_name);
            }
            // The server keeps the channel open after refusing, so stop here
            ChannelMsg::Failure => {
                return Err(SshError::Channel(
                    "exec request refused by server".to_string(),
                ));
            }
            ChannelMsg::Close => return Ok(Flow::Done),
            // Exit status may still follow EOF
            ChannelMsg::Eof => {}
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn finish(self) -> Result<CommandOutput, SshError> {
        Ok(CommandOutput {
            output: String::from_utf8(self.buf)?,
            exit_status: self.exit_status,
        })
    }
}

/// Run `command` on a new channel of `handle` and wait for it to finish.
///
/// stderr is folded into the same buffer as stdout. The channel is read
/// until the server closes it, so output that arrives after the exit
/// status is still captured.
pub async fn execute(
    handle: &Handle<ClientHandler>,
    command: &str,
    options: &ExecOptions,
) -> Result<CommandOutput, SshError> {
    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| SshError::Channel(format!("Failed to open channel: {}", e)))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| SshError::Channel(format!("Failed to exec '{}': {}", command, e)))?;

    let outcome = supervise(collect(&mut channel), options, command).await;

    if let Err(e) = channel.close().await {
        tracing::debug!("Closing exec channel: {}", e);
    }

    outcome??.finish()
}

async fn collect(channel: &mut Channel<Msg>) -> Result<OutputCollector, SshError> {
    let mut collector = OutputCollector::default();

    while let Some(msg) = channel.wait().await {
        if collector.handle(msg)? == Flow::Done {
            break;
        }
    }

    Ok(collector)
}

/// Drive `fut` to completion unless the deadline passes or the token fires.
async fn supervise<F, T>(fut: F, options: &ExecOptions, command: &str) -> Result<T, SshError>
where
    F: Future<Output = T>,
{
    let bounded = async {
        match options.deadline {
            Some(deadline) => timeout(deadline, fut).await.map_err(|_| {
                SshError::Timeout(format!(
                    "command '{}' after {} ms",
                    command,
                    deadline.as_millis()
                ))
            }),
            None => Ok(fut.await),
        }
    };

    match &options.cancel {
        Some(token) => {
            tokio::select! {
                result = bounded => result,
                _ = token.cancelled() => Err(SshError::Cancelled(command.to_string())),
            }
        }
        None => bounded.await,
    }
}
