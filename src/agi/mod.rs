use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

mod environment;
mod response;
#[cfg(test)]
mod tests;

pub use environment::ChannelEnvironment;
pub use response::{AgiResponse, CommandOutcome, VariableValue, parenthesised, quote};

/// Sent by the gateway in place of a reply once the caller has hung up.
const HANGUP_NOTICE: &str = "HANGUP";
const USAGE_CODE: &str = "520";

pub type StdioChannel = AgiChannel<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

pub fn stdio() -> StdioChannel {
    AgiChannel::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
}

/// Client side of one gateway session: a strict one-command, one-reply
/// exchange over a line oriented pipe.
///
/// None of the operations fail. Pipe errors surface as
/// [`CommandOutcome::Transport`] or as empty strings so that bookkeeping
/// problems never interrupt the call itself.
pub struct AgiChannel<R, W> {
    reader: R,
    writer: W,
    hung_up: bool,
}

impl<R, W> AgiChannel<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            hung_up: false,
        }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// True once the gateway has signalled that the caller hung up.
    pub fn hung_up(&self) -> bool {
        self.hung_up
    }

    /// Reads one line as bytes. Values such as caller names may arrive in a
    /// legacy encoding, so invalid UTF-8 is decoded lossily rather than
    /// leaving the rest of the line in the pipe.
    async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buf).trim().to_string()))
    }

    async fn write_line(&mut self, command: &str) -> std::io::Result<()> {
        self.writer
            .write_all(command.trim_end_matches(['\r', '\n']).as_bytes())
            .await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Reads the environment block up to the first blank line. End of stream
    /// simply ends the block.
    pub async fn read_channel_environment(&mut self) -> ChannelEnvironment {
        let mut env = ChannelEnvironment::default();
        loop {
            match self.read_line().await {
                Ok(Some(line)) if line.is_empty() => break,
                Ok(Some(line)) => env.insert_line(&line),
                Ok(None) => break,
                Err(e) => {
                    warn!("failed to read channel environment: {}", e);
                    break;
                }
            }
        }
        let mut keys: Vec<&str> = env.iter().map(|(key, _)| key).collect();
        keys.sort_unstable();
        debug!(vars = env.len(), ?keys, "channel environment received");
        env
    }

    pub async fn command(&mut self, command: &str) -> CommandOutcome {
        if let Err(e) = self.write_line(command).await {
            warn!(command, "failed to send agi command: {}", e);
            return CommandOutcome::Transport(e.to_string());
        }
        loop {
            let line = match self.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    warn!(command, "channel closed before reply");
                    return CommandOutcome::Transport("channel closed".to_string());
                }
                Err(e) => {
                    warn!(command, "failed to read agi reply: {}", e);
                    return CommandOutcome::Transport(e.to_string());
                }
            };
            if line == HANGUP_NOTICE {
                debug!(command, "hangup notice received");
                self.hung_up = true;
                continue;
            }
            let line = if line.starts_with("520-") {
                self.read_usage_block(line).await
            } else {
                line
            };
            return match AgiResponse::parse(&line) {
                Some(response) => CommandOutcome::Replied(response),
                None => {
                    warn!(command, reply = line, "unexpected agi reply");
                    CommandOutcome::Desync(line)
                }
            };
        }
    }

    /// Consumes a `520-` usage block through its closing `520 ` line.
    async fn read_usage_block(&mut self, first: String) -> String {
        let mut block = vec![first];
        loop {
            match self.read_line().await {
                Ok(Some(line)) => {
                    let done = line.starts_with(USAGE_CODE) && !line.starts_with("520-");
                    block.push(line);
                    if done {
                        break;
                    }
                }
                _ => break,
            }
        }
        block.join("\n")
    }

    /// Sends a raw command and returns the trimmed reply, or an empty string
    /// when nothing came back.
    pub async fn send_command(&mut self, command: &str) -> String {
        self.command(command).await.into_raw()
    }

    pub async fn verbose(&mut self, message: &str) -> String {
        self.verbose_level(message, 1).await
    }

    pub async fn verbose_level(&mut self, message: &str, level: u8) -> String {
        self.send_command(&format!("VERBOSE {} {}", quote(message), level))
            .await
    }

    pub async fn variable(&mut self, name: &str) -> VariableValue {
        let outcome = self.command(&format!("GET VARIABLE {}", name)).await;
        match outcome {
            CommandOutcome::Transport(_) => VariableValue::Failed,
            outcome => match outcome.data() {
                Some(value) if !value.is_empty() => VariableValue::Set(value.to_string()),
                _ => VariableValue::Unset,
            },
        }
    }

    pub async fn get_variable(&mut self, name: &str) -> String {
        self.variable(name).await.as_str().to_string()
    }

    /// Returns the raw reply; a rejected store is logged, never raised.
    pub async fn set_variable(&mut self, name: &str, value: impl std::fmt::Display) -> String {
        let outcome = self
            .command(&format!("SET VARIABLE {} {}", name, quote(&value.to_string())))
            .await;
        if !matches!(&outcome, CommandOutcome::Replied(r) if r.is_success()) {
            warn!(name, reply = outcome.raw(), "variable not stored");
        }
        outcome.into_raw()
    }

    pub async fn exec(&mut self, app: &str, options: &str) -> String {
        if options.is_empty() {
            self.send_command(&format!("EXEC {}", app)).await
        } else {
            self.send_command(&format!("EXEC {} {}", app, options)).await
        }
    }
}
