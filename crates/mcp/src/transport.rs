use std::fmt::{self, Display};
use std::process::Stdio;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::process::{Child, Command};

use crate::Error;
use crate::proto::Message;

type BoxedReader = Box<dyn AsyncBufRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// How to start a tool server process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl ServerCommand {
    /// Creates a command running `program` without arguments.
    #[inline]
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Splits a command line at whitespace. Quoting is not supported.
    ///
    /// Returns `None` for a blank line.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace();
        let mut command = Self::new(words.next()?);
        command.args = words.map(str::to_owned).collect();
        Some(command)
    }

    /// Sets an environment variable for the process, on top of the
    /// inherited environment.
    #[inline]
    pub fn env<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Returns the program to run.
    #[inline]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments.
    #[inline]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Display for ServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Newline-delimited JSON messages over a pair of byte streams.
///
/// Each message is one line of compact JSON. The transport may own the
/// child process at the other end, which is killed if the transport is
/// dropped without [`close`](Self::close).
pub struct LineTransport {
    reader: BoxedReader,
    writer: BoxedWriter,
    child: Option<Child>,
    line: String,
}

impl LineTransport {
    /// Creates a transport over an existing stream pair.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            child: None,
            line: String::new(),
        }
    }

    /// Starts `command` with piped stdin and stdout. Its stderr is
    /// inherited, so the server's logs end up next to ours.
    pub fn spawn(command: &ServerCommand) -> Result<Self, Error> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                Error::io(&format!("failed to spawn `{command}`"), err)
            })?;
        debug!("spawned `{command}` (pid {:?})", child.id());

        let (Some(stdin), Some(stdout)) =
            (child.stdin.take(), child.stdout.take())
        else {
            return Err(Error::protocol("the child has no stdio pipes"));
        };

        let mut transport = Self::new(BufReader::new(stdout), stdin);
        transport.child = Some(child);
        Ok(transport)
    }

    /// Returns the process id of the spawned server, while it runs.
    #[inline]
    pub fn server_pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Writes one message and flushes it.
    pub async fn send(&mut self, message: &Message) -> Result<(), Error> {
        let mut line = serde_json::to_string(message).map_err(|err| {
            Error::protocol(format!("failed to encode a message: {err}"))
        })?;
        trace!("--> {line}");
        line.push('\n');

        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|err| Error::io("failed to write", err))?;
        self.writer
            .flush()
            .await
            .map_err(|err| Error::io("failed to flush", err))
    }

    /// Reads the next non-blank line, without its line ending.
    ///
    /// Returns `None` once the other end has closed its side.
    pub async fn read_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .await
                .map_err(|err| Error::io("failed to read", err))?;
            if n == 0 {
                return Ok(None);
            }
            let line = self.line.trim();
            if !line.is_empty() {
                trace!("<-- {line}");
                return Ok(Some(line.to_owned()));
            }
        }
    }

    /// Reads and decodes the next message.
    ///
    /// Returns `None` once the other end has closed its side.
    pub async fn receive(&mut self) -> Result<Option<Message>, Error> {
        let Some(line) = self.read_line().await? else {
            return Ok(None);
        };
        serde_json::from_str(&line)
            .map(Some)
            .map_err(|err| Error::protocol(format!("invalid message: {err}")))
    }

    /// Closes the writing side and waits for the child process, if any,
    /// to exit.
    pub async fn close(self) -> Result<(), Error> {
        let Self {
            reader,
            mut writer,
            child,
            ..
        } = self;
        writer
            .shutdown()
            .await
            .map_err(|err| Error::io("failed to close", err))?;
        drop(writer);
        drop(reader);

        if let Some(mut child) = child {
            let status = child.wait().await.map_err(|err| {
                Error::io("failed to wait for the server", err)
            })?;
            debug!("server exited with {status}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{duplex, split};

    use super::*;

    #[test]
    fn test_parse_command() {
        let command =
            ServerCommand::parse("  fx-mcp-server --quiet ").unwrap();
        assert_eq!(command.program(), "fx-mcp-server");
        assert_eq!(command.args(), ["--quiet"]);
        assert_eq!(command.to_string(), "fx-mcp-server --quiet");
        assert_eq!(ServerCommand::parse(" \t"), None);
    }

    #[tokio::test]
    async fn test_lines() {
        let (near, far) = duplex(1024);
        let (far_reader, far_writer) = split(far);
        let mut far =
            LineTransport::new(BufReader::new(far_reader), far_writer);
        let (near_reader, near_writer) = split(near);
        let mut near =
            LineTransport::new(BufReader::new(near_reader), near_writer);

        near.send(&Message::request(1, "ping", None)).await.unwrap();
        let message = far.receive().await.unwrap().unwrap();
        assert_eq!(message.method.as_deref(), Some("ping"));
        assert_eq!(message.id, Some(json!(1)));

        far.send(&Message::response(json!(1), json!({})))
            .await
            .unwrap();
        assert!(near.receive().await.unwrap().unwrap().is_response());

        near.close().await.unwrap();
        assert_eq!(far.read_line().await.unwrap(), None);
    }
}
