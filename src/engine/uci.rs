use async_trait::async_trait;
use log::{debug, warn};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

use super::{EngineClient, EngineId, InfoLine, RawScore, SearchLimits, SearchOutput};
use crate::error::EngineError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);
/// Used when no search limit is configured, so `go` always terminates.
const FALLBACK_MOVETIME_MS: u64 = 1000;

/// A UCI engine running as a child process.
pub struct UciEngine {
    path: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    lines: Option<Lines<BufReader<ChildStdout>>>,
}

impl UciEngine {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            child: None,
            stdin: None,
            lines: None,
        }
    }

    fn spawn(&mut self) -> Result<(), EngineError> {
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: self.path.clone(),
                source,
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Init("engine stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Init("engine stdout unavailable".to_string()))?;
        self.stdin = Some(stdin);
        self.lines = Some(BufReader::new(stdout).lines());
        self.child = Some(child);
        Ok(())
    }

    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::Exited)?;
        debug!("{} sent to engine", command);
        stdin.write_all(command.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        let lines = self.lines.as_mut().ok_or(EngineError::Exited)?;
        match lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(EngineError::Exited),
        }
    }

    /// Read until a line equal to `marker`, returning the lines before it.
    async fn read_until(&mut self, marker: &str) -> Result<Vec<String>, EngineError> {
        let mut seen = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line == marker {
                return Ok(seen);
            }
            if !line.is_empty() {
                seen.push(line);
            }
        }
    }

    async fn handshake(&mut self) -> Result<EngineId, EngineError> {
        self.send("uci").await?;
        let lines = self.read_until("uciok").await?;
        let mut id = EngineId::default();
        for line in lines {
            if let Some(name) = line.strip_prefix("id name ") {
                id.name = name.trim().to_string();
            } else if let Some(author) = line.strip_prefix("id author ") {
                id.author = Some(author.trim().to_string());
            }
        }
        self.send("isready").await?;
        self.read_until("readyok").await?;
        Ok(id)
    }
}

#[async_trait]
impl EngineClient for UciEngine {
    async fn initialize(&mut self) -> Result<EngineId, EngineError> {
        self.spawn()?;
        match timeout(HANDSHAKE_TIMEOUT, self.handshake()).await {
            Ok(Ok(id)) => Ok(id),
            Ok(Err(EngineError::Exited)) => Err(EngineError::Init(
                "engine exited during the uci handshake".to_string(),
            )),
            Ok(Err(e)) => Err(EngineError::Init(e.to_string())),
            Err(_) => Err(EngineError::Init(format!(
                "no uciok within {}s",
                HANDSHAKE_TIMEOUT.as_secs()
            ))),
        }
    }

    async fn is_ready(&mut self) -> Result<(), EngineError> {
        self.send("isready").await?;
        self.read_until("readyok").await?;
        Ok(())
    }

    async fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        let command = format!("setoption name {} value {}", name, value);
        self.send(&command).await?;
        self.send("isready").await?;
        let replies = self.read_until("readyok").await?;
        match replies.iter().find(|line| rejects_option(line)) {
            Some(reason) => Err(EngineError::command(command, reason.clone())),
            None => Ok(()),
        }
    }

    async fn position(&mut self, fen: &str) -> Result<(), EngineError> {
        self.send(&format!("position fen {}", fen)).await
    }

    async fn go(&mut self, limits: &SearchLimits) -> Result<SearchOutput, EngineError> {
        let command = go_command(limits);
        self.send(&command).await?;
        let mut output = SearchOutput::default();
        loop {
            let line = self.read_line().await?;
            if let Some(rest) = line.strip_prefix("bestmove") {
                let best = rest.split_whitespace().next().unwrap_or("");
                if best.is_empty() || best == "(none)" || best == "0000" {
                    return Err(EngineError::command(command, "engine returned no move"));
                }
                debug!("{} received from engine", best);
                output.best_move = best.to_string();
                return Ok(output);
            }
            if let Some(info) = parse_info(&line) {
                output.info.push(info);
            }
        }
    }

    async fn quit(&mut self) -> Result<(), EngineError> {
        if self.stdin.is_some() {
            self.send("quit").await?;
        }
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            if timeout(QUIT_TIMEOUT, child.wait()).await.is_err() {
                warn!("engine did not quit in time, killing it");
                child.kill().await?;
            }
        }
        Ok(())
    }
}

fn rejects_option(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.contains("no such option") || lower.contains("unknown option")
}

/// Build the `go` line for the configured limits.
pub fn go_command(limits: &SearchLimits) -> String {
    let mut command = String::from("go");
    if let Some(depth) = limits.depth {
        command.push_str(&format!(" depth {}", depth));
    }
    if let Some(nodes) = limits.nodes {
        command.push_str(&format!(" nodes {}", nodes));
    }
    if let Some(movetime) = limits.movetime {
        command.push_str(&format!(" movetime {}", movetime));
    }
    if command == "go" {
        command.push_str(&format!(" movetime {}", FALLBACK_MOVETIME_MS));
    }
    command
}

/// Parse an `info` line. Returns `None` for non-info lines and `info string`.
pub fn parse_info(line: &str) -> Option<InfoLine> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "info" {
        return None;
    }
    let tokens: Vec<&str> = tokens.collect();
    let mut info = InfoLine::default();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "string" => return None,
            "depth" => {
                info.depth = tokens.get(i + 1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "time" => {
                info.time_ms = tokens.get(i + 1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "nodes" => {
                info.nodes = tokens.get(i + 1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "score" => {
                let value = tokens.get(i + 2).and_then(|v| v.parse().ok());
                info.score = match (tokens.get(i + 1), value) {
                    (Some(&"cp"), Some(v)) => Some(RawScore::Centipawns(v)),
                    (Some(&"mate"), Some(v)) => Some(RawScore::Mate(v)),
                    _ => info.score,
                };
                i += 3;
                if matches!(tokens.get(i), Some(&"lowerbound") | Some(&"upperbound")) {
                    i += 1;
                }
            }
            "pv" => {
                info.pv = tokens[i + 1..].iter().map(|m| m.to_string()).collect();
                break;
            }
            "seldepth" | "multipv" | "nps" | "hashfull" | "tbhits" | "sbhits" | "cpuload"
            | "currmove" | "currmovenumber" => i += 2,
            _ => i += 1,
        }
    }
    Some(info)
}
