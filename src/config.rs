use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "bluechess.toml";

/// Boolean feature switches handed to the session at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub save: bool,
    pub voice: bool,
    pub voice_score: bool,
    pub web: bool,
    pub debug: bool,
}

impl Capabilities {
    /// Any spoken output at all. Score announcements imply voice.
    pub fn voice_enabled(&self) -> bool {
        self.voice || self.voice_score
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub engine: EngineConfig,
    #[serde(default)]
    pub moves: MoveSettings,
    #[serde(default)]
    pub pgn: PgnSettings,
    #[serde(default)]
    pub voice: VoiceSettings,
    #[serde(default)]
    pub web: WebSettings,
    #[serde(default)]
    pub board: BoardSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub path: String,
    pub description: Option<String>,
    pub elo: Option<String>,
    #[serde(default)]
    pub options: Vec<UciOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UciOption {
    pub name: String,
    pub value: toml::Value,
}

impl UciOption {
    /// The value as it goes on the `setoption` line.
    pub fn value_string(&self) -> String {
        match &self.value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Search limits forwarded to `go`; any combination may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct MoveSettings {
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub movetime: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PgnSettings {
    pub event: Option<String>,
    pub site: Option<String>,
    #[serde(default = "default_player")]
    pub player: String,
    pub player_elo: Option<String>,
    #[serde(default = "default_pgn_dir")]
    pub directory: PathBuf,
}

impl Default for PgnSettings {
    fn default() -> Self {
        Self {
            event: None,
            site: None,
            player: default_player(),
            player_elo: None,
            directory: default_pgn_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceSettings {
    #[serde(default = "default_voice_command")]
    pub command: String,
    #[serde(default = "default_voice_args")]
    pub args: Vec<String>,
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            command: default_voice_command(),
            args: default_voice_args(),
            audio_dir: default_audio_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Tcp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardSettings {
    #[serde(default)]
    pub transport: Transport,
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            listen: default_listen(),
        }
    }
}

fn default_player() -> String {
    "Human player".to_string()
}

fn default_pgn_dir() -> PathBuf {
    PathBuf::from("pgn")
}

fn default_voice_command() -> String {
    "mpg123".to_string()
}

fn default_voice_args() -> Vec<String> {
    vec!["-q".to_string()]
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("audio")
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_listen() -> String {
    "127.0.0.1:7878".to_string()
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        if config.engine.path.trim().is_empty() {
            return Err(ConfigError::MissingEngine);
        }
        Ok(config)
    }
}
