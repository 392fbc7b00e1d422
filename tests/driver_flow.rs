use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use bluechess::board::{BoardCommand, BoardLink, LinkEvent};
use bluechess::config::{Capabilities, EngineConfig};
use bluechess::console::ConsoleBuffer;
use bluechess::driver::Driver;
use bluechess::engine::{
    EngineClient, EngineId, EngineSession, InfoLine, RawScore, SearchLimits, SearchOutput,
};
use bluechess::error::{BoardLinkError, BridgeError, EngineError, SpeechError};
use bluechess::game::{GameSession, Identity, Phase};
use bluechess::models::SpectatorHub;
use bluechess::persistence::PgnStore;
use bluechess::speech::{SpeechQueue, Speaker};

/// Replies with the scripted moves in order, then fails.
struct ScriptedEngine {
    moves: VecDeque<&'static str>,
    positions: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl EngineClient for ScriptedEngine {
    async fn initialize(&mut self) -> Result<EngineId, EngineError> {
        Ok(EngineId {
            name: "Stockfish 16".to_string(),
            author: None,
        })
    }

    async fn is_ready(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn set_option(&mut self, _name: &str, _value: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn position(&mut self, fen: &str) -> Result<(), EngineError> {
        self.positions.lock().unwrap().push(fen.to_string());
        Ok(())
    }

    async fn go(&mut self, _limits: &SearchLimits) -> Result<SearchOutput, EngineError> {
        let best_move = self.moves.pop_front().ok_or(EngineError::Exited)?;
        Ok(SearchOutput {
            best_move: best_move.to_string(),
            info: vec![InfoLine {
                depth: Some(12),
                score: Some(RawScore::Centipawns(-20)),
                time_ms: Some(300),
                ..InfoLine::default()
            }],
        })
    }

    async fn quit(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

struct ScriptedBoard {
    events: VecDeque<LinkEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    fail_on: Option<&'static str>,
}

#[async_trait]
impl BoardLink for ScriptedBoard {
    async fn next_event(&mut self) -> Result<LinkEvent, BoardLinkError> {
        Ok(self.events.pop_front().unwrap_or(LinkEvent::Closed))
    }

    async fn send(&mut self, command: &BoardCommand) -> Result<(), BoardLinkError> {
        if self.fail_on == Some(command.as_str()) {
            return Err(BoardLinkError::Write {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"),
            });
        }
        self.sent.lock().unwrap().push(command.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct SilentSpeaker {
    played: Mutex<Vec<String>>,
}

#[async_trait]
impl Speaker for SilentSpeaker {
    async fn play(&self, cue: &str) -> Result<(), SpeechError> {
        self.played.lock().unwrap().push(cue.to_string());
        Ok(())
    }
}

struct Harness {
    sent: Arc<Mutex<Vec<String>>>,
    positions: Arc<Mutex<Vec<String>>>,
    speaker: Arc<SilentSpeaker>,
    pgn_dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            sent: Arc::default(),
            positions: Arc::default(),
            speaker: Arc::default(),
            pgn_dir: TempDir::new().unwrap(),
        }
    }

    async fn driver(
        &self,
        capabilities: Capabilities,
        tokens: &[&str],
        engine_moves: &[&'static str],
        fail_on: Option<&'static str>,
    ) -> Driver<ScriptedBoard> {
        let mut events: VecDeque<LinkEvent> = VecDeque::from([LinkEvent::Connected]);
        events.extend(tokens.iter().map(|t| LinkEvent::Token(t.to_string())));

        let config: EngineConfig = toml::from_str("path = \"fake\"\nelo = \"3500\"").unwrap();
        let client = Box::new(ScriptedEngine {
            moves: engine_moves.iter().copied().collect(),
            positions: self.positions.clone(),
        });
        let engine = EngineSession::start(client, &config, SearchLimits::default())
            .await
            .unwrap();
        let identity = Identity {
            player: "Human player".to_string(),
            player_elo: "?".to_string(),
            engine: engine.name().to_string(),
            engine_elo: engine.elo().to_string(),
            event: "?".to_string(),
            site: "?".to_string(),
        };
        let board = ScriptedBoard {
            events,
            sent: self.sent.clone(),
            fail_on,
        };
        Driver::new(
            GameSession::new(capabilities, identity),
            engine,
            board,
            SpeechQueue::new(self.speaker.clone()),
            Arc::new(SpectatorHub::new(Arc::new(ConsoleBuffer::new()))),
            PgnStore::new(self.pgn_dir.path()),
        )
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[actix_rt::test]
async fn plays_a_game_against_the_engine() {
    let harness = Harness::new();
    let capabilities = Capabilities {
        save: true,
        ..Capabilities::default()
    };
    let mut driver = harness
        .driver(
            capabilities,
            &["e1e1", "e2e4", "b1b1", "g1f3"],
            &["e7e5", "g1f3", "b8c6"],
            None,
        )
        .await;

    driver.run().await.unwrap();

    assert_eq!(
        harness.sent(),
        [
            "CONNECTED", "RSTVAR", "GAMEWHITE", "RSTVAR", "GAMEWHITE", "OK", "e7e5", "INVALID",
            "OK", "b8c6"
        ]
    );
    let session = driver.session();
    assert_eq!(session.phase(), Phase::HumanToMove);
    let sans: Vec<&str> = session.history().iter().map(|e| e.san.as_str()).collect();
    assert_eq!(sans, ["e4", "e5", "Nf3", "Nc6"]);
    assert_eq!(session.history()[1].annotation, "{0.20/12 0.3s}");

    let positions = harness.positions.lock().unwrap().clone();
    assert_eq!(positions.len(), 3);
    assert!(positions[1].starts_with("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w"));

    let files: Vec<_> = fs::read_dir(harness.pgn_dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
    let pgn = fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
    assert!(pgn.contains("[Black \"Stockfish 16\"]"));
    assert!(pgn.contains("[BlackElo \"3500\"]"));
    assert!(pgn.ends_with("1. e4 e5 {0.20/12 0.3s} 2. Nf3 Nc6 {0.20/12 0.3s} *"));

    driver.shutdown().await;
}

#[actix_rt::test]
async fn engine_failure_stops_the_loop() {
    let harness = Harness::new();
    let mut driver = harness
        .driver(Capabilities::default(), &["e2e4"], &[], None)
        .await;

    let err = driver.run().await.unwrap_err();
    assert!(matches!(err, BridgeError::Engine(EngineError::Exited)));
    assert_eq!(harness.sent(), ["CONNECTED", "RSTVAR", "GAMEWHITE", "OK"]);
}

#[actix_rt::test]
async fn board_write_failure_is_fatal() {
    let harness = Harness::new();
    let mut driver = harness
        .driver(Capabilities::default(), &["e2e4"], &["e7e5"], Some("OK"))
        .await;

    let err = driver.run().await.unwrap_err();
    assert!(matches!(err, BridgeError::BoardLink(BoardLinkError::Write { .. })));
    assert_eq!(driver.session().history().len(), 1);
}

#[actix_rt::test]
async fn voice_cues_reach_the_speaker() {
    let harness = Harness::new();
    let capabilities = Capabilities {
        voice: true,
        ..Capabilities::default()
    };
    let mut driver = harness
        .driver(capabilities, &["a1a1"], &[], None)
        .await;

    driver.run().await.unwrap();
    actix_rt::time::sleep(Duration::from_millis(100)).await;

    let played = harness.speaker.played.lock().unwrap().clone();
    assert!(played.contains(&"introduction-stockfish".to_string()));
    assert!(played.contains(&"score-on".to_string()));
}
