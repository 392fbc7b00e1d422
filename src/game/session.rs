//! The game session state machine.
//!
//! One entry point per input: [`GameSession::handle_token`] for board
//! notifications, [`GameSession::on_engine_reply`] for finished searches and
//! [`GameSession::on_connected`] for board (re)connections. Each returns the
//! effects to carry out, in order; the session itself never blocks, sleeps
//! or talks to the outside world other than through the `log` facade.

use chess::{Color, Piece};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info, warn};

use crate::board::BoardCommand;
use crate::config::Capabilities;
use crate::error::EngineError;
use crate::game::annotation::{annotate, format_pawns, EngineReply, Score};
use crate::game::rules::{AppliedMove, CastleSide, MoveRequest, Outcome, RulesAdapter};
use crate::game::utils::{color_to_string, turn_text};
use crate::game::voice::{pronounce_mate, pronounce_move, pronounce_score, Cue};
use crate::models::{BoardUpdate, GameRecord, Headers, HistoryEntry, PgnResult, ServerMessage};

/// Lead-in before the engine's first move of a game, so the greeting can finish.
const FIRST_MOVE_DELAY_MS: u64 = 3500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingColorChoice,
    HumanToMove,
    EngineThinking,
    GameOver,
}

/// A board notification, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    ChooseColor(Color),
    ToggleVoiceScore,
    Hint,
    Move(MoveRequest),
    Unknown(String),
}

impl Token {
    pub fn parse(raw: &str) -> Token {
        match raw.trim() {
            "e1e1" => Token::ChooseColor(Color::White),
            "e8e8" => Token::ChooseColor(Color::Black),
            "a1a1" | "a8a8" => Token::ToggleVoiceScore,
            "b1b1" | "b8b8" => Token::Hint,
            other if other.len() == 4 => match MoveRequest::from_uci(other) {
                Some(request) => Token::Move(request),
                None => Token::Unknown(other.to_string()),
            },
            other => Token::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPurpose {
    Move,
    Hint,
}

/// A search the driver must run and report back with the same `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub id: u64,
    pub purpose: SearchPurpose,
    pub fen: String,
    pub human: Color,
}

/// Work for the driver. Only `Board` and `Search` may fail fatally.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Board(BoardCommand),
    Speak(Cue),
    /// Drop every cue still waiting to be played.
    CancelSpeech,
    Web(ServerMessage),
    Persist(GameRecord),
    Search(SearchRequest),
}

/// Names and ratings for the PGN headers and player labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub player: String,
    pub player_elo: String,
    pub engine: String,
    pub engine_elo: String,
    pub event: String,
    pub site: String,
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub struct GameSession {
    rules: RulesAdapter,
    human: Color,
    phase: Phase,
    history: Vec<HistoryEntry>,
    pending_promotion: Option<Piece>,
    voice_score: bool,
    capabilities: Capabilities,
    identity: Identity,
    result: PgnResult,
    date: NaiveDate,
    started_at: Option<NaiveDateTime>,
    pending_search: Option<SearchRequest>,
    next_search_id: u64,
    connected: bool,
    clock: fn() -> NaiveDateTime,
}

impl GameSession {
    pub fn new(capabilities: Capabilities, identity: Identity) -> Self {
        let clock: fn() -> NaiveDateTime = local_now;
        Self {
            rules: RulesAdapter::new(),
            human: Color::White,
            phase: Phase::AwaitingColorChoice,
            history: Vec::new(),
            pending_promotion: None,
            voice_score: capabilities.voice_score,
            capabilities,
            identity,
            result: PgnResult::Ongoing,
            date: clock().date(),
            started_at: None,
            pending_search: None,
            next_search_id: 0,
            connected: false,
            clock,
        }
    }

    /// Replace the wall clock used for the PGN date and file name.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self.date = clock().date();
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn human_color(&self) -> Color {
        self.human
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn voice_score_enabled(&self) -> bool {
        self.voice_score
    }

    pub fn fen(&self) -> String {
        self.rules.fen()
    }

    /// Fresh game for the current human colour. Names and ratings are kept.
    pub fn reset(&mut self) {
        self.rules.reset();
        self.history.clear();
        self.pending_promotion = None;
        self.phase = Phase::AwaitingColorChoice;
        self.result = PgnResult::Ongoing;
        self.date = (self.clock)().date();
        self.started_at = None;
        self.pending_search = None;
    }

    /// Current game as PGN plus headers.
    pub fn record(&self) -> GameRecord {
        let (white_name, white_elo, black_name, black_elo) = match self.human {
            Color::White => (
                &self.identity.player,
                &self.identity.player_elo,
                &self.identity.engine,
                &self.identity.engine_elo,
            ),
            Color::Black => (
                &self.identity.engine,
                &self.identity.engine_elo,
                &self.identity.player,
                &self.identity.player_elo,
            ),
        };
        let headers = Headers {
            event: self.identity.event.clone(),
            site: self.identity.site.clone(),
            date: self.date.format("%Y.%m.%d").to_string(),
            white_name: white_name.clone(),
            white_elo: white_elo.clone(),
            black_name: black_name.clone(),
            black_elo: black_elo.clone(),
        };
        GameRecord::build(headers, &self.history, self.result, self.started_at)
    }

    /// The board link came up. Only the first connection starts a game and
    /// plays the introduction; later ones resume where play stopped.
    pub fn on_connected(&mut self) -> Vec<Effect> {
        let mut fx = vec![Effect::Board(BoardCommand::Connected)];
        if self.connected {
            info!("Board reconnected, resuming the current game");
            return fx;
        }
        self.connected = true;
        fx.push(Effect::Board(BoardCommand::ResetVariant));
        fx.push(Effect::Board(BoardCommand::GameWhite));
        info!("Board ready");

        if self.capabilities.save {
            info!("Games to be saved as .pgn files");
        }
        info!("Play time!");
        if self.capabilities.voice_enabled() {
            info!("To toggle vocal score information on/off, click twice on your queen's rook initial square");
        }
        info!("For hints, click twice on your queen's knight initial square");
        info!(
            "Human is playing {}, engine is playing {}",
            color_to_string(self.human),
            color_to_string(!self.human)
        );
        info!("To change colours, click twice on your king's initial square");
        info!("Good luck!");

        let intro = intro_cue(&self.identity.engine);
        self.speak(&mut fx, Cue::new(intro, 0));
        self.push_new_game_view(&mut fx);
        fx
    }

    pub fn handle_token(&mut self, raw: &str) -> Vec<Effect> {
        match Token::parse(raw) {
            Token::ChooseColor(color) => self.choose_color(color),
            Token::ToggleVoiceScore => self.toggle_voice_score(),
            Token::Hint => self.request_hint(),
            Token::Move(request) => self.play_human_move(request),
            Token::Unknown(text) => {
                debug!("ignoring unrecognised board token {:?}", text);
                vec![Effect::Board(BoardCommand::Invalid)]
            }
        }
    }

    /// Feed back the result of a [`SearchRequest`]. Replies to searches that
    /// a new game has superseded are dropped.
    pub fn on_engine_reply(
        &mut self,
        id: u64,
        reply: EngineReply,
    ) -> Result<Vec<Effect>, EngineError> {
        let request = match self.pending_search.take() {
            Some(request) if request.id == id => request,
            other => {
                self.pending_search = other;
                warn!("discarding stale engine reply {}", reply.best_move);
                return Ok(Vec::new());
            }
        };
        match request.purpose {
            SearchPurpose::Move => self.play_engine_move(reply),
            SearchPurpose::Hint => self.announce_hint(reply),
        }
    }

    fn choose_color(&mut self, color: Color) -> Vec<Effect> {
        let mut fx = vec![
            Effect::CancelSpeech,
            Effect::Board(BoardCommand::ResetVariant),
            Effect::Board(BoardCommand::new_game(color)),
        ];
        self.human = color;
        self.reset();
        info!(
            "Human asked to play {}, engine is playing {}",
            color_to_string(color),
            color_to_string(!color)
        );
        self.speak(&mut fx, Cue::new("ok", 0));
        self.speak(&mut fx, Cue::new(format!("I-play-{}", color_to_string(!color)), 1000));
        self.speak(&mut fx, Cue::new("good-luck", 2250));
        self.push_new_game_view(&mut fx);

        match color {
            Color::White => self.phase = Phase::HumanToMove,
            Color::Black => self.begin_engine_turn(&mut fx),
        }
        fx
    }

    fn toggle_voice_score(&mut self) -> Vec<Effect> {
        let mut fx = vec![Effect::Board(BoardCommand::Invalid)];
        self.voice_score = !self.voice_score;
        if self.voice_score {
            info!("Vocal score information switched on");
            self.speak(&mut fx, Cue::new("score-on", 0));
        } else {
            info!("Vocal score information switched off");
            self.speak(&mut fx, Cue::new("score-off", 0));
        }
        fx
    }

    fn request_hint(&mut self) -> Vec<Effect> {
        let mut fx = vec![Effect::Board(BoardCommand::Invalid)];
        if !self.human_may_move() {
            debug!("hint ignored outside the human's turn");
            return fx;
        }
        info!("Asking for hint...");
        let request = self.new_search(SearchPurpose::Hint);
        fx.push(Effect::Search(request));
        fx
    }

    fn play_human_move(&mut self, request: MoveRequest) -> Vec<Effect> {
        if self.phase == Phase::GameOver {
            debug!("new game as {} after game over", color_to_string(self.human));
            self.reset();
        }
        if !self.human_may_move() {
            debug!(
                "{}{} rejected outside the human's turn",
                request.from, request.to
            );
            return vec![Effect::Board(BoardCommand::Invalid)];
        }
        if !self
            .rules
            .legal_destinations(request.from)
            .contains(&request.to)
        {
            debug!("illegal move {}{}", request.from, request.to);
            return vec![Effect::Board(BoardCommand::Invalid)];
        }

        if self.rules.is_promotion(request.from, request.to) {
            self.pending_promotion = Some(Piece::Queen);
        }
        let request = MoveRequest {
            promotion: self.pending_promotion.take(),
            ..request
        };
        let Some(applied) = self.rules.apply(&request) else {
            debug!("move {}{} could not be resolved", request.from, request.to);
            return vec![Effect::Board(BoardCommand::Invalid)];
        };

        let mut fx = vec![Effect::Board(BoardCommand::Ok)];
        let outcome = self.record_move(&mut fx, &applied, String::new());
        info!("Human played {}", applied.san);
        match outcome {
            Some(outcome) => self.finish_game(&mut fx, outcome, true, 0),
            None => {
                fx.push(Effect::Web(ServerMessage::Turn(turn_text(!self.human))));
                self.begin_engine_turn(&mut fx);
            }
        }
        fx
    }

    fn play_engine_move(&mut self, reply: EngineReply) -> Result<Vec<Effect>, EngineError> {
        let annotation = annotate(&reply);
        let applied = self
            .rules
            .apply_uci(&reply.best_move)
            .ok_or_else(|| EngineError::IllegalMove(reply.best_move.clone()))?;

        let mut fx = Vec::new();
        let outcome = self.record_move(&mut fx, &applied, annotation.clone());
        if annotation.is_empty() {
            info!("Engine played {}", applied.san);
        } else {
            info!("Engine played {} {}", applied.san, annotation);
        }

        fx.push(Effect::Board(BoardCommand::Move(reply.best_move.clone())));
        if let Some(side) = applied.castle {
            let rook = rook_relocation(applied.mover, side);
            fx.push(Effect::Board(BoardCommand::Move(rook.to_string())));
        }

        let lead_in = if self.history.len() == 1 {
            FIRST_MOVE_DELAY_MS
        } else {
            0
        };
        let mut timer = self.speak_all(&mut fx, pronounce_move(&applied.san, lead_in));
        if outcome.is_none() {
            match reply.score {
                Score::Centipawns(cp) if self.capabilities.voice_score && self.voice_score => {
                    timer = self.speak_all(&mut fx, pronounce_score(&format_pawns(cp), timer));
                }
                Score::Mate(n) => {
                    timer = self.speak_all(&mut fx, pronounce_mate(n, timer));
                }
                _ => {}
            }
        }

        match outcome {
            Some(outcome) => self.finish_game(&mut fx, outcome, false, timer),
            None => {
                self.phase = Phase::HumanToMove;
                fx.push(Effect::Web(ServerMessage::Turn(turn_text(self.human))));
                info!("Waiting for human...");
            }
        }
        Ok(fx)
    }

    /// Play the suggestion on a scratch ply only to name it.
    fn announce_hint(&mut self, reply: EngineReply) -> Result<Vec<Effect>, EngineError> {
        let applied = self
            .rules
            .apply_uci(&reply.best_move)
            .ok_or_else(|| EngineError::IllegalMove(reply.best_move.clone()))?;
        self.rules.undo();
        info!("Hint: {}", applied.san);

        let mut fx = Vec::new();
        self.speak(&mut fx, Cue::new("hint", 0));
        self.speak_all(&mut fx, pronounce_move(&applied.san, 1000));
        Ok(fx)
    }

    /// Append to the history and publish the new state. Returns the outcome
    /// if this move ended the game.
    fn record_move(
        &mut self,
        fx: &mut Vec<Effect>,
        applied: &AppliedMove,
        annotation: String,
    ) -> Option<Outcome> {
        self.history.push(HistoryEntry {
            san: applied.san.clone(),
            uci: applied.uci.clone(),
            mover: applied.mover,
            annotation,
        });
        if self.history.len() == 1 {
            self.started_at = Some((self.clock)());
        }

        let outcome = self.rules.outcome();
        if let Some(outcome) = outcome {
            self.result = match outcome {
                Outcome::Checkmate { winner } => PgnResult::win_for(winner),
                _ => PgnResult::Draw,
            };
        }

        let record = self.record();
        fx.push(Effect::Web(ServerMessage::Pgn(record.pgn_text.clone())));
        fx.push(Effect::Web(ServerMessage::Board(BoardUpdate {
            orientation: color_to_string(self.human),
            position: self.rules.fen(),
            show_notation: false,
        })));
        if self.capabilities.save {
            fx.push(Effect::Persist(record));
        }
        outcome
    }

    fn finish_game(&mut self, fx: &mut Vec<Effect>, outcome: Outcome, by_human: bool, timer: u64) {
        info!("End of game: {}", outcome.reason());
        fx.push(Effect::Board(BoardCommand::ResetVariant));
        fx.push(Effect::Board(BoardCommand::new_game(self.human)));
        info!("Choose colours by clicking twice on your king's initial square to start a new game.");

        if by_human {
            let verdict = if outcome.is_draw() {
                "draw"
            } else {
                "congratulations"
            };
            self.speak(fx, Cue::new(verdict, 0));
            self.speak(fx, Cue::new("choose-colours", 1750));
        } else {
            let at = timer + 1000;
            if outcome.is_draw() {
                self.speak(fx, Cue::new("draw", at));
                self.speak(fx, Cue::new("choose-colours", at + 1750));
            } else {
                self.speak(fx, Cue::new("choose-colours", at));
            }
        }
        fx.push(Effect::Web(ServerMessage::Turn(String::new())));
        self.phase = Phase::GameOver;
        self.pending_search = None;
    }

    fn begin_engine_turn(&mut self, fx: &mut Vec<Effect>) {
        self.phase = Phase::EngineThinking;
        info!("Engine is thinking...");
        let request = self.new_search(SearchPurpose::Move);
        fx.push(Effect::Search(request));
    }

    fn new_search(&mut self, purpose: SearchPurpose) -> SearchRequest {
        self.next_search_id += 1;
        let request = SearchRequest {
            id: self.next_search_id,
            purpose,
            fen: self.rules.fen(),
            human: self.human,
        };
        self.pending_search = Some(request.clone());
        request
    }

    /// Before a colour is chosen the human plays White by default.
    fn human_may_move(&self) -> bool {
        matches!(self.phase, Phase::HumanToMove | Phase::AwaitingColorChoice)
            && self.rules.side_to_move() == self.human
            && self.pending_search.is_none()
    }

    fn push_new_game_view(&self, fx: &mut Vec<Effect>) {
        fx.push(Effect::Web(ServerMessage::Board(BoardUpdate {
            orientation: color_to_string(self.human),
            position: "start".to_string(),
            show_notation: false,
        })));
        fx.push(Effect::Web(ServerMessage::Pgn(String::new())));
        fx.push(Effect::Web(ServerMessage::Turn(turn_text(Color::White))));
        fx.push(Effect::Web(ServerMessage::TopPlayer(label(
            &self.identity.engine,
            &self.identity.engine_elo,
        ))));
        fx.push(Effect::Web(ServerMessage::BottomPlayer(label(
            &self.identity.player,
            &self.identity.player_elo,
        ))));
    }

    fn speak(&self, fx: &mut Vec<Effect>, cue: Cue) {
        if self.capabilities.voice_enabled() {
            fx.push(Effect::Speak(cue));
        }
    }

    fn speak_all(&self, fx: &mut Vec<Effect>, (cues, end): (Vec<Cue>, u64)) -> u64 {
        for cue in cues {
            self.speak(fx, cue);
        }
        end
    }
}

fn label(name: &str, elo: &str) -> String {
    if elo.is_empty() || elo == "?" {
        name.to_string()
    } else {
        format!("{} ({})", name, elo)
    }
}

fn intro_cue(engine_name: &str) -> &'static str {
    if engine_name.contains("Lc0") {
        "introduction-lc0"
    } else if engine_name.contains("Stockfish") {
        "introduction-stockfish"
    } else {
        "introduction-2"
    }
}

/// Rook move the physical board must be told about after engine castling.
fn rook_relocation(engine: Color, side: CastleSide) -> &'static str {
    match (engine, side) {
        (Color::White, CastleSide::King) => "h1f1",
        (Color::White, CastleSide::Queen) => "a1d1",
        (Color::Black, CastleSide::King) => "h8f8",
        (Color::Black, CastleSide::Queen) => "a8d8",
    }
}

#[cfg(test)]
mod tests;
