use super::*;
use chrono::NaiveDate;

fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .and_then(|d| d.and_hms_opt(14, 5, 33))
        .unwrap()
}

fn identity() -> Identity {
    Identity {
        player: "Human player".to_string(),
        player_elo: "?".to_string(),
        engine: "Stockfish 16".to_string(),
        engine_elo: "3500".to_string(),
        event: "?".to_string(),
        site: "Home".to_string(),
    }
}

fn quiet() -> GameSession {
    GameSession::new(Capabilities::default(), identity()).with_clock(fixed_clock)
}

fn talking() -> GameSession {
    let capabilities = Capabilities {
        save: true,
        voice: true,
        ..Capabilities::default()
    };
    GameSession::new(capabilities, identity()).with_clock(fixed_clock)
}

fn reply(best_move: &str) -> EngineReply {
    EngineReply {
        best_move: best_move.to_string(),
        score: Score::None,
        depth: 0,
        elapsed_ms: 0,
    }
}

fn board(fx: &[Effect]) -> Vec<String> {
    fx.iter()
        .filter_map(|e| match e {
            Effect::Board(cmd) => Some(cmd.as_str().to_string()),
            _ => None,
        })
        .collect()
}

fn cues(fx: &[Effect]) -> Vec<Cue> {
    fx.iter()
        .filter_map(|e| match e {
            Effect::Speak(cue) => Some(cue.clone()),
            _ => None,
        })
        .collect()
}

fn cue_names(fx: &[Effect]) -> Vec<String> {
    cues(fx).into_iter().map(|c| c.name).collect()
}

fn search(fx: &[Effect]) -> Option<SearchRequest> {
    fx.iter().find_map(|e| match e {
        Effect::Search(request) => Some(request.clone()),
        _ => None,
    })
}

/// Human move followed by the engine's answer.
fn exchange(session: &mut GameSession, human: &str, engine: &str) -> Vec<Effect> {
    let fx = session.handle_token(human);
    assert_eq!(board(&fx)[0], "OK", "{} should be accepted", human);
    let request = search(&fx).expect("engine search after human move");
    session.on_engine_reply(request.id, reply(engine)).unwrap()
}

#[test]
fn parses_board_tokens() {
    assert_eq!(Token::parse("e1e1"), Token::ChooseColor(Color::White));
    assert_eq!(Token::parse("e8e8\n"), Token::ChooseColor(Color::Black));
    assert_eq!(Token::parse("a8a8"), Token::ToggleVoiceScore);
    assert_eq!(Token::parse("b1b1"), Token::Hint);
    assert!(matches!(Token::parse("g1f3"), Token::Move(_)));
    assert_eq!(Token::parse("zz99"), Token::Unknown("zz99".to_string()));
    assert_eq!(Token::parse("e7e8q"), Token::Unknown("e7e8q".to_string()));
}

#[test]
fn first_connection_sets_up_the_board() {
    let mut session = talking();
    let fx = session.on_connected();
    assert_eq!(board(&fx), ["CONNECTED", "RSTVAR", "GAMEWHITE"]);
    assert_eq!(cue_names(&fx), ["introduction-stockfish"]);
    assert!(fx.contains(&Effect::Web(ServerMessage::TopPlayer(
        "Stockfish 16 (3500)".to_string()
    ))));
    assert!(fx.contains(&Effect::Web(ServerMessage::BottomPlayer(
        "Human player".to_string()
    ))));
    assert_eq!(session.phase(), Phase::AwaitingColorChoice);
}

#[test]
fn reconnect_keeps_the_game() {
    let mut session = talking();
    session.on_connected();
    exchange(&mut session, "e2e4", "e7e5");
    let fen = session.fen();

    let fx = session.on_connected();
    assert_eq!(board(&fx), ["CONNECTED"]);
    assert!(cues(&fx).is_empty());
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.fen(), fen);
}

#[test]
fn white_game_first_exchange() {
    let mut session = quiet();
    let fx = session.handle_token("e1e1");
    assert_eq!(board(&fx), ["RSTVAR", "GAMEWHITE"]);
    assert!(search(&fx).is_none());
    assert_eq!(session.phase(), Phase::HumanToMove);
    assert!(fx.contains(&Effect::Web(ServerMessage::Turn("white to play".to_string()))));

    let fx = session.handle_token("e2e4");
    assert_eq!(board(&fx), ["OK"]);
    assert_eq!(session.phase(), Phase::EngineThinking);
    let request = search(&fx).unwrap();
    assert_eq!(request.purpose, SearchPurpose::Move);
    assert_eq!(request.human, Color::White);
    assert_eq!(request.fen, session.fen());

    let fx = session.on_engine_reply(request.id, reply("e7e5")).unwrap();
    assert_eq!(board(&fx), ["e7e5"]);
    assert_eq!(session.phase(), Phase::HumanToMove);
    assert_eq!(session.history().len(), 2);
    assert!(session.record().pgn_text.contains("1. e4 e5 *"));
}

#[test]
fn choosing_black_starts_the_engine() {
    let mut session = talking();
    let fx = session.handle_token("e8e8");
    assert_eq!(fx[0], Effect::CancelSpeech);
    assert_eq!(board(&fx), ["RSTVAR", "GAMEBLACK"]);
    assert_eq!(
        cues(&fx),
        [
            Cue::new("ok", 0),
            Cue::new("I-play-white", 1000),
            Cue::new("good-luck", 2250)
        ]
    );
    let request = search(&fx).unwrap();
    assert_eq!(session.phase(), Phase::EngineThinking);

    let fx = session.on_engine_reply(request.id, reply("e2e4")).unwrap();
    assert_eq!(board(&fx), ["e2e4"]);
    assert_eq!(cues(&fx)[0], Cue::new("e", FIRST_MOVE_DELAY_MS));
    assert!(fx.contains(&Effect::Web(ServerMessage::Turn("black to play".to_string()))));
}

#[test]
fn colour_choice_is_idempotent() {
    for token in ["e1e1", "e8e8"] {
        let mut session = quiet();
        session.handle_token(token);
        let (fen, phase) = (session.fen(), session.phase());
        session.handle_token(token);
        assert_eq!(session.fen(), fen);
        assert_eq!(session.phase(), phase);
        assert!(session.history().is_empty());
    }
}

#[test]
fn illegal_move_changes_nothing() {
    let mut session = quiet();
    session.handle_token("e1e1");
    let before = session.fen();
    for token in ["e2e5", "e7e5", "zz99"] {
        let fx = session.handle_token(token);
        assert_eq!(fx, [Effect::Board(BoardCommand::Invalid)]);
    }
    assert_eq!(session.fen(), before);
    assert!(session.history().is_empty());
    assert_eq!(session.phase(), Phase::HumanToMove);
}

#[test]
fn moves_are_rejected_while_engine_thinks() {
    let mut session = quiet();
    session.handle_token("e2e4");
    assert_eq!(session.phase(), Phase::EngineThinking);
    let fx = session.handle_token("d2d4");
    assert_eq!(board(&fx), ["INVALID"]);
    assert_eq!(session.history().len(), 1);
}

#[test]
fn promotion_defaults_to_queen() {
    let mut session = quiet();
    session.rules = RulesAdapter::from_fen("8/4P3/8/8/8/k7/8/4K3 w - - 0 1").unwrap();
    session.phase = Phase::HumanToMove;

    let fx = session.handle_token("e7e8");
    assert_eq!(board(&fx), ["OK"]);
    let last = session.history().last().unwrap();
    assert!(last.san.starts_with("e8=Q"), "got {}", last.san);
    assert_eq!(last.uci, "e7e8q");
    assert!(search(&fx).is_some());
    assert_eq!(session.pending_promotion, None);
}

#[test]
fn engine_castling_moves_the_rook() {
    let fen = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";
    for (engine_move, rook, san) in [("e8g8", "h8f8", "O-O"), ("e8c8", "a8d8", "O-O-O")] {
        let mut session = quiet();
        session.rules = RulesAdapter::from_fen(fen).unwrap();
        session.phase = Phase::HumanToMove;

        let fx = exchange(&mut session, "a2a3", engine_move);
        assert_eq!(board(&fx), [engine_move, rook]);
        assert_eq!(session.history().last().unwrap().san, san);
    }
}

#[test]
fn hint_leaves_the_game_untouched() {
    let mut session = talking();
    session.handle_token("e1e1");
    let before = session.fen();

    let fx = session.handle_token("b1b1");
    assert_eq!(board(&fx), ["INVALID"]);
    let request = search(&fx).unwrap();
    assert_eq!(request.purpose, SearchPurpose::Hint);

    let fx = session.on_engine_reply(request.id, reply("g1f3")).unwrap();
    assert_eq!(
        cues(&fx),
        [
            Cue::new("hint", 0),
            Cue::new("knight", 1000),
            Cue::new("f", 1750),
            Cue::new("3", 2500)
        ]
    );
    assert!(board(&fx).is_empty());
    assert_eq!(session.fen(), before);
    assert!(session.history().is_empty());
    assert_eq!(session.phase(), Phase::HumanToMove);
}

#[test]
fn toggle_flips_even_without_voice() {
    let mut session = quiet();
    assert!(!session.voice_score_enabled());
    let fx = session.handle_token("a1a1");
    assert_eq!(fx, [Effect::Board(BoardCommand::Invalid)]);
    assert!(session.voice_score_enabled());
    session.handle_token("a8a8");
    assert!(!session.voice_score_enabled());
}

#[test]
fn score_is_spoken_only_when_switched_on() {
    let capabilities = Capabilities {
        voice_score: true,
        ..Capabilities::default()
    };
    let mut session = GameSession::new(capabilities, identity()).with_clock(fixed_clock);
    session.handle_token("e1e1");
    let scored = EngineReply {
        score: Score::Centipawns(-35),
        depth: 12,
        ..reply("e7e5")
    };

    let fx = session.handle_token("e2e4");
    let request = search(&fx).unwrap();
    let fx = session.on_engine_reply(request.id, scored.clone()).unwrap();
    assert!(cue_names(&fx).contains(&"score".to_string()));
    assert!(cue_names(&fx).contains(&"point".to_string()));

    session.handle_token("a1a1");
    let fx = session.handle_token("g1f3");
    let request = search(&fx).unwrap();
    let fx = session
        .on_engine_reply(
            request.id,
            EngineReply {
                best_move: "b8c6".to_string(),
                ..scored
            },
        )
        .unwrap();
    assert_eq!(cue_names(&fx), ["knight", "c", "6"]);
}

#[test]
fn mate_is_announced_regardless_of_toggle() {
    let mut session = talking();
    session.handle_token("e1e1");
    let fx = session.handle_token("f2f3");
    let request = search(&fx).unwrap();
    let fx = session
        .on_engine_reply(
            request.id,
            EngineReply {
                score: Score::Mate(2),
                depth: 5,
                ..reply("e7e5")
            },
        )
        .unwrap();
    assert_eq!(
        cue_names(&fx),
        ["e", "5", "mate", "2"],
        "pawn move then mate distance"
    );
    assert!(session.history()[1].annotation.starts_with("{#2/5"));
}

#[test]
fn repetition_draw_speaks_draw_once() {
    let mut session = talking();
    session.handle_token("e1e1");
    exchange(&mut session, "g1f3", "g8f6");
    exchange(&mut session, "f3g1", "f6g8");
    exchange(&mut session, "g1f3", "g8f6");
    let fx = exchange(&mut session, "f3g1", "f6g8");

    assert_eq!(session.phase(), Phase::GameOver);
    let names = cue_names(&fx);
    assert_eq!(names.iter().filter(|n| *n == "draw").count(), 1);
    assert!(!names.contains(&"congratulations".to_string()));
    assert_eq!(names.last().map(String::as_str), Some("choose-colours"));
    assert_eq!(board(&fx), ["f6g8", "RSTVAR", "GAMEWHITE"]);

    let record = session.record();
    assert_eq!(record.result, PgnResult::Draw);
    assert!(record.pgn_text.contains("[Result \"1/2-1/2\"]"));
    assert!(fx.contains(&Effect::Persist(record)));
}

#[test]
fn human_checkmate_is_congratulated() {
    let mut session = talking();
    let fx = session.handle_token("e8e8");
    let request = search(&fx).unwrap();
    session.on_engine_reply(request.id, reply("f2f3")).unwrap();
    exchange(&mut session, "e7e5", "g2g4");

    let fx = session.handle_token("d8h4");
    assert_eq!(board(&fx), ["OK", "RSTVAR", "GAMEBLACK"]);
    assert_eq!(
        cues(&fx),
        [
            Cue::new("congratulations", 0),
            Cue::new("choose-colours", 1750)
        ]
    );
    assert!(search(&fx).is_none());
    assert_eq!(session.phase(), Phase::GameOver);
    assert_eq!(session.record().result, PgnResult::BlackWins);
    assert!(session.record().pgn_text.ends_with("2. g4 Qh4# 0-1"));
}

#[test]
fn move_after_game_over_starts_a_new_game() {
    let mut session = quiet();
    exchange(&mut session, "f2f3", "e7e5");
    let fx = exchange(&mut session, "g2g4", "d8h4");
    assert_eq!(board(&fx), ["d8h4", "RSTVAR", "GAMEWHITE"]);
    assert_eq!(session.phase(), Phase::GameOver);
    assert_eq!(session.record().result, PgnResult::BlackWins);

    let fx = session.handle_token("d2d4");
    assert_eq!(board(&fx), ["OK"]);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].san, "d4");
    assert_eq!(session.record().result, PgnResult::Ongoing);
}

#[test]
fn stale_reply_is_discarded() {
    let mut session = quiet();
    let first = search(&session.handle_token("e8e8")).unwrap();
    let second = search(&session.handle_token("e8e8")).unwrap();
    assert_ne!(first.id, second.id);

    assert!(session.on_engine_reply(first.id, reply("d2d4")).unwrap().is_empty());
    assert!(session.history().is_empty());
    assert_eq!(session.phase(), Phase::EngineThinking);

    session.on_engine_reply(second.id, reply("e2e4")).unwrap();
    assert_eq!(session.history()[0].san, "e4");
}

#[test]
fn illegal_engine_move_is_an_error() {
    let mut session = quiet();
    let request = search(&session.handle_token("e8e8")).unwrap();
    let err = session.on_engine_reply(request.id, reply("e2e5")).unwrap_err();
    assert!(matches!(err, EngineError::IllegalMove(ref m) if m == "e2e5"));
}

#[test]
fn record_names_players_by_colour() {
    let mut session = quiet();
    session.handle_token("e8e8");
    let record = session.record();
    assert_eq!(record.white_name, "Stockfish 16");
    assert_eq!(record.black_name, "Human player");
    assert_eq!(record.date, "2024.03.09");
    assert_eq!(record.started_at, None);
}
