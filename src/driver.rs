//! Event loop tying the session to the outside world.
//!
//! Board events are handled strictly one at a time. Engine searches are
//! awaited inline, so a second board token is never looked at while the
//! first is still being answered.

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::board::{BoardLink, LinkEvent};
use crate::engine::EngineSession;
use crate::error::BridgeError;
use crate::game::session::{Effect, GameSession};
use crate::models::SpectatorHub;
use crate::persistence::PgnStore;
use crate::speech::SpeechQueue;

pub struct Driver<L> {
    session: GameSession,
    engine: EngineSession,
    link: L,
    speech: SpeechQueue,
    hub: Arc<SpectatorHub>,
    store: PgnStore,
}

impl<L: BoardLink> Driver<L> {
    pub fn new(
        session: GameSession,
        engine: EngineSession,
        link: L,
        speech: SpeechQueue,
        hub: Arc<SpectatorHub>,
        store: PgnStore,
    ) -> Self {
        Self {
            session,
            engine,
            link,
            speech,
            hub,
            store,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Run until the board link closes. Engine and board failures end the
    /// loop with an error.
    pub async fn run(&mut self) -> Result<(), BridgeError> {
        loop {
            match self.link.next_event().await? {
                LinkEvent::Connected => {
                    let effects = self.session.on_connected();
                    self.execute(effects).await?;
                }
                LinkEvent::Token(token) => {
                    debug!("{} received from board", token);
                    let effects = self.session.handle_token(&token);
                    self.execute(effects).await?;
                }
                LinkEvent::Disconnected => {
                    warn!("Board disconnected, waiting for it to reconnect");
                }
                LinkEvent::Closed => {
                    info!("Board link closed");
                    return Ok(());
                }
            }
        }
    }

    async fn execute(&mut self, effects: Vec<Effect>) -> Result<(), BridgeError> {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Board(command) => self.link.send(&command).await?,
                Effect::Speak(cue) => self.speech.schedule(cue),
                Effect::CancelSpeech => self.speech.cancel_all(),
                Effect::Web(message) => self.hub.broadcast(&message),
                Effect::Persist(record) => {
                    if let Err(e) = self.store.save(&record) {
                        warn!("{}", e);
                    }
                }
                Effect::Search(request) => {
                    let reply = self.engine.search(&request.fen, request.human).await?;
                    queue.extend(self.session.on_engine_reply(request.id, reply)?);
                }
            }
        }
        Ok(())
    }

    /// Stop pending speech and close the engine.
    pub async fn shutdown(mut self) {
        self.speech.cancel_all();
        self.engine.shutdown().await;
    }
}
