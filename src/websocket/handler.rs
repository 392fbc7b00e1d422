use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, info};
use uuid::Uuid;

use crate::models::{SpectatorHub, SpectatorMessage};

/// Read-only WebSocket for one spectator page
pub struct SpectatorSocket {
    pub id: String,
    pub hub: web::Data<SpectatorHub>,
}

impl Actor for SpectatorSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        // Bring the page up to date before it sees live events
        for message in self.hub.snapshot() {
            ctx.text(message);
        }
        let total_sessions = self.hub.register(self.id.clone(), ctx.address());
        info!("Spectator connected: {}", self.id);
        debug!("Total spectators: {}", total_sessions);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        let total_sessions = self.hub.unregister(&self.id);
        info!("Spectator disconnected: {}", self.id);
        debug!("Total spectators: {}", total_sessions);
        Running::Stop
    }
}

impl Handler<SpectatorMessage> for SpectatorSocket {
    type Result = ();

    fn handle(&mut self, msg: SpectatorMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

// Spectators only listen; anything they send besides control frames is dropped
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SpectatorSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(_)) | Ok(ws::Message::Binary(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

/// WebSocket connection handler
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    hub: web::Data<SpectatorHub>,
) -> Result<HttpResponse, Error> {
    let socket = SpectatorSocket {
        id: Uuid::new_v4().to_string(),
        hub: hub.clone(),
    };
    ws::start(socket, &req, stream)
}
