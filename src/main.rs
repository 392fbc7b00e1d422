use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use futures::StreamExt;
use log::{error, info};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use bluechess::board::{BoardLink, StdioLink, TcpLink};
use bluechess::config::{AppConfig, Capabilities, Transport, WebSettings, DEFAULT_CONFIG_FILE};
use bluechess::console::{init_logger, ConsoleBuffer};
use bluechess::driver::Driver;
use bluechess::engine::{EngineSession, UciEngine};
use bluechess::game::{GameSession, Identity};
use bluechess::models::{ServerMessage, SpectatorHub};
use bluechess::persistence::PgnStore;
use bluechess::routes::configure_routes;
use bluechess::speech::{CommandSpeaker, SpeechQueue};

/// Play a UCI chess engine on a Bluetooth chessboard
#[derive(Parser, Debug)]
#[command(name = "bluechess", version)]
struct Cli {
    /// Save every game as a PGN file
    #[arg(short = 's', long)]
    save: bool,

    /// Announce moves with audio clips
    #[arg(short = 'v', long)]
    voice: bool,

    /// Announce moves and the engine's evaluation
    #[arg(short = 'c', long)]
    voice_score: bool,

    /// Serve the spectator web page
    #[arg(short = 'w', long)]
    web: bool,

    /// Log board and engine traffic
    #[arg(short = 'd', long)]
    debug: bool,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

impl Cli {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            save: self.save,
            voice: self.voice || self.voice_score,
            voice_score: self.voice_score,
            web: self.web,
            debug: self.debug,
        }
    }
}

#[actix_web::main]
async fn main() {
    let cli = Cli::parse();
    let console = Arc::new(ConsoleBuffer::new());
    init_logger(cli.debug, console.clone());

    if let Err(e) = run(cli, console).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli, console: Arc<ConsoleBuffer>) -> anyhow::Result<()> {
    let capabilities = cli.capabilities();
    let config = AppConfig::load(&cli.config)?;
    info!("Configuration loaded from {}", cli.config.display());

    let hub = Arc::new(SpectatorHub::new(console.clone()));
    let server = if capabilities.web {
        Some(start_web(&config.web, hub.clone(), &console)?)
    } else {
        None
    };

    let client = Box::new(UciEngine::new(config.engine.path.clone()));
    let engine = EngineSession::start(client, &config.engine, config.moves).await?;

    let unknown = || "?".to_string();
    let identity = Identity {
        player: config.pgn.player.clone(),
        player_elo: config.pgn.player_elo.clone().unwrap_or_else(unknown),
        engine: engine.name().to_string(),
        engine_elo: engine.elo().to_string(),
        event: config.pgn.event.clone().unwrap_or_else(unknown),
        site: config.pgn.site.clone().unwrap_or_else(unknown),
    };
    let session = GameSession::new(capabilities, identity);
    let speech = SpeechQueue::new(Arc::new(CommandSpeaker::new(&config.voice)));
    let store = PgnStore::new(config.pgn.directory.clone());

    let result = match config.board.transport {
        Transport::Stdio => {
            info!("Waiting for board tokens on stdin");
            let link = StdioLink::stdio();
            drive(Driver::new(session, engine, link, speech, hub, store)).await
        }
        Transport::Tcp => {
            let link = TcpLink::bind(&config.board.listen).await?;
            drive(Driver::new(session, engine, link, speech, hub, store)).await
        }
    };

    if let Some(server) = server {
        server.stop(true).await;
    }
    result
}

async fn drive<L: BoardLink>(mut driver: Driver<L>) -> anyhow::Result<()> {
    let result = driver.run().await;
    driver.shutdown().await;
    Ok(result?)
}

/// Start the spectator server in the background and forward console lines
/// to it.
fn start_web(
    settings: &WebSettings,
    hub: Arc<SpectatorHub>,
    console: &ConsoleBuffer,
) -> anyhow::Result<ServerHandle> {
    let mut feed = console.subscribe();
    let feed_hub = hub.clone();
    actix_rt::spawn(async move {
        while let Some(line) = feed.next().await {
            feed_hub.broadcast(&ServerMessage::Console(line));
        }
    });

    let hub = web::Data::from(hub);
    let web_settings = web::Data::new(settings.clone());
    let static_dir = settings.static_dir.clone();
    let server = HttpServer::new(move || {
        let static_dir = static_dir.clone();
        App::new()
            .app_data(hub.clone())
            .app_data(web_settings.clone())
            .configure(move |cfg| configure_routes(cfg, &static_dir))
    })
    .bind(settings.bind.as_str())?
    .run();

    let handle = server.handle();
    actix_rt::spawn(server);
    info!("Spectator page at http://{}", settings.bind);
    Ok(handle)
}
