mod bank;
mod config;
mod events;
mod routes;
mod sse;
mod state;
mod tui;

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use duel::{DuelConfig, DuelService, MemoryRepository, NotificationHub};

use config::ServerConfig;
use events::OpsEvent;
use state::AppState;
use tui::TuiState;

#[derive(Parser)]
#[command(name = "duel-server")]
#[command(about = "Real-time PVP duel server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    #[arg(short, long, value_name = "FILE", help = "Question bank JSON file")]
    questions: PathBuf,

    #[arg(long, default_value_t = 5, help = "Fixed rounds before tie-break")]
    rounds: u32,

    #[arg(long, default_value_t = 1, help = "Points per correct answer")]
    points: u32,

    #[arg(long, help = "Cancel pending challenges after this many seconds")]
    challenge_timeout_secs: Option<u64>,

    #[arg(long, default_value_t = 64, help = "Per-topic event buffer size")]
    sse_buffer: usize,

    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ServerConfig {
        duel: DuelConfig {
            regular_rounds: args.rounds,
            points_per_correct: args.points,
        },
        challenge_timeout: args.challenge_timeout_secs.map(Duration::from_secs),
        sse_buffer: args.sse_buffer,
        ..Default::default()
    };

    let bank = bank::load(&args.questions)?;
    let service = Arc::new(DuelService::new(
        Arc::new(MemoryRepository::new()),
        Arc::new(bank),
        Arc::new(NotificationHub::new(config.sse_buffer)),
        config.duel,
    ));

    let (ops_tx, ops_rx) = mpsc::unbounded_channel();
    let app = AppState::new(Arc::clone(&service), ops_tx);

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let local_addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, routes::router(app)).await {
            log::error!("http server exited: {}", err);
        }
    });

    if let Some(timeout) = config.challenge_timeout {
        let sweeper = Arc::clone(&service);
        let interval = config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match sweeper.expire_pending(timeout.as_millis() as u64).await {
                    Ok(expired) if !expired.is_empty() => {
                        log::info!("expired {} pending challenge(s)", expired.len());
                    }
                    Ok(_) => {}
                    Err(err) => log::warn!("challenge sweep failed: {}", err),
                }
            }
        });
    }

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        log::info!("Server started on {}", local_addr);
        run_headless(ops_rx).await;
        log::info!("Server shutting down");
    } else {
        run_with_tui(&service, ops_rx, local_addr)?;
    }

    Ok(())
}

async fn run_headless(mut ops_rx: mpsc::UnboundedReceiver<OpsEvent>) {
    loop {
        tokio::select! {
            Some(event) = ops_rx.recv() => {
                if event.is_error() {
                    log::warn!("{}", event.describe());
                } else {
                    log::info!("{}", event.describe());
                }
            }
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    break;
                }
            }
        }
    }
}

fn run_with_tui(
    service: &Arc<DuelService>,
    mut ops_rx: mpsc::UnboundedReceiver<OpsEvent>,
    local_addr: SocketAddr,
) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let started = Instant::now();
    let mut tui_state = TuiState::new();
    tui_state.push_info(format!("Server started on {}", local_addr));

    let mut running = true;
    while running {
        while let Ok(event) = ops_rx.try_recv() {
            tui_state.push(&event);
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                {
                    running = false;
                }
            }
        }

        let duels = service.overview().unwrap_or_default();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, started.elapsed().as_secs(), &duels);
        })?;
    }

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
