/// Cadence - command-line music client with simulated playback
mod commands;
mod console;
mod seed;

use anyhow::Context;
use cadence_core::{Track, TrackId, UserId};
use cadence_playback::{PlaybackEvent, SimulatedBackend};
use cadence_session::{
    open_storage, Collaborators, LikeOutcome, PlayOutcome, SearchController, Session,
    SessionConfig, UploadForm, UploadOutcome,
};
use cadence_storage::{songs, LocalIdentity};
use clap::{Parser, Subcommand};
use commands::{Command, HELP};
use console::{ConsoleNavigator, ConsoleNotifier};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence music client", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./cadence.toml if present)
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file of songs to load into the catalog
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session (default)
    Run {
        /// Simulated length of every track, in seconds
        #[arg(long, default_value_t = 30)]
        track_length: u64,
    },
    /// Print songs whose title contains TITLE, newest first
    Songs {
        #[arg(default_value = "")]
        title: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = SessionConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate()?;

    let (store, blobs) = open_storage(&config.storage).await?;
    if let Some(path) = &cli.catalog {
        seed::seed_catalog(store.as_ref(), path).await?;
    }

    match cli.command.unwrap_or(Commands::Run { track_length: 30 }) {
        Commands::Songs { title } => {
            for track in songs::by_title(store.as_ref(), &title).await? {
                print_track(&track);
            }
            Ok(())
        }
        Commands::Run { track_length } => {
            let identity = Arc::new(LocalIdentity::new());
            identity.set_signed_out();
            let navigator = Arc::new(ConsoleNavigator::default());

            let session = Session::start(
                config,
                Collaborators {
                    store,
                    blobs,
                    identity: identity.clone(),
                    backend: Arc::new(SimulatedBackend::new(Duration::from_secs(track_length))),
                    navigator: navigator.clone(),
                    notifier: Arc::new(ConsoleNotifier),
                },
            )?;

            let result = repl(&session, &identity, &navigator).await;
            session.shutdown().await;
            result
        }
    }
}

fn print_track(track: &Track) {
    println!("  {:<24} {} - {}", track.id, track.title, track.author);
}

/// Print playback events as they happen
fn spawn_event_printer(session: &Session) -> tokio::task::JoinHandle<()> {
    let mut events = session.player().events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                PlaybackEvent::PlayStarted { url } => println!("> playing {url}"),
                PlaybackEvent::Paused { url } => println!("|| paused {url}"),
                PlaybackEvent::PlaybackEnded { url } => println!("[] finished {url}"),
                PlaybackEvent::VolumeChanged { level, is_muted } => {
                    println!("volume {:.0}%{}", level * 100.0, if is_muted { " (muted)" } else { "" });
                }
                PlaybackEvent::StateChanged { .. } | PlaybackEvent::Error { .. } => {}
            }
        }
    })
}

async fn repl(
    session: &Session,
    identity: &LocalIdentity,
    navigator: &ConsoleNavigator,
) -> anyhow::Result<()> {
    let printer = spawn_event_printer(session);
    let search = session.search();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{HELP}");
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(session, identity, navigator, &search, command).await {
            println!("[error] {e:#}");
        }
    }

    printer.abort();
    Ok(())
}

/// Songs shown for the last search
async fn listing(session: &Session, navigator: &ConsoleNavigator) -> anyhow::Result<Vec<Track>> {
    Ok(songs::by_title(session.store().as_ref(), &navigator.current_title()).await?)
}

async fn execute(
    session: &Session,
    identity: &LocalIdentity,
    navigator: &ConsoleNavigator,
    search: &SearchController,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Login { user, email } => identity.sign_in_as(UserId::new(user), email),
        Command::Logout => {
            // Failures are already reported by the session
            let _ = session.sign_out().await;
        }
        Command::Songs => {
            for track in listing(session, navigator).await? {
                print_track(&track);
            }
        }
        Command::Liked => {
            for track in session.liked_songs().await {
                print_track(&track);
            }
        }
        Command::Play(id) => {
            let ids: Vec<TrackId> = listing(session, navigator)
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect();
            match session.request_play(&TrackId::new(id), &ids).await {
                PlayOutcome::Started => {}
                PlayOutcome::AuthRequired => println!("sign in first (login <user>)"),
                PlayOutcome::SubscriptionRequired => println!("a subscription is required"),
                PlayOutcome::Deferred => println!("still checking your account, try again"),
            }
        }
        Command::Next => {
            session.playlist().next();
        }
        Command::Previous => {
            session.playlist().previous();
        }
        Command::Toggle => session.player().toggle_play_pause().await?,
        Command::Volume(level) => session.player().set_volume(level).await?,
        Command::Mute => session.player().toggle_mute().await?,
        Command::Like(id) => {
            let toggle = session.like_toggle(TrackId::new(id));
            match toggle.toggle().await {
                LikeOutcome::Liked | LikeOutcome::Failed(_) => {}
                LikeOutcome::Unliked => println!("removed from liked songs"),
                LikeOutcome::AuthRequired => println!("sign in first (login <user>)"),
                LikeOutcome::Deferred => println!("still checking your account, try again"),
                LikeOutcome::Busy | LikeOutcome::Cancelled => {}
            }
        }
        Command::Search(text) => search.set_input(text),
        Command::Upload {
            title,
            author,
            song,
            image,
        } => {
            let song = tokio::fs::read(&song)
                .await
                .with_context(|| format!("Failed to read {}", song.display()))?;
            let image = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let form = UploadForm {
                title,
                author,
                song: Some(song),
                image: Some(image),
            };
            match session.uploader().submit(form).await {
                UploadOutcome::Created(track) => print_track(&track),
                UploadOutcome::AuthRequired => println!("sign in first (login <user>)"),
                UploadOutcome::SubscriptionRequired => println!("a subscription is required"),
                _ => {}
            }
        }
        Command::Status => print_status(session),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn print_status(session: &Session) {
    let status = session.player().status();
    let entitlement = session.entitlement().snapshot();

    match entitlement.user_id() {
        Some(user) => println!(
            "user: {user}{}",
            if entitlement.has_subscription() { " (subscribed)" } else { "" }
        ),
        None => println!("user: anonymous"),
    }
    match &status.track {
        Some(track) => println!("{:?}: {} - {}", status.state, track.title, track.author),
        None => println!("{:?}", status.state),
    }
    println!(
        "volume: {:.0}%{}",
        status.volume * 100.0,
        if status.muted { " (muted)" } else { "" }
    );

    let playlist = session.playlist().snapshot();
    if !playlist.ids.is_empty() {
        let ids: Vec<&str> = playlist.ids.iter().map(TrackId::as_str).collect();
        println!("playlist: {}", ids.join(", "));
    }
    let prompts = session.prompts().open_prompts();
    if !prompts.is_empty() {
        let names: Vec<String> = prompts.iter().map(ToString::to_string).collect();
        println!("open prompts: {}", names.join(", "));
    }
}
