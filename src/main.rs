use std::sync::Arc;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotctl::{
    Res,
    browser::{BrowserLauncher, SystemBrowser},
    cli, config, error,
    error::{AuthError, Error},
    info,
    management::FileStore,
    session::SpotifySession,
    spotify::{
        auth::AuthorizationPrompt,
        prompt::{CallbackServerPrompt, PastedRedirectPrompt},
        target::PlaybackTarget,
    },
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Paste the redirect URL instead of running the local callback server
    #[clap(long, global = true)]
    paste: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Forget the saved session
    Logout,

    /// Search for tracks
    Search(SearchOptions),

    /// Show new releases
    New,

    /// List your playlists
    Playlists,

    /// Show the current track
    Current,

    /// List available playback devices
    Devices,

    /// Play or pause
    Toggle,

    /// Set playback volume
    Volume(VolumeOptions),

    /// Cycle repeat mode (off, track, context)
    Repeat,

    /// Set repeat mode (off/track/context/song/album/playlist)
    RepeatMode(RepeatModeOptions),

    /// Skip to next track
    Next,

    /// Go back to previous track
    Prev,

    /// Play a track, album or playlist
    Play(PlayOptions),

    /// Interactive shell (default)
    Shell,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// Search query
    #[clap(required = true, num_args = 1..)]
    query: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct VolumeOptions {
    /// Volume between 0 and 100
    #[clap(allow_negative_numbers = true)]
    percent: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct RepeatModeOptions {
    mode: String,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayOptions {
    /// URI in the form spotify:track|album|playlist:<id>
    #[clap(value_parser = parse_target)]
    uri: PlaybackTarget,
}

fn parse_target(s: &str) -> Result<PlaybackTarget, String> {
    PlaybackTarget::parse(s).map_err(|e| e.to_string())
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    config::load_env().await;

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Shell);

    if let Command::Completions(opt) = &command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let settings = match config::Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!(
            "{}. Put them in a .env file or export them before running spotctl.",
            e
        ),
    };

    let launcher: Arc<dyn BrowserLauncher> = Arc::new(SystemBrowser);
    let prompt: Arc<dyn AuthorizationPrompt> = if cli.paste {
        Arc::new(PastedRedirectPrompt)
    } else {
        Arc::new(CallbackServerPrompt::new(&settings, Arc::clone(&launcher)))
    };
    let store = Arc::new(FileStore::new(settings.state_dir.clone()));

    let session = match SpotifySession::new(settings, store, prompt, launcher) {
        Ok(session) => session,
        Err(e) => error!("Cannot set up the HTTP client. Err: {}", e),
    };

    if let Err(e) = run(&session, command).await {
        cli::report_error(&e);
        if matches!(e, Error::Auth(AuthError::EntropyUnavailable(_))) {
            info!("Set SPOTCTL_ALLOW_WEAK_STATE=1 to continue with a weaker state value.");
        }
        std::process::exit(1);
    }
}

async fn run(session: &SpotifySession, command: Command) -> Res<()> {
    match command {
        Command::Auth => cli::auth(session).await,
        Command::Logout => cli::logout(session).await,
        Command::Search(opt) => cli::search(session, &opt.query.join(" ")).await.map(drop),
        Command::New => cli::new_releases(session).await.map(drop),
        Command::Playlists => cli::playlists(session).await.map(drop),
        Command::Current => cli::current(session).await,
        Command::Devices => cli::devices(session).await,
        Command::Toggle => cli::toggle(session).await,
        Command::Volume(opt) => cli::volume(session, opt.percent).await,
        Command::Repeat => cli::repeat(session).await,
        Command::RepeatMode(opt) => cli::repeat_mode(session, &opt.mode).await,
        Command::Next => cli::next(session).await,
        Command::Prev => cli::previous(session).await,
        Command::Play(opt) => {
            let interrupt = cli::CtrlCGuard::install();
            cli::play(session, &opt.uri, interrupt.token()).await
        }
        Command::Shell => cli::shell(session).await,
        Command::Completions(_) => Ok(()),
    }
}
