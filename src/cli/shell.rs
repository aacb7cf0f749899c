use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    Res,
    cli::{catalog, interrupt::CtrlCGuard, player, report_error},
    info,
    session::SpotifySession,
    spotify::target::PlaybackTarget,
    types::{Album, Playlist, Track},
    warning,
};

const HELP: &str = "\
Commands:
  search <query>      Search for tracks
  play <number>       Play track from search results
  new                 Show new releases
  play-new <number>   Play album from new releases
  playlists           List your playlists
  play-list <number>  Play playlist from list
  current             Show current track
  toggle              Play/Pause
  volume <0-100>      Set playback volume
  repeat              Cycle repeat mode (off/track/context)
  repeat-mode <mode>  Set repeat mode (off/track/context/song/album/playlist)
  next                Skip to next track
  prev                Go back to previous track
  devices             List available devices
  help                Show this help
  quit                Exit";

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Search(String),
    Play(usize),
    New,
    PlayNew(usize),
    Playlists,
    PlayList(usize),
    Current,
    Toggle,
    Volume(i64),
    Repeat,
    RepeatMode(String),
    Next,
    Prev,
    Devices,
    Help,
    Quit,
    Empty,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };

        let command = match verb {
            "" => Self::Empty,
            "search" if !arg.is_empty() => Self::Search(arg.to_string()),
            "search" => return Err("Usage: search <query>".to_string()),
            "play" => Self::Play(parse_number(arg, "track")?),
            "play-new" => Self::PlayNew(parse_number(arg, "album")?),
            "play-list" => Self::PlayList(parse_number(arg, "playlist")?),
            "new" => Self::New,
            "playlists" => Self::Playlists,
            "current" => Self::Current,
            "toggle" => Self::Toggle,
            "volume" => Self::Volume(arg.parse().map_err(|_| {
                "Please provide a valid volume number between 0 and 100".to_string()
            })?),
            "repeat" => Self::Repeat,
            "repeat-mode" if !arg.is_empty() => Self::RepeatMode(arg.to_string()),
            "repeat-mode" => return Err("Usage: repeat-mode <mode>".to_string()),
            "next" => Self::Next,
            "prev" => Self::Prev,
            "devices" => Self::Devices,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => return Err(format!("Unknown command: {}", verb)),
        };
        Ok(command)
    }
}

fn parse_number(arg: &str, what: &str) -> Result<usize, String> {
    arg.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("Invalid {} number", what))
}

/// Last listings shown in the shell, so numbered entries can be played.
///
/// Numbers are 1-based as displayed in the tables.
#[derive(Debug, Default)]
pub struct ShellContext {
    tracks: Vec<Track>,
    albums: Vec<Album>,
    playlists: Vec<Playlist>,
}

impl ShellContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
    }

    pub fn set_albums(&mut self, albums: Vec<Album>) {
        self.albums = albums;
    }

    pub fn set_playlists(&mut self, playlists: Vec<Playlist>) {
        self.playlists = playlists;
    }

    pub fn track(&self, number: usize) -> Option<PlaybackTarget> {
        let track = self.tracks.get(number.checked_sub(1)?)?;
        Some(PlaybackTarget::track(&track.uri))
    }

    pub fn album(&self, number: usize) -> Option<PlaybackTarget> {
        let album = self.albums.get(number.checked_sub(1)?)?;
        Some(PlaybackTarget::album(&album.id))
    }

    pub fn playlist(&self, number: usize) -> Option<PlaybackTarget> {
        let playlist = self.playlists.get(number.checked_sub(1)?)?;
        Some(PlaybackTarget::playlist(&playlist.id))
    }
}

/// Interactive loop. Returns when the user quits or stdin closes.
pub async fn run(session: &SpotifySession) -> Res<()> {
    session.start().await?;

    let mut context = ShellContext::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    loop {
        print!("\n> ");
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warning!("Error reading input: {}", e);
                break;
            }
        };

        let command = match ShellCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                warning!("{}", message);
                continue;
            }
        };

        match command {
            ShellCommand::Quit => {
                info!("Goodbye!");
                break;
            }
            ShellCommand::Empty => {}
            ShellCommand::Help => println!("{}", HELP),
            command => {
                if let Err(e) = execute(session, &mut context, command).await {
                    report_error(&e);
                }
            }
        }
    }

    Ok(())
}

async fn execute(
    session: &SpotifySession,
    context: &mut ShellContext,
    command: ShellCommand,
) -> Res<()> {
    let interrupt = CtrlCGuard::install();
    let cancel = interrupt.token();

    match command {
        ShellCommand::Search(query) => context.set_tracks(catalog::search(session, &query).await?),
        ShellCommand::New => context.set_albums(catalog::new_releases(session).await?),
        ShellCommand::Playlists => context.set_playlists(catalog::playlists(session).await?),
        ShellCommand::Play(n) => match context.track(n) {
            Some(target) => player::play(session, &target, cancel).await?,
            None => warning!("Invalid track number. Run a search first."),
        },
        ShellCommand::PlayNew(n) => match context.album(n) {
            Some(target) => player::play(session, &target, cancel).await?,
            None => warning!("Invalid album number. Run 'new' first."),
        },
        ShellCommand::PlayList(n) => match context.playlist(n) {
            Some(target) => player::play(session, &target, cancel).await?,
            None => warning!("Invalid playlist number. Run 'playlists' first."),
        },
        ShellCommand::Current => player::current(session).await?,
        ShellCommand::Toggle => player::toggle(session).await?,
        ShellCommand::Volume(v) => player::volume(session, v).await?,
        ShellCommand::Repeat => player::repeat(session).await?,
        ShellCommand::RepeatMode(mode) => player::repeat_mode(session, &mode).await?,
        ShellCommand::Next => player::next(session).await?,
        ShellCommand::Prev => player::previous(session).await?,
        ShellCommand::Devices => catalog::devices(session).await?,
        ShellCommand::Help | ShellCommand::Quit | ShellCommand::Empty => {}
    }

    if cancel.is_cancelled() {
        info!("Cancelled.");
    }
    Ok(())
}
