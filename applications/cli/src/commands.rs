//! Line commands read from stdin

use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  login <user> [email]      sign in as <user>
  logout                    sign out
  songs                     list songs matching the last search
  liked                     list liked songs
  play <id>                 play <id> with the listed songs as playlist
  next | prev               move through the playlist
  toggle                    pause or resume
  volume <0.0-1.0>          set volume
  mute                      toggle mute
  like <id>                 like or unlike <id>
  search <text>             type into the search box
  upload <title> | <author> | <song file> | <image file>
  status                    show player and session status
  help                      show this help
  quit                      exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { user: String, email: Option<String> },
    Logout,
    Songs,
    Liked,
    Play(String),
    Next,
    Previous,
    Toggle,
    Volume(f32),
    Mute,
    Like(String),
    Search(String),
    Upload {
        title: String,
        author: String,
        song: PathBuf,
        image: PathBuf,
    },
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "login" => {
                let mut parts = rest.split_whitespace();
                let user = parts.next().ok_or("usage: login <user> [email]")?;
                Command::Login {
                    user: user.to_string(),
                    email: parts.next().map(str::to_string),
                }
            }
            "logout" => Command::Logout,
            "songs" | "ls" => Command::Songs,
            "liked" => Command::Liked,
            "play" => Command::Play(required(rest, "usage: play <id>")?),
            "next" => Command::Next,
            "prev" | "previous" => Command::Previous,
            "toggle" | "pause" => Command::Toggle,
            "volume" | "vol" => {
                let level = rest
                    .parse::<f32>()
                    .map_err(|_| "usage: volume <0.0-1.0>".to_string())?;
                Command::Volume(level)
            }
            "mute" => Command::Mute,
            "like" => Command::Like(required(rest, "usage: like <id>")?),
            // Empty text is a valid search
            "search" => Command::Search(rest.to_string()),
            "upload" => parse_upload(rest)?,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command: {other} (try `help`)")),
        };

        Ok(Some(command))
    }
}

fn required(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(usage.to_string())
    } else {
        Ok(rest.to_string())
    }
}

fn parse_upload(rest: &str) -> Result<Command, String> {
    let fields: Vec<&str> = rest.split('|').map(str::trim).collect();
    let [title, author, song, image] = fields.as_slice() else {
        return Err("usage: upload <title> | <author> | <song file> | <image file>".to_string());
    };
    Ok(Command::Upload {
        title: (*title).to_string(),
        author: (*author).to_string(),
        song: PathBuf::from(song),
        image: PathBuf::from(image),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(Command::parse("next").unwrap(), Some(Command::Next));
        assert_eq!(Command::parse("  PREV ").unwrap(), Some(Command::Previous));
        assert_eq!(Command::parse("").unwrap(), None);
        assert_eq!(
            Command::parse("play song-1").unwrap(),
            Some(Command::Play("song-1".to_string()))
        );
    }

    #[test]
    fn login_takes_optional_email() {
        assert_eq!(
            Command::parse("login ada ada@example.com").unwrap(),
            Some(Command::Login {
                user: "ada".to_string(),
                email: Some("ada@example.com".to_string()),
            })
        );
        assert!(Command::parse("login").is_err());
    }

    #[test]
    fn search_keeps_spaces_and_allows_empty() {
        assert_eq!(
            Command::parse("search blue in green").unwrap(),
            Some(Command::Search("blue in green".to_string()))
        );
        assert_eq!(
            Command::parse("search").unwrap(),
            Some(Command::Search(String::new()))
        );
    }

    #[test]
    fn volume_requires_number() {
        assert_eq!(
            Command::parse("volume 0.25").unwrap(),
            Some(Command::Volume(0.25))
        );
        assert!(Command::parse("volume loud").is_err());
    }

    #[test]
    fn upload_splits_on_pipes() {
        assert_eq!(
            Command::parse("upload Dawn Chorus | Lark | a.mp3 | a.png").unwrap(),
            Some(Command::Upload {
                title: "Dawn Chorus".to_string(),
                author: "Lark".to_string(),
                song: PathBuf::from("a.mp3"),
                image: PathBuf::from("a.png"),
            })
        );
        assert!(Command::parse("upload Dawn | Lark").is_err());
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Command::parse("dance").is_err());
    }
}
