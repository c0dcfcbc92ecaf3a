use std::path::PathBuf;

use anyhow::{
  Result,
  bail,
};
use clap::{
  ArgAction,
  Parser,
  Subcommand,
};
use url::Url;

#[derive(Clone, Debug)]
pub struct CliOptions {
  pub verbosity:   u8,
  pub log_file:    Option<PathBuf>,
  pub config_file: Option<PathBuf>,
  pub server:      Option<Url>,
  pub command:     Command,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
  /// Request a completion at `cursor` (end of file if unset) and accept it.
  Complete {
    file:   PathBuf,
    cursor: Option<usize>,
    write:  bool,
  },
  /// Execute a file through the execution service.
  Run { file: PathBuf },
  /// Check that the backend answers.
  Health,
  /// Ask the chat assistant.
  Chat {
    message: String,
    session: Option<String>,
    files:   Vec<PathBuf>,
  },
  /// Inspect or reset server-side chat sessions.
  Sessions(SessionAction),
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum SessionAction {
  /// List known sessions
  List,
  /// Print the conversation of a session
  Show { id: String },
  /// Forget the history of a session
  Clear { id: String },
  /// Delete a session
  Delete { id: String },
}

impl CliOptions {
  pub fn parse() -> Result<Self> {
    let raw = RawCli::parse();
    raw.try_into()
  }

  pub fn parse_from<I, T>(args: I) -> Result<Self>
  where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
  {
    let raw = RawCli::try_parse_from(args)?;
    raw.try_into()
  }
}

#[derive(Parser, Debug)]
#[command(name = "wisp", about, long_about = None, version = wisp_loader::VERSION)]
struct RawCli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count, global = true)]
  verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE", global = true)]
  log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
  config_file: Option<PathBuf>,

  /// Backend URL, overrides `server.url`
  #[arg(long = "server", value_name = "URL", global = true)]
  server: Option<String>,

  #[command(subcommand)]
  command: RawCommand,
}

#[derive(Subcommand, Debug)]
enum RawCommand {
  /// Request an inline completion and accept it
  Complete {
    file:   PathBuf,
    /// Char offset of the cursor, defaults to the end of the file
    #[arg(long)]
    cursor: Option<usize>,
    /// Write the result back instead of printing it
    #[arg(long)]
    write:  bool,
  },
  /// Run a Python or JavaScript file
  Run { file: PathBuf },
  /// Check that the backend is reachable
  Health,
  /// Send a message to the chat assistant
  Chat {
    message: String,
    /// Conversation to continue, defaults to `chat.session`
    #[arg(long, short = 's')]
    session: Option<String>,
    /// Attach a file as context (repeatable)
    #[arg(long = "file", short = 'f', value_name = "FILE")]
    files:   Vec<PathBuf>,
  },
  /// Manage chat sessions
  Sessions {
    #[command(subcommand)]
    action: Option<SessionAction>,
  },
}

impl TryFrom<RawCli> for CliOptions {
  type Error = anyhow::Error;

  fn try_from(raw: RawCli) -> Result<Self> {
    let server = match raw.server {
      Some(server) => {
        match Url::parse(&server) {
          Ok(url) => Some(url),
          Err(err) => bail!("invalid --server url '{server}': {err}"),
        }
      },
      None => None,
    };

    let command = match raw.command {
      RawCommand::Complete {
        file,
        cursor,
        write,
      } => Command::Complete {
        file,
        cursor,
        write,
      },
      RawCommand::Run { file } => Command::Run { file },
      RawCommand::Health => Command::Health,
      RawCommand::Chat {
        message,
        session,
        files,
      } => {
        if message.trim().is_empty() {
          bail!("chat message must not be empty");
        }
        Command::Chat {
          message,
          session,
          files,
        }
      },
      RawCommand::Sessions { action } => Command::Sessions(action.unwrap_or(SessionAction::List)),
    };

    Ok(Self {
      verbosity: raw.verbosity,
      log_file: raw.log_file,
      config_file: raw.config_file,
      server,
      command,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn complete_with_flags() {
    let options =
      CliOptions::parse_from(["wisp", "-vv", "complete", "main.py", "--cursor", "12", "--write"])
        .unwrap();
    assert_eq!(options.verbosity, 2);
    assert_eq!(options.command, Command::Complete {
      file:   PathBuf::from("main.py"),
      cursor: Some(12),
      write:  true,
    });
  }

  #[test]
  fn global_options_after_subcommand() {
    let options = CliOptions::parse_from([
      "wisp",
      "run",
      "app.js",
      "--server",
      "http://127.0.0.1:9000",
      "-c",
      "wisp.toml",
    ])
    .unwrap();
    assert_eq!(options.command, Command::Run {
      file: PathBuf::from("app.js"),
    });
    assert_eq!(options.server.unwrap().as_str(), "http://127.0.0.1:9000/");
    assert_eq!(options.config_file, Some(PathBuf::from("wisp.toml")));
  }

  #[test]
  fn bad_server_url() {
    assert!(CliOptions::parse_from(["wisp", "--server", "not a url", "health"]).is_err());
  }

  #[test]
  fn subcommand_required() {
    assert!(CliOptions::parse_from(["wisp"]).is_err());
  }

  #[test]
  fn chat_with_files() {
    let options = CliOptions::parse_from([
      "wisp", "chat", "why?", "-s", "work", "-f", "a.py", "--file", "b.js",
    ])
    .unwrap();
    assert_eq!(options.command, Command::Chat {
      message: "why?".into(),
      session: Some("work".into()),
      files:   vec![PathBuf::from("a.py"), PathBuf::from("b.js")],
    });
  }

  #[test]
  fn empty_chat_message() {
    assert!(CliOptions::parse_from(["wisp", "chat", "  "]).is_err());
  }

  #[test]
  fn sessions_defaults_to_list() {
    let options = CliOptions::parse_from(["wisp", "sessions"]).unwrap();
    assert_eq!(options.command, Command::Sessions(SessionAction::List));

    let options = CliOptions::parse_from(["wisp", "sessions", "clear", "work"]).unwrap();
    assert_eq!(
      options.command,
      Command::Sessions(SessionAction::Clear { id: "work".into() })
    );
  }
}
