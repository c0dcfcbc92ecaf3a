use std::{
  path::{
    Path,
    PathBuf,
  },
  process::ExitCode,
  sync::Arc,
  time::Duration,
};

use anyhow::{
  Context,
  Result,
};
use url::Url;
use wisp_client::{
  ApiClient,
  ClientOptions,
  protocol::ChatRequest,
  run::RunReport,
};
use wisp_editor::{
  chat,
  config::Config,
  file,
  handlers::GhostHandler,
  session::Session,
};

use crate::cli::{
  CliOptions,
  Command,
  SessionAction,
};

mod cli;

fn main() -> Result<ExitCode> {
  let options = CliOptions::parse()?;

  wisp_loader::initialize_config_file(options.config_file.clone());
  wisp_loader::initialize_log_file(options.log_file.clone());
  setup_logging(options.verbosity).context("failed to initialize logging")?;

  let config = Config::load_user().context("failed to load configuration")?;
  log::debug!("starting wisp {} with {:?}", wisp_loader::VERSION, options.command);

  let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
  runtime.block_on(run(options, config))
}

fn setup_logging(verbosity: u8) -> Result<()> {
  let mut base_config = fern::Dispatch::new();

  base_config = match verbosity {
    0 => base_config.level(log::LevelFilter::Warn),
    1 => base_config.level(log::LevelFilter::Info),
    2 => base_config.level(log::LevelFilter::Debug),
    _ => base_config.level(log::LevelFilter::Trace),
  };

  let file_config = fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} {} [{}] {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        record.target(),
        record.level(),
        message
      ))
    })
    .chain(fern::log_file(wisp_loader::log_file())?);

  base_config.chain(file_config).apply()?;
  Ok(())
}

async fn run(options: CliOptions, config: Config) -> Result<ExitCode> {
  let base_url = match options.server {
    Some(url) => url,
    None => {
      Url::parse(&config.server.url)
        .with_context(|| format!("invalid server.url '{}'", config.server.url))?
    },
  };
  let client = ApiClient::new(ClientOptions {
    base_url,
    completion_timeout: config.completion_timeout(),
    run_timeout: config.run_timeout(),
    chat_timeout: config.chat_timeout(),
  })?;

  match options.command {
    Command::Complete {
      file,
      cursor,
      write,
    } => complete(client, &config, &file, cursor, write).await,
    Command::Run { file } => run_file(&client, &file).await,
    Command::Health => health(&client).await,
    Command::Chat {
      message,
      session,
      files,
    } => {
      let session = session.unwrap_or_else(|| config.chat.session.clone());
      ask(&client, &message, &session, &files).await
    },
    Command::Sessions(action) => sessions(&client, action).await,
  }
}

async fn complete(
  client: ApiClient,
  config: &Config,
  path: &Path,
  cursor: Option<usize>,
  write: bool,
) -> Result<ExitCode> {
  let mut doc = file::open_document(path)?;
  let cursor = cursor.unwrap_or(doc.len_chars());
  doc.set_cursor(cursor)?;

  let handler = GhostHandler::new(Arc::new(client), config.ghost_settings());
  let mut session = Session::new(doc, handler, config.ghost_style());
  if !session.replay_last_char()? {
    eprintln!("nothing to complete at the start of the file");
    return Ok(ExitCode::FAILURE);
  }
  if !session.handler().is_pending() {
    eprintln!("no completion requested at offset {cursor}");
    return Ok(ExitCode::FAILURE);
  }

  let wait = config.debounce() + config.completion_timeout() + Duration::from_secs(1);
  let showing = tokio::time::timeout(wait, session.settle())
    .await
    .unwrap_or(false);
  if let Some(decoration) = session.decoration().filter(|_| showing) {
    log::info!("suggestion at {}: {:?}", decoration.inline.char_idx, decoration.text());
  }
  let Some(accepted) = session.accept()? else {
    eprintln!("no suggestion");
    return Ok(ExitCode::FAILURE);
  };

  let doc = session.into_document();
  if write {
    let written = file::save_document(&doc)?;
    eprintln!(
      "inserted {} chars at {} into {}",
      accepted.text.chars().count(),
      accepted.at,
      written.display()
    );
  } else {
    print!("{}", doc.text());
  }
  Ok(ExitCode::SUCCESS)
}

async fn run_file(client: &ApiClient, path: &Path) -> Result<ExitCode> {
  let doc = file::open_document(path)?;
  let code = doc.text().to_string();
  let report = RunReport::from_result(client.run(&code, doc.language()).await);
  print!("{report}");
  if report.is_failure() {
    Ok(ExitCode::FAILURE)
  } else {
    Ok(ExitCode::SUCCESS)
  }
}

async fn health(client: &ApiClient) -> Result<ExitCode> {
  let url = &client.options().base_url;
  match client.health().await {
    Ok(health) if health.is_ok() => {
      println!("{url}: {} (version {})", health.message, health.version);
      Ok(ExitCode::SUCCESS)
    },
    Ok(health) => {
      eprintln!("{url}: unexpected status '{}'", health.status);
      Ok(ExitCode::FAILURE)
    },
    Err(err) => {
      eprintln!("{url}: {err}");
      Ok(ExitCode::FAILURE)
    },
  }
}

async fn ask(
  client: &ApiClient,
  message: &str,
  session: &str,
  files: &[PathBuf],
) -> Result<ExitCode> {
  let uploads = files
    .iter()
    .map(|path| chat::read_upload(path))
    .collect::<Result<Vec<_>, _>>()?;
  let reply = client
    .chat(&ChatRequest {
      user_input:           message,
      uploaded_files:       &uploads,
      conversation_history: None,
      session_id:           session,
    })
    .await?;

  println!("{}", reply.generated_response.trim_end());
  match reply.error {
    Some(err) => {
      eprintln!("chat failed: {err}");
      Ok(ExitCode::FAILURE)
    },
    None => {
      log::info!("chat intent: {}", reply.intent);
      Ok(ExitCode::SUCCESS)
    },
  }
}

async fn sessions(client: &ApiClient, action: SessionAction) -> Result<ExitCode> {
  match action {
    SessionAction::List => {
      let list = client.sessions().await?;
      for id in &list.sessions {
        println!("{id}");
      }
      eprintln!("{} session(s)", list.count);
    },
    SessionAction::Show { id } => {
      let Some(info) = client.session(&id).await? else {
        eprintln!("no session '{id}'");
        return Ok(ExitCode::FAILURE);
      };
      eprintln!(
        "session '{}' created {}, {} message(s)",
        info.session_id, info.created_at, info.message_count
      );
      print!("{}", chat::transcript(&info.conversation_history));
    },
    SessionAction::Clear { id } => {
      let ack = client.clear_session(&id).await?;
      eprintln!("{}", ack.message);
    },
    SessionAction::Delete { id } => {
      if !client.delete_session(&id).await? {
        eprintln!("no session '{id}'");
        return Ok(ExitCode::FAILURE);
      }
      eprintln!("deleted session '{id}'");
    },
  }
  Ok(ExitCode::SUCCESS)
}
