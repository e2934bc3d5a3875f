/// stormwatch_service - radar nowcasting daemon
///
/// Modes:
///   stormwatch_service                       run the polling daemon
///   stormwatch_service --verify              check configured points against the live radar
///   stormwatch_service --replay FILE [--at RFC3339]
///                                            analyze a saved animation, no DB or Telegram
///
/// Common options: --log-level debug|info|warning|error
///
/// Configuration comes from `stormwatch.toml` (or `$STORMWATCH_CONFIG`);
/// `DATABASE_URL` and `TELEGRAM_BOT_TOKEN` come from the environment or `.env`.

use std::error::Error;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use stormwatch_service::alert::telegram::TelegramClient;
use stormwatch_service::config::{self, AppConfig};
use stormwatch_service::db::PgStore;
use stormwatch_service::dev_mode::ReplayMode;
use stormwatch_service::ingest::radar;
use stormwatch_service::logging::{self, LogLevel, Subsystem};
use stormwatch_service::{service, verify};

enum Mode {
    Daemon,
    Verify,
    Replay { path: String, at: Option<DateTime<Utc>> },
}

struct Args {
    mode: Mode,
    log_level: LogLevel,
}

fn parse_args() -> Result<Args, String> {
    let mut mode = Mode::Daemon;
    let mut at = None;
    let mut log_level = LogLevel::Info;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verify" => mode = Mode::Verify,
            "--replay" => {
                let path = args.next().ok_or("--replay needs a file path")?;
                mode = Mode::Replay { path, at: None };
            }
            "--at" => {
                let value = args.next().ok_or("--at needs an RFC 3339 timestamp")?;
                let parsed = DateTime::parse_from_rfc3339(&value)
                    .map_err(|e| format!("invalid --at '{}': {}", value, e))?;
                at = Some(parsed.with_timezone(&Utc));
            }
            "--log-level" => {
                let value = args.next().ok_or("--log-level needs a value")?;
                log_level = LogLevel::from_name(&value)
                    .ok_or_else(|| format!("unknown log level '{}'", value))?;
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }

    if let Mode::Replay { at: replay_at, .. } = &mut mode {
        *replay_at = at;
    } else if at.is_some() {
        return Err("--at only applies to --replay".into());
    }

    Ok(Args { mode, log_level })
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let args = parse_args()?;
    let config = config::load_config(config::config_path())?;

    logging::init_logger(args.log_level, config.service.log_file.as_deref(), true);

    match args.mode {
        Mode::Verify => run_verify(&config),
        Mode::Replay { path, at } => run_replay(&config, path, at),
        Mode::Daemon => run_daemon(&config),
    }
}

fn run_verify(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let http = radar::build_client(config.source.timeout_secs)?;
    let bytes = radar::fetch(&http, &config.source.url)?;
    let frames = radar::decode_frames(&bytes)?;

    let report = verify::verify_points(&frames, &config.points, &config.engine);
    verify::print_report(&report);
    println!("\n{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_replay(config: &AppConfig, path: String, at: Option<DateTime<Utc>>) -> Result<(), Box<dyn Error>> {
    let mut replay = ReplayMode::new(path);
    if let Some(at) = at {
        replay = replay.at(at);
    }

    logging::info(
        Subsystem::System,
        None,
        &format!("Replaying {} as of {}", replay.path.display(), replay.now().to_rfc3339()),
    );
    for line in replay.run(config)? {
        println!("{}", line);
    }
    Ok(())
}

fn run_daemon(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let database_url = config::require_env("DATABASE_URL")?;
    let token = config::require_env("TELEGRAM_BOT_TOKEN")?;

    let mut store = PgStore::connect(&database_url)?;
    let http = radar::build_client(config.source.timeout_secs)?;
    let bot = TelegramClient::new(&token, config.source.timeout_secs)?;

    logging::info(
        Subsystem::System,
        None,
        &format!(
            "Monitoring {} points, forecast every {}s",
            config.points.len(),
            config.service.poll_interval_secs
        ),
    );

    let poll_interval = Duration::from_secs(config.service.poll_interval_secs);
    let command_interval = Duration::from_secs(config.service.command_poll_secs.max(1));
    let mut next_update_offset: Option<i64> = None;
    let mut last_forecast: Option<Instant> = None;

    loop {
        if last_forecast.map_or(true, |t| t.elapsed() >= poll_interval) {
            last_forecast = Some(Instant::now());
            if let Err(e) = service::update_forecast(&mut store, &bot, &http, config, Utc::now()) {
                logging::error(Subsystem::Store, None, &format!("Forecast cycle aborted: {}", e));
            }
        }

        match bot.get_updates(next_update_offset, 0) {
            Ok(updates) => {
                for update in updates {
                    next_update_offset = Some(update.update_id + 1);
                    let Some(message) = update.message else { continue };
                    let text = message.text.unwrap_or_default();
                    if let Err(e) =
                        service::handle_command(&mut store, &bot, message.chat.id, &text, config, Utc::now())
                    {
                        logging::error(
                            Subsystem::Store,
                            None,
                            &format!("Command from chat {} failed: {}", message.chat.id, e),
                        );
                    }
                }
            }
            Err(e) => logging::warn(Subsystem::Notify, None, &format!("getUpdates failed: {}", e)),
        }

        thread::sleep(command_interval);
    }
}
