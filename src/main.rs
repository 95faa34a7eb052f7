use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

use roomtalk::core::config::{CliOverrides, RoomtalkConfig, load_config, resolve};
use roomtalk::core::session::{load_saved_session, startup_session};
use roomtalk::tui;

#[derive(Parser)]
#[command(name = "roomtalk", about = "Terminal client for multi-room chat with AI agents")]
struct Args {
    /// Chat server base URL (e.g. http://localhost:8000)
    #[arg(short, long)]
    server: Option<String>,
    /// Name to use when no saved login exists
    #[arg(short, long)]
    username: Option<String>,
    /// Room to join on startup
    #[arg(short, long)]
    room: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to roomtalk.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("roomtalk.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = load_config().unwrap_or_else(|e| {
        log::warn!("Using default config: {}", e);
        RoomtalkConfig::default()
    });
    let cli = CliOverrides {
        server: args.server,
        username: args.username,
        room: args.room,
    };
    let config = resolve(&file_config, &cli);
    let session = startup_session(load_saved_session(), config.username.as_deref());

    log::info!(
        "roomtalk starting up as {} against {}",
        session.username,
        config.server_url
    );

    tui::run(config, session)
}
