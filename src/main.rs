// Main entry point for the application

use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tcpfetch::{ClientConfig, DownloadCoordinator, FileServer, ServerConfig, TransferState};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "tcpfetch")]
#[command(about = "List and download files from a tcpfetch server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RemoteArgs {
    /// Server host (default: 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// Server port (default: 5001)
    #[arg(long)]
    port: Option<u16>,

    /// JSON client config file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl RemoteArgs {
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve a directory to clients
    Serve {
        /// Bind address (default: 0.0.0.0:5001)
        #[arg(long)]
        bind: Option<String>,

        /// Shared directory (default: ./shared_files)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Read/write chunk size in bytes
        #[arg(long)]
        buffer_size: Option<usize>,

        /// JSON server config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the files a server offers
    List {
        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Download one file
    Get {
        /// File to download
        name: String,

        #[command(flatten)]
        remote: RemoteArgs,

        /// Download directory (default: ./downloads)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Print the final status as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, dir, buffer_size, config } => {
            let mut config = match config {
                Some(path) => ServerConfig::load(&path)?,
                None => ServerConfig::default(),
            };
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            if let Some(dir) = dir {
                config.shared_dir = dir;
            }
            if let Some(size) = buffer_size {
                config = config.with_buffer_size(size)?;
            }

            let server = FileServer::bind(config)?;
            println!("Serving on {} (Ctrl+C to stop)", server.local_addr()?);
            server.run()?;
        }

        Commands::List { remote } => {
            let coordinator = DownloadCoordinator::new(remote.client_config()?);
            let names = coordinator.list_files()?;
            if names.is_empty() {
                println!("(no files)");
            }
            for name in names {
                println!("{}", name);
            }
        }

        Commands::Get { name, remote, out_dir, json } => {
            let mut config = remote.client_config()?;
            if let Some(dir) = out_dir {
                config = config.with_download_dir(dir);
            }

            let coordinator = DownloadCoordinator::new(config);
            coordinator.start_download(&name)?;

            let bar = ProgressBar::new(100);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg:30} [{bar:40}] {pos:>3}%")?
                    .progress_chars("=>-"),
            );

            // Poll until a terminal status shows up; intermediate ticks may be skipped.
            let mut last_seen = 0;
            let status = loop {
                let status = coordinator.current_status();
                if status.updated_at != last_seen {
                    last_seen = status.updated_at;
                    bar.set_message(status.message.clone());
                    bar.set_position(status.progress as u64);
                }
                if status.is_terminal() {
                    break status;
                }
                thread::sleep(POLL_INTERVAL);
            };
            bar.finish_and_clear();

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{}", status.message);
            }

            if status.state == TransferState::Failed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
