//! xput - TCP/UDP and disk transfer rate testing

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use xput::client::{Client, ClientConfig};
use xput::config::{Config, DEFAULT_CHUNK_SIZE, DEFAULT_PORT, Mode, RawOptions};
use xput::disk;
use xput::report::TransferReport;
use xput::server::{Server, ServerConfig};

#[derive(Parser)]
#[command(name = "xput")]
#[command(version, about = "Test TCP/UDP and/or disk transfer rate")]
#[command(after_help = "Choose exactly one of -s, -c HOST, -w, -r per invocation.")]
struct Cli {
    /// Start in server mode
    #[arg(short = 's')]
    server: bool,

    /// Connect client to HOST server
    #[arg(short = 'c', value_name = "HOST")]
    client: Option<String>,

    /// Only write to disk
    #[arg(short = 'w')]
    writer: bool,

    /// Only read from disk
    #[arg(short = 'r')]
    reader: bool,

    /// Use UDP instead of TCP
    #[arg(short = 'u')]
    udp: bool,

    /// Port used for TCP/UDP communication
    #[arg(short = 'p', value_name = "PORT", env = "XPUT_PORT")]
    port: Option<u16>,

    /// Size of the transferred/read/written data chunks, in bytes
    #[arg(short = 'n', value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Size of total transferred data, in GB
    #[arg(short = 'g', value_name = "GBYTES")]
    gigabytes: Option<f64>,

    /// Path to file, mandatory for writer and reader, optional for server
    #[arg(short = 'f', value_name = "PATH")]
    file: Option<PathBuf>,

    /// Validate data while reading (slower)
    #[arg(short = 'v')]
    verify: bool,

    /// Print the session report as a JSON object
    #[arg(long)]
    json: bool,

    /// Server exits after one session
    #[arg(long)]
    one_off: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "XPUT_LOG_LEVEL")]
    log_level: Option<String>,
}

fn init_logging(log_level: Option<&str>) -> Result<()> {
    let level = log_level.unwrap_or("info");
    let env_filter =
        EnvFilter::from_default_env().add_directive(format!("xput={}", level).parse()?);

    // Diagnostics go to stderr; only report lines use stdout.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn print_report(report: &TransferReport, json: bool) -> Result<()> {
    if json {
        println!("{}", report.json()?);
    } else {
        println!("{}", report.plain());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config file fills gaps the CLI left open (CLI > file > default).
    let file_config = Config::load().unwrap_or_default();

    let log_level = cli
        .log_level
        .as_deref()
        .or(file_config.defaults.log_level.as_deref());
    init_logging(log_level)?;

    let options = RawOptions {
        server: cli.server,
        client_host: cli.client.clone(),
        writer: cli.writer,
        reader: cli.reader,
        udp: cli.udp,
        port: cli
            .port
            .or(file_config.defaults.port)
            .unwrap_or(DEFAULT_PORT),
        chunk_size: cli
            .chunk_size
            .or(file_config.defaults.chunk_size)
            .unwrap_or(DEFAULT_CHUNK_SIZE),
        gigabytes: cli.gigabytes,
        file: cli.file.clone(),
        verify: cli.verify,
    };

    let config = match options.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}\n");
            let _ = Cli::command().write_help(&mut std::io::stderr());
            eprintln!();
            std::process::exit(1);
        }
    };

    match config.mode {
        Mode::Server => {
            let server = Server::new(ServerConfig {
                transport: config.transport,
                port: config.port,
                chunk_size: config.chunk_size,
                file: config.file,
                one_off: cli.one_off,
                json: cli.json,
            });
            server.run().await?;
        }

        Mode::Client => {
            let host = config.host.context("client mode requires a host")?;
            let client = Client::new(ClientConfig {
                host,
                port: config.port,
                transport: config.transport,
                chunk_size: config.chunk_size,
                target_bytes: config.target_bytes,
            });
            let report = client.run().await?;
            print_report(&report, cli.json)?;
        }

        Mode::Writer => {
            let path = config.file.context("writer mode requires a file path")?;
            let report = disk::write_file(&path, config.chunk_size, config.target_bytes).await?;
            print_report(&report, cli.json)?;
        }

        Mode::Reader => {
            let path = config.file.context("reader mode requires a file path")?;
            let report =
                disk::read_file(&path, config.chunk_size, config.termination, config.verify)
                    .await?;
            print_report(&report, cli.json)?;
            if let Some(errors) = report.errors {
                eprintln!("found {} errors", errors);
            }
        }
    }

    Ok(())
}
