//! ngxedit - edit nginx upstreams and servers in place
//!
//! This is the main entry point for the ngxedit CLI.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use ngxedit_config::{Locator, ParseError, fetch, parse_bytes, render};
use ngxedit_core::{Document, HostPort};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// ngxedit - round-trip editor for nginx reverse-proxy configs
#[derive(Parser)]
#[command(name = "ngxedit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a config and print it back
    Fmt {
        /// Path or URL of the config
        #[arg(default_value = "nginx.conf")]
        config: String,
    },

    /// Check that a config can be parsed
    Check {
        /// Path or URL of the config
        #[arg(default_value = "nginx.conf")]
        config: String,
    },

    /// List upstreams and servers
    Show {
        /// Path or URL of the config
        #[arg(default_value = "nginx.conf")]
        config: String,

        /// Print the parsed model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add (or replace) a target in an upstream
    #[command(name = "add-host")]
    AddHost {
        config: String,
        upstream: String,
        /// Target as host[:port]
        target: String,
        #[arg(long)]
        in_place: bool,
    },

    /// Remove every target on a host from an upstream
    #[command(name = "remove-host")]
    RemoveHost {
        config: String,
        upstream: String,
        host: String,
        #[arg(long)]
        in_place: bool,
    },

    /// Move an existing host:port target to a new port
    #[command(name = "set-port")]
    SetPort {
        config: String,
        upstream: String,
        /// Current target as host:port
        target: String,
        port: u16,
        #[arg(long)]
        in_place: bool,
    },

    /// Remove servers by server_name[:listen]
    #[command(name = "remove-server")]
    RemoveServer {
        config: String,
        /// Server as name[:port], port defaults to 80
        server: String,
        #[arg(long)]
        in_place: bool,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries the config
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Fmt { config } => {
            let (_, doc) = load(&config)?;
            print!("{}", doc);
        }

        Commands::Check { config } => {
            let (_, doc) = load(&config)?;
            println!(
                "✅ Configuration '{}' is valid ({} upstreams, {} servers)",
                config,
                doc.upstreams().len(),
                doc.servers().len()
            );
        }

        Commands::Show { config, json } => {
            let (_, doc) = load(&config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                show(&doc);
            }
        }

        Commands::AddHost {
            config,
            upstream,
            target,
            in_place,
        } => {
            let (locator, mut doc) = load(&config)?;
            let host_port: HostPort = target.parse()?;
            doc.require_upstream_mut(&upstream)?.update_host_port(host_port);
            emit(&doc, &locator, in_place)?;
        }

        Commands::RemoveHost {
            config,
            upstream,
            host,
            in_place,
        } => {
            let (locator, mut doc) = load(&config)?;
            let upstream = doc.require_upstream_mut(&upstream)?;
            if !upstream.has_host(&host) {
                tracing::warn!("upstream {} has no server on {}", upstream.name(), host);
            }
            upstream.remove_host(&host);
            emit(&doc, &locator, in_place)?;
        }

        Commands::SetPort {
            config,
            upstream,
            target,
            port,
            in_place,
        } => {
            let (locator, mut doc) = load(&config)?;
            let host_port: HostPort = target.parse()?;
            doc.require_upstream_mut(&upstream)?.set_port(&host_port, port)?;
            emit(&doc, &locator, in_place)?;
        }

        Commands::RemoveServer {
            config,
            server,
            in_place,
        } => {
            let (locator, mut doc) = load(&config)?;
            let key: HostPort = server.parse()?;
            let removed = doc.remove_server(&key);
            tracing::info!("removed {} server(s) matching {}", removed, key);
            emit(&doc, &locator, in_place)?;
        }

        Commands::Version => {
            println!("ngxedit v{}", ngxedit_core::VERSION);
        }
    }

    Ok(())
}

/// Fetch and parse a config, printing a diagnostic on parse errors
fn load(config: &str) -> anyhow::Result<(Locator, Document)> {
    let locator = Locator::parse(config);
    let bytes = fetch(&locator)?;

    match parse_bytes(&bytes) {
        Ok(doc) => Ok((locator, doc)),
        Err(e) => {
            report(&e, config, &bytes);
            Err(e).with_context(|| format!("can't parse '{}'", config))
        }
    }
}

fn report(error: &ParseError, name: &str, bytes: &[u8]) {
    let source = String::from_utf8_lossy(bytes);
    eprintln!("{}", render(error, name, &source));
}

/// Print the document, or write it back over the file it came from
fn emit(doc: &Document, locator: &Locator, in_place: bool) -> anyhow::Result<()> {
    if !in_place {
        print!("{}", doc);
        return Ok(());
    }
    match locator {
        Locator::File(path) => {
            std::fs::write(path, doc.to_string())
                .with_context(|| format!("can't write '{}'", path.display()))?;
            tracing::info!("📝 Wrote {}", path.display());
            Ok(())
        }
        Locator::Remote(url) => bail!("--in-place needs a local file, got '{}'", url),
    }
}

fn show(doc: &Document) {
    for upstream in doc.upstreams() {
        match upstream.method() {
            Some(method) => println!("upstream {} ({})", upstream.name(), method),
            None => println!("upstream {}", upstream.name()),
        }
        for host_port in upstream.host_ports() {
            println!("  {}", host_port);
        }
    }
    for server in doc.servers() {
        println!("server {}:{}", server.name(), server.listen());
        for location in server.locations() {
            println!("  {} -> {}", location.name(), location.proxy_pass());
        }
    }
}
