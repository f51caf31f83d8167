//! GridQuota CLI - manage per-user routing quota documents
//!
//! This binary exposes the quota core operations (list, add-section,
//! add-host, remove-section, remove-host) against the document store.

mod render;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use gridquota_common::{Config, ListMode, UserId};
use gridquota_store::DocumentStore;
use gridquota_tree::{Host, Mutation, SectionPath, codec};
use std::path::PathBuf;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "gridquota-cli")]
#[command(about = "GridQuota quota document admin CLI")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/gridquota/gridquota.toml")]
    config: PathBuf,

    /// Directory holding the quota documents (overrides the config file)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// User whose document is operated on
    #[arg(short, long, env = "GRIDQUOTA_USER")]
    user: UserId,

    /// Log level (overrides the config file, RUST_LOG takes precedence)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List browsers, versions, regions and hosts
    List {
        /// Ordering policy (sorted or raw); defaults to the configured mode
        #[arg(short, long)]
        mode: Option<ListMode>,
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the document in canonical XML form
    Show,
    /// Ensure a browser/version/region section exists
    AddSection {
        #[command(flatten)]
        section: SectionArgs,
        /// Also append a host with this name to the section
        #[arg(long, requires_all = ["port", "count"])]
        host: Option<String>,
        #[command(flatten)]
        fields: HostFieldArgs,
    },
    /// Append a host to a section, creating the section if needed
    AddHost {
        #[command(flatten)]
        section: SectionArgs,
        /// Host name
        host: String,
        #[command(flatten)]
        fields: HostFieldArgs,
    },
    /// Remove a region, or its version when the region does not exist
    RemoveSection {
        #[command(flatten)]
        section: SectionArgs,
    },
    /// Remove the first host with the given name from a section
    RemoveHost {
        #[command(flatten)]
        section: SectionArgs,
        /// Host name
        host: String,
    },
}

#[derive(ClapArgs, Debug)]
struct SectionArgs {
    /// Browser name
    browser: String,
    /// Browser version
    version: String,
    /// Region name
    region: String,
}

impl From<SectionArgs> for SectionPath {
    fn from(args: SectionArgs) -> Self {
        Self::new(args.browser, args.version, args.region)
    }
}

#[derive(ClapArgs, Debug)]
struct HostFieldArgs {
    /// Host port
    #[arg(long)]
    port: Option<String>,
    /// Number of sessions the host accepts
    #[arg(long)]
    count: Option<String>,
    /// Username for the host
    #[arg(long)]
    username: Option<String>,
    /// Password for the host
    #[arg(long, env = "GRIDQUOTA_HOST_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Scheme used to reach the host (http or https)
    #[arg(long)]
    scheme: Option<String>,
    /// VNC address of the host
    #[arg(long)]
    vnc: Option<String>,
}

impl HostFieldArgs {
    fn into_host(self, name: String) -> Result<Host> {
        let port = self
            .port
            .ok_or_else(|| anyhow::anyhow!("--port is required for host '{name}'"))?;
        let count = self
            .count
            .ok_or_else(|| anyhow::anyhow!("--count is required for host '{name}'"))?;
        let mut host = Host::new(name, port, count);
        if let Some(username) = self.username {
            host = host.with_username(username);
        }
        if let Some(password) = self.password {
            host = host.with_password(password);
        }
        if let Some(scheme) = self.scheme {
            host = host.with_scheme(scheme);
        }
        if let Some(vnc) = self.vnc {
            host = host.with_vnc(vnc);
        }
        Ok(host)
    }
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        if let Some(quota_err) = e.downcast_ref::<gridquota_common::Error>() {
            error!("{}", quota_err);
            eprintln!("error: {quota_err}");
            std::process::exit(quota_err.exit_code());
        }
        error!("{:#}", e);
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    // CLI takes precedence over the config file
    if let Some(root) = args.root {
        config.storage.root = root;
    }
    let log_level = args.log_level.unwrap_or_else(|| config.logging.level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!(
        config = %args.config.display(),
        root = %config.storage.root.display(),
        user = %args.user,
        "starting gridquota-cli"
    );

    let store = DocumentStore::from_config(&config.storage);
    let user = args.user;

    let mutation = match args.command {
        Commands::List { mode, json } => {
            let mode = mode.unwrap_or(config.listing.mode);
            let view = store.list(&user, mode)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", render::render_view(&user, mode, &view));
            }
            return Ok(());
        }
        Commands::Show => {
            let loaded = store.load(&user)?;
            println!("{}", codec::serialize(&loaded.document)?);
            return Ok(());
        }
        Commands::AddSection {
            section,
            host,
            fields,
        } => Mutation::AddSection {
            path: section.into(),
            host: host.map(|name| fields.into_host(name)).transpose()?,
        },
        Commands::AddHost {
            section,
            host,
            fields,
        } => Mutation::AddHost {
            path: section.into(),
            host: fields.into_host(host)?,
        },
        Commands::RemoveSection { section } => Mutation::RemoveSection {
            path: section.into(),
        },
        Commands::RemoveHost { section, host } => Mutation::RemoveHost {
            path: section.into(),
            host,
        },
    };

    let applied = store.apply(&user, &mutation)?;
    println!("{}", render::render_outcome(&mutation, &applied));
    Ok(())
}
