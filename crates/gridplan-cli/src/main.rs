use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;
mod nodes;

#[derive(Parser)]
#[command(
    name = "gridplan",
    about = "gridplan: plan and provision application-server clusters",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to gridplan.toml
    #[arg(short, long, global = true, default_value = "gridplan.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that override values from gridplan.toml.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Number of auto-assigned instances
    #[arg(long)]
    pub instances: Option<u32>,
    /// Spread instances over one node each
    #[arg(long)]
    pub multi_node: bool,
    /// Inventory label eligible nodes must carry
    #[arg(long)]
    pub label: Option<String>,
    /// Directory descriptors are written to and read from
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a gridplan.toml scaffold
    Init {
        /// Cluster name
        #[arg(short, long)]
        name: String,
        /// Name of this node in the inventory
        #[arg(long, default_value = "localhost")]
        node: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Build the topology and print it without touching any node
    Plan {
        #[command(flatten)]
        overrides: Overrides,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Build, install on every node, then write descriptors
    Provision {
        #[command(flatten)]
        overrides: Overrides,
        /// Server bundle URL (defaults to [cluster].bundle_url)
        #[arg(long)]
        bundle: Option<String>,
    },
    /// Delete the installation from every node of the planned cluster
    Uninstall {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Run a command on the coordinator node
    Exec {
        #[command(flatten)]
        overrides: Overrides,
        /// Command line to run
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Print the canonical descriptor from a previous provision run
    Show {
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,gridplan=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Init { name, node, force } => commands::init::init(&cli.config, &name, &node, force),
        Commands::Plan { overrides, format } => {
            commands::plan::plan(&cli.config, &overrides, &format)
        }
        Commands::Provision { overrides, bundle } => {
            commands::provision::provision(&cli.config, &overrides, bundle.as_deref())
        }
        Commands::Uninstall { overrides } => {
            commands::provision::uninstall(&cli.config, &overrides)
        }
        Commands::Exec { overrides, command } => {
            commands::provision::exec(&cli.config, &overrides, &command.join(" "))
        }
        Commands::Show { workspace, format } => commands::plan::show(&cli.config, &workspace, &format),
    }
}
