//! metagraph CLI
//!
//! Entry point for the `metagraph` command-line tool.

use clap::{Parser, Subcommand};
use metagraph::config::{project_config_path, user_config_path, EffectiveConfig};
use metagraph::{open_directory, plain, traverse, Tree, TreeError, TreeRef, Value};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Exit code when the requested path does not exist
const EXIT_ABSENT: i32 = 2;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Error serializing output: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Parser)]
#[command(name = "metagraph")]
#[command(about = "Browse a directory through formulas, scopes and overlays", version)]
struct Cli {
    /// Directory to expose as the root tree
    #[arg(long, short = 'r', default_value = ".")]
    root: PathBuf,

    /// Path to project config file (default: <root>/.metagraph.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override a config value, e.g. --set tree.ghosts=false
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value at a slash-separated path
    Get {
        /// Path such as posts/hello.html
        path: String,
    },

    /// List the keys at a path
    Keys {
        /// Path to a subtree (default: the root)
        path: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print a whole tree as JSON
    Dump {
        /// Path to a subtree (default: the root)
        path: Option<String>,
    },

    /// Print the effective configuration, or one dotted key of it
    Config {
        /// Dotted key, e.g. `eval.max_depth`
        key: Option<String>,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    if let Commands::Config { key } = &cli.command {
        process::exit(run_config(&config, key.as_deref()));
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            process::exit(1);
        }
    };
    let code = runtime.block_on(run(&cli, &config));
    process::exit(code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("METAGRAPH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<EffectiveConfig, metagraph::ConfigError> {
    let user = user_config_path();
    let project = cli
        .config
        .clone()
        .unwrap_or_else(|| project_config_path(&cli.root));
    let overrides = if cli.set.is_empty() {
        None
    } else {
        Some(EffectiveConfig::parse_overrides(&cli.set)?)
    };
    EffectiveConfig::build(user.as_deref(), Some(&project), overrides)
}

fn run_config(config: &EffectiveConfig, key: Option<&str>) -> i32 {
    let output = match key {
        None => config.to_json(),
        Some(key) => match config.get(key) {
            Some(value) => serde_json::to_string_pretty(value),
            None => {
                eprintln!("No configuration value at {}", key);
                return EXIT_ABSENT;
            }
        },
    };
    match output {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            1
        }
    }
}

async fn run(cli: &Cli, config: &EffectiveConfig) -> i32 {
    let root = match open_directory(&cli.root, config) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Error opening {}: {}", cli.root.display(), e);
            return 1;
        }
    };
    let tree: TreeRef = root;

    let result = match &cli.command {
        Commands::Get { path } => run_get(&tree, path).await,
        Commands::Keys { path, json } => run_keys(&tree, path.as_deref(), *json).await,
        Commands::Dump { path } => run_dump(&tree, path.as_deref()).await,
        Commands::Config { .. } => Ok(0),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn resolve(tree: &TreeRef, path: Option<&str>) -> Result<Option<Value>, TreeError> {
    let segments: Vec<&str> = path
        .unwrap_or("")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    traverse(tree, &segments).await
}

async fn to_json(value: Value) -> Result<serde_json::Value, TreeError> {
    match value {
        Value::Data(data) => Ok(data),
        Value::Tree(tree) => plain(tree.as_ref()).await,
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_get(tree: &TreeRef, path: &str) -> Result<i32, CliError> {
    let Some(value) = resolve(tree, Some(path)).await? else {
        eprintln!("Not found: {}", path);
        return Ok(EXIT_ABSENT);
    };
    match value {
        Value::Data(serde_json::Value::String(text)) => println!("{}", text),
        other => print_json(&to_json(other).await?)?,
    }
    Ok(0)
}

async fn run_keys(tree: &TreeRef, path: Option<&str>, json: bool) -> Result<i32, CliError> {
    let Some(value) = resolve(tree, path).await? else {
        eprintln!("Not found: {}", path.unwrap_or(""));
        return Ok(EXIT_ABSENT);
    };
    let Some(subtree) = value.into_tree() else {
        eprintln!("Not a tree: {}", path.unwrap_or(""));
        return Ok(1);
    };
    let keys = subtree.keys().await?;
    if json {
        print_json(&serde_json::json!(keys))?;
    } else {
        for key in keys {
            println!("{}", key);
        }
    }
    Ok(0)
}

async fn run_dump(tree: &TreeRef, path: Option<&str>) -> Result<i32, CliError> {
    let Some(value) = resolve(tree, path).await? else {
        eprintln!("Not found: {}", path.unwrap_or(""));
        return Ok(EXIT_ABSENT);
    };
    print_json(&to_json(value).await?)?;
    Ok(0)
}
