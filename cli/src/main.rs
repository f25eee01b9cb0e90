use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gogen_cli::{init_logging, Command, ConfigManager, DevCommand, GenCommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gogen")]
#[command(about = "Annotation driven code generation for Go packages", version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to gogen.yaml in the project root when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GenArgs {
    /// Directories or files; a trailing /... recurses
    patterns: Vec<String>,

    /// Default output pattern, e.g. $FILE_gen.go
    #[arg(short, long)]
    output: Option<String>,

    /// Suppress the summary
    #[arg(short, long)]
    quiet: bool,

    /// Generate independent patterns in parallel
    #[arg(long = "async")]
    async_mode: bool,

    /// Generate without writing files
    #[arg(long)]
    dry_run: bool,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code for annotated declarations
    Gen(GenArgs),
    /// Generate, then regenerate changed directories until Ctrl-C
    Dev(GenArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = std::env::current_dir()?;
    let mut manager = ConfigManager::for_directory(&cwd);
    if let Some(file) = &cli.config {
        manager = manager.with_config_file(file);
    }
    manager.load()?;
    let config = manager.get_effective_config()?;

    let gen_command = |args: GenArgs| GenCommand {
        patterns: args.patterns,
        output: args.output,
        quiet: args.quiet,
        async_mode: args.async_mode,
        dry_run: args.dry_run,
        json: args.json,
        config: config.clone(),
    };

    match cli.command {
        Commands::Gen(args) => gen_command(args).execute().await,
        Commands::Dev(args) => DevCommand { generate: gen_command(args) }.execute().await,
    }
}
