use anyhow::Result;
use clap::Parser;
use filebox::cli::{Cli, Commands};
use filebox::{commands, AppContext};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before parsing so FILEBOX_DATA_DIR can come from it.
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cx = AppContext::new(cli.data_dir.clone());

    match cli.command {
        Commands::Init => commands::handle_init(&cx).await?,
        Commands::Ls(args) => commands::handle_ls(args, &cx).await?,
        Commands::Mkdir(args) => commands::handle_mkdir(args, &cx).await?,
        Commands::Import(args) => commands::handle_import(args, &cx).await?,
        Commands::Rename(args) => commands::handle_rename(args, &cx).await?,
        Commands::Mv(args) => commands::handle_mv(args, &cx).await?,
        Commands::Rm(args) => commands::handle_rm(args, &cx).await?,
        Commands::Du(args) => commands::handle_du(args, &cx).await?,
        Commands::Path(args) => commands::handle_path(args, &cx).await?,
        Commands::Info(args) => commands::handle_info(args, &cx).await?,
    }

    Ok(())
}

/// Installs the fmt subscriber. `RUST_LOG` wins over the `-v`/`-q` flags.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
