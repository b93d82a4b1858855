#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use filehub::client::{read_upload, DateRange, FileApi, FileHubClient, FilterSet};
use filehub::session::{self, Input};
use filehub::{config, AppShell, Command, SearchPanel, ShellState, StatsPanel};

/// browse and manage a deduplicating file store
#[derive(Parser, Debug)]
#[clap(name ="filehub", author, version = env!("GIT_VERSION"), about, long_about = None)]
struct Options {
    /// enable debugging logs
    #[clap(short, long, action=ArgAction::Count)]
    debug: u8,

    /// config file path
    #[clap(short, long)]
    config: Option<String>,

    /// api base url, overrides the config file and FILEHUB_API_URL
    #[clap(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// list all files
    List,
    /// list files matching the given filters
    Search(SearchOptions),
    /// upload one or more files
    Upload(UploadOptions),
    /// delete a file by id
    Delete(DeleteOptions),
    /// show storage statistics
    Stats,
    /// download a file by id
    Download(DownloadOptions),
    /// interactive session with live search
    Interactive,
}

#[derive(Args, Debug)]
struct SearchOptions {
    /// filename substring
    #[clap(long)]
    filename: Option<String>,

    /// file type substring, e.g. image/png
    #[clap(long)]
    file_type: Option<String>,

    /// minimum size in bytes
    #[clap(long)]
    min_size: Option<u64>,

    /// maximum size in bytes
    #[clap(long)]
    max_size: Option<u64>,

    /// upload window: today, week or month
    #[clap(long)]
    date_range: Option<DateRange>,
}

impl From<SearchOptions> for FilterSet {
    fn from(opts: SearchOptions) -> Self {
        FilterSet {
            filename: opts.filename,
            file_type: opts.file_type,
            min_size: opts.min_size,
            max_size: opts.max_size,
            date_range: opts.date_range,
        }
    }
}

#[derive(Args, Debug)]
struct UploadOptions {
    /// files to upload
    #[clap(action=ArgAction::Append, required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct DeleteOptions {
    /// file id
    id: String,
}

#[derive(Args, Debug)]
struct DownloadOptions {
    /// file id
    id: String,

    /// save under this name instead of the listed filename
    #[clap(short, long)]
    name: Option<String>,

    /// directory to save into, overrides the configured download dir
    #[clap(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let opts = Options::parse();

    simple_logger::SimpleLogger::new()
        .with_utc_timestamps()
        .with_level({
            match opts.debug {
                0 => log::LevelFilter::Info,
                1 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            }
        })
        .with_module_level("reqwest", log::LevelFilter::Warn)
        .with_module_level("hyper", log::LevelFilter::Warn)
        .with_module_level("hyper_util", log::LevelFilter::Warn)
        .init()?;

    log::debug!("options: {:#?}", opts);

    let mut cfg = config::load(opts.config.as_deref(), opts.api_url)?;
    if let Commands::Download(DownloadOptions {
        output: Some(ref output),
        ..
    }) = opts.command
    {
        cfg.download_dir = output.clone();
    }

    // a single event loop drives everything
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    rt.block_on(async move {
        let client = FileHubClient::new(cfg.client_config())
            .context("failed to create api client")?;
        info!("using api at {}", client.base_url());

        match opts.command {
            Commands::List => list(client, None).await,
            Commands::Search(opts) => list(client, Some(opts.into())).await,
            Commands::Upload(opts) => upload(client, opts.paths).await,
            Commands::Delete(opts) => delete(client, opts.id).await,
            Commands::Stats => stats(client).await,
            Commands::Download(opts) => download(client, opts.id, opts.name).await,
            Commands::Interactive => interactive(client, cfg.debounce()).await,
        }
    })
}

fn check(state: &ShellState) -> Result<()> {
    match &state.error {
        Some(err) => Err(anyhow::anyhow!("{} ({:?})", err.message, err.kind)),
        None => Ok(()),
    }
}

async fn list(client: FileHubClient, filter: Option<FilterSet>) -> Result<()> {
    let mut shell = AppShell::new(Arc::new(client));
    shell.load_files(filter.as_ref()).await;
    check(shell.state())?;

    print!("{}", shell.render());
    Ok(())
}

async fn upload(client: FileHubClient, paths: Vec<PathBuf>) -> Result<()> {
    let mut shell = AppShell::new(Arc::new(client));

    for path in paths {
        let (filename, content) = read_upload(&path).await?;

        match shell.upload(content, &filename).await {
            Some(record) if record.is_duplicate => println!(
                "{} uploaded as {} (duplicate of {})",
                filename,
                record.id,
                record
                    .original_file_details
                    .as_ref()
                    .map(|d| d.original_filename.as_str())
                    .unwrap_or("a deleted file")
            ),
            Some(record) => println!("{} uploaded as {}", filename, record.id),
            None => check(shell.state())?,
        }
    }

    print!("{}", StatsPanel::render(shell.state().stats.as_ref()));
    Ok(())
}

async fn delete(client: FileHubClient, id: String) -> Result<()> {
    let mut shell = AppShell::new(Arc::new(client));
    if !shell.delete(&id).await {
        check(shell.state())?;
    }

    println!("deleted {}", id);
    Ok(())
}

async fn stats(client: FileHubClient) -> Result<()> {
    let stats = client
        .stats()
        .await
        .context("failed to fetch storage statistics")?;

    print!("{}", StatsPanel::render(Some(&stats)));
    Ok(())
}

async fn download(client: FileHubClient, id: String, name: Option<String>) -> Result<()> {
    if let Some(name) = name {
        let path = client
            .download(&id, &name)
            .await
            .with_context(|| format!("failed to download file {}", id))?;
        println!("saved {}", path.display());
        return Ok(());
    }

    let mut shell = AppShell::new(Arc::new(client));
    // the listing provides the original filename
    shell.load_files(None).await;
    check(shell.state())?;

    match shell.download(&id).await {
        Some(path) => {
            println!("saved {}", path.display());
            Ok(())
        }
        None => check(shell.state()),
    }
}

fn redraw(state: &ShellState) {
    println!();
    print!("{}", StatsPanel::render(state.stats.as_ref()));
    println!();
    print!("{}", state.render());
}

async fn interactive(client: FileHubClient, debounce: std::time::Duration) -> Result<()> {
    let (filters_tx, filters_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();

    let mut shell = AppShell::new(Arc::new(client));
    shell.mount().await;

    println!("{}", session::HELP);
    redraw(shell.state());

    let input = tokio::spawn(async move {
        let mut panel = SearchPanel::with_delay(filters_tx, debounce);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    error!("failed to read input: {}", err);
                    break;
                }
            };

            let input = match session::parse_input(&line) {
                Ok(Some(input)) => input,
                Ok(None) => continue,
                Err(msg) => {
                    eprintln!("{}", msg);
                    continue;
                }
            };

            let command = match input {
                Input::Filename(name) => {
                    panel.set_filename(&name);
                    None
                }
                Input::FileType(file_type) => {
                    panel.set_file_type(&file_type);
                    None
                }
                Input::MinSize(size) => {
                    panel.set_min_size(size);
                    None
                }
                Input::MaxSize(size) => {
                    panel.set_max_size(size);
                    None
                }
                Input::Range(range) => {
                    panel.set_date_range(range);
                    None
                }
                Input::Search => {
                    panel.submit();
                    None
                }
                Input::Clear => {
                    panel.clear_filename();
                    None
                }
                Input::Reset => {
                    panel.reset();
                    None
                }
                Input::Upload(path) => match read_upload(&path).await {
                    Ok((filename, content)) => Some(Command::Upload { filename, content }),
                    Err(err) => {
                        eprintln!("{:#}", err);
                        None
                    }
                },
                Input::Delete(id) => Some(Command::Delete(id)),
                Input::Download(id) => Some(Command::Download(id)),
                Input::Refresh => Some(Command::Refresh),
                Input::Help => {
                    println!("{}", session::HELP);
                    None
                }
                Input::Quit => break,
            };

            if let Some(command) = command {
                if commands_tx.send(command).is_err() {
                    break;
                }
            }
        }

        // dropping the panel cancels a pending search
        drop(panel);
        let _ = commands_tx.send(Command::Quit);
    });

    shell.run(filters_rx, commands_rx, redraw).await;
    input.abort();

    Ok(())
}
