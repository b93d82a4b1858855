use std::collections::VecDeque;
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;

use filehub_client::{
    ApiError, DedupStatus, ErrorKind, FileApi, FileRecord, FilterSet, Result as ApiResult,
    StorageStats,
};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::format::{format_bytes, format_timestamp};

/// User facing failure of the last action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellError {
    pub message: String,
    pub kind: ErrorKind,
}

#[derive(Debug, Default)]
pub struct ShellState {
    pub files: Vec<FileRecord>,
    pub loading: bool,
    pub error: Option<ShellError>,
    /// `None` until the first successful stats fetch
    pub stats: Option<StorageStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Original,
    Duplicate,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Original => "Original",
            Badge::Duplicate => "Duplicate",
        }
    }
}

/// One rendered line of the file table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub id: String,
    pub filename: String,
    pub file_type: String,
    pub size: String,
    pub uploaded: String,
    pub badge: Badge,
    /// filename of the original when this row is a duplicate
    pub duplicate_of: Option<String>,
}

impl From<&FileRecord> for FileRow {
    fn from(record: &FileRecord) -> Self {
        let (badge, duplicate_of) = match record.status() {
            DedupStatus::Original => (Badge::Original, None),
            DedupStatus::Duplicate(details) => (
                Badge::Duplicate,
                details.map(|d| d.original_filename.clone()),
            ),
        };

        FileRow {
            id: record.id.clone(),
            filename: record.original_filename.clone(),
            file_type: record.file_type.clone(),
            size: format_bytes(record.size),
            uploaded: format_timestamp(&record.uploaded_at),
            badge,
            duplicate_of,
        }
    }
}

impl ShellState {
    pub fn rows(&self) -> Vec<FileRow> {
        self.files.iter().map(FileRow::from).collect()
    }

    /// Error banner followed by a loading indicator or the file table
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(err) = &self.error {
            let _ = writeln!(out, "! {}", err.message);
        }

        if self.loading {
            out.push_str("Loading...\n");
            return out;
        }

        let rows = self.rows();
        if rows.is_empty() {
            out.push_str("No files\n");
            return out;
        }

        const HEADERS: [&str; 6] = ["FILE", "TYPE", "SIZE", "UPLOADED", "STATUS", "ID"];
        let cells: Vec<[&str; 6]> = rows
            .iter()
            .map(|r| {
                [
                    r.filename.as_str(),
                    r.file_type.as_str(),
                    r.size.as_str(),
                    r.uploaded.as_str(),
                    r.badge.label(),
                    r.id.as_str(),
                ]
            })
            .collect();

        let mut widths = HEADERS.map(|h| h.chars().count());
        for line in &cells {
            for (width, cell) in widths.iter_mut().zip(line.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let push_line = |out: &mut String, line: &[&str; 6]| {
            let text: Vec<String> = line
                .iter()
                .zip(widths.iter())
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect();
            let _ = writeln!(out, "{}", text.join("  ").trim_end());
        };

        push_line(&mut out, &HEADERS);
        for (row, line) in rows.iter().zip(cells.iter()) {
            push_line(&mut out, line);
            if let Some(original) = &row.duplicate_of {
                let _ = writeln!(out, "  └ duplicate of: {}", original);
            }
        }
        out
    }
}

/// Generation of one list/search load. Only the newest ticket's result is
/// applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

type SearchFuture = BoxFuture<'static, (LoadTicket, ApiResult<Vec<FileRecord>>)>;

/// Actions the shell runs to completion one at a time
#[derive(Debug)]
pub enum Command {
    Upload { filename: String, content: Vec<u8> },
    Delete(String),
    Download(String),
    Refresh,
    Quit,
}

/// Top level coordinator: owns the listing, the stats snapshot, the loading
/// flag and the last error, and reloads authoritative state after every
/// mutation.
pub struct AppShell<A> {
    api: Arc<A>,
    state: ShellState,
    generation: u64,
    /// generation of the newest load that has not finished yet
    outstanding: Option<u64>,
}

impl<A> AppShell<A>
where
    A: FileApi + 'static,
{
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: ShellState::default(),
            generation: 0,
            outstanding: None,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn rows(&self) -> Vec<FileRow> {
        self.state.rows()
    }

    pub fn render(&self) -> String {
        self.state.render()
    }

    /// Initial load: listing and stats at the same time, failing independently
    pub async fn mount(&mut self) {
        let ticket = self.begin_load();
        let (files, stats) = tokio::join!(self.api.list(), self.api.stats());
        self.finish_load(ticket, files);
        self.apply_stats(stats);
    }

    /// Start a list/search load. Any older load still in flight becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.outstanding = Some(self.generation);
        self.state.loading = true;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Apply the result of a load. Returns false, leaving the state untouched,
    /// when a newer load was started after `ticket`.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: ApiResult<Vec<FileRecord>>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                "discarding stale file listing #{} (latest #{})",
                ticket.generation, self.generation
            );
            return false;
        }

        self.outstanding = None;
        self.state.loading = false;
        match result {
            Ok(files) => {
                debug!("loaded {} files", files.len());
                self.state.files = files;
                self.state.error = None;
            }
            Err(err) => {
                error!("Error loading files: {}", err);
                self.set_error("Failed to load files", &err);
            }
        }
        true
    }

    fn apply_stats(&mut self, result: ApiResult<StorageStats>) {
        match result {
            Ok(stats) => self.state.stats = Some(stats),
            Err(err) => error!("Error loading storage stats: {}", err),
        }
    }

    fn set_error(&mut self, message: &str, err: &ApiError) {
        self.state.error = Some(ShellError {
            message: message.to_string(),
            kind: err.kind(),
        });
    }

    /// End a failed mutation. Loading stays set while a load is still running.
    fn fail(&mut self, message: &str, err: &ApiError) {
        self.set_error(message, err);
        self.state.loading = self.outstanding.is_some();
    }

    /// Load the listing, filtered when `filter` is given
    pub async fn load_files(&mut self, filter: Option<&FilterSet>) {
        let ticket = self.begin_load();
        let result = match filter {
            Some(filter) => self.api.search(filter).await,
            None => self.api.list().await,
        };
        self.finish_load(ticket, result);
    }

    pub async fn on_search(&mut self, filter: FilterSet) {
        self.load_files(Some(&filter)).await;
    }

    /// Fresh unfiltered listing and stats after a mutation
    async fn reload(&mut self) {
        let ticket = self.begin_load();
        let (files, stats) = tokio::join!(self.api.list(), self.api.stats());
        self.finish_load(ticket, files);
        self.apply_stats(stats);
    }

    /// Upload then reload. Refused while another operation is loading.
    pub async fn upload(&mut self, content: Vec<u8>, filename: &str) -> Option<FileRecord> {
        if self.state.loading {
            warn!("upload of {} ignored, an operation is in progress", filename);
            self.state.error = Some(ShellError {
                message: "Upload ignored, an operation is in progress".to_string(),
                kind: ErrorKind::Other,
            });
            return None;
        }

        self.state.loading = true;
        match self.api.upload(content, filename).await {
            Ok(record) => {
                self.reload().await;
                Some(record)
            }
            Err(err) => {
                error!("Error uploading file {}: {}", filename, err);
                let message = match err.kind() {
                    ErrorKind::Conflict => "File already exists",
                    _ => "Failed to upload file",
                };
                self.fail(message, &err);
                None
            }
        }
    }

    /// Delete then reload
    pub async fn delete(&mut self, id: &str) -> bool {
        self.state.loading = true;
        match self.api.remove(id).await {
            Ok(()) => {
                self.reload().await;
                true
            }
            Err(err) => {
                error!("Error deleting file {}: {}", id, err);
                self.fail("Failed to delete file", &err);
                false
            }
        }
    }

    /// Save a listed file under its original name
    pub async fn download(&mut self, id: &str) -> Option<PathBuf> {
        let filename = self
            .state
            .files
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.original_filename.clone())
            .unwrap_or_else(|| id.to_string());

        match self.api.download(id, &filename).await {
            Ok(path) => Some(path),
            Err(err) => {
                error!("Error downloading file {}: {}", id, err);
                let message = match err.kind() {
                    ErrorKind::NotFound => "File not found",
                    _ => "Failed to download file",
                };
                self.set_error(message, &err);
                None
            }
        }
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::Upload { filename, content } => {
                self.upload(content, &filename).await;
            }
            Command::Delete(id) => {
                self.delete(&id).await;
            }
            Command::Download(id) => {
                if let Some(path) = self.download(&id).await {
                    info!("saved {}", path.display());
                }
            }
            Command::Refresh => self.reload().await,
            Command::Quit => {}
        }
    }

    /// Run queued uploads once no load is outstanding
    async fn run_queued<F>(&mut self, queued: &mut VecDeque<Command>, on_change: &mut F)
    where
        F: FnMut(&ShellState),
    {
        while self.outstanding.is_none() {
            let Some(command) = queued.pop_front() else {
                break;
            };
            self.execute(command).await;
            on_change(&self.state);
        }
    }

    /// Event loop driving the shell.
    ///
    /// Filter sets start a search right away, so several searches may be in
    /// flight at once; only the newest result is applied. Commands run to
    /// completion before the next event is taken. An upload that arrives
    /// while a search is in flight is queued and runs once the newest search
    /// has finished. `on_change` is called after every visible state change.
    /// Returns on [`Command::Quit`] or once both channels are closed and no
    /// search is left. Queued uploads still run before returning.
    pub async fn run<F>(
        &mut self,
        mut filters: UnboundedReceiver<FilterSet>,
        mut commands: UnboundedReceiver<Command>,
        mut on_change: F,
    ) where
        F: FnMut(&ShellState),
    {
        let mut searches: FuturesUnordered<SearchFuture> = FuturesUnordered::new();
        let mut queued = VecDeque::new();
        let mut filters_open = true;
        let mut commands_open = true;

        loop {
            tokio::select! {
                filter = filters.recv(), if filters_open => match filter {
                    Some(filter) => {
                        let ticket = self.begin_load();
                        let api = Arc::clone(&self.api);
                        searches.push(
                            async move {
                                let result = api.search(&filter).await;
                                (ticket, result)
                            }
                            .boxed(),
                        );
                        on_change(&self.state);
                    }
                    None => filters_open = false,
                },
                command = commands.recv(), if commands_open => match command {
                    Some(Command::Quit) => break,
                    Some(command @ Command::Upload { .. })
                        if self.outstanding.is_some() && !searches.is_empty() =>
                    {
                        debug!("upload queued until the running search finishes");
                        queued.push_back(command);
                    }
                    Some(command) => {
                        self.execute(command).await;
                        on_change(&self.state);
                    }
                    None => commands_open = false,
                },
                Some((ticket, result)) = searches.next(), if !searches.is_empty() => {
                    if self.finish_load(ticket, result) {
                        on_change(&self.state);
                        self.run_queued(&mut queued, &mut on_change).await;
                    }
                }
                else => break,
            }
        }

        if !queued.is_empty() {
            while let Some((ticket, result)) = searches.next().await {
                if self.finish_load(ticket, result) {
                    on_change(&self.state);
                }
            }
            self.run_queued(&mut queued, &mut on_change).await;
        }
    }
}
