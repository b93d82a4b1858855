//! Line oriented input of the interactive session.

use std::path::PathBuf;

use filehub_client::DateRange;

pub const HELP: &str = "\
commands:
  name <text>          filter by filename (applied after a short pause)
  type <text>          filter by file type
  min <bytes>          minimum size, empty to clear
  max <bytes>          maximum size, empty to clear
  range <today|week|month|all>
  search               apply all filters now
  clear                clear the filename filter
  reset                clear all filters
  upload <path>        upload a file
  delete <id>          delete a file
  download <id>        save a file into the download directory
  refresh              reload files and statistics
  help                 show this message
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Filename(String),
    FileType(String),
    MinSize(Option<u64>),
    MaxSize(Option<u64>),
    Range(Option<DateRange>),
    Search,
    Clear,
    Reset,
    Upload(PathBuf),
    Delete(String),
    Download(String),
    Refresh,
    Help,
    Quit,
}

fn size(arg: &str) -> Result<Option<u64>, String> {
    if arg.is_empty() {
        return Ok(None);
    }
    arg.parse::<u64>()
        .map(Some)
        .map_err(|_| format!("invalid size '{}', expected a byte count", arg))
}

fn required(arg: &str, what: &str) -> Result<String, String> {
    if arg.is_empty() {
        Err(format!("missing {}", what))
    } else {
        Ok(arg.to_string())
    }
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    let input = match command {
        "name" => Input::Filename(arg.to_string()),
        "type" => Input::FileType(arg.to_string()),
        "min" => Input::MinSize(size(arg)?),
        "max" => Input::MaxSize(size(arg)?),
        "range" => match arg {
            "" | "all" => Input::Range(None),
            other => Input::Range(Some(other.parse()?)),
        },
        "search" => Input::Search,
        "clear" => Input::Clear,
        "reset" => Input::Reset,
        "upload" => Input::Upload(PathBuf::from(required(arg, "path")?)),
        "delete" | "rm" => Input::Delete(required(arg, "file id")?),
        "download" | "get" => Input::Download(required(arg, "file id")?),
        "refresh" => Input::Refresh,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command '{}', type help", other)),
    };

    Ok(Some(input))
}
