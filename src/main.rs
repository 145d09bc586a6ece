use anyhow::{anyhow, bail, Context, Result};
use granola_client::config::Config;
use granola_client::utils::app_paths::AppPaths;
use granola_client::{logging, Document, GranolaApiClient, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_LIMIT};
use std::process::ExitCode;

mod table_display;

use table_display::{display_document, display_documents};

const USAGE: &str = "\
Usage: granola-docs [--json] [--log-file] <command> [--] [args]

Commands:
  list [--limit N] [--offset N]   Fetch one page of documents
  all                             Fetch every document
  search <query> [--limit N]      Search titles, markdown and content
  get <id>                        Show one document

Options:
  --json               Print raw JSON instead of a table
  --log-file           Also write logs to the application log directory
  --generate-config    Write a commented config file and exit
  -h, --help           Show this help
  --                   Treat the remaining arguments as plain values";

#[derive(Debug, PartialEq)]
enum Command {
    List { limit: usize, offset: usize },
    All,
    Search { query: String, limit: usize },
    Get { id: String },
    GenerateConfig,
    Help,
}

#[derive(Debug, PartialEq)]
struct Options {
    command: Command,
    json: bool,
    log_file: bool,
}

fn flag_value(args: &[String], flag: &str) -> Result<Option<usize>> {
    match args.iter().position(|a| a == flag) {
        None => Ok(None),
        Some(pos) => {
            let raw = args
                .get(pos + 1)
                .ok_or_else(|| anyhow!("{flag} needs a value"))?;
            let value = raw
                .parse::<usize>()
                .with_context(|| format!("{flag} expects a number, got {raw:?}"))?;
            Ok(Some(value))
        }
    }
}

fn positionals(args: &[String]) -> Vec<&String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        match arg.as_str() {
            "--limit" | "--offset" => skip_next = true,
            a if a.starts_with('-') => {}
            _ => out.push(arg),
        }
    }
    out
}

fn parse_args(args: &[String]) -> Result<Options> {
    // Everything after `--` is positional, so a query may start with a dash
    let (args, rest) = match args.iter().position(|a| a == "--") {
        Some(pos) => (&args[..pos], &args[pos + 1..]),
        None => (args, &[][..]),
    };

    let json = args.iter().any(|a| a == "--json");
    let log_file = args.iter().any(|a| a == "--log-file");

    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Ok(Options { command: Command::Help, json, log_file });
    }
    if args.iter().any(|a| a == "--generate-config") {
        return Ok(Options { command: Command::GenerateConfig, json, log_file });
    }

    let mut positional = positionals(args);
    positional.extend(rest);
    let command = match positional.first().map(|s| s.as_str()) {
        None => Command::Help,
        Some("list") => Command::List {
            limit: flag_value(args, "--limit")?.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: flag_value(args, "--offset")?.unwrap_or(0),
        },
        Some("all") => Command::All,
        Some("search") => {
            let query = positional
                .get(1)
                .ok_or_else(|| anyhow!("search needs a query"))?;
            Command::Search {
                query: query.to_string(),
                limit: flag_value(args, "--limit")?.unwrap_or(DEFAULT_SEARCH_LIMIT),
            }
        }
        Some("get") => {
            let id = positional.get(1).ok_or_else(|| anyhow!("get needs a document id"))?;
            Command::Get { id: id.to_string() }
        }
        Some(other) => bail!("unknown command {other:?}"),
    };

    Ok(Options { command, json, log_file })
}

fn print_documents(docs: &[Document], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(docs)?);
    } else {
        display_documents(docs);
    }
    Ok(())
}

fn generate_config() -> Result<()> {
    let path = Config::get_config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&path, Config::create_default_with_comments())
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Configuration file created at: {}", path.display());
    Ok(())
}

fn run(options: Options) -> Result<ExitCode> {
    let json = options.json;

    match options.command {
        Command::Help => println!("{USAGE}"),
        Command::GenerateConfig => generate_config()?,
        Command::List { limit, offset } => {
            let docs = GranolaApiClient::new()?.fetch_documents(limit, offset)?;
            print_documents(&docs, json)?;
        }
        Command::All => {
            let docs = GranolaApiClient::new()?.get_all_documents()?;
            print_documents(&docs, json)?;
        }
        Command::Search { query, limit } => {
            let docs = GranolaApiClient::new()?.search_documents(&query, limit)?;
            print_documents(&docs, json)?;
        }
        Command::Get { id } => match GranolaApiClient::new()?.get_document_by_id(&id)? {
            Some(doc) if json => println!("{}", serde_json::to_string_pretty(&doc)?),
            Some(doc) => display_document(&doc),
            None => {
                eprintln!("Document {id} not found");
                return Ok(ExitCode::from(2));
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {e:#}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    if options.log_file {
        match AppPaths::log_dir().and_then(|dir| Ok(logging::init_file_tracing(&dir)?)) {
            Ok(path) => eprintln!("Logs will be written to: {}", path.display()),
            Err(e) => {
                eprintln!("Could not set up log file ({e:#}), logging to stderr only");
                logging::init_tracing();
            }
        }
    } else {
        logging::init_tracing();
    }

    match run(options) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_list_defaults() {
        let options = parse_args(&args(&["list"])).unwrap();
        assert_eq!(options.command, Command::List { limit: 100, offset: 0 });
        assert!(!options.json);
    }

    #[test]
    fn test_search_with_limit_and_json() {
        let options = parse_args(&args(&["--json", "search", "--limit", "5", "standup"])).unwrap();
        assert_eq!(
            options.command,
            Command::Search { query: "standup".to_string(), limit: 5 }
        );
        assert!(options.json);
    }

    #[test]
    fn test_search_default_limit() {
        let options = parse_args(&args(&["search", "retro"])).unwrap();
        assert_eq!(
            options.command,
            Command::Search { query: "retro".to_string(), limit: 10 }
        );
    }

    #[test]
    fn test_get_requires_id() {
        assert!(parse_args(&args(&["get"])).is_err());
        let options = parse_args(&args(&["get", "doc-42"])).unwrap();
        assert_eq!(options.command, Command::Get { id: "doc-42".to_string() });
    }

    #[test]
    fn test_bad_numbers_and_commands_fail() {
        assert!(parse_args(&args(&["list", "--limit", "many"])).is_err());
        assert!(parse_args(&args(&["list", "--offset"])).is_err());
        assert!(parse_args(&args(&["export"])).is_err());
    }

    #[test]
    fn test_double_dash_ends_flags() {
        let options = parse_args(&args(&["search", "--", "-foo"])).unwrap();
        assert_eq!(
            options.command,
            Command::Search { query: "-foo".to_string(), limit: 10 }
        );

        let options = parse_args(&args(&["search", "--limit", "3", "--", "--json"])).unwrap();
        assert_eq!(
            options.command,
            Command::Search { query: "--json".to_string(), limit: 3 }
        );
        assert!(!options.json);

        let options = parse_args(&args(&["get", "--", "--help"])).unwrap();
        assert_eq!(options.command, Command::Get { id: "--help".to_string() });
    }

    #[test]
    fn test_dash_query_without_marker_is_rejected() {
        assert!(parse_args(&args(&["search", "-foo"])).is_err());
    }

    #[test]
    fn test_no_arguments_shows_help() {
        assert_eq!(parse_args(&[]).unwrap().command, Command::Help);
    }
}
