//! CLI argument parsing.
//!
//! Builds one `Config` plus a `Command` value; no option state lives
//! anywhere else. Everything after the first non-option token of `add`
//! is forwarded to the frontend verbatim.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

use sindex::index::mode;
use sindex::index::{FileLoc, LocationQuery, SearchOptions};

const DEFAULT_DATABASE: &str = "sindex.sqlite";
const DEFAULT_FORMAT: &str = "(%m) %f\\t%l\\t%c\\t%C\\t%s";

pub fn print_usage() {
    eprintln!("Usage: sindex [options] <command> [command options] [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  add      Generate or update the semantic index for C source code");
    eprintln!("  rm       Remove files from the index by pattern");
    eprintln!("  search   Make index queries");
    eprintln!();
    eprintln!("Options:");
    eprintln!(
        "  -D, --database=FILE    Specify database file (default: {})",
        DEFAULT_DATABASE
    );
    eprintln!("  -v, --verbose          Show information about what is being done");
    eprintln!("  -h, --help             Show this text and exit");
    eprintln!("      --version          Show version information and exit");
    eprintln!();
    eprintln!("Add options:");
    eprintln!("  --include-local-syms   Include local symbols into the index");
    eprintln!("  everything after the first non-option is forwarded to the frontend");
    eprintln!();
    eprintln!("Rm arguments:");
    eprintln!("  pattern...             glob(7) patterns against stored file names");
    eprintln!();
    eprintln!("Search options:");
    eprintln!("  -f, --format=STRING    Specify an output format");
    eprintln!("  -p, --path=PATTERN     Search symbols only in matching files");
    eprintln!("  -m, --mode=MODE        Search only the specified type of access");
    eprintln!("  -k, --kind=KIND        Specify a kind of symbol (s, f, v, m)");
    eprintln!("  -e, --explain          Show what happens at a file position");
    eprintln!("  -l, --location         Show usage of symbols from a file position");
    eprintln!("  positional             symbol pattern, or filename[:line[:column]]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SINDEX_DATABASE        Database file location");
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: PathBuf,
    pub verbose: u8,
}

#[derive(Debug)]
pub enum Command {
    Help,
    Version,
    Add {
        include_local_syms: bool,
        tail: Vec<String>,
    },
    Rm {
        patterns: Vec<String>,
    },
    Search {
        format: String,
        options: SearchOptions,
    },
}

#[derive(Debug)]
pub struct Cli {
    pub config: Config,
    pub command: Command,
}

/// Split `--opt=value` forms; returns (option, inline value).
fn split_eq(arg: &str) -> (&str, Option<&str>) {
    match arg.split_once('=') {
        Some((opt, value)) if opt.starts_with("--") => (opt, Some(value)),
        _ => (arg, None),
    }
}

struct Args<'a> {
    args: &'a [String],
    i: usize,
}

impl<'a> Args<'a> {
    fn next(&mut self) -> Option<&'a str> {
        let arg = self.args.get(self.i)?;
        self.i += 1;
        Some(arg)
    }

    fn peek(&self) -> Option<&'a str> {
        self.args.get(self.i).map(String::as_str)
    }

    /// Value of an option, either inline (`--opt=value`) or the next
    /// argument.
    fn value(&mut self, opt: &str, inline: Option<&'a str>) -> Result<&'a str> {
        match inline {
            Some(value) => Ok(value),
            None => self
                .next()
                .ok_or_else(|| anyhow!("{} requires an argument", opt)),
        }
    }

    fn rest(&mut self) -> Vec<String> {
        let rest = self.args[self.i..].to_vec();
        self.i = self.args.len();
        rest
    }
}

pub fn parse_args(args: &[String]) -> Result<Cli> {
    let mut config = Config {
        database: std::env::var_os("SINDEX_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
        verbose: 0,
    };

    let mut args = Args { args, i: 1 };

    let command = loop {
        let Some(arg) = args.next() else {
            bail!("command required");
        };
        let (opt, inline) = split_eq(arg);
        match opt {
            "-D" | "--database" => config.database = PathBuf::from(args.value(opt, inline)?),
            "-v" | "--verbose" => config.verbose += 1,
            "-h" | "--help" => {
                return Ok(Cli {
                    config,
                    command: Command::Help,
                })
            }
            "--version" => {
                return Ok(Cli {
                    config,
                    command: Command::Version,
                })
            }
            _ if arg.starts_with('-') => bail!("unknown option: {}", arg),
            _ => break arg,
        }
    };

    let command = match command {
        "add" => parse_add(&mut args, &mut config)?,
        "rm" => parse_rm(&mut args, &mut config)?,
        "search" => parse_search(&mut args, &mut config)?,
        other => bail!("unknown command: {}", other),
    };

    Ok(Cli { config, command })
}

fn parse_add(args: &mut Args<'_>, config: &mut Config) -> Result<Command> {
    let mut include_local_syms = false;
    let tail;

    loop {
        match args.peek() {
            None => {
                tail = Vec::new();
                break;
            }
            Some("--include-local-syms") => {
                include_local_syms = true;
                args.next();
            }
            Some("-v") | Some("--verbose") => {
                config.verbose += 1;
                args.next();
            }
            Some("-h") | Some("--help") => return Ok(Command::Help),
            Some("--") => {
                args.next();
                tail = args.rest();
                break;
            }
            // First unrecognized token: the frontend owns everything
            // from here on.
            Some(_) => {
                tail = args.rest();
                break;
            }
        }
    }

    if tail.is_empty() {
        bail!("add: more arguments required");
    }
    Ok(Command::Add {
        include_local_syms,
        tail,
    })
}

fn parse_rm(args: &mut Args<'_>, config: &mut Config) -> Result<Command> {
    let mut patterns = Vec::new();

    while let Some(arg) = args.next() {
        match arg {
            "-v" | "--verbose" => config.verbose += 1,
            "-h" | "--help" => return Ok(Command::Help),
            "--" => {
                patterns.extend(args.rest());
                break;
            }
            _ if arg.starts_with('-') => bail!("rm: unknown option: {}", arg),
            _ => patterns.push(arg.to_string()),
        }
    }

    if patterns.is_empty() {
        bail!("rm: more arguments required");
    }
    Ok(Command::Rm { patterns })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LocationFlag {
    Explain,
    Usage,
}

fn parse_search(args: &mut Args<'_>, config: &mut Config) -> Result<Command> {
    let mut format = DEFAULT_FORMAT.to_string();
    let mut options = SearchOptions::default();
    let mut location_flag = None;
    let mut positional: Option<String> = None;

    while let Some(arg) = args.next() {
        let (opt, inline) = split_eq(arg);
        match opt {
            "-f" | "--format" => format = args.value(opt, inline)?.to_string(),
            "-p" | "--path" => options.path = Some(args.value(opt, inline)?.to_string()),
            "-m" | "--mode" => options.mode = Some(mode::parse_mask(args.value(opt, inline)?)?),
            "-k" | "--kind" => options.kind = Some(parse_kind(args.value(opt, inline)?)?),
            "-e" | "--explain" => location_flag = Some(LocationFlag::Explain),
            "-l" | "--location" => location_flag = Some(LocationFlag::Usage),
            "-v" | "--verbose" => config.verbose += 1,
            "-h" | "--help" => return Ok(Command::Help),
            _ if arg.starts_with('-') => bail!("search: unknown option: {}", arg),
            _ => {
                if positional.is_some() {
                    bail!("search: unexpected argument: {}", arg);
                }
                positional = Some(arg.to_string());
            }
        }
    }

    match location_flag {
        Some(flag) => {
            let Some(spec) = positional else {
                bail!("search: one argument required");
            };
            let loc = parse_location(&spec)?;
            options.location = Some(match flag {
                LocationFlag::Explain => LocationQuery::Explain(loc),
                LocationFlag::Usage => LocationQuery::Usage(loc),
            });
        }
        None => options.symbol = positional,
    }

    Ok(Command::Search { format, options })
}

fn parse_kind(value: &str) -> Result<u8> {
    let kind = value
        .chars()
        .next()
        .ok_or_else(|| anyhow!("empty kind value"))?
        .to_ascii_lowercase();
    if !matches!(kind, 's' | 'f' | 'v' | 'm') {
        bail!("unknown kind (`s', `f', `v' or `m' expected): {}", value);
    }
    Ok(kind as u8)
}

/// Parse `filename[:line[:column]]`; empty segments are skipped.
fn parse_location(spec: &str) -> Result<FileLoc> {
    let mut file = None;
    let mut line = None;
    let mut column = None;

    for part in spec.split(':').filter(|part| !part.is_empty()) {
        if file.is_none() {
            file = Some(part.to_string());
        } else if line.is_none() {
            line = Some(
                part.parse()
                    .map_err(|_| anyhow!("invalid line number: {}", part))?,
            );
        } else if column.is_none() {
            column = Some(
                part.parse()
                    .map_err(|_| anyhow!("invalid column number: {}", part))?,
            );
        }
    }

    let Some(file) = file else {
        bail!("invalid location: {}", spec);
    };
    Ok(FileLoc { file, line, column })
}
