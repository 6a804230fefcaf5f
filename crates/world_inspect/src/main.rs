use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use world_inspect::{parse_checksum_policy, run, CommandKind, CommonOptions};

fn main() -> ExitCode {
    init_tracing();
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        print_usage();
        return Ok(());
    }

    let mut options = CommonOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--json" => {
                options.json = true;
                index += 1;
            }
            "--config" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --config".to_string())?;
                options.config_path = Some(PathBuf::from(value));
                index += 2;
            }
            "--checksum" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --checksum".to_string())?;
                options.checksum_policy = Some(parse_checksum_policy(value)?);
                index += 2;
            }
            _ => break,
        }
    }

    let command = args
        .get(index)
        .ok_or_else(|| "missing subcommand".to_string())?
        .as_str();
    let command_args = &args[(index + 1)..];

    let kind = match command {
        "summary" | "validate" => {
            let [path] = command_args else {
                return Err(format!("{command} requires exactly one world file"));
            };
            let path = PathBuf::from(path);
            if command == "summary" {
                CommandKind::Summary { path }
            } else {
                CommandKind::Validate { path }
            }
        }
        "resave" => {
            let [path, version, out] = command_args else {
                return Err("resave requires <file> <version> <out>".to_string());
            };
            let version = version
                .parse::<u32>()
                .map_err(|_| format!("invalid version '{version}' (expected u32)"))?;
            CommandKind::Resave {
                path: PathBuf::from(path),
                version,
                out: PathBuf::from(out),
            }
        }
        "versions" => {
            if !command_args.is_empty() {
                return Err("versions takes no arguments".to_string());
            }
            CommandKind::Versions
        }
        other => return Err(format!("unknown subcommand '{other}'")),
    };

    run(kind, options, &mut io::stdout())
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "world_inspect - inspect and convert TWLD world files",
        "",
        "Usage:",
        "  world_inspect [--json] [--config <file.json>] [--checksum <warn|reject|skip>] summary <file>",
        "  world_inspect [--json] [--config <file.json>] [--checksum <warn|reject|skip>] validate <file>",
        "  world_inspect [--config <file.json>] [--checksum <warn|reject|skip>] resave <file> <version> <out>",
        "  world_inspect [--json] versions",
        "",
        "Logging is controlled by RUST_LOG (default: warn).",
    ]
    .join("\n")
}
