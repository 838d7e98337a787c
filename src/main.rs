use anyhow::Result;
use std::io;
use std::path::PathBuf;

use calibrolino::cloud::{Credentials, DryRunClient};
use calibrolino::config::Config;
use calibrolino::shell::{read_catalog, Shell};
use calibrolino::logging;

struct Args {
    config_path: Option<PathBuf>,
    list: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config_path: None,
        list: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("calibrolino {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--list" | "-l" => {
                parsed.list = true;
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"calibrolino - upload a calibre library to an e-reader cloud

USAGE:
    calibrolino [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config file
    --list, -l          Print the calibre catalog and exit
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    CALIBROLINO_CONFIG  Path to config file (overrides default location)
    CALIBROLINO_LOG     Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/calibrolino/config.toml"#
    );
}

fn dry_run_client(credentials: &Credentials) -> DryRunClient {
    DryRunClient::new(&credentials.server_name)
}

fn print_catalog(config: &Config) -> Result<()> {
    let catalog = read_catalog(&config.library)?;
    for book in &catalog.books {
        println!("==========");
        println!("title: {}", book.display_title());
        println!("uuid: {}", book.uuid);
        println!("authors: {}", book.authors.join(", "));
        println!("tags: {}", book.tags.join(", "));
        println!("status: {}", book.status.as_deref().unwrap_or("-"));
        match &book.file_path {
            Some(path) => println!("file: {}", path.display()),
            None => println!("file: -"),
        }
    }
    for error in &catalog.errors {
        eprintln!("missing file: {}", error);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args();

    let _ = logging::init(&Config::config_dir().join("logs"));

    let config = match args.config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    if args.list {
        return print_catalog(&config);
    }

    let stdin = io::stdin();
    let mut shell = Shell::new(config, dry_run_client, stdin.lock(), io::stdout());
    shell.run()
}
