//! Kiln interactive front end.
//!
//! Reads submissions from stdin, one per line; a line ending in `\` continues
//! on the next line. Ctrl-C keeps its default behavior and ends the process.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use kiln_refs::FrameworkRequest;
use kiln_repl::{CancellationToken, EvaluationResult, Session, SessionConfig};

fn main() {
    kiln_repl::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match parse_args(&args, SessionConfig::from_env()) {
        Ok(Some(config)) => config,
        Ok(None) => return,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    let session = match Session::start(config) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(&session) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Apply command-line flags on top of `config`; `None` means nothing to run.
fn parse_args(args: &[String], mut config: SessionConfig) -> Result<Option<SessionConfig>, String> {
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-h" | "--help" => {
                print_usage();
                return Ok(None);
            }
            "-V" | "--version" => {
                println!("kiln {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "--framework" => {
                let request: FrameworkRequest = take_value(args, &mut i)?
                    .parse()
                    .map_err(|err| format!("{err}"))?;
                config = config.with_framework(request);
            }
            "--using" => config = config.with_import(take_value(args, &mut i)?),
            "--reference" | "-r" => config = config.with_reference(take_value(args, &mut i)?),
            "--feed" => {
                config = config.with_package_feed(PathBuf::from(take_value(args, &mut i)?));
            }
            "--root" => {
                config = config.with_install_root(PathBuf::from(take_value(args, &mut i)?));
            }
            "--" => {
                config = config.with_args(args[i + 1..].to_vec());
                break;
            }
            other => return Err(format!("unknown option '{other}'")),
        }
        i += 1;
    }
    Ok(Some(config))
}

/// The argument after the flag at `*i`, advancing past it.
fn take_value(args: &[String], i: &mut usize) -> Result<String, String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("missing value for '{flag}'"))
}

fn run(session: &Session) -> io::Result<()> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut stdout = io::stdout();
    let mut submission = String::new();

    prompt(&mut stdout, interactive, false)?;
    for line in stdin.lock().lines() {
        let line = line?;
        if let Some(continued) = line.strip_suffix('\\') {
            submission.push_str(continued);
            submission.push('\n');
            prompt(&mut stdout, interactive, true)?;
            continue;
        }
        submission.push_str(&line);
        let text = std::mem::take(&mut submission);

        if !text.trim().is_empty() {
            match session.evaluate(&text, &CancellationToken::new()) {
                EvaluationResult::Success(success) => {
                    if let Some(value) = success.return_value {
                        writeln!(stdout, "{value}")?;
                    }
                }
                EvaluationResult::Error(failure) => eprintln!("error: {failure}"),
                EvaluationResult::Cancelled => eprintln!("cancelled"),
            }
        }
        prompt(&mut stdout, interactive, false)?;
    }
    Ok(())
}

fn prompt(stdout: &mut io::Stdout, interactive: bool, continuation: bool) -> io::Result<()> {
    if interactive {
        write!(stdout, "{}", if continuation { "... " } else { "> " })?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_usage() {
    eprintln!("Kiln - incremental evaluator");
    eprintln!();
    eprintln!("Usage: kiln [options] [-- script-args...]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --framework <name[/version]>  Shared framework to load (default: Kiln.Core)");
    eprintln!("  --using <namespace>           Import a namespace from the start (repeatable)");
    eprintln!("  -r, --reference <reference>   Reference to resolve at startup (repeatable)");
    eprintln!("  --feed <dir>                  Local package feed for '#r \"package: ...\"'");
    eprintln!("  --root <dir>                  Additional framework install root");
    eprintln!("  -h, --help                    Print this help");
    eprintln!("  -V, --version                 Print the version");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  KILN_ROOT, KILN_PACKAGES, KILN_FEED, KILN_BUILD, RUST_LOG");
    eprintln!();
    eprintln!("Ctrl-C ends the process; pending work is not preserved.");
}
