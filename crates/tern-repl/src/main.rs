//! tern CLI entry point.
//!
//! Usage:
//!   tern tokens [-c TEXT | FILE]        # Dump the token stream
//!   tern arith EXPR [NAME=VALUE ...]    # Evaluate an arithmetic expression
//!   tern exec [NAME=VALUE ...] WORD ... # Run one command invocation

use std::env;
use std::io::Read;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tern_kernel::ast::{Arg, Assignment, CommandNode, ShellNode};
use tern_kernel::{
    evaluate_arithmetic, tokenize, tokenize_all, Evaluator, LexerOptions, Scope, ShellConfig,
    SystemSpawner, Token, VarScope,
};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None | Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!("tern {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }

        Some("tokens") => run_tokens(&args[2..]),
        Some("arith") => run_arith(&args[2..]),
        Some("exec") => run_exec(&args[2..]),

        Some(unknown) => {
            eprintln!("Unknown command: {unknown}");
            eprintln!("Run 'tern --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(
        r#"tern v{}

Usage:
  tern tokens [-c TEXT | FILE]         Print the token stream of a script
  tern arith EXPR [NAME=VALUE ...]     Evaluate an arithmetic expression
  tern exec [NAME=VALUE ...] WORD ...  Run one command and exit with its status

Options:
  -h, --help                           Show this help
  -V, --version                        Show version

Without -c or FILE, `tokens` reads the script from stdin.
Configuration is read from the platform config directory (tern/config.toml).

Examples:
  tern tokens -c 'if true; then echo "$HOME"; fi'
  tern arith 'y = x += 2' x=4 y=0
  tern exec GREETING=hi sh -c 'echo \$GREETING is $HOME'
"#,
        env!("CARGO_PKG_VERSION")
    );
}

fn load_config() -> Result<ShellConfig> {
    ShellConfig::load().context("Failed to load configuration")
}

/// Print one line per token: `line:pos TOKEN value`.
fn run_tokens(args: &[String]) -> Result<ExitCode> {
    let source = match args {
        [] => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read script from stdin")?;
            text
        }
        [flag, text] if flag == "-c" => text.clone(),
        [flag] if flag == "-c" => bail!("-c requires a script argument"),
        [path] => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {path}"))?,
        _ => bail!("tokens takes at most one script"),
    };

    let config = load_config()?;
    for item in tokenize(source, config.lexer) {
        let item = item.context("Tokenizing failed")?;
        let mut line = format!("{}:{} {}", item.line, item.pos, item.token);
        if !item.value.is_empty() {
            line.push(' ');
            line.push_str(&item.value.escape_debug().to_string());
        }
        for sub in &item.subs {
            line.push_str(&format!(" [{sub}]"));
        }
        println!("{line}");
    }
    Ok(ExitCode::SUCCESS)
}

fn parse_binding(text: &str) -> Result<Assignment> {
    Assignment::parse(text).with_context(|| format!("Expected NAME=VALUE, got '{text}'"))
}

/// Evaluate an expression and print its value plus the named bindings.
fn run_arith(args: &[String]) -> Result<ExitCode> {
    let (expr, bindings) = args
        .split_first()
        .context("arith requires an expression")?;

    let mut scope = VarScope::new();
    let mut names = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let assignment = parse_binding(binding)?;
        scope.set(&assignment.name, assignment.value.raw);
        names.push(assignment.name);
    }

    let value = evaluate_arithmetic(expr, &mut scope)
        .with_context(|| format!("Failed to evaluate '{expr}'"))?;
    println!("{value}");
    for name in names {
        println!("{name}={}", scope.get(&name).unwrap_or_default());
    }

    Ok(ExitCode::from(u8::from(value == 0)))
}

/// Lex a command line word as if it were double-quoted, so `$VAR`,
/// `$((...))` and `$(...)` expand while spaces stay inside the word.
/// `\$` and `` \` `` stay literal; every other backslash is kept as typed.
fn word_to_arg(word: &str) -> Result<Arg> {
    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('"');
    let mut chars = word.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some('$' | '`')) => quoted.push('\\'),
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    let options = LexerOptions {
        resolve_keywords: false,
        resolve_aliases: false,
        ..LexerOptions::default()
    };
    let items = tokenize_all(quoted, options).with_context(|| format!("Invalid word: {word}"))?;
    match items.as_slice() {
        [item, eof] if item.token == Token::Word && eof.token == Token::Eof => {
            Ok(item.clone().into_arg())
        }
        _ => bail!("'{word}' is not a single shell word"),
    }
}

/// Evaluate one command with the system spawner.
fn run_exec(args: &[String]) -> Result<ExitCode> {
    let split = args
        .iter()
        .position(|arg| Assignment::parse(arg).is_none())
        .unwrap_or(args.len());
    let (bindings, words) = args.split_at(split);
    if words.is_empty() {
        bail!("exec requires a command");
    }

    let mut assignments = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let assignment = parse_binding(binding)?;
        let value = word_to_arg(&assignment.value.raw)?;
        assignments.push(Assignment::new(assignment.name, value));
    }
    let node = ShellNode::Command(CommandNode {
        assignments,
        args: words
            .iter()
            .map(|word| word_to_arg(word))
            .collect::<Result<_>>()?,
        line: 1,
    });

    let config = load_config()?;
    let mut scope = VarScope::from_env();
    let mut evaluator = Evaluator::new(SystemSpawner::new(config.spawn));
    let status = evaluator
        .evaluate(&node, &mut scope)
        .context("Evaluation failed")?;

    tracing::debug!(%status, "exec finished");
    Ok(ExitCode::from(status.code().clamp(0, 255) as u8))
}
