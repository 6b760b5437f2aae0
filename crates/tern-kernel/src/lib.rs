//! tern-kernel: the core of the tern shell.
//!
//! This crate provides:
//!
//! - **Lexer**: Streams shell text into tokens on a producer thread
//! - **Arithmetic**: Pratt parser and evaluator for `$(( ))` expressions
//! - **AST**: The executable tree built by an upstream grammar parser
//! - **Interpreter**: Scopes, exit statuses and tree evaluation
//! - **Spawn**: Process spawning, pipelines and background jobs
//! - **Config**: TOML configuration

pub mod arithmetic;
pub mod ast;
pub mod config;
pub mod interpreter;
pub mod lexer;
pub mod spawn;

pub use arithmetic::{evaluate as evaluate_arithmetic, ArithError};
pub use config::{ConfigError, ShellConfig, SpawnConfig};
pub use interpreter::{Evaluator, EvalError, ExitStatus, Scope, VarScope};
pub use lexer::{tokenize, tokenize_all, LexError, LexItem, LexerOptions, Token, TokenStream};
pub use spawn::{Invocation, SpawnOutcome, Spawner, SystemSpawner};
