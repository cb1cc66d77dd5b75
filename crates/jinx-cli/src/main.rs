use clap::{Parser, Subcommand};
use jinx_exec::{Context, Evaluator};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jinx")]
#[command(about = "Jinx: Jinja-style template expressions")]
#[command(version)]
struct Cli {
    /// Log debug events to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse an expression and print its canonical form
    Parse {
        /// Expression source, e.g. "a and b or c"
        expr: String,

        /// Also print the syntax tree
        #[arg(long)]
        ast: bool,
    },

    /// Render a template file to stdout
    Render {
        /// Input template file
        path: String,

        /// Bind a variable, e.g. --set "items=[1, 2]". The value is an expression.
        #[arg(long = "set", value_name = "NAME=EXPR")]
        vars: Vec<String>,
    },

    /// Check a template file for syntax errors without rendering it
    Check {
        /// Input template file
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();
    install_tracing(cli.verbose);

    match cli.command {
        Command::Parse { expr, ast } => cmd_parse(&expr, ast),
        Command::Render { path, vars } => cmd_render(&path, &vars),
        Command::Check { path } => cmd_check(&path),
    }
}

fn install_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_parse(source: &str, show_ast: bool) {
    let expr = match jinx_parser::Parser::parse_expression(source) {
        Ok(expr) => expr,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    println!("{expr}");
    if show_ast {
        println!("{expr:#?}");
    }
}

fn cmd_render(path: &str, vars: &[String]) {
    let source = read_source(path);
    let evaluator = Evaluator::new();
    let mut ctx = Context::new();

    for binding in vars {
        let Some((name, expr)) = binding.split_once('=') else {
            eprintln!("Error: expected NAME=EXPR, got '{binding}'");
            std::process::exit(1);
        };
        let name = name.trim();
        match evaluator.eval_str(expr, &mut ctx) {
            Ok(value) => {
                debug!(%name, %value, "bound variable");
                ctx.set(name, value);
            }
            Err(e) => {
                eprintln!("Error in --set {name}: {e}");
                std::process::exit(1);
            }
        }
    }

    match evaluator.render_str(&source, &mut ctx) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Render error: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_check(path: &str) {
    let source = read_source(path);

    if let Err(e) = jinx_parser::Parser::parse_template(&source) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    eprintln!("OK: {path}");
}
