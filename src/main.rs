use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use regcalc::diagnostic::AnsiRenderer;
use regcalc::display::{format_number, format_record};
use regcalc::{Config, Session};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Bytecode,
    Json,
}

/// Evaluate arithmetic lines and `def name = expr` definitions on a register VM.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Lines to evaluate in order, sharing one set of variables.
    lines: Vec<String>,

    /// Read lines from a file instead of the arguments.
    #[arg(short, long, conflicts_with = "lines")]
    file: Option<PathBuf>,

    /// Print each evaluation as a `>>> input` / output record.
    #[arg(long)]
    echo: bool,

    /// Print the compiled program instead of running it.
    #[arg(long, value_enum)]
    emit: Option<Emit>,

    /// Explain failures on stderr.
    #[arg(long)]
    explain: bool,

    /// JSON file with memory layout and parser limits.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Deepest parenthesis nesting accepted.
    #[arg(long)]
    max_depth: Option<usize>,

    /// First heap address; also the largest program size.
    #[arg(long)]
    heap_base: Option<usize>,

    /// Address where the stack region starts.
    #[arg(long)]
    stack_top: Option<usize>,

    /// Log compilation and evaluation to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn install_tracing(verbose: bool) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if verbose {
        if let Ok(directive) = "regcalc=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn load_config(args: &Args) -> Result<Config, String> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Error reading {}: {}", path.display(), e))?;
            serde_json::from_str(&text).map_err(|e| format!("Invalid config {}: {}", path.display(), e))?
        }
        None => Config::default(),
    };
    if let Some(n) = args.max_depth {
        config.max_depth = n;
    }
    if let Some(n) = args.heap_base {
        config.heap_base = n;
    }
    if let Some(n) = args.stack_top {
        config.stack_top = n;
    }
    if config.heap_base > config.stack_top {
        return Err(format!("heap base {} lies above stack top {}", config.heap_base, config.stack_top));
    }
    Ok(config)
}

struct Runner {
    session: Session,
    echo: bool,
    emit: Option<Emit>,
    explain: bool,
    failed: bool,
}

impl Runner {
    fn line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if line == ":vars" {
            for var in self.session.variables() {
                println!("{} @{} = {}", var.name, var.addr, format_number(var.value));
            }
            return;
        }
        match self.emit {
            Some(emit) => self.emit_line(line, emit),
            None => self.eval_line(line),
        }
    }

    fn eval_line(&mut self, line: &str) {
        match self.session.evaluate(line) {
            Ok(value) => {
                let out = format_number(value);
                if self.echo {
                    println!("{}", format_record(line, &out));
                } else {
                    println!("{}", out);
                }
            }
            Err(e) => {
                self.failed = true;
                if self.echo {
                    println!("{}", format_record(line, &e.to_string()));
                } else {
                    eprintln!("{}", e);
                }
                self.report(line, &e);
            }
        }
    }

    fn emit_line(&mut self, line: &str, emit: Emit) {
        match self.session.compile(line) {
            Ok(compiled) => match emit {
                Emit::Bytecode => print!("{}", regcalc::vm::disassemble(&compiled.code)),
                Emit::Json => match serde_json::to_string(&compiled.code) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        self.failed = true;
                        eprintln!("Serialization error: {}", e);
                    }
                },
            },
            Err(e) => {
                self.failed = true;
                eprintln!("{}", e);
                self.report(line, &e);
            }
        }
    }

    fn report(&self, line: &str, e: &regcalc::EvalError) {
        if self.explain {
            let renderer = AnsiRenderer { use_color: std::io::stderr().is_terminal() };
            eprint!("{}", renderer.render(line, e));
        }
    }
}

fn repl(runner: &mut Runner) -> std::io::Result<()> {
    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    let mut input = stdin.lock();
    let mut buf = String::new();
    loop {
        if interactive {
            print!(">>> ");
            std::io::stdout().flush()?;
        }
        buf.clear();
        if input.read_line(&mut buf)? == 0 {
            break;
        }
        runner.line(&buf);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    install_tracing(args.verbose);

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let mut runner = Runner {
        session: Session::with_config(config),
        echo: args.echo,
        emit: args.emit,
        explain: args.explain,
        failed: false,
    };

    if let Some(path) = &args.file {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                std::process::exit(1);
            }
        };
        for line in source.lines() {
            runner.line(line);
        }
    } else if !args.lines.is_empty() {
        for line in &args.lines {
            runner.line(line);
        }
    } else if let Err(e) = repl(&mut runner) {
        eprintln!("Error reading input: {}", e);
        std::process::exit(1);
    }

    if runner.failed {
        std::process::exit(1);
    }
}
