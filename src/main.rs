use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::filter::EnvFilter;

use avm1_core::{Avm1Error, Context, ContextConfig, Value, coerce, number_ops};

#[derive(Parser)]
#[command(name = "avm1", version, about = "Evaluate AVM1 value coercions")]
struct Cli {
    /// File with one command per line
    file: Option<PathBuf>,

    /// Evaluate a single command, e.g. `to-string 0.1`
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// SWF version of the simulated movie
    #[arg(long = "swf-version", default_value_t = 10)]
    swf_version: u8,

    /// Seed for Math.random
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug)]
enum CommandError {
    UnknownOp(String),
    BadLiteral(String),
    Runtime(Avm1Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::UnknownOp(op) => {
                write!(f, "unknown operation `{op}` (expected to-string, to-number, to-int32, to-boolean or normalize)")
            }
            CommandError::BadLiteral(msg) => write!(f, "bad literal: {msg}"),
            CommandError::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl From<Avm1Error> for CommandError {
    fn from(e: Avm1Error) -> Self {
        CommandError::Runtime(e)
    }
}

/// Literal syntax: `undefined`, `null`, `true`, `false`, numbers,
/// `"quoted strings"`, `[a, b, ...]` arrays; any other word is a string.
struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn parse_all(mut self, cx: &mut Context) -> Result<Value, CommandError> {
        let value = self.parse_value(cx)?;
        self.skip_ws();
        if !self.rest().is_empty() {
            return Err(CommandError::BadLiteral(format!("trailing input `{}`", self.rest())));
        }
        Ok(value)
    }

    fn parse_value(&mut self, cx: &mut Context) -> Result<Value, CommandError> {
        self.skip_ws();
        match self.rest().chars().next() {
            None => Err(CommandError::BadLiteral("missing value".into())),
            Some('[') => {
                self.pos += 1;
                let mut elements = Vec::new();
                self.skip_ws();
                if self.rest().starts_with(']') {
                    self.pos += 1;
                    return Ok(Value::Object(cx.create_array(elements)));
                }
                loop {
                    elements.push(self.parse_value(cx)?);
                    self.skip_ws();
                    match self.rest().chars().next() {
                        Some(',') => self.pos += 1,
                        Some(']') => {
                            self.pos += 1;
                            return Ok(Value::Object(cx.create_array(elements)));
                        }
                        _ => return Err(CommandError::BadLiteral("unterminated array".into())),
                    }
                }
            }
            Some('"') => {
                let body = &self.rest()[1..];
                let Some(end) = body.find('"') else {
                    return Err(CommandError::BadLiteral("unterminated string".into()));
                };
                self.pos += end + 2;
                Ok(Value::string(&body[..end]))
            }
            Some(_) => {
                let rest = self.rest();
                let len = rest.find([',', ']']).unwrap_or(rest.len());
                let word = rest[..len].trim_end();
                self.pos += len;
                Ok(word_value(cx, word)?)
            }
        }
    }
}

fn word_value(cx: &mut Context, word: &str) -> Result<Value, Avm1Error> {
    Ok(match word {
        "undefined" => Value::Undefined,
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "NaN" => Value::Number(f64::NAN),
        _ => {
            let as_string = Value::string(word);
            let n = coerce::to_number(cx, &as_string)?;
            if n.is_nan() { as_string } else { Value::Number(n) }
        }
    })
}

fn run_command(cx: &mut Context, line: &str) -> Result<String, CommandError> {
    let line = line.trim();
    let (op, literal) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let value = LiteralParser::new(literal).parse_all(cx)?;
    tracing::debug!(op, ?value, "evaluating");
    Ok(match op {
        "to-string" => format!("{:?}", coerce::to_string(cx, &value)?.as_ref()),
        "to-number" => number_ops::to_string(coerce::to_number(cx, &value)?),
        "to-int32" => coerce::to_int32(cx, &value)?.to_string(),
        "to-boolean" => coerce::to_boolean(&value).to_string(),
        "normalize" => {
            let key = cx.normalize_key(&value)?;
            format!("{:?}", key.as_ref())
        }
        other => return Err(CommandError::UnknownOp(other.to_string())),
    })
}

fn execute_lines<'a>(cx: &mut Context, lines: impl Iterator<Item = &'a str>) -> ExitCode {
    let mut status = ExitCode::SUCCESS;
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match run_command(cx, trimmed) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Error: {e}");
                status = ExitCode::from(1);
            }
        }
    }
    status
}

fn run_file(cx: &mut Context, path: &Path) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            return ExitCode::from(1);
        }
    };
    execute_lines(cx, source.lines())
}

fn run_repl(cx: &mut Context) -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("avm1 v{} (swf version {})", env!("CARGO_PKG_VERSION"), cx.swf_version());
    println!("Type `<op> <literal>`, e.g. `to-string [1, 0.1]`. Press Ctrl-D to exit.");

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match run_command(cx, trimmed) {
                    Ok(out) => println!("{out}"),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            Err(e) => {
                eprintln!("Read error: {e}");
                return ExitCode::from(1);
            }
        }
    }

    println!();
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let cli = Cli::parse();
    let mut config = ContextConfig::default().with_swf_version(cli.swf_version);
    if let Some(seed) = cli.seed {
        config = config.with_random_seed(seed);
    }
    let mut cx = Context::new(config);

    if let Some(code) = &cli.eval {
        return execute_lines(&mut cx, std::iter::once(code.as_str()));
    }

    if let Some(path) = &cli.file {
        return run_file(&mut cx, path);
    }

    run_repl(&mut cx)
}
