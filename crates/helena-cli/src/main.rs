//! The `helena` binary: script runner and line REPL.

use std::{
    env, fs,
    io::{self, BufRead, Write},
    process::ExitCode,
    rc::Rc,
    time::Instant,
};

use helena::{
    tracer::StderrTracer, HelenaError, Outcome, ParseError, Scope, Value,
};

fn main() -> ExitCode {
    let mut trace = false;
    let mut file: Option<String> = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--trace" => trace = true,
            "--help" | "-h" => {
                eprintln!("usage: helena [--trace] [script]");
                return ExitCode::SUCCESS;
            }
            _ => file = Some(arg),
        }
    }
    match file {
        Some(path) => run_file(&path, trace),
        None => repl(trace),
    }
}

fn run_file(path: &str, trace: bool) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let scope = Scope::new_root();
    let start = Instant::now();
    let result = run_source(&scope, &source, trace);
    let elapsed = start.elapsed();
    match result {
        Ok(Outcome::Ok(value)) => {
            if !matches!(value, Value::Nil) {
                println!("{value}");
            }
            eprintln!("completed in {elapsed:?}");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Error(error)) => {
            eprintln!("{}", error.report());
            ExitCode::FAILURE
        }
        Ok(other) => {
            eprintln!("script finished with {:?}", other.code());
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_source(scope: &Scope, source: &str, trace: bool) -> Result<Outcome, HelenaError> {
    let script = helena::parse(source)?;
    let program = scope.compile(&script, Some(Rc::from(source)))?;
    let mut process = scope.prepare_process(program);
    if trace {
        process.set_tracer(Box::new(StderrTracer));
    }
    Ok(process.run())
}

/// Line REPL over a persistent root scope. Lines with unterminated
/// delimiters accumulate until they parse.
fn repl(trace: bool) -> ExitCode {
    let scope = Scope::new_root();
    let stdin = io::stdin();
    let mut buffer = String::new();
    prompt(buffer.is_empty());
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        if buffer.is_empty() && line.trim() == "exit" {
            break;
        }
        buffer.push_str(&line);
        buffer.push('\n');
        match run_source(&scope, &buffer, trace) {
            Err(HelenaError::Parse(err)) if is_unterminated(&err) => {
                // Keep accumulating input.
                prompt(false);
                continue;
            }
            Err(err) => eprintln!("error: {err}"),
            Ok(Outcome::Ok(value)) => {
                if !matches!(value, Value::Nil) {
                    println!("{value}");
                }
            }
            Ok(Outcome::Error(error)) => eprintln!("{}", error.report()),
            Ok(Outcome::Yield(value)) => {
                eprintln!("yielded {value}; suspended processes are discarded in the REPL");
            }
            Ok(other) => eprintln!("{:?}", other.code()),
        }
        buffer.clear();
        prompt(true);
    }
    ExitCode::SUCCESS
}

fn is_unterminated(err: &ParseError) -> bool {
    matches!(
        err,
        ParseError::UnterminatedBlock(_)
            | ParseError::UnterminatedTuple(_)
            | ParseError::UnterminatedExpression(_)
            | ParseError::UnterminatedString(_)
            | ParseError::UnterminatedComment(_)
    )
}

fn prompt(fresh: bool) {
    print!("{}", if fresh { "> " } else { "… " });
    let _ = io::stdout().flush();
}
