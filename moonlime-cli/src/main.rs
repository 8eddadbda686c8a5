use clap::Parser;
use moonlime::emit::{Codegen, HEADER_TEMPLATE, LEXER_TEMPLATE};
use moonlime::nfa::Nfa;
use moonlime::parser::{self, ParseError};
use moonlime::spec::LexerSpec;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

/// Compiles a lexer specification into a C scanner with embedded DFA
/// tables.
#[derive(Debug, Parser)]
#[command(name = "moonlime", version)]
struct MoonlimeArgs {
    /// The lexer specification to compile
    input: PathBuf,

    /// Path of the generated implementation file
    #[arg(short = 'o', value_name = "FILE", default_value = "yylex.c")]
    output: PathBuf,

    /// Also generate a header file; without a value the path is derived
    /// from the output file
    #[arg(short = 'i', value_name = "FILE", num_args = 0..=1)]
    header: Option<Option<PathBuf>>,

    /// Print the parsed rules and the constructed automata to stderr
    #[arg(short = 'v')]
    verbose: bool,
}

#[derive(Debug, Error)]
enum Error {
    #[error("couldn't open file '{0}': {1}")]
    Read(PathBuf, io::Error),
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("can't write {0}: {1}")]
    Write(PathBuf, io::Error),
}

fn main() -> ExitCode {
    let args = MoonlimeArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("moonlime: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &MoonlimeArgs) -> Result<(), Error> {
    let source =
        fs::read(&args.input).map_err(|e| Error::Read(args.input.clone(), e))?;
    let spec = parser::parse(&source)?;

    if args.verbose {
        dump_spec(&spec);
    }

    let nfa = Nfa::from_spec(&spec);
    if args.verbose {
        eprintln!("--- total NFA:\n{nfa}");
    }

    let dfa = nfa.to_dfa();
    if args.verbose {
        eprintln!("--- total DFA:\n{dfa}");
    }

    let codegen = Codegen::new(&spec, &dfa);
    write_output(&codegen, LEXER_TEMPLATE, &args.output)?;

    if let Some(header) = &args.header {
        let path = match header {
            Some(path) => path.clone(),
            None => derive_header_path(&args.output),
        };
        write_output(&codegen, HEADER_TEMPLATE, &path)?;
    }

    Ok(())
}

fn dump_spec(spec: &LexerSpec) {
    for rule in &spec.rules {
        eprint!("Pattern {}", rule.index);
        if !rule.selectors.is_empty() {
            eprint!(" <{}>", rule.selectors.join(","));
        }
        eprintln!(":\n{}", rule.regex);
        eprintln!("Code: {{{}}}", String::from_utf8_lossy(&rule.code));
    }
    eprintln!(
        "Start states: {} (initial {})",
        spec.start_states.join(", "),
        spec.initial_state()
    );
}

/// The header path for `-i` without a value: the output path with a `.c`
/// suffix turned into `.h`, or `yylex.h` when that doesn't apply.
fn derive_header_path(output: &Path) -> PathBuf {
    match output.extension() {
        Some(ext) if ext == "c" => output.with_extension("h"),
        _ => PathBuf::from("yylex.h"),
    }
}

fn write_output(codegen: &Codegen, template: &str, path: &Path) -> Result<(), Error> {
    let wrap = |e| Error::Write(path.to_path_buf(), e);
    let file = File::create(path).map_err(wrap)?;
    let mut out = BufWriter::new(file);
    codegen.expand(template, &mut out).map_err(wrap)?;
    out.flush().map_err(wrap)
}
