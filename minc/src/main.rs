use anyhow::{anyhow, bail, Context, Result};
use console::style;
use minc::CodegenOptions;
use minc_source::Source;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

const USAGE: &str = "usage: minc [--prefix <prefix>] [--run] [--verbose] <file.c>...";

struct Args {
    options: CodegenOptions,
    run: bool,
    verbose: bool,
    inputs: Vec<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        options: CodegenOptions::default(),
        run: false,
        verbose: false,
        inputs: Vec::new(),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--prefix" | "-p" => {
                parsed.options.symbol_prefix = args
                    .next()
                    .ok_or_else(|| anyhow!("missing symbol prefix after {}", arg))?;
            }
            "--run" | "-r" => parsed.run = true,
            "--verbose" | "-v" => parsed.verbose = true,
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            _ if arg.starts_with('-') => bail!("unknown flag {}\n{}", arg, USAGE),
            _ => parsed.inputs.push(PathBuf::from(arg)),
        }
    }

    if parsed.inputs.is_empty() {
        bail!("no input files\n{}", USAGE);
    }
    Ok(parsed)
}

/// Compiles `path` into a `.s` file next to it.
fn compile_file(path: &Path, args: &Args) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let source = Source::new(&text);

    let program = minc_parser::parse(&source)?;
    if args.verbose {
        eprintln!("{}", style("== ast ==").bold());
        eprintln!("{}", program);
    }

    let asm = minc_codegen::generate(&program, args.options.clone())
        .map_err(|err| source.diagnose(err))?;
    if args.verbose {
        eprintln!("{}", asm.listing(&path.display().to_string()));
    }

    let output = path.with_extension("s");
    fs::write(&output, asm.to_string())
        .with_context(|| format!("writing {}", output.display()))?;
    eprintln!(
        "{} {} -> {}",
        style("compiled").green().bold(),
        path.display(),
        output.display()
    );

    if args.run {
        let value = minc::run_assembly(&asm, &args.options)?;
        println!("{}", value);
    }
    Ok(())
}

fn main() {
    let result = parse_args().and_then(|args| {
        args.inputs
            .iter()
            .try_for_each(|path| compile_file(path, &args).with_context(|| path.display().to_string()))
    });

    if let Err(err) = result {
        eprintln!("{} {:#}", style("error:").red().bold(), err);
        process::exit(1);
    }
}
