mod toolchain;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{Level, debug, info};

use crate::toolchain::Toolchain;

#[derive(Parser, Debug)]
#[command(version, about = "Compile a source file to a 32-bit Linux executable", long_about = None)]
struct Cli {
  /// Source file to compile.
  input: PathBuf,

  /// Executable path; defaults to the input path without its extension.
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Stop after writing the assembly file.
  #[arg(short = 'S', long)]
  asm_only: bool,

  /// Log every pipeline stage.
  #[arg(short, long)]
  verbose: bool,

  /// Assembler program.
  #[arg(long, env = "NEXC_NASM", default_value = "nasm")]
  nasm: String,

  /// Linker program.
  #[arg(long, env = "NEXC_LD", default_value = "ld")]
  ld: String,
}

fn main() {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_target(false)
    .with_max_level(if cli.verbose {
      Level::DEBUG
    } else {
      Level::WARN
    })
    .with_writer(std::io::stderr)
    .init();

  if let Err(err) = run(&cli) {
    eprintln!("error: {err:#}");
    process::exit(1);
  }
}

fn run(cli: &Cli) -> Result<()> {
  let source = fs::read_to_string(&cli.input)
    .with_context(|| format!("reading {}", cli.input.display()))?;
  debug!(path = %cli.input.display(), bytes = source.len(), "loaded source");

  let asm = nexc::compile(&source).map_err(|err| anyhow!(diagnostic(&source, &err)))?;

  let exe = match &cli.output {
    Some(path) => path.clone(),
    None if cli.input.extension().is_some() => cli.input.with_extension(""),
    None => cli.input.with_extension("out"),
  };
  let asm_path = exe.with_extension("asm");
  write_assembly(&asm_path, &asm)?;
  info!(path = %asm_path.display(), "wrote assembly");

  if cli.asm_only {
    return Ok(());
  }

  let toolchain = Toolchain {
    nasm: cli.nasm.clone(),
    ld: cli.ld.clone(),
  };
  let obj_path = exe.with_extension("o");
  toolchain.build(&asm_path, &obj_path, &exe)?;
  info!(path = %exe.display(), "built executable");
  Ok(())
}

fn write_assembly(path: &Path, asm: &str) -> Result<()> {
  let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
  let mut writer = BufWriter::new(file);
  writer
    .write_all(asm.as_bytes())
    .and_then(|()| writer.flush())
    .with_context(|| format!("writing {}", path.display()))
}

/// Error message followed by the offending source line and a caret under
/// the reported column.
fn diagnostic(source: &str, err: &nexc::Error) -> String {
  let Some((line, col)) = err.position() else {
    return err.to_string();
  };
  let Some(text) = line.checked_sub(1).and_then(|i| source.lines().nth(i)) else {
    return err.to_string();
  };
  let pad = " ".repeat(col.saturating_sub(1));
  format!("{err}\n  {text}\n  {pad}^")
}
