//! Assembler and linker invocation for the emitted NASM file.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

/// Outcome of one external tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
  pub success: bool,
  pub stderr: String,
}

/// Programs used to turn assembly into an executable.
#[derive(Debug, Clone)]
pub struct Toolchain {
  pub nasm: String,
  pub ld: String,
}

impl Toolchain {
  /// `nasm -f elf32 <asm> -o <obj>`
  pub fn assemble(&self, asm: &Path, obj: &Path) -> Result<ToolOutput> {
    run(
      Command::new(&self.nasm)
        .arg("-f")
        .arg("elf32")
        .arg(asm)
        .arg("-o")
        .arg(obj),
    )
    .with_context(|| format!("running {}", self.nasm))
  }

  /// `ld -m elf_i386 -o <exe> <obj>`
  pub fn link(&self, obj: &Path, exe: &Path) -> Result<ToolOutput> {
    run(
      Command::new(&self.ld)
        .arg("-m")
        .arg("elf_i386")
        .arg("-o")
        .arg(exe)
        .arg(obj),
    )
    .with_context(|| format!("running {}", self.ld))
  }

  /// Assemble then link, stopping at the first failing step.
  pub fn build(&self, asm: &Path, obj: &Path, exe: &Path) -> Result<()> {
    let assembled = self.assemble(asm, obj)?;
    if !assembled.success {
      bail!("assembling {} failed:\n{}", asm.display(), assembled.stderr);
    }

    let linked = self.link(obj, exe)?;
    if !linked.success {
      bail!("linking {} failed:\n{}", obj.display(), linked.stderr);
    }
    Ok(())
  }
}

fn run(command: &mut Command) -> Result<ToolOutput> {
  debug!(?command, "spawning");
  let output = command.output()?;
  let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
  if !output.status.success() {
    warn!(status = %output.status, "tool exited with failure");
  }
  Ok(ToolOutput {
    success: output.status.success(),
    stderr,
  })
}
