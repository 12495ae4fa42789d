use anyhow::{Context, Result};
use std::path::Path;
use vm::{disasm, Image};

pub fn disassemble_to_string(path: &Path) -> Result<String> {
    let image = Image::load(path)
        .with_context(|| format!("Failed to load image {}", path.display()))?;
    Ok(disasm::render(&image))
}

pub fn disassemble_file(path: &Path) -> Result<()> {
    let listing = disassemble_to_string(path)?;
    println!("== Disassembly of {} ==", path.display());
    print!("{}", listing);
    Ok(())
}
