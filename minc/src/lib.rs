//! Compiles a small subset of C into 32-bit x86 assembly (AT&T syntax).
//!
//! ```
//! let asm = minc::compile("int main() { return 2; }", &minc::CodegenOptions::elf()).unwrap();
//! assert!(asm.contains("main:"));
//! ```

pub use minc_codegen::CodegenOptions;

use minc_asm::Assembly;
use minc_source::{Diagnostic, Source};
use minc_vm::Vm;

/// Parses `source` and generates its [`Assembly`]. The first error is returned together with
/// the source context around it.
pub fn compile_assembly(source: &str, options: &CodegenOptions) -> Result<Assembly, Diagnostic> {
    let source = Source::new(source);
    let program = minc_parser::parse(&source)?;
    minc_codegen::generate(&program, options.clone()).map_err(|err| source.diagnose(err))
}

/// Compiles `source` into assembler text.
pub fn compile(source: &str, options: &CodegenOptions) -> Result<String, Diagnostic> {
    compile_assembly(source, options).map(|asm| asm.to_string())
}

/// Runs the `main` function of an assembled program on the reference machine.
pub fn run_assembly(asm: &Assembly, options: &CodegenOptions) -> anyhow::Result<i32> {
    let entry = format!("{}main", options.symbol_prefix);
    Ok(Vm::new(asm).run(&entry)?)
}

/// Compiles `source` and returns the value its `main` returns.
pub fn run(source: &str) -> anyhow::Result<i32> {
    let options = CodegenOptions::default();
    let asm = compile_assembly(source, &options)?;
    run_assembly(&asm, &options)
}
