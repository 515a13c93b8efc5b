//! Lowers the AST into 32-bit x86 [`Assembly`].

pub mod codegen;
pub mod functions;
pub mod labels;
pub mod scope;

pub use codegen::Codegen;

use minc_asm::Assembly;
use minc_parser::ast::Program;
use minc_source::CompileResult;

/// Options controlling the emitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Prepended to every function name to form its symbol.
    pub symbol_prefix: String,
}

impl CodegenOptions {
    /// Options for ELF toolchains, where C symbols are not decorated.
    pub fn elf() -> Self {
        Self {
            symbol_prefix: String::new(),
        }
    }
}

impl Default for CodegenOptions {
    /// Symbols carry a single leading underscore, like C symbols on Windows and Mach-O targets.
    fn default() -> Self {
        Self {
            symbol_prefix: "_".to_string(),
        }
    }
}

/// Generates the assembly for a whole program.
pub fn generate(program: &Program, options: CodegenOptions) -> CompileResult<Assembly> {
    let mut codegen = Codegen::new(options);
    codegen.codegen_program(program)?;
    Ok(codegen.into_inner_assembly())
}
