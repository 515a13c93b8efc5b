//! A small interpreter for generated [`minc_asm::Assembly`], so programs can be run without an
//! assembler or a 32-bit toolchain.

pub mod vm;

pub use vm::{RuntimeError, Vm};
