//! Styled [`Assembly`] listing, for dumping generated code to a terminal.

use crate::{Assembly, Line};
use console::style;
use std::fmt;

/// Display adapter returned by [`Assembly::listing`].
pub struct Listing<'a> {
    asm: &'a Assembly,
    name: &'a str,
}

impl Assembly {
    /// Renders the listing with line indices and highlighted labels.
    pub fn listing<'a>(&'a self, name: &'a str) -> Listing<'a> {
        Listing { asm: self, name }
    }
}

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.name)?;

        for (index, line) in self.asm.lines.iter().enumerate() {
            write!(f, "{:04} ", style(index).black().bright())?;
            match line {
                Line::Label(_) => writeln!(f, "{}", style(line).cyan())?,
                Line::Text | Line::Globl(_) => writeln!(f, "{}", style(line).color256(29))?, // dark green
                Line::Instr(_) => writeln!(f, "{}", line)?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Assembly, Instr};

    #[test]
    fn test_listing_has_every_line() {
        let mut asm = Assembly::new();
        asm.label("_f");
        asm.emit(Instr::Ret);
        let listing = asm.listing("f").to_string();
        assert!(listing.starts_with("== f =="));
        assert!(listing.contains("_f:"));
        assert!(listing.contains("ret"));
        assert_eq!(listing.lines().count(), 3);
    }
}
