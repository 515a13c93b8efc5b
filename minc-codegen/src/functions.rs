//! Function prototypes and definitions seen so far.

use minc_parser::ast::FuncDec;
use minc_source::{CompileError, CompileResult, ErrorKind, Position};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    /// Number of arguments that the function accepts.
    pub arity: usize,
    /// Whether a definition (declaration with a body) has been registered.
    pub defined: bool,
    /// Whether the most recent declaration was a prototype.
    last_was_prototype: bool,
}

/// Records every function declaration in file order and validates calls against it.
#[derive(Debug, Default)]
pub struct FunctionTable {
    entries: HashMap<String, FunctionEntry>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn get(&self, ident: &str) -> Option<&FunctionEntry> {
        self.entries.get(ident)
    }

    /// Registers a prototype or definition.
    ///
    /// Every declaration of a name must agree on the parameter count. A name can be defined once, and
    /// two prototypes of it need a definition in between.
    pub fn register(&mut self, func: &FuncDec) -> CompileResult<()> {
        let arity = func.params.len();
        let is_prototype = func.is_prototype();
        let error = |kind| Err(CompileError::new(kind, func.pos));

        let entry = match self.entries.get_mut(&func.ident) {
            Some(entry) => entry,
            None => {
                self.entries.insert(
                    func.ident.clone(),
                    FunctionEntry {
                        arity,
                        defined: !is_prototype,
                        last_was_prototype: is_prototype,
                    },
                );
                return Ok(());
            }
        };

        if entry.arity != arity {
            return error(ErrorKind::ArityMismatch {
                name: func.ident.clone(),
                expected: entry.arity,
                found: arity,
            });
        }
        if is_prototype {
            if entry.last_was_prototype {
                return error(ErrorKind::DuplicateFunctionPrototype(func.ident.clone()));
            }
            entry.last_was_prototype = true;
        } else {
            if entry.defined {
                return error(ErrorKind::DuplicateFunctionDefinition(func.ident.clone()));
            }
            entry.defined = true;
            entry.last_was_prototype = false;
        }
        Ok(())
    }

    /// Checks that `ident` has been declared with `argc` parameters.
    pub fn resolve_call(&self, ident: &str, argc: usize, pos: Position) -> CompileResult<()> {
        let entry = self.entries.get(ident).ok_or_else(|| {
            CompileError::new(ErrorKind::UnknownFunction(ident.to_string()), pos)
        })?;
        if entry.arity != argc {
            return Err(CompileError::new(
                ErrorKind::ArityMismatch {
                    name: ident.to_string(),
                    expected: entry.arity,
                    found: argc,
                },
                pos,
            ));
        }
        Ok(())
    }
}
