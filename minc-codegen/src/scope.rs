//! Lexical scopes and stack frame offsets.

use crate::labels::LoopLabels;
use minc_source::{CompileError, CompileResult, ErrorKind, Position};
use std::collections::HashMap;

/// Size of a stack slot. Every local takes one 32-bit word.
pub const SLOT_SIZE: i32 = 4;

/// Offset of the first parameter from the frame pointer: past the saved frame pointer and the
/// return address.
pub const PARAM_BASE: i32 = 2 * SLOT_SIZE;

/// A local variable (or parameter) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Local {
    /// Offset relative to `%ebp`.
    pub offset: i32,
    /// Set once the declaration has executed in program order. Parameters are always declared.
    pub declared: bool,
}

#[derive(Debug, Default)]
struct Scope {
    locals: HashMap<String, Local>,
    /// Lowest offset allocated in this scope or any enclosing one.
    offset: i32,
    /// Bytes reserved on the stack by this scope's locals.
    reserved: i32,
    loop_labels: Option<LoopLabels>,
}

/// Stack of the scopes enclosing the code being generated. The first scope holds the current
/// function's parameters and is never popped by [`ScopeStack::exit_scope`].
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Resets the stack to a single root scope holding `params`. Parameter `i` lives at
    /// `PARAM_BASE + i * SLOT_SIZE`.
    pub fn enter_function(&mut self, params: &[String], pos: Position) -> CompileResult<()> {
        let mut root = Scope::default();
        for (i, param) in params.iter().enumerate() {
            let local = Local {
                offset: PARAM_BASE + i as i32 * SLOT_SIZE,
                declared: true,
            };
            if root.locals.insert(param.clone(), local).is_some() {
                return Err(CompileError::new(
                    ErrorKind::DuplicateDeclaration(param.clone()),
                    pos,
                ));
            }
        }
        self.scopes = vec![root];
        Ok(())
    }

    /// Pushes a child scope. Its locals are allocated below every slot of the enclosing scopes.
    pub fn enter_scope(&mut self, loop_labels: Option<LoopLabels>) {
        let offset = self.current().offset;
        self.scopes.push(Scope {
            offset,
            loop_labels,
            ..Scope::default()
        });
    }

    /// Pops the current scope and returns the number of bytes its locals reserved.
    pub fn exit_scope(&mut self) -> i32 {
        if self.scopes.len() > 1 {
            self.scopes.pop().map_or(0, |scope| scope.reserved)
        } else {
            0
        }
    }

    /// Number of bytes reserved by the current scope so far.
    pub fn reserved(&self) -> i32 {
        self.current().reserved
    }

    /// Allocates a slot for `ident` in the current scope. The local cannot be used until
    /// [`ScopeStack::declare`] marks it declared.
    pub fn register(&mut self, ident: &str, pos: Position) -> CompileResult<i32> {
        let scope = self.current_mut();
        if scope.locals.contains_key(ident) {
            return Err(CompileError::new(
                ErrorKind::DuplicateDeclaration(ident.to_string()),
                pos,
            ));
        }
        scope.offset -= SLOT_SIZE;
        scope.reserved += SLOT_SIZE;
        let offset = scope.offset;
        scope.locals.insert(
            ident.to_string(),
            Local {
                offset,
                declared: false,
            },
        );
        Ok(offset)
    }

    /// Marks a local of the current scope as declared and returns its offset.
    pub fn declare(&mut self, ident: &str, pos: Position) -> CompileResult<i32> {
        match self.current_mut().locals.get_mut(ident) {
            Some(local) => {
                local.declared = true;
                Ok(local.offset)
            }
            None => Err(CompileError::new(
                ErrorKind::UndefinedName(ident.to_string()),
                pos,
            )),
        }
    }

    /// Returns the offset of the innermost `ident` visible from the current scope.
    pub fn resolve(&self, ident: &str, pos: Position) -> CompileResult<i32> {
        let local = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.locals.get(ident))
            .ok_or_else(|| CompileError::new(ErrorKind::UndefinedName(ident.to_string()), pos))?;
        if !local.declared {
            return Err(CompileError::new(
                ErrorKind::UseBeforeDeclaration(ident.to_string()),
                pos,
            ));
        }
        Ok(local.offset)
    }

    /// Returns the labels of the innermost enclosing loop, together with the bytes reserved by the
    /// scopes nested inside that loop's scope, which must be released before jumping out of them.
    pub fn loop_target(&self) -> Option<(&LoopLabels, i32)> {
        let mut unwind = 0;
        for scope in self.scopes.iter().rev() {
            if let Some(labels) = &scope.loop_labels {
                return Some((labels, unwind));
            }
            unwind += scope.reserved;
        }
        None
    }

    fn current(&self) -> &Scope {
        &self.scopes[self.scopes.len() - 1]
    }

    fn current_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::default()
    }

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn loop_labels(name: &str) -> LoopLabels {
        LoopLabels {
            break_label: format!("{}_break", name),
            continue_label: format!("{}_continue", name),
        }
    }

    #[test]
    fn test_param_offsets() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function(&params(&["a", "b", "c"]), pos()).unwrap();
        assert_eq!(scopes.resolve("a", pos()), Ok(8));
        assert_eq!(scopes.resolve("b", pos()), Ok(12));
        assert_eq!(scopes.resolve("c", pos()), Ok(16));
        assert_eq!(
            scopes.enter_function(&params(&["a", "a"]), pos()).unwrap_err().kind,
            ErrorKind::DuplicateDeclaration("a".to_string())
        );
    }

    #[test]
    fn test_offsets_decrease_with_nesting() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function(&[], pos()).unwrap();
        scopes.enter_scope(None);
        assert_eq!(scopes.register("a", pos()), Ok(-4));
        assert_eq!(scopes.register("b", pos()), Ok(-8));
        assert_eq!(scopes.reserved(), 8);

        scopes.enter_scope(None);
        assert_eq!(scopes.register("c", pos()), Ok(-12));
        assert_eq!(scopes.exit_scope(), 4);

        // a sibling scope starts from the same place
        scopes.enter_scope(None);
        assert_eq!(scopes.register("d", pos()), Ok(-12));
        assert_eq!(scopes.exit_scope(), 4);

        assert_eq!(scopes.exit_scope(), 8);
        // the root scope stays
        assert_eq!(scopes.exit_scope(), 0);
    }

    #[test]
    fn test_duplicate_declaration() {
        let mut scopes = ScopeStack::new();
        scopes.enter_scope(None);
        scopes.register("a", pos()).unwrap();
        assert_eq!(
            scopes.register("a", pos()).unwrap_err().kind,
            ErrorKind::DuplicateDeclaration("a".to_string())
        );
    }

    #[test]
    fn test_use_before_declaration() {
        let mut scopes = ScopeStack::new();
        scopes.enter_scope(None);
        scopes.register("a", pos()).unwrap();
        assert_eq!(
            scopes.resolve("a", pos()).unwrap_err().kind,
            ErrorKind::UseBeforeDeclaration("a".to_string())
        );
        assert_eq!(scopes.declare("a", pos()), Ok(-4));
        assert_eq!(scopes.resolve("a", pos()), Ok(-4));
        assert_eq!(
            scopes.resolve("b", pos()).unwrap_err().kind,
            ErrorKind::UndefinedName("b".to_string())
        );
    }

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut scopes = ScopeStack::new();
        scopes.enter_function(&params(&["a"]), pos()).unwrap();
        scopes.enter_scope(None);
        scopes.register("a", pos()).unwrap();
        scopes.declare("a", pos()).unwrap();
        scopes.enter_scope(None);
        scopes.register("a", pos()).unwrap();
        scopes.declare("a", pos()).unwrap();
        assert_eq!(scopes.resolve("a", pos()), Ok(-8));
        scopes.exit_scope();
        assert_eq!(scopes.resolve("a", pos()), Ok(-4));
        scopes.exit_scope();
        assert_eq!(scopes.resolve("a", pos()), Ok(8));
    }

    #[test]
    fn test_loop_target() {
        let mut scopes = ScopeStack::new();
        assert_eq!(scopes.loop_target(), None);

        scopes.enter_scope(Some(loop_labels("outer")));
        scopes.register("i", pos()).unwrap();
        scopes.enter_scope(None);
        scopes.register("x", pos()).unwrap();
        scopes.register("y", pos()).unwrap();
        let (labels, unwind) = scopes.loop_target().unwrap();
        assert_eq!(labels, &loop_labels("outer"));
        assert_eq!(unwind, 8);

        scopes.enter_scope(Some(loop_labels("inner")));
        let (labels, unwind) = scopes.loop_target().unwrap();
        assert_eq!(labels, &loop_labels("inner"));
        assert_eq!(unwind, 0);
    }
}
