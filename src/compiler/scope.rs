//! Lexical scope management for code generation.
//!
//! This module provides the `ScopeStack` the generator pushes a `BlockScope`
//! onto when it enters a function body or nested block. It handles:
//! - Overload sets: every scope maps a name to the callables declared in it
//! - Value bindings (function parameters) with innermost-first shadowing
//! - Candidate collection for calls across all enclosing scopes
//!
//! Scope ids are handed out in push order so the generator can check that it
//! pops exactly the scope it pushed.

use std::{collections::HashMap, fmt::Display, fmt::Write};

use inkwell::{
    basic_block::BasicBlock,
    types::FunctionType,
    values::{AnyValueEnum, PointerValue},
};
use tracing::debug;

use crate::ast::{ast::FunctionId, types::Signature, types::Type};

/// Opaque handle for a pushed scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One callable visible under a name.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSymbolTarget<'ctx> {
    /// AST signature at registration time
    pub signature: Signature,
    /// LLVM function type
    pub function_type: FunctionType<'ctx>,
    /// Function or function pointer to call
    pub value: AnyValueEnum<'ctx>,
    /// Definition in the function arena, if the callable has a body
    pub definition: Option<FunctionId>,
    /// Scope the target was registered in
    pub owning_scope: ScopeId,
}

/// A named value such as a function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTarget<'ctx> {
    /// Stack slot holding the value
    pub slot: PointerValue<'ctx>,
    pub type_: Type,
}

#[derive(Debug)]
pub struct BlockScope<'ctx> {
    id: ScopeId,
    block: Option<BasicBlock<'ctx>>,
    functions: HashMap<String, Vec<FunctionSymbolTarget<'ctx>>>,
    values: HashMap<String, SymbolTarget<'ctx>>,
}

impl<'ctx> BlockScope<'ctx> {
    fn new(id: ScopeId, block: Option<BasicBlock<'ctx>>) -> Self {
        BlockScope {
            id,
            block,
            functions: HashMap::new(),
            values: HashMap::new(),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// The basic block this scope generates into, if any.
    pub fn block(&self) -> Option<BasicBlock<'ctx>> {
        self.block
    }

    pub fn lookup_function_symbol_targets(
        &self,
        name: &str,
    ) -> Option<&Vec<FunctionSymbolTarget<'ctx>>> {
        self.functions.get(name)
    }

    pub fn lookup_value(&self, name: &str) -> Option<&SymbolTarget<'ctx>> {
        self.values.get(name)
    }

    fn set_function_symbol_target(
        &mut self,
        name: &str,
        signature: Signature,
        function_type: FunctionType<'ctx>,
        value: AnyValueEnum<'ctx>,
        definition: Option<FunctionId>,
    ) -> bool {
        let targets = self.functions.entry(name.to_string()).or_default();

        if targets
            .iter()
            .any(|target| target.function_type == function_type && target.signature == signature)
        {
            debug!(function = name, %signature, scope = %self.id, "duplicate function signature");
            return false;
        }

        targets.push(FunctionSymbolTarget {
            signature,
            function_type,
            value,
            definition,
            owning_scope: self.id,
        });

        true
    }
}

/// Stack of live scopes, innermost last.
#[derive(Debug, Default)]
pub struct ScopeStack<'ctx> {
    scopes: Vec<BlockScope<'ctx>>,
    next_id: u32,
}

impl<'ctx> ScopeStack<'ctx> {
    pub fn new() -> Self {
        ScopeStack::default()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn current(&self) -> Option<&BlockScope<'ctx>> {
        self.scopes.last()
    }

    pub fn push_scope(&mut self, block: Option<BasicBlock<'ctx>>) -> ScopeId {
        let id = ScopeId(self.next_id);
        self.next_id += 1;
        self.scopes.push(BlockScope::new(id, block));
        id
    }

    /// Removes the innermost scope.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty; that is a traversal bug, not bad input.
    pub fn pop_scope(&mut self) -> BlockScope<'ctx> {
        self.scopes
            .pop()
            .unwrap_or_else(|| panic!("Attempted to pop an empty scope stack"))
    }

    /// Pops the innermost scope, which must be `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty or scopes are popped out of order.
    pub fn pop_expected(&mut self, expected: ScopeId) -> BlockScope<'ctx> {
        let scope = self.pop_scope();
        assert_eq!(scope.id, expected, "Scopes popped out of order");
        scope
    }

    fn live_scope_mut(&mut self, scope: ScopeId) -> &mut BlockScope<'ctx> {
        self.scopes
            .iter_mut()
            .find(|live| live.id == scope)
            .unwrap_or_else(|| panic!("Scope {} is not on the stack", scope))
    }

    /// Adds a callable to `name`'s overload set in `scope`.
    ///
    /// Returns `false`, leaving the scope untouched, when `name` already has
    /// a target with the same signature and function type in that scope.
    ///
    /// # Panics
    ///
    /// Panics if `scope` has been popped.
    pub fn register_callable(
        &mut self,
        scope: ScopeId,
        name: &str,
        signature: Signature,
        function_type: FunctionType<'ctx>,
        value: AnyValueEnum<'ctx>,
        definition: Option<FunctionId>,
    ) -> bool {
        self.live_scope_mut(scope).set_function_symbol_target(
            name,
            signature,
            function_type,
            value,
            definition,
        )
    }

    /// Binds a value name in `scope`, replacing an earlier binding there.
    ///
    /// # Panics
    ///
    /// Panics if `scope` has been popped.
    pub fn bind_value(&mut self, scope: ScopeId, name: &str, slot: PointerValue<'ctx>, type_: Type) {
        self.live_scope_mut(scope)
            .values
            .insert(name.to_string(), SymbolTarget { slot, type_ });
    }

    /// Collects every callable named `name`, innermost scope first and in
    /// declaration order within a scope.
    ///
    /// Inner declarations do not hide outer ones here; overload selection
    /// decides between them.
    pub fn resolve_callable(&self, name: &str) -> Vec<FunctionSymbolTarget<'ctx>> {
        let mut found = vec![];

        for scope in self.scopes.iter().rev() {
            if let Some(targets) = scope.lookup_function_symbol_targets(name) {
                found.extend(targets.iter().cloned());
            }
        }

        found
    }

    /// Finds the innermost value bound to `name`.
    pub fn lookup_value(&self, name: &str) -> Option<&SymbolTarget<'ctx>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.lookup_value(name))
    }

    /// Distance of `scope` from the top of the stack (0 = innermost).
    pub fn proximity(&self, scope: ScopeId) -> Option<usize> {
        self.scopes.iter().rev().position(|live| live.id == scope)
    }

    /// Renders every live scope's symbols, outermost first, as nested braces.
    pub fn dump(&self) -> String {
        let mut out = String::new();

        for (level, scope) in self.scopes.iter().enumerate() {
            let indent = "  ".repeat(level);
            let _ = writeln!(out, "{}{{", indent);

            let mut values = scope.values.iter().collect::<Vec<_>>();
            values.sort_by(|a, b| a.0.cmp(b.0));
            for (name, target) in values {
                let _ = writeln!(out, "{}  {}: {}", indent, name, target.type_);
            }

            let mut functions = scope.functions.iter().collect::<Vec<_>>();
            functions.sort_by(|a, b| a.0.cmp(b.0));
            for (name, targets) in functions {
                for target in targets {
                    let _ = writeln!(out, "{}  {}: {}", indent, name, target.signature);
                }
            }
        }

        for level in (0..self.scopes.len()).rev() {
            let _ = writeln!(out, "{}}}", "  ".repeat(level));
        }

        out
    }
}
