//! Scope Stack & Symbol Tables (§3 "Scope & Symbol", §2 component table).
//!
//! A walker populates a `ScopeStack` at or before the node of interest;
//! the `InferenceEngine` consults it during identifier resolution (§4.6).

use gs_ast::NodeId;
use rustc_hash::FxHashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Class,
    Method,
    Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Constant,
    Parameter,
    Method,
    Signal,
    Enum,
    Class,
}

/// A type expressed the way `infer_type_node` shapes it — see
/// `crate::type_node::TypeNode`. Kept as an opaque alias here so `scope.rs`
/// doesn't need to depend on the concrete variant shape.
pub type TypeNode = crate::type_node::TypeNode;

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub declaration_ast: Option<NodeId>,
    pub type_name: Option<String>,
    pub type_node: Option<TypeNode>,
    pub is_static: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            declaration_ast: None,
            type_name: None,
            type_node: None,
            is_static: false,
        }
    }

    pub fn with_declaration(mut self, node: NodeId) -> Self {
        self.declaration_ast = Some(node);
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_type_node(mut self, type_node: TypeNode) -> Self {
        self.type_node = Some(type_node);
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}

struct Scope {
    kind: ScopeKind,
    declarations: FxHashMap<String, Symbol>,
}

/// Lexical scope chain: `Lookup` searches inner-first (§3), `TryDeclare`
/// permits shadowing in a nested scope but rejects a redeclaration within
/// the same scope.
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
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                declarations: FxHashMap::default(),
            }],
        }
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            declarations: FxHashMap::default(),
        });
    }

    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes.last().expect("ScopeStack is never empty").kind
    }

    /// Returns `false` (and does not insert) if `symbol.name` is already
    /// declared in the *current* (top) scope. Declaring the same name again
    /// in a nested scope shadows it and is always allowed.
    pub fn try_declare(&mut self, symbol: Symbol) -> bool {
        let top = self.scopes.last_mut().expect("ScopeStack is never empty");
        if top.declarations.contains_key(&symbol.name) {
            return false;
        }
        top.declarations.insert(symbol.name.clone(), symbol);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.declarations.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_allowed_across_scopes_but_not_within_one() {
        let mut stack = ScopeStack::new();
        assert!(stack.try_declare(Symbol::new("x", SymbolKind::Variable).with_type_name("int")));
        assert!(!stack.try_declare(Symbol::new("x", SymbolKind::Variable).with_type_name("String")));

        stack.push(ScopeKind::Block);
        assert!(stack.try_declare(Symbol::new("x", SymbolKind::Variable).with_type_name("String")));
        assert_eq!(stack.lookup("x").unwrap().type_name.as_deref(), Some("String"));

        stack.pop();
        assert_eq!(stack.lookup("x").unwrap().type_name.as_deref(), Some("int"));
    }

    #[test]
    fn pop_on_global_scope_is_a_no_op() {
        let mut stack = ScopeStack::new();
        stack.pop();
        assert_eq!(stack.current_kind(), ScopeKind::Global);
    }

    #[test]
    fn lookup_misses_return_none() {
        let stack = ScopeStack::new();
        assert!(stack.lookup("nonexistent").is_none());
    }
}
