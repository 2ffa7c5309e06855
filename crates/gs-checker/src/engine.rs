//! The Inference Engine (§4.6): answers "what is the type of this
//! expression/declaration" against a script's AST, consulting the
//! `Provider` graph, the scope stack, and the Runtime Type Injector.
//!
//! One engine instance is bound to one script at a time via
//! `set_source_file`; switching scripts clears the per-node cache (§5,
//! single-threaded per engine).

use crate::inheritance::find_member_with_inheritance;
use crate::injector::RuntimeTypeInjector;
use crate::lambda::{format_callable, resolve_param_type, CallSiteRegistry, LambdaParamGuess};
use crate::operators::{promote_numeric, resolve_binary, resolve_unary};
use crate::scope::{ScopeKind, ScopeStack, Symbol, SymbolKind};
use crate::type_node::TypeNode;
use gs_ast::{
    BinaryOp, DeclKind, ExprKind, MatchArm, NodeId, NodeKind, ParamDecl, ScriptFile, StmtKind,
};
use gs_common::limits::MAX_INFERENCE_DEPTH;
use gs_common::numeric::is_float_lexeme;
use gs_providers::ProjectTypesProvider;
use gs_types::{MethodMember, Provider, ReturnTypeRole, TypeValue};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// An external usage-inference oracle: given the expression a container
/// value flows through (e.g. `for x in arr: x.foo()`), guesses its element
/// type from how callers of the engine observed it being used. Kept
/// outside this crate's scope (§1) the same way `CallSiteRegistry` is.
pub trait ContainerTypeProvider: Send + Sync {
    fn infer(&self, container_expr: NodeId) -> Option<String>;
}

/// Narrows an identifier's type at one occurrence (e.g. after an `is`
/// check or inside a `match` binding guard) independent of its declared or
/// scope-resolved type.
pub trait NarrowingTypeProvider: Send + Sync {
    fn narrowed_type(&self, node: NodeId) -> Option<String>;
}

/// Consulted only after every other identifier-resolution step (§4.6) has
/// failed — an escape hatch for hosts that track bindings this engine
/// doesn't model itself (e.g. `for` loop variables introduced by a walker
/// that hasn't populated the scope stack yet).
pub trait SymbolLookupFallback: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Contexts `expected_type` (§4.7 "Reverse inference") can be asked about.
pub enum ExpectedTypeContext {
    /// The right-hand side of `lhs = rhs`: expected type is `lhs`'s.
    AssignmentRhs { lhs: NodeId },
    /// `var x: T = ...`: expected type is the declared annotation.
    Initializer { declared_type: String },
    /// The `index`-th positional argument of a call to `method_name` on
    /// `callee_type_name`.
    Argument { callee_type_name: String, method_name: String, index: usize },
    /// A `return expr` inside a method with declared return type `T`.
    ReturnExpr { declared_return: String },
    /// An element inside an array literal whose own expected type is
    /// already known (e.g. from an annotated `var` or argument position).
    ArrayElement { element_type: String },
}

fn strip_generic_suffix(name: &str) -> String {
    name.split('[').next().unwrap_or(name).to_string()
}

fn packed_array_element(name: &str) -> Option<&'static str> {
    match name {
        "PackedByteArray" | "PackedInt32Array" | "PackedInt64Array" => Some("int"),
        "PackedFloat32Array" | "PackedFloat64Array" => Some("float"),
        "PackedStringArray" => Some("String"),
        "PackedVector2Array" => Some("Vector2"),
        "PackedVector3Array" => Some("Vector3"),
        "PackedColorArray" => Some("Color"),
        _ => None,
    }
}

fn is_identifier_named(script: &ScriptFile, node: NodeId, name: &str) -> bool {
    matches!(&script.arena.get(node).kind, NodeKind::Expr(ExprKind::Identifier(id)) if id == name)
}

pub struct InferenceEngine {
    composite: Arc<dyn Provider>,
    project: Arc<ProjectTypesProvider>,
    injector: RuntimeTypeInjector,
    scope: ScopeStack,
    current_class_name: Option<String>,
    current_script_path: Option<String>,
    current_method_body: Vec<NodeId>,
    script: Option<Arc<ScriptFile>>,
    type_cache: FxHashMap<NodeId, TypeValue>,
    being_inferred: FxHashSet<NodeId>,
    depth: u32,
    container_type_provider: Option<Box<dyn ContainerTypeProvider>>,
    narrowing_type_provider: Option<Box<dyn NarrowingTypeProvider>>,
    symbol_lookup_fallback: Option<Box<dyn SymbolLookupFallback>>,
    call_site_registry: Option<Arc<dyn CallSiteRegistry>>,
}

impl InferenceEngine {
    pub fn new(
        composite: Arc<dyn Provider>,
        project: Arc<ProjectTypesProvider>,
        injector: RuntimeTypeInjector,
    ) -> Self {
        Self {
            composite,
            project,
            injector,
            scope: ScopeStack::new(),
            current_class_name: None,
            current_script_path: None,
            current_method_body: Vec::new(),
            script: None,
            type_cache: FxHashMap::default(),
            being_inferred: FxHashSet::default(),
            depth: 0,
            container_type_provider: None,
            narrowing_type_provider: None,
            symbol_lookup_fallback: None,
            call_site_registry: None,
        }
    }

    pub fn set_container_type_provider(&mut self, provider: Box<dyn ContainerTypeProvider>) {
        self.container_type_provider = Some(provider);
    }

    pub fn set_narrowing_type_provider(&mut self, provider: Box<dyn NarrowingTypeProvider>) {
        self.narrowing_type_provider = Some(provider);
    }

    pub fn set_symbol_lookup_fallback(&mut self, fallback: Box<dyn SymbolLookupFallback>) {
        self.symbol_lookup_fallback = Some(fallback);
    }

    pub fn set_call_site_registry(&mut self, registry: Arc<dyn CallSiteRegistry>) {
        self.call_site_registry = Some(registry);
    }

    /// Binds the engine to a script for subsequent queries, clearing the
    /// per-node cache (node identities from a different script's arena
    /// would otherwise collide with this one's).
    pub fn set_source_file(&mut self, script: Arc<ScriptFile>, class_name: String) {
        self.current_script_path = Some(script.resource_path.clone());
        self.current_class_name = Some(class_name);
        self.script = Some(script);
        self.clear_cache();
    }

    pub fn clear_cache(&mut self) {
        self.type_cache.clear();
        self.being_inferred.clear();
        self.depth = 0;
    }

    /// Pushes a method scope and declares its parameters, ahead of
    /// resolving identifiers inside the body. `body` seeds the AST-fallback
    /// local-variable scan (§4.6, step "walk up to enclosing method body").
    pub fn enter_method(&mut self, params: &[ParamDecl], body: Vec<NodeId>) {
        self.scope.push(ScopeKind::Method);
        for p in params {
            let mut symbol = Symbol::new(p.name.clone(), SymbolKind::Parameter);
            if let Some(t) = &p.declared_type {
                symbol = symbol.with_type_name(t.clone());
            }
            self.scope.try_declare(symbol);
        }
        self.current_method_body = body;
    }

    pub fn exit_method(&mut self) {
        self.scope.pop();
        self.current_method_body.clear();
    }

    pub fn infer_type(&mut self, node: NodeId) -> Option<String> {
        self.value_of(node).map(|v| v.display_name())
    }

    pub fn type_of_node(&mut self, node: NodeId) -> Option<String> {
        self.value_of(node).map(|v| v.display_name())
    }

    /// Node-level counterpart of `infer_type`; refuses to answer (`None`)
    /// for a union type, since `TypeNode`'s grammar cannot express one
    /// (§4.6.2).
    pub fn infer_type_node(&mut self, node: NodeId) -> Option<TypeNode> {
        let value = self.value_of(node)?;
        TypeNode::parse(&value.display_name())
    }

    pub fn expected_type(&mut self, ctx: &ExpectedTypeContext) -> Option<String> {
        match ctx {
            ExpectedTypeContext::AssignmentRhs { lhs } => self.infer_type(*lhs),
            ExpectedTypeContext::Initializer { declared_type } => Some(declared_type.clone()),
            ExpectedTypeContext::Argument { callee_type_name, method_name, index } => {
                let (_, member) =
                    find_member_with_inheritance(self.composite.as_ref(), callee_type_name, method_name)?;
                let method = member.as_method()?;
                method.parameters.get(*index).map(|p| p.type_name.clone())
            }
            ExpectedTypeContext::ReturnExpr { declared_return } => Some(declared_return.clone()),
            ExpectedTypeContext::ArrayElement { element_type } => Some(element_type.clone()),
        }
    }

    // -- cached, recursion-guarded entry point (§4.6.3) ---------------------

    fn value_of(&mut self, node: NodeId) -> Option<TypeValue> {
        if let Some(v) = self.type_cache.get(&node) {
            return Some(v.clone());
        }
        if self.depth >= MAX_INFERENCE_DEPTH {
            return None;
        }
        if !self.being_inferred.insert(node) {
            return None;
        }
        self.depth += 1;
        let result = self.value_of_uncached(node);
        self.depth -= 1;
        self.being_inferred.remove(&node);
        if let Some(v) = &result {
            self.type_cache.insert(node, v.clone());
        }
        result
    }

    fn value_of_uncached(&mut self, node: NodeId) -> Option<TypeValue> {
        let script = self.script.clone()?;
        match &script.arena.get(node).kind {
            NodeKind::Expr(_) => self.infer_expr_uncached(node),
            NodeKind::Stmt(_) => self.stmt_value(node),
            NodeKind::Decl(_) => self.decl_value(node),
        }
    }

    // -- declarations & statements -------------------------------------------

    fn stmt_value(&mut self, node: NodeId) -> Option<TypeValue> {
        let script = self.script.clone()?;
        let NodeKind::Stmt(kind) = &script.arena.get(node).kind else { return None };
        match kind {
            StmtKind::VarDecl(decl_id) => self.value_of(*decl_id),
            StmtKind::Return(Some(e)) => self.value_of(*e),
            StmtKind::Return(None) => Some(TypeValue::concrete("void")),
            StmtKind::Expr(e) => self.value_of(*e),
            StmtKind::If { .. } | StmtKind::Match { .. } => None,
        }
    }

    fn decl_value(&mut self, node: NodeId) -> Option<TypeValue> {
        let script = self.script.clone()?;
        let NodeKind::Decl(kind) = &script.arena.get(node).kind else { return None };
        match kind {
            DeclKind::Param(p) => {
                if let Some(t) = &p.declared_type {
                    return Some(TypeValue::concrete(t.clone()));
                }
                match p.default_value {
                    Some(default) => self.value_of(default),
                    None => Some(TypeValue::Variant),
                }
            }
            DeclKind::Variable(v) => {
                if let Some(t) = &v.declared_type {
                    return Some(TypeValue::concrete(t.clone()));
                }
                match v.initializer {
                    Some(init) => self.value_of(init),
                    None => Some(TypeValue::Variant),
                }
            }
            DeclKind::Method(m) => {
                if let Some(t) = &m.declared_return {
                    return Some(TypeValue::concrete(t.clone()));
                }
                let class_name = self.current_class_name.clone()?;
                Some(TypeValue::concrete(self.project.infer_return_type(&class_name, &m.name)))
            }
            DeclKind::Signal(_) => Some(TypeValue::concrete("Signal")),
            // Enum *values* are plain strings in the grammar (no NodeId per
            // value), so `type_of_node` can only resolve at the whole-enum
            // granularity — see DESIGN.md.
            DeclKind::Enum(e) => {
                let owner = self.current_class_name.clone().unwrap_or_default();
                Some(TypeValue::concrete(format!("{owner}.{}", e.name)))
            }
            DeclKind::Class(c) => {
                Some(TypeValue::concrete(c.name.clone().unwrap_or_else(|| "_Anonymous".to_string())))
            }
            DeclKind::Lambda(_) => self.infer_lambda(node).map(TypeValue::concrete),
        }
    }

    // -- expressions ----------------------------------------------------------

    fn infer_expr_uncached(&mut self, node: NodeId) -> Option<TypeValue> {
        let script = self.script.clone()?;
        let NodeKind::Expr(kind) = &script.arena.get(node).kind else { return None };
        match kind {
            ExprKind::NullLiteral => Some(TypeValue::Null),
            ExprKind::BoolLiteral(_) => Some(TypeValue::concrete("bool")),
            ExprKind::NumberLiteral(lexeme) => {
                Some(TypeValue::concrete(if is_float_lexeme(lexeme) { "float" } else { "int" }))
            }
            ExprKind::StringLiteral(_) => Some(TypeValue::concrete("String")),
            ExprKind::ArrayLiteral(elements) => {
                let elements = elements.clone();
                Some(self.infer_array_literal(&elements))
            }
            ExprKind::DictLiteral(pairs) => {
                let pairs = pairs.clone();
                Some(self.infer_dict_literal(&pairs))
            }
            ExprKind::Identifier(name) => {
                let name = name.clone();
                self.infer_identifier(node, &name)
            }
            ExprKind::SelfExpr => self.current_class_name.clone().map(TypeValue::concrete),
            ExprKind::SuperExpr => {
                let class_name = self.current_class_name.clone()?;
                self.composite.get_base_type(&class_name).map(TypeValue::concrete)
            }
            ExprKind::MemberAccess { receiver, member } => {
                let (receiver, member) = (*receiver, member.clone());
                self.infer_member_access(receiver, &member)
            }
            ExprKind::Index { receiver, index } => {
                let (receiver, index) = (*receiver, *index);
                self.infer_indexer(receiver, index)
            }
            ExprKind::Call { callee, args } => {
                let (callee, args) = (*callee, args.clone());
                self.infer_call(callee, &args)
            }
            ExprKind::Binary { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                let l = self.value_of(left)?;
                let r = self.value_of(right)?;
                Some(resolve_binary(op, &l, &r))
            }
            ExprKind::Unary { op, operand } => {
                let (op, operand) = (*op, *operand);
                let v = self.value_of(operand)?;
                Some(resolve_unary(op, &v))
            }
            ExprKind::IsExpr { .. } | ExprKind::InExpr { .. } => Some(TypeValue::concrete("bool")),
            ExprKind::AsExpr { type_name, .. } => Some(TypeValue::concrete(type_name.clone())),
            ExprKind::Ternary { then_expr, else_expr, .. } => {
                let (then_expr, else_expr) = (*then_expr, *else_expr);
                let branches: Vec<TypeValue> =
                    [self.value_of(then_expr), self.value_of(else_expr)].into_iter().flatten().collect();
                Some(TypeValue::unify_return_types(branches))
            }
            ExprKind::Paren(inner) => {
                let inner = *inner;
                self.value_of(inner)
            }
            ExprKind::NodePath { path, unique } => {
                let (path, unique) = (path.clone(), *unique);
                self.infer_node_path(&path, unique)
            }
            ExprKind::Await(inner) => {
                let inner = *inner;
                self.infer_await(inner)
            }
            ExprKind::Lambda(lambda_node) => {
                let lambda_node = *lambda_node;
                self.infer_lambda(lambda_node).map(TypeValue::concrete)
            }
        }
    }

    fn infer_array_literal(&mut self, elements: &[NodeId]) -> TypeValue {
        if elements.is_empty() {
            return TypeValue::concrete("Array");
        }
        let element_types: Vec<TypeValue> = elements.iter().filter_map(|&e| self.value_of(e)).collect();
        let union = TypeValue::union_of(element_types);
        TypeValue::concrete(format!("Array[{}]", union.display_name()))
    }

    fn infer_dict_literal(&mut self, pairs: &[(NodeId, NodeId)]) -> TypeValue {
        if pairs.is_empty() {
            return TypeValue::concrete("Dictionary");
        }
        let key_types: Vec<TypeValue> = pairs.iter().filter_map(|&(k, _)| self.value_of(k)).collect();
        let value_types: Vec<TypeValue> = pairs.iter().filter_map(|&(_, v)| self.value_of(v)).collect();
        let key_union = TypeValue::union_of(key_types);
        let value_union = TypeValue::union_of(value_types);
        TypeValue::concrete(format!("Dictionary[{},{}]", key_union.display_name(), value_union.display_name()))
    }

    fn keyword_constant(&self, name: &str) -> Option<TypeValue> {
        match name {
            "true" | "false" => Some(TypeValue::concrete("bool")),
            "null" => Some(TypeValue::Null),
            "PI" | "TAU" | "INF" | "NAN" => Some(TypeValue::concrete("float")),
            "self" => self.current_class_name.clone().map(TypeValue::concrete),
            "super" => {
                let class_name = self.current_class_name.as_deref()?;
                self.composite.get_base_type(class_name).map(TypeValue::concrete)
            }
            _ => None,
        }
    }

    /// §4.6 identifier resolution, in priority order: keyword constants,
    /// an external narrowing hook, the scope stack, the enclosing class's
    /// own members (walking inheritance), known/global type names, an
    /// AST-level local-variable fallback, then an external lookup hook.
    fn infer_identifier(&mut self, node: NodeId, name: &str) -> Option<TypeValue> {
        if let Some(v) = self.keyword_constant(name) {
            return Some(v);
        }
        if let Some(narrowing) = &self.narrowing_type_provider {
            if let Some(t) = narrowing.narrowed_type(node) {
                return Some(TypeValue::concrete(t));
            }
        }
        if let Some(symbol) = self.scope.lookup(name).cloned() {
            if let Some(tn) = &symbol.type_node {
                return Some(TypeValue::concrete(tn.display_name()));
            }
            if let Some(tn) = &symbol.type_name {
                return Some(TypeValue::concrete(tn.clone()));
            }
            if let Some(decl) = symbol.declaration_ast {
                return self.value_of(decl);
            }
            return Some(TypeValue::Variant);
        }
        if let Some(class_name) = self.current_class_name.clone() {
            if let Some((_, member)) = find_member_with_inheritance(self.composite.as_ref(), &class_name, name) {
                return Some(TypeValue::concrete(member.value_type_name()));
            }
        }
        if let Some(info) = self.composite.get_type_info(name) {
            return Some(TypeValue::concrete(info.name));
        }
        if let Some(v) = self.ast_fallback_local_var(name) {
            return Some(v);
        }
        if let Some(fallback) = &self.symbol_lookup_fallback {
            if let Some(t) = fallback.lookup(name) {
                return Some(TypeValue::concrete(t));
            }
        }
        None
    }

    fn ast_fallback_local_var(&mut self, name: &str) -> Option<TypeValue> {
        let script = self.script.clone()?;
        let body = self.current_method_body.clone();
        self.find_var_decl_in_stmts(&script, &body, name)
    }

    fn find_var_decl_in_stmts(&mut self, script: &Arc<ScriptFile>, stmts: &[NodeId], name: &str) -> Option<TypeValue> {
        for &stmt in stmts {
            let NodeKind::Stmt(kind) = &script.arena.get(stmt).kind else { continue };
            match kind {
                StmtKind::VarDecl(decl_id) => {
                    let decl_id = *decl_id;
                    if let NodeKind::Decl(DeclKind::Variable(v)) = &script.arena.get(decl_id).kind {
                        if v.name == name {
                            return self.value_of(decl_id);
                        }
                    }
                }
                StmtKind::If { then_branch, else_branch, .. } => {
                    if let Some(v) = self.find_var_decl_in_stmts(script, then_branch, name) {
                        return Some(v);
                    }
                    if let Some(v) = self.find_var_decl_in_stmts(script, else_branch, name) {
                        return Some(v);
                    }
                }
                StmtKind::Match { arms, .. } => {
                    for arm in arms {
                        if let Some(v) = self.find_var_decl_in_stmts(script, &arm.body, name) {
                            return Some(v);
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn find_dict_initializer_in_stmts(
        &self,
        script: &Arc<ScriptFile>,
        stmts: &[NodeId],
        name: &str,
    ) -> Option<Vec<(NodeId, NodeId)>> {
        for &stmt in stmts {
            let NodeKind::Stmt(kind) = &script.arena.get(stmt).kind else { continue };
            match kind {
                StmtKind::VarDecl(decl_id) => {
                    if let NodeKind::Decl(DeclKind::Variable(v)) = &script.arena.get(*decl_id).kind {
                        if v.name == name {
                            if let Some(init) = v.initializer {
                                if let NodeKind::Expr(ExprKind::DictLiteral(pairs)) = &script.arena.get(init).kind {
                                    return Some(pairs.clone());
                                }
                            }
                        }
                    }
                }
                StmtKind::If { then_branch, else_branch, .. } => {
                    if let Some(p) = self.find_dict_initializer_in_stmts(script, then_branch, name) {
                        return Some(p);
                    }
                    if let Some(p) = self.find_dict_initializer_in_stmts(script, else_branch, name) {
                        return Some(p);
                    }
                }
                StmtKind::Match { arms, .. } => {
                    for arm in arms {
                        if let Some(p) = self.find_dict_initializer_in_stmts(script, &arm.body, name) {
                            return Some(p);
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn find_string_var_in_stmts(&self, script: &Arc<ScriptFile>, stmts: &[NodeId], name: &str) -> Option<String> {
        for &stmt in stmts {
            let NodeKind::Stmt(kind) = &script.arena.get(stmt).kind else { continue };
            match kind {
                StmtKind::VarDecl(decl_id) => {
                    if let NodeKind::Decl(DeclKind::Variable(v)) = &script.arena.get(*decl_id).kind {
                        if v.name == name {
                            if let Some(init) = v.initializer {
                                if let NodeKind::Expr(ExprKind::StringLiteral(s)) = &script.arena.get(init).kind {
                                    return Some(s.clone());
                                }
                            }
                        }
                    }
                }
                StmtKind::If { then_branch, else_branch, .. } => {
                    if let Some(s) = self.find_string_var_in_stmts(script, then_branch, name) {
                        return Some(s);
                    }
                    if let Some(s) = self.find_string_var_in_stmts(script, else_branch, name) {
                        return Some(s);
                    }
                }
                StmtKind::Match { arms, .. } => {
                    for arm in arms {
                        if let Some(s) = self.find_string_var_in_stmts(script, &arm.body, name) {
                            return Some(s);
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn resolve_dict_literal_initializer(&mut self, receiver: NodeId) -> Option<Vec<(NodeId, NodeId)>> {
        let script = self.script.clone()?;
        match &script.arena.get(receiver).kind {
            NodeKind::Expr(ExprKind::DictLiteral(pairs)) => Some(pairs.clone()),
            NodeKind::Expr(ExprKind::Identifier(name)) => {
                let name = name.clone();
                let body = self.current_method_body.clone();
                self.find_dict_initializer_in_stmts(&script, &body, &name)
            }
            _ => None,
        }
    }

    fn literal_key_text(&mut self, node: NodeId) -> Option<String> {
        let script = self.script.clone()?;
        match &script.arena.get(node).kind {
            NodeKind::Expr(ExprKind::StringLiteral(s)) => Some(s.clone()),
            NodeKind::Expr(ExprKind::NumberLiteral(n)) => Some(n.clone()),
            NodeKind::Expr(ExprKind::BoolLiteral(b)) => Some(b.to_string()),
            _ => None,
        }
    }

    fn dict_value_for_literal_key(&mut self, pairs: &[(NodeId, NodeId)], key_text: &str) -> Option<NodeId> {
        for &(k, v) in pairs {
            if self.literal_key_text(k).as_deref() == Some(key_text) {
                return Some(v);
            }
        }
        None
    }

    fn literal_or_var_string_arg(&mut self, args: &[NodeId], index: usize) -> Option<String> {
        let script = self.script.clone()?;
        let &arg = args.get(index)?;
        match &script.arena.get(arg).kind {
            NodeKind::Expr(ExprKind::StringLiteral(s)) => Some(s.clone()),
            NodeKind::Expr(ExprKind::Identifier(name)) => {
                let name = name.clone();
                let body = self.current_method_body.clone();
                self.find_string_var_in_stmts(&script, &body, &name)
            }
            _ => None,
        }
    }

    fn literal_int_arg(&mut self, args: &[NodeId], index: usize) -> Option<usize> {
        let script = self.script.clone()?;
        let &arg = args.get(index)?;
        if let NodeKind::Expr(ExprKind::NumberLiteral(n)) = &script.arena.get(arg).kind {
            return n.parse::<usize>().ok();
        }
        None
    }

    fn find_preload_scene_const(&self, script: &Arc<ScriptFile>, alias: &str) -> Option<String> {
        let NodeKind::Decl(DeclKind::Class(class)) = &script.arena.get(script.root_class).kind else {
            return None;
        };
        for &v_id in &class.variables {
            let NodeKind::Decl(DeclKind::Variable(v)) = &script.arena.get(v_id).kind else { continue };
            if v.name != alias || !v.is_const {
                continue;
            }
            let Some(init) = v.initializer else { continue };
            let NodeKind::Expr(ExprKind::Call { callee, args }) = &script.arena.get(init).kind else { continue };
            let NodeKind::Expr(ExprKind::Identifier(callee_name)) = &script.arena.get(*callee).kind else {
                continue;
            };
            if callee_name != "preload" && callee_name != "load" {
                continue;
            }
            if let Some(&arg0) = args.first() {
                if let NodeKind::Expr(ExprKind::StringLiteral(path)) = &script.arena.get(arg0).kind {
                    return Some(path.clone());
                }
            }
        }
        None
    }

    /// The scene path a `.instantiate()`/`.get_child()` receiver points at:
    /// either an inline `preload("scene.tscn")` call, or an identifier
    /// aliasing one via `const Foo = preload("scene.tscn")` (§4.8).
    fn resolve_scene_path_of(&mut self, receiver: NodeId) -> Option<String> {
        let script = self.script.clone()?;
        match &script.arena.get(receiver).kind {
            NodeKind::Expr(ExprKind::Call { callee, args }) => {
                if let NodeKind::Expr(ExprKind::Identifier(name)) = &script.arena.get(*callee).kind {
                    if name == "preload" || name == "load" {
                        let args = args.clone();
                        return self.literal_or_var_string_arg(&args, 0);
                    }
                }
                None
            }
            NodeKind::Expr(ExprKind::Identifier(name)) => {
                let name = name.clone();
                self.find_preload_scene_const(&script, &name)
            }
            _ => None,
        }
    }

    fn infer_member_access(&mut self, receiver: NodeId, member: &str) -> Option<TypeValue> {
        let script = self.script.clone()?;
        if let NodeKind::Expr(ExprKind::Identifier(base_name)) = &script.arena.get(receiver).kind {
            let qualified = format!("{base_name}.{member}");
            if let Some(info) = self.composite.get_type_info(&qualified) {
                return Some(TypeValue::concrete(info.name));
            }
        }
        let receiver_value = self.value_of(receiver)?;
        let receiver_name = receiver_value.display_name();
        let lookup_name = strip_generic_suffix(&receiver_name);
        let (_, member_info) = find_member_with_inheritance(self.composite.as_ref(), &lookup_name, member)?;
        Some(TypeValue::concrete(member_info.value_type_name()))
    }

    fn infer_indexer(&mut self, receiver: NodeId, index: NodeId) -> Option<TypeValue> {
        let receiver_value = self.value_of(receiver)?;
        let receiver_name = receiver_value.display_name();
        match TypeNode::parse(&receiver_name) {
            Some(TypeNode::Array(element)) => return Some(TypeValue::concrete(element.display_name())),
            Some(TypeNode::Dictionary(_, value)) => return Some(TypeValue::concrete(value.display_name())),
            _ => {}
        }
        if receiver_name == "String" {
            return Some(TypeValue::concrete("String"));
        }
        if let Some(elem) = packed_array_element(&receiver_name) {
            return Some(TypeValue::concrete(elem));
        }
        if receiver_name == "Dictionary" {
            if let Some(key_text) = self.literal_key_text(index) {
                if let Some(pairs) = self.resolve_dict_literal_initializer(receiver) {
                    if let Some(value_node) = self.dict_value_for_literal_key(&pairs, &key_text) {
                        return self.value_of(value_node);
                    }
                }
            }
            if let Some(container) = &self.container_type_provider {
                if let Some(t) = container.infer(receiver) {
                    return Some(TypeValue::concrete(t));
                }
            }
            return Some(TypeValue::Variant);
        }
        if receiver_name == "Array" {
            if let Some(container) = &self.container_type_provider {
                if let Some(t) = container.infer(receiver) {
                    return Some(TypeValue::concrete(t));
                }
            }
            return Some(TypeValue::Variant);
        }
        Some(TypeValue::Variant)
    }

    fn infer_node_path(&mut self, path: &str, unique: bool) -> Option<TypeValue> {
        let script_path = self.current_script_path.clone()?;
        self.injector.inject_node_path(&script_path, path, unique).map(TypeValue::concrete)
    }

    fn infer_await(&mut self, inner: NodeId) -> Option<TypeValue> {
        let script = self.script.clone()?;
        if let NodeKind::Expr(ExprKind::MemberAccess { receiver, member }) = &script.arena.get(inner).kind {
            let (receiver, member) = (*receiver, member.clone());
            let receiver_value = self.value_of(receiver)?;
            let receiver_name = receiver_value.display_name();
            let params = find_member_with_inheritance(self.composite.as_ref(), &receiver_name, &member)
                .and_then(|(_, m)| m.as_signal().map(|s| s.parameter_type_names.clone()))
                .or_else(|| self.injector.get_signal_parameter_types(&member, &receiver_name));
            if let Some(params) = params {
                return Some(signal_emission_type(&params));
            }
        }
        self.value_of(inner)
    }

    // -- calls ------------------------------------------------------------

    fn infer_call(&mut self, callee: NodeId, args: &[NodeId]) -> Option<TypeValue> {
        if let Some(injected) = self.try_inject_call(callee, args) {
            return Some(injected);
        }
        let script = self.script.clone()?;
        match &script.arena.get(callee).kind {
            NodeKind::Expr(ExprKind::Identifier(name)) => {
                let name = name.clone();
                self.infer_identifier_call(&name, args)
            }
            NodeKind::Expr(ExprKind::MemberAccess { receiver, member }) => {
                let (receiver, member) = (*receiver, member.clone());
                self.infer_member_call(receiver, &member, args)
            }
            _ => None,
        }
    }

    fn try_inject_call(&mut self, callee: NodeId, args: &[NodeId]) -> Option<TypeValue> {
        let script = self.script.clone()?;
        match &script.arena.get(callee).kind {
            NodeKind::Expr(ExprKind::Identifier(name)) => match name.as_str() {
                "preload" | "load" => {
                    let path = self.literal_or_var_string_arg(args, 0)?;
                    Some(TypeValue::concrete(self.injector.inject_resource_load(&path)))
                }
                "get_node" | "get_node_or_null" | "find_node" => {
                    let path = self.literal_or_var_string_arg(args, 0)?;
                    let script_path = self.current_script_path.clone()?;
                    self.injector.inject_get_node(&script_path, &path).map(TypeValue::concrete)
                }
                _ => None,
            },
            NodeKind::Expr(ExprKind::MemberAccess { receiver, member }) => {
                let receiver = *receiver;
                match member.as_str() {
                    "instantiate" => {
                        let scene_path = self.resolve_scene_path_of(receiver)?;
                        self.injector.inject_instantiate(&scene_path).map(TypeValue::concrete)
                    }
                    "get_child" | "get_child_or_null" => {
                        let index = self.literal_int_arg(args, 0)?;
                        let scene_path = self.resolve_scene_path_of(receiver)?;
                        self.injector.inject_get_child(&scene_path, index).map(TypeValue::concrete)
                    }
                    "get_node" | "get_node_or_null" | "find_node" => {
                        let path = self.literal_or_var_string_arg(args, 0)?;
                        let script_path = self.current_script_path.clone()?;
                        self.injector.inject_get_node(&script_path, &path).map(TypeValue::concrete)
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn infer_identifier_call(&mut self, name: &str, args: &[NodeId]) -> Option<TypeValue> {
        if let Some(info) = self.composite.get_type_info(name) {
            return Some(TypeValue::concrete(info.name));
        }
        if let Some(global) = self.composite.get_global_function(name) {
            if let Some(method) = global.as_method().cloned() {
                if let Some(role) = method.return_type_role {
                    return Some(self.apply_return_role(role, None, &method, args));
                }
                return Some(TypeValue::concrete(method.return_type_name));
            }
        }
        let class_name = self.current_class_name.clone()?;
        let (declaring, member) = find_member_with_inheritance(self.composite.as_ref(), &class_name, name)?;
        let method = member.as_method()?.clone();
        if let Some(role) = method.return_type_role {
            return Some(self.apply_return_role(role, Some(&declaring), &method, args));
        }
        Some(TypeValue::concrete(method.return_type_name))
    }

    fn infer_member_call(&mut self, receiver: NodeId, member: &str, args: &[NodeId]) -> Option<TypeValue> {
        let script = self.script.clone()?;
        if member == "new" {
            if let NodeKind::Expr(ExprKind::Identifier(type_name)) = &script.arena.get(receiver).kind {
                let type_name = type_name.clone();
                let resolved = self
                    .composite
                    .get_type_info(&type_name)
                    .map(|info| info.name)
                    .unwrap_or(type_name);
                return Some(TypeValue::concrete(resolved));
            }
        }

        let receiver_value = self.value_of(receiver)?;
        let receiver_name = receiver_value.display_name();

        if member == "get" {
            if let Some(&key_arg) = args.first() {
                if let Some(key_text) = self.literal_key_text(key_arg) {
                    if receiver_name == "Dictionary" || receiver_name.starts_with("Dictionary[") {
                        if let Some(pairs) = self.resolve_dict_literal_initializer(receiver) {
                            if let Some(value_node) = self.dict_value_for_literal_key(&pairs, &key_text) {
                                return self.value_of(value_node);
                            }
                        }
                    } else if let Some((_, m)) =
                        find_member_with_inheritance(self.composite.as_ref(), &receiver_name, &key_text)
                    {
                        if let gs_types::MemberInfo::Property(_) = m {
                            return Some(TypeValue::concrete(m.value_type_name()));
                        }
                    }
                }
            }
        }

        if (member == "call" || member == "callv") {
            if let Some(TypeNode::Callable { returns, .. }) = TypeNode::parse(&receiver_name) {
                return Some(TypeValue::concrete(returns.display_name()));
            }
        }

        if receiver_value.is_variant() {
            return self.duck_type_call(member, args);
        }

        let lookup_name = strip_generic_suffix(&receiver_name);
        let (_, member_info) = find_member_with_inheritance(self.composite.as_ref(), &lookup_name, member)?;
        let method = member_info.as_method()?.clone();
        if let Some(role) = method.return_type_role {
            return Some(self.apply_return_role(role, Some(&receiver_name), &method, args));
        }
        Some(TypeValue::concrete(method.return_type_name))
    }

    /// A method call on a `Variant`-typed receiver: §4.6 falls back to
    /// duck typing across every type the composite knows to declare a
    /// method of this name, agreeing only when every candidate's return
    /// type matches (or all are numeric, promoting per the usual rule).
    fn duck_type_call(&mut self, member: &str, _args: &[NodeId]) -> Option<TypeValue> {
        let candidates = self.composite.find_types_with_method(member);
        if candidates.is_empty() {
            return None;
        }
        let mut names: Vec<String> = Vec::new();
        for c in &candidates {
            if let Some(m) = self.composite.get_member(c, member) {
                if let Some(method) = m.as_method() {
                    names.push(method.return_type_name.clone());
                }
            }
        }
        let first = names.first()?.clone();
        if names.iter().all(|n| *n == first) {
            return Some(TypeValue::concrete(first));
        }
        let mut result = TypeValue::concrete(first);
        for n in &names[1..] {
            result = promote_numeric(&result.display_name(), n);
        }
        if result.is_variant() {
            None
        } else {
            Some(result)
        }
    }

    fn apply_return_role(
        &mut self,
        role: ReturnTypeRole,
        caller: Option<&str>,
        method: &MethodMember,
        args: &[NodeId],
    ) -> TypeValue {
        let fallback = || TypeValue::concrete(method.return_type_name.clone());
        match role {
            ReturnTypeRole::SelfType => caller.map(TypeValue::concrete).unwrap_or_else(fallback),
            ReturnTypeRole::Element => match caller.and_then(TypeNode::parse) {
                Some(TypeNode::Array(element)) => TypeValue::concrete(element.display_name()),
                _ => fallback(),
            },
            ReturnTypeRole::Key => match caller.and_then(TypeNode::parse) {
                Some(TypeNode::Dictionary(key, _)) => TypeValue::concrete(key.display_name()),
                _ => fallback(),
            },
            ReturnTypeRole::Value => match caller.and_then(TypeNode::parse) {
                Some(TypeNode::Dictionary(_, value)) => TypeValue::concrete(value.display_name()),
                _ => fallback(),
            },
            ReturnTypeRole::KeysArray => match caller.and_then(TypeNode::parse) {
                Some(TypeNode::Dictionary(key, _)) => TypeValue::concrete(format!("Array[{}]", key.display_name())),
                _ => fallback(),
            },
            ReturnTypeRole::ValuesArray => match caller.and_then(TypeNode::parse) {
                Some(TypeNode::Dictionary(_, value)) => {
                    TypeValue::concrete(format!("Array[{}]", value.display_name()))
                }
                _ => fallback(),
            },
            ReturnTypeRole::CallableReturnArray => match caller.and_then(TypeNode::parse) {
                Some(TypeNode::Callable { returns, .. }) => TypeValue::concrete(returns.display_name()),
                _ => fallback(),
            },
            ReturnTypeRole::FirstArg => args.first().and_then(|&a| self.value_of(a)).unwrap_or_else(fallback),
            ReturnTypeRole::CommonArg | ReturnTypeRole::CommonTwo => {
                let names: Vec<String> =
                    args.iter().filter_map(|&a| self.value_of(a)).map(|v| v.display_name()).collect();
                match names.split_first() {
                    Some((first, rest)) => {
                        let mut result = TypeValue::concrete(first.clone());
                        for n in rest {
                            result = promote_numeric(&result.display_name(), n);
                        }
                        result
                    }
                    None => fallback(),
                }
            }
        }
    }

    // -- lambdas ------------------------------------------------------------

    fn infer_lambda(&mut self, lambda_node: NodeId) -> Option<String> {
        let script = self.script.clone()?;
        let NodeKind::Decl(DeclKind::Lambda(decl)) = &script.arena.get(lambda_node).kind else {
            return None;
        };
        let decl = decl.clone();

        let mut param_names = Vec::with_capacity(decl.params.len());
        let mut param_types = Vec::with_capacity(decl.params.len());
        for (idx, p) in decl.params.iter().enumerate() {
            let default_value_type = match p.default_value {
                Some(d) => self.value_of(d).map(|v| v.display_name()),
                None => None,
            };
            let call_site_type =
                self.call_site_registry.as_ref().and_then(|r| r.argument_type_at(decl.id, idx));
            let duck_typed = self.duck_type_param_usage(&script, &decl.body, &p.name);
            let guess = LambdaParamGuess {
                declared: p.declared_type.clone(),
                default_value_type,
                call_site_type,
                duck_typed,
            };
            param_types.push(resolve_param_type(&guess));
            param_names.push(p.name.clone());
        }

        self.scope.push(ScopeKind::Method);
        for (name, ty) in param_names.iter().zip(param_types.iter()) {
            self.scope.try_declare(Symbol::new(name.clone(), SymbolKind::Parameter).with_type_name(ty.clone()));
        }
        let ret = match &decl.declared_return {
            Some(declared) => declared.clone(),
            None => {
                let returns = self.collect_lambda_returns(&script, &decl.body);
                TypeValue::unify_return_types(returns).display_name()
            }
        };
        self.scope.pop();

        Some(format_callable(&param_types, &ret))
    }

    fn collect_lambda_returns(&mut self, script: &Arc<ScriptFile>, body: &[NodeId]) -> Vec<TypeValue> {
        // An expression-bodied lambda with no `return` keyword is a single
        // bare `Expr` statement whose value is the implicit result (§4.6.1).
        if let [only] = body {
            if let NodeKind::Stmt(StmtKind::Expr(e)) = &script.arena.get(*only).kind {
                let e = *e;
                return self.value_of(e).into_iter().collect();
            }
        }
        let mut out = Vec::new();
        self.collect_returns_in_stmts(script, body, &mut out);
        out
    }

    fn collect_returns_in_stmts(&mut self, script: &Arc<ScriptFile>, stmts: &[NodeId], out: &mut Vec<TypeValue>) {
        for &stmt in stmts {
            let NodeKind::Stmt(kind) = &script.arena.get(stmt).kind else { continue };
            match kind {
                StmtKind::Return(Some(e)) => {
                    if let Some(v) = self.value_of(*e) {
                        out.push(v);
                    }
                }
                StmtKind::Return(None) => out.push(TypeValue::concrete("void")),
                StmtKind::If { then_branch, else_branch, .. } => {
                    self.collect_returns_in_stmts(script, then_branch, out);
                    self.collect_returns_in_stmts(script, else_branch, out);
                }
                StmtKind::Match { arms, .. } => {
                    for arm in arms {
                        self.collect_returns_in_stmts(script, &arm.body, out);
                    }
                }
                _ => {}
            }
        }
    }

    /// A pragmatic duck-typing pass over a lambda body (§4.6.1's fallback
    /// when call-site information is unavailable): looks for the parameter
    /// used as an operand of an arithmetic operator against a literal, and
    /// guesses accordingly. Not exhaustive by design — anything it can't
    /// characterize falls through to `Variant`, same as an unused
    /// parameter would.
    fn duck_type_param_usage(&self, script: &Arc<ScriptFile>, body: &[NodeId], param_name: &str) -> Option<String> {
        self.duck_type_in_stmts(script, body, param_name)
    }

    fn duck_type_in_stmts(&self, script: &Arc<ScriptFile>, stmts: &[NodeId], param_name: &str) -> Option<String> {
        for &stmt in stmts {
            let NodeKind::Stmt(kind) = &script.arena.get(stmt).kind else { continue };
            let found = match kind {
                StmtKind::Expr(e) | StmtKind::Return(Some(e)) => self.duck_type_in_expr(script, *e, param_name),
                StmtKind::VarDecl(decl_id) => {
                    if let NodeKind::Decl(DeclKind::Variable(v)) = &script.arena.get(*decl_id).kind {
                        v.initializer.and_then(|i| self.duck_type_in_expr(script, i, param_name))
                    } else {
                        None
                    }
                }
                StmtKind::If { cond, then_branch, else_branch } => self
                    .duck_type_in_expr(script, *cond, param_name)
                    .or_else(|| self.duck_type_in_stmts(script, then_branch, param_name))
                    .or_else(|| self.duck_type_in_stmts(script, else_branch, param_name)),
                StmtKind::Match { subject, arms } => self.duck_type_in_expr(script, *subject, param_name).or_else(|| {
                    arms.iter().find_map(|arm: &MatchArm| self.duck_type_in_stmts(script, &arm.body, param_name))
                }),
                StmtKind::Return(None) => None,
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn duck_type_in_expr(&self, script: &Arc<ScriptFile>, expr: NodeId, param_name: &str) -> Option<String> {
        let NodeKind::Expr(kind) = &script.arena.get(expr).kind else { return None };
        match kind {
            ExprKind::Binary { op, left, right } => {
                let (param_side, other) = if is_identifier_named(script, *left, param_name) {
                    (true, *right)
                } else if is_identifier_named(script, *right, param_name) {
                    (true, *left)
                } else {
                    (false, *left)
                };
                if param_side && matches!(op, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
                {
                    return match &script.arena.get(other).kind {
                        NodeKind::Expr(ExprKind::NumberLiteral(lexeme)) => {
                            Some(if is_float_lexeme(lexeme) { "float" } else { "int" }.to_string())
                        }
                        NodeKind::Expr(ExprKind::StringLiteral(_)) => Some("String".to_string()),
                        _ => Some("float".to_string()),
                    };
                }
                self.duck_type_in_expr(script, *left, param_name)
                    .or_else(|| self.duck_type_in_expr(script, *right, param_name))
            }
            ExprKind::MemberAccess { receiver, .. } | ExprKind::Index { receiver, .. } => {
                self.duck_type_in_expr(script, *receiver, param_name)
            }
            ExprKind::Call { callee, args } => {
                if let NodeKind::Expr(ExprKind::MemberAccess { receiver, .. }) = &script.arena.get(*callee).kind {
                    if is_identifier_named(script, *receiver, param_name) {
                        return Some("Variant".to_string());
                    }
                }
                args.iter().find_map(|&a| self.duck_type_in_expr(script, a, param_name))
            }
            _ => None,
        }
    }
}

fn signal_emission_type(params: &[String]) -> TypeValue {
    match params.len() {
        0 => TypeValue::concrete("void"),
        1 => TypeValue::concrete(params[0].clone()),
        _ => TypeValue::concrete(format!("({})", params.join(", "))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gs_ast::{Arena, ClassDecl, EnumDecl, ExtendsRef, LambdaDecl, LambdaId, MethodDecl, VariableDecl};
    use gs_common::Span;
    use gs_providers::host_db::{HostMethodEntry, HostPropertyEntry};
    use gs_providers::{
        AutoloadsProvider, CompositeProvider, DefaultFallbackProvider, HostTypeDbProvider, HostTypeDescriptor,
        HostTypeEntry, SceneTypesProvider,
    };

    struct Harness {
        engine: InferenceEngine,
    }

    fn host_descriptor() -> HostTypeDescriptor {
        HostTypeDescriptor {
            types: vec![
                HostTypeEntry {
                    name: "Node".to_string(),
                    base_type: Some("Object".to_string()),
                    is_builtin_value: false,
                    is_singleton: false,
                    is_abstract: false,
                    methods: vec![],
                    properties: vec![HostPropertyEntry {
                        name: "position".to_string(),
                        type_name: "Vector2".to_string(),
                        is_static: false,
                    }],
                    constants: vec![],
                    signals: vec![],
                },
                HostTypeEntry {
                    name: "Vector2".to_string(),
                    base_type: None,
                    is_builtin_value: true,
                    is_singleton: false,
                    is_abstract: false,
                    methods: vec![],
                    properties: vec![HostPropertyEntry {
                        name: "x".to_string(),
                        type_name: "float".to_string(),
                        is_static: false,
                    }],
                    constants: vec![],
                    signals: vec![],
                },
                HostTypeEntry {
                    name: "Object".to_string(),
                    base_type: None,
                    is_builtin_value: false,
                    is_singleton: false,
                    is_abstract: false,
                    methods: vec![],
                    properties: vec![],
                    constants: vec![],
                    signals: vec![],
                },
            ],
        }
    }

    /// Builds a harness bound to `script`, with the project cache rebuilt
    /// over `all_scripts` and the engine's current class set to
    /// `class_name`.
    fn harness_for(script: Arc<ScriptFile>, all_scripts: &[Arc<ScriptFile>], class_name: &str) -> Harness {
        let host: Arc<dyn Provider> = Arc::new(HostTypeDbProvider::from_descriptor(host_descriptor()));
        let project = Arc::new(ProjectTypesProvider::new(host.clone()));
        project.rebuild_cache(all_scripts);
        let scene = Arc::new(SceneTypesProvider::new());
        let autoloads: Arc<dyn Provider> = Arc::new(AutoloadsProvider::new(vec![], project.clone(), scene.clone()));
        let fallback: Arc<dyn Provider> = Arc::new(DefaultFallbackProvider::new());
        let composite: Arc<dyn Provider> = Arc::new(CompositeProvider::standard(
            host.clone(),
            project.clone() as Arc<dyn Provider>,
            autoloads,
            scene.clone() as Arc<dyn Provider>,
            fallback,
        ));
        let injector = RuntimeTypeInjector::new(project.clone(), scene, composite.clone());
        let mut engine = InferenceEngine::new(composite, project, injector);
        engine.set_source_file(script, class_name.to_string());
        Harness { engine }
    }

    fn script_with_class(resource_path: &str, class: ClassDecl) -> Arc<ScriptFile> {
        let mut arena = Arena::new();
        let root_class = arena.push(Span::dummy(), NodeKind::Decl(DeclKind::Class(class)));
        Arc::new(ScriptFile::new(resource_path.to_string(), resource_path.to_string(), arena, root_class))
    }

    // S1: inherited member inference — `position` climbs Node's base chain
    // via the composite, `position.x` resolves on the member's own type.
    #[test]
    fn s1_inherited_member_and_nested_property() {
        let class = ClassDecl {
            name: Some("Player".to_string()),
            extends: Some(ExtendsRef::Name("Node".to_string())),
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![],
            inner_classes: vec![],
        };
        let script = script_with_class("res://player.gs", class);
        let mut arena = script.arena.clone();
        let position_id = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("position".to_string())));
        let position_x_id = arena.push(
            Span::dummy(),
            NodeKind::Expr(ExprKind::MemberAccess { receiver: position_id, member: "x".to_string() }),
        );
        let script = Arc::new(ScriptFile::new(
            script.full_path.clone(),
            script.resource_path.clone(),
            arena,
            script.root_class,
        ));

        let mut h = harness_for(script.clone(), &[script], "Player");
        assert_eq!(h.engine.infer_type(position_id).as_deref(), Some("Vector2"));
        assert_eq!(h.engine.infer_type(position_x_id).as_deref(), Some("float"));
    }

    // S2: generic element propagation through indexing and a front()-style
    // call that carries `ReturnTypeRole::Element`.
    #[test]
    fn s2_generic_array_element_propagation() {
        let class = ClassDecl {
            name: Some("Inventory".to_string()),
            extends: None,
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![],
            inner_classes: vec![],
        };
        let script = script_with_class("res://inventory.gs", class);
        let mut arena = script.arena.clone();
        let one = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::NumberLiteral("1".to_string())));
        let two = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::NumberLiteral("2".to_string())));
        let three = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::NumberLiteral("3".to_string())));
        let array_lit = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::ArrayLiteral(vec![one, two, three])));
        let var_decl = arena.push(
            Span::dummy(),
            NodeKind::Decl(DeclKind::Variable(VariableDecl {
                name: "xs".to_string(),
                declared_type: None,
                initializer: Some(array_lit),
                is_const: false,
            })),
        );
        let var_decl_stmt = arena.push(Span::dummy(), NodeKind::Stmt(StmtKind::VarDecl(var_decl)));
        let xs_ident = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("xs".to_string())));
        let zero = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::NumberLiteral("0".to_string())));
        let indexer = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Index { receiver: xs_ident, index: zero }));
        let xs_ident2 = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("xs".to_string())));
        let front_access = arena.push(
            Span::dummy(),
            NodeKind::Expr(ExprKind::MemberAccess { receiver: xs_ident2, member: "front".to_string() }),
        );
        let front_call = arena.push(
            Span::dummy(),
            NodeKind::Expr(ExprKind::Call { callee: front_access, args: vec![] }),
        );

        let script =
            Arc::new(ScriptFile::new(script.full_path.clone(), script.resource_path.clone(), arena, script.root_class));
        let mut h = harness_for(script.clone(), &[script], "Inventory");
        h.engine.enter_method(&[], vec![var_decl_stmt]);
        assert_eq!(h.engine.infer_type(indexer).as_deref(), Some("int"));
        assert_eq!(h.engine.infer_type(front_call).as_deref(), Some("int"));
    }

    // S3: dictionary literal, static-key lookup vs. a dynamic key.
    #[test]
    fn s3_dictionary_literal_key_lookup() {
        let class = ClassDecl {
            name: Some("Config".to_string()),
            extends: None,
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![],
            inner_classes: vec![],
        };
        let script = script_with_class("res://config.gs", class);
        let mut arena = script.arena.clone();
        let key_a = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::StringLiteral("a".to_string())));
        let val_a = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::NumberLiteral("1".to_string())));
        let key_b = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::StringLiteral("b".to_string())));
        let val_b = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::StringLiteral("x".to_string())));
        let dict_lit =
            arena.push(Span::dummy(), NodeKind::Expr(ExprKind::DictLiteral(vec![(key_a, val_a), (key_b, val_b)])));
        let var_decl = arena.push(
            Span::dummy(),
            NodeKind::Decl(DeclKind::Variable(VariableDecl {
                name: "d".to_string(),
                declared_type: None,
                initializer: Some(dict_lit),
                is_const: false,
            })),
        );
        let var_decl_stmt = arena.push(Span::dummy(), NodeKind::Stmt(StmtKind::VarDecl(var_decl)));

        let d1 = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("d".to_string())));
        let lit_a2 = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::StringLiteral("a".to_string())));
        let get_a_callee =
            arena.push(Span::dummy(), NodeKind::Expr(ExprKind::MemberAccess { receiver: d1, member: "get".to_string() }));
        let get_a = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Call { callee: get_a_callee, args: vec![lit_a2] }));

        let d2 = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("d".to_string())));
        let lit_b2 = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::StringLiteral("b".to_string())));
        let get_b_callee =
            arena.push(Span::dummy(), NodeKind::Expr(ExprKind::MemberAccess { receiver: d2, member: "get".to_string() }));
        let get_b = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Call { callee: get_b_callee, args: vec![lit_b2] }));

        let d3 = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("d".to_string())));
        let dyn_key = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("some_key".to_string())));
        let get_dyn_callee =
            arena.push(Span::dummy(), NodeKind::Expr(ExprKind::MemberAccess { receiver: d3, member: "get".to_string() }));
        let get_dyn =
            arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Call { callee: get_dyn_callee, args: vec![dyn_key] }));

        let script =
            Arc::new(ScriptFile::new(script.full_path.clone(), script.resource_path.clone(), arena, script.root_class));
        let mut h = harness_for(script.clone(), &[script], "Config");
        h.engine.enter_method(&[], vec![var_decl_stmt]);
        assert_eq!(h.engine.infer_type(get_a).as_deref(), Some("int"));
        assert_eq!(h.engine.infer_type(get_b).as_deref(), Some("String"));
        assert_eq!(h.engine.infer_type(get_dyn).as_deref(), Some("Variant"));
    }

    // S4: preload-alias constructor resolution, then a method call on the
    // resulting instance's canonical class.
    #[test]
    fn s4_preload_alias_constructor() {
        let enemy_class = ClassDecl {
            name: Some("EnemyClass".to_string()),
            extends: None,
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![],
            inner_classes: vec![],
        };
        let mut enemy_arena = Arena::new();
        let enemy_method = enemy_arena.push(
            Span::dummy(),
            NodeKind::Decl(DeclKind::Method(MethodDecl {
                name: "health".to_string(),
                params: vec![],
                declared_return: Some("int".to_string()),
                body: vec![],
                is_static: false,
            })),
        );
        let enemy_class = ClassDecl { methods: vec![enemy_method], ..enemy_class };
        let enemy_root = enemy_arena.push(Span::dummy(), NodeKind::Decl(DeclKind::Class(enemy_class)));
        let enemy_script =
            Arc::new(ScriptFile::new("res://enemy.gs".to_string(), "res://enemy.gs".to_string(), enemy_arena, enemy_root));

        let main_class = ClassDecl {
            name: Some("Main".to_string()),
            extends: None,
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![],
            inner_classes: vec![],
        };
        let mut main_arena = Arena::new();
        let preload_callee = main_arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("preload".to_string())));
        let path_lit =
            main_arena.push(Span::dummy(), NodeKind::Expr(ExprKind::StringLiteral("res://enemy.gs".to_string())));
        let preload_call = main_arena
            .push(Span::dummy(), NodeKind::Expr(ExprKind::Call { callee: preload_callee, args: vec![path_lit] }));
        let alias_decl = main_arena.push(
            Span::dummy(),
            NodeKind::Decl(DeclKind::Variable(VariableDecl {
                name: "Foo".to_string(),
                declared_type: None,
                initializer: Some(preload_call),
                is_const: true,
            })),
        );
        let main_class = ClassDecl { variables: vec![alias_decl], ..main_class };
        let main_root = main_arena.push(Span::dummy(), NodeKind::Decl(DeclKind::Class(main_class)));

        let foo_ident = main_arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("Foo".to_string())));
        let new_access =
            main_arena.push(Span::dummy(), NodeKind::Expr(ExprKind::MemberAccess { receiver: foo_ident, member: "new".to_string() }));
        let new_call = main_arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Call { callee: new_access, args: vec![] }));
        let health_access =
            main_arena.push(Span::dummy(), NodeKind::Expr(ExprKind::MemberAccess { receiver: new_call, member: "health".to_string() }));
        let health_call =
            main_arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Call { callee: health_access, args: vec![] }));

        let main_script =
            Arc::new(ScriptFile::new("res://main.gs".to_string(), "res://main.gs".to_string(), main_arena, main_root));

        let mut h = harness_for(main_script.clone(), &[main_script, enemy_script], "Main");
        assert_eq!(h.engine.infer_type(new_call).as_deref(), Some("EnemyClass"));
        assert_eq!(h.engine.infer_type(health_call).as_deref(), Some("int"));
    }

    // S5: node-path injection, ambiguous across two scenes vs. agreeing.
    #[test]
    fn s5_node_path_ambiguous_vs_agreeing() {
        let class = ClassDecl {
            name: Some("Ref".to_string()),
            extends: None,
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![],
            inner_classes: vec![],
        };
        let script = script_with_class("res://enemy_ref.gs", class);
        let mut arena = script.arena.clone();
        let node_path_expr =
            arena.push(Span::dummy(), NodeKind::Expr(ExprKind::NodePath { path: "Enemy".to_string(), unique: false }));
        let script =
            Arc::new(ScriptFile::new(script.full_path.clone(), script.resource_path.clone(), arena, script.root_class));

        let host: Arc<dyn Provider> = Arc::new(HostTypeDbProvider::from_descriptor(HostTypeDescriptor::default()));
        let project = Arc::new(ProjectTypesProvider::new(host.clone()));
        project.rebuild_cache(&[script.clone()]);
        let scene = Arc::new(SceneTypesProvider::new());
        scene.load_scene(
            "res://a.tscn",
            r#"
[gd_scene load_steps=2 format=3]
[ext_resource type="Script" path="res://enemy_ref.gs" id="1"]
[node name="Root" type="Node2D"]
script = ExtResource("1")
[node name="Enemy" type="Goblin" parent="."]
"#,
        );
        scene.load_scene(
            "res://b.tscn",
            r#"
[gd_scene load_steps=2 format=3]
[ext_resource type="Script" path="res://enemy_ref.gs" id="1"]
[node name="Root" type="Node2D"]
script = ExtResource("1")
[node name="Enemy" type="Orc" parent="."]
"#,
        );
        let autoloads: Arc<dyn Provider> = Arc::new(AutoloadsProvider::new(vec![], project.clone(), scene.clone()));
        let fallback: Arc<dyn Provider> = Arc::new(DefaultFallbackProvider::new());
        let composite: Arc<dyn Provider> = Arc::new(CompositeProvider::standard(
            host,
            project.clone() as Arc<dyn Provider>,
            autoloads,
            scene.clone() as Arc<dyn Provider>,
            fallback,
        ));
        let injector = RuntimeTypeInjector::new(project.clone(), scene.clone(), composite.clone());
        let mut engine = InferenceEngine::new(composite, project, injector);
        engine.set_source_file(script, "Ref".to_string());
        assert_eq!(engine.infer_type(node_path_expr), None);

        // Both scenes agreeing should resolve cleanly.
        let scene2 = Arc::new(SceneTypesProvider::new());
        scene2.load_scene(
            "res://a.tscn",
            r#"
[gd_scene load_steps=2 format=3]
[ext_resource type="Script" path="res://enemy_ref.gs" id="1"]
[node name="Root" type="Node2D"]
script = ExtResource("1")
[node name="Enemy" type="Goblin" parent="."]
"#,
        );
        scene2.load_scene(
            "res://b.tscn",
            r#"
[gd_scene load_steps=2 format=3]
[ext_resource type="Script" path="res://enemy_ref.gs" id="1"]
[node name="Root" type="Node2D"]
script = ExtResource("1")
[node name="Enemy" type="Goblin" parent="."]
"#,
        );
        let host2: Arc<dyn Provider> = Arc::new(HostTypeDbProvider::from_descriptor(HostTypeDescriptor::default()));
        let autoloads2: Arc<dyn Provider> = Arc::new(AutoloadsProvider::new(vec![], project.clone(), scene2.clone()));
        let fallback2: Arc<dyn Provider> = Arc::new(DefaultFallbackProvider::new());
        let composite2: Arc<dyn Provider> = Arc::new(CompositeProvider::standard(
            host2,
            project.clone() as Arc<dyn Provider>,
            autoloads2,
            scene2.clone() as Arc<dyn Provider>,
            fallback2,
        ));
        let injector2 = RuntimeTypeInjector::new(project.clone(), scene2, composite2.clone());
        let mut engine2 = InferenceEngine::new(composite2, project, injector2);
        let script2 = script_with_class("res://enemy_ref.gs", ClassDecl {
            name: Some("Ref".to_string()),
            extends: None,
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![],
            inner_classes: vec![],
        });
        let mut arena2 = script2.arena.clone();
        let node_path_expr2 =
            arena2.push(Span::dummy(), NodeKind::Expr(ExprKind::NodePath { path: "Enemy".to_string(), unique: false }));
        let script2 = Arc::new(ScriptFile::new(
            script2.full_path.clone(),
            script2.resource_path.clone(),
            arena2,
            script2.root_class,
        ));
        engine2.set_source_file(script2, "Ref".to_string());
        assert_eq!(engine2.infer_type(node_path_expr2).as_deref(), Some("Goblin"));
    }

    // S6: lambda semantic parameter type from an (external) call site.
    #[test]
    fn s6_lambda_call_site_type() {
        struct MockRegistry;
        impl CallSiteRegistry for MockRegistry {
            fn argument_type_at(&self, lambda: LambdaId, param_index: usize) -> Option<String> {
                if lambda == LambdaId(0) && param_index == 0 {
                    Some("int".to_string())
                } else {
                    None
                }
            }
        }

        let class = ClassDecl {
            name: Some("Caller".to_string()),
            extends: None,
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![],
            inner_classes: vec![],
        };
        let script = script_with_class("res://caller.gs", class);
        let mut arena = script.arena.clone();
        let x_ident = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("x".to_string())));
        let one = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::NumberLiteral("1".to_string())));
        let add = arena.push(
            Span::dummy(),
            NodeKind::Expr(ExprKind::Binary { op: BinaryOp::Add, left: x_ident, right: one }),
        );
        let return_stmt = arena.push(Span::dummy(), NodeKind::Stmt(StmtKind::Return(Some(add))));
        let lambda_decl = arena.push(
            Span::dummy(),
            NodeKind::Decl(DeclKind::Lambda(LambdaDecl {
                id: LambdaId(0),
                params: vec![ParamDecl { name: "x".to_string(), declared_type: None, default_value: None }],
                declared_return: None,
                body: vec![return_stmt],
            })),
        );
        let lambda_expr = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Lambda(lambda_decl)));

        let script =
            Arc::new(ScriptFile::new(script.full_path.clone(), script.resource_path.clone(), arena, script.root_class));
        let mut h = harness_for(script.clone(), &[script], "Caller");
        h.engine.set_call_site_registry(Arc::new(MockRegistry));
        assert_eq!(h.engine.infer_type(lambda_expr).as_deref(), Some("Callable[[int], int]"));
    }

    #[test]
    fn enum_declaration_resolves_to_qualified_owner_name() {
        let enum_decl = EnumDecl { name: "State".to_string(), values: vec!["IDLE".to_string(), "RUN".to_string()] };
        let mut arena = Arena::new();
        let enum_id = arena.push(Span::dummy(), NodeKind::Decl(DeclKind::Enum(enum_decl)));
        let class = ClassDecl {
            name: Some("Player".to_string()),
            extends: None,
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![enum_id],
            inner_classes: vec![],
        };
        let root = arena.push(Span::dummy(), NodeKind::Decl(DeclKind::Class(class)));
        let script = Arc::new(ScriptFile::new("res://player.gs".to_string(), "res://player.gs".to_string(), arena, root));
        let mut h = harness_for(script.clone(), &[script], "Player");
        assert_eq!(h.engine.type_of_node(enum_id).as_deref(), Some("Player.State"));
    }

    #[test]
    fn recursion_guard_breaks_a_self_referential_cycle() {
        let class = ClassDecl {
            name: Some("Cyclic".to_string()),
            extends: None,
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![],
            inner_classes: vec![],
        };
        let script = script_with_class("res://cyclic.gs", class);
        let mut arena = script.arena.clone();
        // `var a = a` — a variable whose own initializer refers to itself.
        let a_ident = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::Identifier("a".to_string())));
        let var_decl = arena.push(
            Span::dummy(),
            NodeKind::Decl(DeclKind::Variable(VariableDecl {
                name: "a".to_string(),
                declared_type: None,
                initializer: Some(a_ident),
                is_const: false,
            })),
        );
        let var_decl_stmt = arena.push(Span::dummy(), NodeKind::Stmt(StmtKind::VarDecl(var_decl)));
        let script =
            Arc::new(ScriptFile::new(script.full_path.clone(), script.resource_path.clone(), arena, script.root_class));
        let mut h = harness_for(script.clone(), &[script], "Cyclic");
        h.engine.enter_method(&[], vec![var_decl_stmt]);
        assert_eq!(h.engine.infer_type(a_ident), None);
    }

    #[test]
    fn clearing_cache_forces_recomputation() {
        let class = ClassDecl {
            name: Some("Simple".to_string()),
            extends: None,
            is_abstract: false,
            variables: vec![],
            methods: vec![],
            signals: vec![],
            enums: vec![],
            inner_classes: vec![],
        };
        let script = script_with_class("res://simple.gs", class);
        let mut arena = script.arena.clone();
        let lit = arena.push(Span::dummy(), NodeKind::Expr(ExprKind::NumberLiteral("1".to_string())));
        let script =
            Arc::new(ScriptFile::new(script.full_path.clone(), script.resource_path.clone(), arena, script.root_class));
        let mut h = harness_for(script, &[], "Simple");
        assert_eq!(h.engine.infer_type(lit).as_deref(), Some("int"));
        h.engine.clear_cache();
        assert_eq!(h.engine.infer_type(lit).as_deref(), Some("int"));
    }
}
