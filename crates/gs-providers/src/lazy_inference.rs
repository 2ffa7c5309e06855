//! The Project Types Provider's self-contained inference collector (§4.3).
//!
//! This is deliberately a *separate, smaller* evaluator from the full
//! `InferenceEngine` in `gs-checker` — the provider crate sits below the
//! engine crate in the dependency graph, so its lazy return-type/property
//! inference can only lean on its own class index plus the host type DB,
//! not on the engine's operator/lambda/injector machinery. It covers the
//! subset of expression shapes that actually show up in method bodies and
//! initializers: literals, identifiers, member access, calls, and
//! containers.

use crate::project_types::ProjectClass;
use gs_ast::{Arena, ExprKind, NodeId, NodeKind, StmtKind};
use gs_common::numeric::is_float_lexeme;
use gs_types::{Provider, TypeValue};
use std::sync::Arc;

pub struct ReturnTypeCollector<'a> {
    pub host_db: &'a Arc<dyn Provider>,
    pub class: &'a ProjectClass,
    pub arena: &'a Arena,
    pub local_var_types: rustc_hash::FxHashMap<String, TypeValue>,
}

impl<'a> ReturnTypeCollector<'a> {
    pub fn collect_from_body(
        host_db: &'a Arc<dyn Provider>,
        class: &'a ProjectClass,
        arena: &'a Arena,
        params: impl IntoIterator<Item = (String, TypeValue)>,
        body: &[NodeId],
    ) -> TypeValue {
        let mut collector = ReturnTypeCollector {
            host_db,
            class,
            arena,
            local_var_types: params.into_iter().collect(),
        };
        let mut returns = Vec::new();
        collector.walk_statements(body, &mut returns);
        TypeValue::unify_return_types(returns)
    }

    fn walk_statements(&mut self, stmts: &[NodeId], out: &mut Vec<TypeValue>) {
        for &stmt in stmts {
            self.walk_statement(stmt, out);
        }
    }

    fn walk_statement(&mut self, stmt: NodeId, out: &mut Vec<TypeValue>) {
        let NodeKind::Stmt(kind) = &self.arena.get(stmt).kind else {
            return;
        };
        match kind {
            StmtKind::Return(Some(expr)) => out.push(self.infer_expr(*expr)),
            StmtKind::Return(None) => out.push(TypeValue::concrete("void")),
            StmtKind::Expr(_) => {}
            StmtKind::VarDecl(decl_id) => {
                if let NodeKind::Decl(gs_ast::DeclKind::Variable(v)) = &self.arena.get(*decl_id).kind
                {
                    let ty = if let Some(declared) = &v.declared_type {
                        TypeValue::concrete(declared.clone())
                    } else if let Some(init) = v.initializer {
                        self.infer_expr(init)
                    } else {
                        TypeValue::Variant
                    };
                    self.local_var_types.insert(v.name.clone(), ty);
                }
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.walk_statements(then_branch, out);
                self.walk_statements(else_branch, out);
            }
            StmtKind::Match { arms, .. } => {
                for arm in arms {
                    if let gs_ast::MatchPattern::Binding {
                        name,
                        narrowed_type: Some(narrowed),
                    } = &arm.pattern
                    {
                        self.local_var_types
                            .insert(name.clone(), TypeValue::concrete(narrowed.clone()));
                    }
                    self.walk_statements(&arm.body, out);
                }
            }
        }
    }

    fn infer_expr(&self, expr: NodeId) -> TypeValue {
        let NodeKind::Expr(kind) = &self.arena.get(expr).kind else {
            return TypeValue::Variant;
        };
        match kind {
            ExprKind::NullLiteral => TypeValue::Null,
            ExprKind::BoolLiteral(_) => TypeValue::concrete("bool"),
            ExprKind::NumberLiteral(lexeme) => {
                TypeValue::concrete(if is_float_lexeme(lexeme) { "float" } else { "int" })
            }
            ExprKind::StringLiteral(_) => TypeValue::concrete("String"),
            ExprKind::ArrayLiteral(elements) => {
                if elements.is_empty() {
                    TypeValue::concrete("Array")
                } else {
                    let element_types: Vec<TypeValue> =
                        elements.iter().map(|&e| self.infer_expr(e)).collect();
                    let union = TypeValue::union_of(element_types);
                    TypeValue::concrete(format!("Array[{}]", union.display_name()))
                }
            }
            ExprKind::DictLiteral(_) => TypeValue::concrete("Dictionary"),
            ExprKind::Identifier(name) => self.infer_identifier(name),
            ExprKind::SelfExpr => TypeValue::concrete(self.class.name.clone()),
            ExprKind::SuperExpr => self
                .class
                .base_type_name
                .clone()
                .map(TypeValue::concrete)
                .unwrap_or(TypeValue::Variant),
            ExprKind::MemberAccess { receiver, member } => {
                let receiver_type = self.infer_expr(*receiver);
                self.member_type(&receiver_type.display_name(), member)
            }
            ExprKind::Index { .. } => TypeValue::Variant,
            ExprKind::Call { callee, args: _ } => self.infer_call(*callee),
            ExprKind::Binary { left, right, .. } => {
                let l = self.infer_expr(*left);
                let r = self.infer_expr(*right);
                if l == r {
                    l
                } else {
                    TypeValue::Variant
                }
            }
            ExprKind::Unary { operand, .. } => self.infer_expr(*operand),
            ExprKind::IsExpr { .. } | ExprKind::InExpr { .. } => TypeValue::concrete("bool"),
            ExprKind::AsExpr { type_name, .. } => TypeValue::concrete(type_name.clone()),
            ExprKind::Ternary {
                then_expr,
                else_expr,
                ..
            } => {
                let t = self.infer_expr(*then_expr);
                let e = self.infer_expr(*else_expr);
                TypeValue::unify_return_types([t, e])
            }
            ExprKind::Paren(inner) => self.infer_expr(*inner),
            ExprKind::NodePath { .. } => TypeValue::concrete("Node"),
            ExprKind::Await(inner) => self.infer_expr(*inner),
            ExprKind::Lambda(_) => TypeValue::concrete("Callable"),
        }
    }

    fn infer_identifier(&self, name: &str) -> TypeValue {
        match name {
            "true" | "false" => TypeValue::concrete("bool"),
            "null" => TypeValue::Null,
            "PI" | "TAU" | "INF" | "NAN" => TypeValue::concrete("float"),
            _ => {
                if let Some(ty) = self.local_var_types.get(name) {
                    return ty.clone();
                }
                if let Some(prop) = self.class.properties.iter().find(|p| p.name == name) {
                    return TypeValue::concrete(prop.current_type_name());
                }
                if self.host_db.is_known_type(name) {
                    return TypeValue::concrete(name);
                }
                TypeValue::Variant
            }
        }
    }

    fn member_type(&self, receiver_type: &str, member: &str) -> TypeValue {
        if receiver_type == self.class.name {
            if let Some(prop) = self.class.properties.iter().find(|p| p.name == member) {
                return TypeValue::concrete(prop.current_type_name());
            }
        }
        if let Some(m) = self.host_db.get_member(receiver_type, member) {
            return TypeValue::concrete(m.value_type_name());
        }
        TypeValue::Variant
    }

    fn infer_call(&self, callee: NodeId) -> TypeValue {
        let NodeKind::Expr(kind) = &self.arena.get(callee).kind else {
            return TypeValue::Variant;
        };
        match kind {
            ExprKind::Identifier(name) => {
                if self.host_db.is_known_type(name) {
                    return TypeValue::concrete(name.clone());
                }
                if let Some(m) = self.host_db.get_global_function(name) {
                    return TypeValue::concrete(m.value_type_name());
                }
                if let Some(method) = self.class.methods.iter().find(|m| &m.name == name) {
                    return TypeValue::concrete(method.current_return_type_name());
                }
                TypeValue::Variant
            }
            ExprKind::MemberAccess { receiver, member } => {
                if member == "new" {
                    if let NodeKind::Expr(ExprKind::Identifier(type_name)) =
                        &self.arena.get(*receiver).kind
                    {
                        return TypeValue::concrete(type_name.clone());
                    }
                }
                let receiver_type = self.infer_expr(*receiver);
                let declaring = self.member_type(&receiver_type.display_name(), member);
                declaring
            }
            _ => TypeValue::Variant,
        }
    }
}

/// Infers a property's type from its initializer expression (§4.3 "Property
/// type"). Returns `None` (meaning: leave the declared/placeholder name
/// unchanged) when the initializer doesn't resolve to anything better than
/// `Variant`.
pub fn infer_from_initializer(
    host_db: &Arc<dyn Provider>,
    class: &ProjectClass,
    arena: &Arena,
    initializer: NodeId,
) -> Option<String> {
    let collector = ReturnTypeCollector {
        host_db,
        class,
        arena,
        local_var_types: rustc_hash::FxHashMap::default(),
    };
    let ty = collector.infer_expr(initializer);
    if ty.is_variant() {
        None
    } else {
        Some(ty.display_name())
    }
}
