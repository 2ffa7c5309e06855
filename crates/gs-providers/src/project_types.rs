//! Project Types Provider (§4.3): builds and maintains an incrementally
//! refreshable class cache from the AST of every project source file, and
//! performs lazy, thread-safe return-type and property-type inference for
//! members without explicit annotations.

use crate::lazy_inference::{infer_from_initializer, ReturnTypeCollector};
use dashmap::{DashMap, DashSet};
use gs_ast::{ClassDecl, DeclKind, ExprKind, NodeId, NodeKind, ScriptFile};
use gs_common::path::index_keys_for_path;
use gs_types::{MemberInfo, ParameterInfo, Provider, SignalMember, TypeInfo, TypeValue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

pub struct ProjectProperty {
    pub name: String,
    pub declared_type: Option<String>,
    pub initializer: Option<NodeId>,
    pub is_const: bool,
    type_name: RwLock<String>,
    type_inferred: AtomicBool,
}

impl ProjectProperty {
    fn new(name: String, declared_type: Option<String>, initializer: Option<NodeId>, is_const: bool) -> Self {
        let placeholder = declared_type.clone().unwrap_or_else(|| "Variant".to_string());
        let inferred = declared_type.is_some();
        Self {
            name,
            declared_type,
            initializer,
            is_const,
            type_name: RwLock::new(placeholder),
            type_inferred: AtomicBool::new(inferred),
        }
    }

    pub fn current_type_name(&self) -> String {
        self.type_name.read().unwrap().clone()
    }

    /// Has an AST back-reference to the initializer, per the invariant that
    /// a property without an explicit annotation — or one marked const —
    /// always carries one (§3).
    fn needs_lazy_inference(&self) -> bool {
        self.declared_type.is_none() && self.initializer.is_some()
    }
}

pub struct ProjectMethod {
    pub name: String,
    pub params: Vec<ParameterInfo>,
    pub declared_return: Option<String>,
    pub body: Vec<NodeId>,
    pub is_static: bool,
    return_type: RwLock<String>,
    return_type_inferred: AtomicBool,
}

impl ProjectMethod {
    fn new(
        name: String,
        params: Vec<ParameterInfo>,
        declared_return: Option<String>,
        body: Vec<NodeId>,
        is_static: bool,
    ) -> Self {
        let placeholder = declared_return.clone().unwrap_or_else(|| "Variant".to_string());
        let inferred = declared_return.is_some();
        Self {
            name,
            params,
            declared_return,
            body,
            is_static,
            return_type: RwLock::new(placeholder),
            return_type_inferred: AtomicBool::new(inferred),
        }
    }

    pub fn current_return_type_name(&self) -> String {
        self.return_type.read().unwrap().clone()
    }
}

pub struct ProjectClass {
    pub name: String,
    pub qualified_name: String,
    pub script_path: Option<String>,
    pub base_type_name: Option<String>,
    pub is_abstract: bool,
    pub methods: Vec<ProjectMethod>,
    pub properties: Vec<ProjectProperty>,
    pub signals: Vec<SignalMember>,
    pub inner_class_names: Vec<String>,
    /// `true` for a synthetic `Owner.EnumName` entry (§3: base `int`,
    /// properties are the enum's values as constants).
    pub is_enum: bool,
    pub script: Option<Arc<ScriptFile>>,
    pub class_node: Option<NodeId>,
}

impl ProjectClass {
    fn to_type_info(&self) -> TypeInfo {
        let mut info = TypeInfo::new(self.qualified_name.clone());
        info.base_type = self.base_type_name.clone();
        info.is_abstract = self.is_abstract;
        for m in &self.methods {
            info.members.push(MemberInfo::Method(gs_types::MethodMember::from_parameters(
                m.name.clone(),
                m.current_return_type_name(),
                m.params.clone(),
            )));
        }
        for p in &self.properties {
            if self.is_enum {
                info.members.push(MemberInfo::Constant(gs_types::ConstantMember {
                    name: p.name.clone(),
                    type_name: p.current_type_name(),
                    initializer_ast: p.initializer,
                }));
            } else if p.is_const {
                info.members.push(MemberInfo::Constant(gs_types::ConstantMember {
                    name: p.name.clone(),
                    type_name: p.current_type_name(),
                    initializer_ast: p.initializer,
                }));
            } else {
                info.members.push(MemberInfo::Property(gs_types::PropertyMember {
                    name: p.name.clone(),
                    type_name: p.current_type_name(),
                    is_static: false,
                }));
            }
        }
        for s in &self.signals {
            info.members.push(MemberInfo::Signal(s.clone()));
        }
        info
    }
}

#[derive(Default)]
pub struct ProjectTypesProvider {
    by_class_name: DashMap<String, Arc<ProjectClass>>,
    by_path: DashMap<String, String>,
    by_preload_alias: DashMap<String, String>,
    methods_being_inferred: DashSet<(String, String)>,
    properties_being_inferred: DashSet<(String, String)>,
    host_db: Option<Arc<dyn Provider>>,
}

impl ProjectTypesProvider {
    pub fn new(host_db: Arc<dyn Provider>) -> Self {
        Self {
            host_db: Some(host_db),
            ..Default::default()
        }
    }

    fn host(&self) -> &Arc<dyn Provider> {
        self.host_db.as_ref().expect("ProjectTypesProvider constructed via new()")
    }

    /// Rebuilds the whole class cache from scratch from the given set of
    /// parsed project scripts. NOT safe to call concurrently with readers
    /// (§5) — callers must quiesce the system first.
    pub fn rebuild_cache(&self, scripts: &[Arc<ScriptFile>]) {
        self.by_class_name.clear();
        self.by_path.clear();
        self.by_preload_alias.clear();

        for script in scripts {
            self.register_script(script);
        }
        for script in scripts {
            self.register_preload_aliases(script);
        }
        debug!(
            classes = self.by_class_name.len(),
            paths = self.by_path.len(),
            "ProjectTypesProvider cache rebuilt"
        );
    }

    fn register_script(&self, script: &Arc<ScriptFile>) {
        let NodeKind::Decl(DeclKind::Class(class)) = &script.arena.get(script.root_class).kind
        else {
            return;
        };
        let name = class.name.clone().unwrap_or_else(|| "_Anonymous".to_string());
        self.register_class(script, class, script.root_class, &name, &name, false);

        for key in index_keys_for_path(&script.full_path, &script.resource_path) {
            self.by_path.insert(key, name.clone());
        }
    }

    fn register_class(
        &self,
        script: &Arc<ScriptFile>,
        class: &ClassDecl,
        class_node: NodeId,
        short_name: &str,
        qualified_name: &str,
        is_inner: bool,
    ) {
        let base_type_name = class.extends.as_ref().and_then(|e| match e {
            gs_ast::ExtendsRef::Name(n) => Some(n.clone()),
            gs_ast::ExtendsRef::Path(path) => self
                .by_path
                .get(&gs_common::path::normalize_script_path(path))
                .map(|r| r.clone()),
        });

        let mut methods = Vec::new();
        for &m_id in &class.methods {
            if let NodeKind::Decl(DeclKind::Method(m)) = &script.arena.get(m_id).kind {
                let params = m
                    .params
                    .iter()
                    .map(|p| {
                        let mut pi = ParameterInfo::simple(
                            p.name.clone(),
                            p.declared_type.clone().unwrap_or_else(|| "Variant".to_string()),
                        );
                        pi.has_default = p.default_value.is_some();
                        pi
                    })
                    .collect();
                methods.push(ProjectMethod::new(
                    m.name.clone(),
                    params,
                    m.declared_return.clone(),
                    m.body.clone(),
                    m.is_static,
                ));
            }
        }

        let mut properties = Vec::new();
        for &v_id in &class.variables {
            if let NodeKind::Decl(DeclKind::Variable(v)) = &script.arena.get(v_id).kind {
                properties.push(ProjectProperty::new(
                    v.name.clone(),
                    v.declared_type.clone(),
                    v.initializer,
                    v.is_const,
                ));
            }
        }

        let mut signals = Vec::new();
        for &s_id in &class.signals {
            if let NodeKind::Decl(DeclKind::Signal(s)) = &script.arena.get(s_id).kind {
                signals.push(SignalMember {
                    name: s.name.clone(),
                    parameter_type_names: s
                        .params
                        .iter()
                        .map(|p| p.declared_type.clone().unwrap_or_else(|| "Variant".to_string()))
                        .collect(),
                });
            }
        }

        let inner_class_names: Vec<String> = class
            .inner_classes
            .iter()
            .filter_map(|&inner_id| match &script.arena.get(inner_id).kind {
                NodeKind::Decl(DeclKind::Class(inner)) => inner.name.clone(),
                _ => None,
            })
            .collect();

        let project_class = Arc::new(ProjectClass {
            name: short_name.to_string(),
            qualified_name: qualified_name.to_string(),
            script_path: Some(script.resource_path.clone()),
            base_type_name,
            is_abstract: class.is_abstract,
            methods,
            properties,
            signals,
            inner_class_names: inner_class_names.clone(),
            is_enum: false,
            script: Some(script.clone()),
            class_node: Some(class_node),
        });

        // Short name registered for back-compat; qualified name is
        // authoritative when both exist (§3).
        if !is_inner || !self.by_class_name.contains_key(short_name) {
            self.by_class_name
                .insert(short_name.to_string(), project_class.clone());
        }
        if qualified_name != short_name {
            self.by_class_name
                .insert(qualified_name.to_string(), project_class.clone());
        }

        for &enum_id in &class.enums {
            if let NodeKind::Decl(DeclKind::Enum(e)) = &script.arena.get(enum_id).kind {
                self.register_enum(script, e, qualified_name);
            }
        }

        for &inner_id in &class.inner_classes {
            if let NodeKind::Decl(DeclKind::Class(inner)) = &script.arena.get(inner_id).kind {
                let inner_short = inner.name.clone().unwrap_or_else(|| "_Anonymous".to_string());
                let inner_qualified = format!("{qualified_name}.{inner_short}");
                self.register_class(script, inner, inner_id, &inner_short, &inner_qualified, true);
            }
        }
    }

    fn register_enum(&self, script: &Arc<ScriptFile>, e: &gs_ast::EnumDecl, owner_qualified: &str) {
        let qualified = format!("{owner_qualified}.{}", e.name);
        let properties: Vec<ProjectProperty> = e
            .values
            .iter()
            .map(|v| ProjectProperty::new(v.clone(), Some("int".to_string()), None, true))
            .collect();
        let project_class = Arc::new(ProjectClass {
            name: e.name.clone(),
            qualified_name: qualified.clone(),
            script_path: Some(script.resource_path.clone()),
            base_type_name: Some("int".to_string()),
            is_abstract: false,
            methods: Vec::new(),
            properties,
            signals: Vec::new(),
            inner_class_names: Vec::new(),
            is_enum: true,
            script: Some(script.clone()),
            class_node: None,
        });
        self.by_class_name.insert(qualified, project_class);
    }

    fn register_preload_aliases(&self, script: &Arc<ScriptFile>) {
        let NodeKind::Decl(DeclKind::Class(class)) = &script.arena.get(script.root_class).kind
        else {
            return;
        };
        for &v_id in &class.variables {
            let NodeKind::Decl(DeclKind::Variable(v)) = &script.arena.get(v_id).kind else {
                continue;
            };
            if !v.is_const {
                continue;
            }
            let Some(init) = v.initializer else { continue };
            let NodeKind::Expr(ExprKind::Call { callee, args }) = &script.arena.get(init).kind
            else {
                continue;
            };
            let NodeKind::Expr(ExprKind::Identifier(callee_name)) = &script.arena.get(*callee).kind
            else {
                continue;
            };
            if callee_name != "preload" {
                continue;
            }
            let Some(&arg0) = args.first() else { continue };
            let NodeKind::Expr(ExprKind::StringLiteral(path)) = &script.arena.get(arg0).kind else {
                continue;
            };
            let key = gs_common::path::normalize_script_path(path);
            let Some(class_name) = self.by_path.get(&key).map(|r| r.clone()) else {
                continue;
            };
            if self.by_class_name.contains_key(&v.name) {
                // Alias collides with an actual class name: Open Question 1
                // (see DESIGN.md) — we treat the class name as authoritative
                // and skip registering the alias.
                continue;
            }
            self.by_preload_alias.insert(v.name.clone(), class_name);
        }
    }

    /// Resolves a (possibly aliased or qualified) type reference to its
    /// canonical registered class name.
    fn resolve_canonical(&self, name: &str) -> Option<String> {
        if self.by_class_name.contains_key(name) {
            return Some(name.to_string());
        }
        self.by_preload_alias.get(name).map(|r| r.clone())
    }

    pub fn resolve_class_by_path(&self, path: &str) -> Option<String> {
        let key = gs_common::path::normalize_script_path(path);
        self.by_path.get(&key).map(|r| r.clone())
    }

    /// Climbs `T`'s base chain using only this provider's own index,
    /// returning the declaring type's canonical name alongside the member
    /// (§4.3). Guarded against cycles with a visited set.
    pub fn get_member_with_declaring_type(
        &self,
        type_name: &str,
        member: &str,
    ) -> Option<(String, MemberInfo)> {
        let mut current = self.resolve_canonical(type_name)?;
        let mut visited = rustc_hash::FxHashSet::default();
        loop {
            if !visited.insert(current.clone()) {
                return None;
            }
            let class = self.by_class_name.get(&current)?;
            if let Some(m) = class.to_type_info().member(member) {
                return Some((current.clone(), m.clone()));
            }
            let base = class.base_type_name.clone()?;
            current = self.resolve_canonical(&base)?;
        }
    }

    pub fn find_types_with_method(&self, method: &str) -> Vec<String> {
        self.by_class_name
            .iter()
            .filter(|e| e.value().methods.iter().any(|m| m.name == method))
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn find_types_with_property(&self, property: &str) -> Vec<String> {
        self.by_class_name
            .iter()
            .filter(|e| {
                e.value()
                    .properties
                    .iter()
                    .any(|p| p.name == property && !p.is_const)
            })
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn is_known_preload_alias(&self, name: &str) -> bool {
        self.by_preload_alias.contains_key(name)
    }

    /// Lazily infers and caches a method's return type (§4.3, "Lazy member
    /// inference"). Thread-safe: a concurrent guard set prevents redundant
    /// work, and an abort on any path always clears the inflight marker.
    pub fn infer_return_type(&self, class_name: &str, method_name: &str) -> String {
        let Some(canonical) = self.resolve_canonical(class_name) else {
            return "Variant".to_string();
        };
        let Some(class) = self.by_class_name.get(&canonical) else {
            return "Variant".to_string();
        };
        let Some(method) = class.methods.iter().find(|m| m.name == method_name) else {
            return "Variant".to_string();
        };
        if method.return_type_inferred.load(Ordering::Acquire) {
            return method.current_return_type_name();
        }

        let key = (canonical.clone(), method_name.to_string());
        if !self.methods_being_inferred.insert(key.clone()) {
            trace!(class = %canonical, method = %method_name, "return-type inference cycle guard hit");
            return method.current_return_type_name();
        }

        // Second check: another thread may have finished while we were
        // inserting the guard.
        if method.return_type_inferred.load(Ordering::Acquire) {
            self.methods_being_inferred.remove(&key);
            return method.current_return_type_name();
        }

        let unified = match &class.script {
            Some(script) => {
                let seeded_params = method
                    .params
                    .iter()
                    .map(|p| (p.name.clone(), TypeValue::concrete(p.type_name.clone())));
                ReturnTypeCollector::collect_from_body(
                    self.host(),
                    &class,
                    &script.arena,
                    seeded_params,
                    &method.body,
                )
            }
            None => TypeValue::Variant,
        };
        self.methods_being_inferred.remove(&key);

        let unified_name = unified.display_name();
        if !(unified_name.is_empty() || unified_name == "Variant" || unified_name == "null") {
            *method.return_type.write().unwrap() = unified_name;
        }
        method.return_type_inferred.store(true, Ordering::Release);
        method.current_return_type_name()
    }

    /// Lazily infers and caches a property's type from its initializer
    /// (§4.3, "Property type").
    pub fn infer_property_type(&self, class_name: &str, property_name: &str) -> String {
        let Some(canonical) = self.resolve_canonical(class_name) else {
            return "Variant".to_string();
        };
        let Some(class) = self.by_class_name.get(&canonical) else {
            return "Variant".to_string();
        };
        let Some(prop) = class.properties.iter().find(|p| p.name == property_name) else {
            return "Variant".to_string();
        };
        if prop.type_inferred.load(Ordering::Acquire) {
            return prop.current_type_name();
        }
        if !prop.needs_lazy_inference() {
            prop.type_inferred.store(true, Ordering::Release);
            return prop.current_type_name();
        }

        let key = (canonical.clone(), property_name.to_string());
        if !self.properties_being_inferred.insert(key.clone()) {
            return prop.current_type_name();
        }
        if prop.type_inferred.load(Ordering::Acquire) {
            self.properties_being_inferred.remove(&key);
            return prop.current_type_name();
        }

        let inferred = class.script.as_ref().and_then(|script| {
            prop.initializer
                .and_then(|init| infer_from_initializer(self.host(), &class, &script.arena, init))
        });
        self.properties_being_inferred.remove(&key);

        if let Some(name) = inferred {
            *prop.type_name.write().unwrap() = name;
        }
        prop.type_inferred.store(true, Ordering::Release);
        prop.current_type_name()
    }
}

impl Provider for ProjectTypesProvider {
    fn is_known_type(&self, name: &str) -> bool {
        self.resolve_canonical(name).is_some()
    }

    fn get_type_info(&self, name: &str) -> Option<TypeInfo> {
        let canonical = self.resolve_canonical(name)?;
        // Clone the Arc and drop the DashMap guard before calling back into
        // `infer_return_type`/`infer_property_type`, which re-enter
        // `by_class_name` on the same key — holding the guard here would
        // deadlock against that shard's lock.
        let class = self.by_class_name.get(&canonical)?.clone();
        for m in &class.methods {
            if m.declared_return.is_none() {
                self.infer_return_type(&canonical, &m.name);
            }
        }
        for p in &class.properties {
            if p.needs_lazy_inference() {
                self.infer_property_type(&canonical, &p.name);
            }
        }
        Some(class.to_type_info())
    }

    fn get_member(&self, type_name: &str, member: &str) -> Option<MemberInfo> {
        let canonical = self.resolve_canonical(type_name)?;
        let class = self.by_class_name.get(&canonical)?.clone();
        if let Some(m) = class.methods.iter().find(|m| m.name == member) {
            if m.declared_return.is_none() {
                self.infer_return_type(&canonical, member);
            }
        }
        if let Some(p) = class.properties.iter().find(|p| p.name == member) {
            if p.needs_lazy_inference() {
                self.infer_property_type(&canonical, member);
            }
        }
        class.to_type_info().member(member).cloned()
    }

    fn get_global_class(&self, name: &str) -> Option<TypeInfo> {
        self.get_type_info(name)
    }

    fn get_all_types(&self) -> Vec<String> {
        self.by_class_name.iter().map(|e| e.key().clone()).collect()
    }

    fn find_types_with_method(&self, method: &str) -> Vec<String> {
        ProjectTypesProvider::find_types_with_method(self, method)
    }

    fn find_types_with_property(&self, property: &str) -> Vec<String> {
        ProjectTypesProvider::find_types_with_property(self, property)
    }
}
