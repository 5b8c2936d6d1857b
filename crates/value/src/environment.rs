//! Lexically scoped binding environment (§3, §4.1).

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

/// Shared handle to an [`Environment`] frame.
///
/// Closures capture this directly (`Rc::clone`) so the declaring scope
/// outlives the block that created it, matching §9's "captured scope
/// outlives the declaring block."
pub type SharedEnv = Rc<RefCell<Environment>>;

/// Binding visibility (§3). `Public` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
    PrivateModule,
}

/// A struct type definition: ordered field name -> declared type name.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: IndexMap<String, String>,
}

impl StructDef {
    fn error_builtin() -> Self {
        let mut fields = IndexMap::new();
        fields.insert("message".to_string(), "string".to_string());
        fields.insert("code".to_string(), "int".to_string());
        StructDef {
            name: "Error".to_string(),
            fields,
        }
    }
}

/// A lexically scoped binding frame with an optional parent (§3, §4.1).
#[derive(Debug)]
pub struct Environment {
    store: HashMap<String, Value>,
    mutable: HashMap<String, bool>,
    visibility: HashMap<String, Visibility>,
    struct_defs: HashMap<String, StructDef>,
    imports: HashMap<String, String>,
    using: Vec<String>,
    modules: HashMap<String, Value>,
    outer: Option<SharedEnv>,
    loop_depth: u32,
}

impl Environment {
    /// Create an empty chain root, pre-registering the built-in `Error`
    /// struct definition (`message: string, code: int`).
    pub fn new() -> Self {
        let mut struct_defs = HashMap::new();
        let error_def = StructDef::error_builtin();
        struct_defs.insert(error_def.name.clone(), error_def);

        Environment {
            store: HashMap::new(),
            mutable: HashMap::new(),
            visibility: HashMap::new(),
            struct_defs,
            imports: HashMap::new(),
            using: Vec::new(),
            modules: HashMap::new(),
            outer: None,
            loop_depth: 0,
        }
    }

    /// Create a child frame that delegates lookups to `outer` and inherits
    /// its current loop depth.
    pub fn new_enclosed(outer: SharedEnv) -> Self {
        let loop_depth = outer.borrow().loop_depth;
        Environment {
            store: HashMap::new(),
            mutable: HashMap::new(),
            visibility: HashMap::new(),
            struct_defs: HashMap::new(),
            imports: HashMap::new(),
            using: Vec::new(),
            modules: HashMap::new(),
            outer: Some(outer),
            loop_depth,
        }
    }

    /// Search this frame then outer; first match wins.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.store.get(name) {
            return Some(v.clone());
        }
        self.outer.as_ref().and_then(|o| o.borrow().get(name))
    }

    /// Unconditionally install in this frame, shadowing outer.
    pub fn set(&mut self, name: impl Into<String>, value: Value, mutable: bool) {
        let name = name.into();
        self.mutable.insert(name.clone(), mutable);
        self.store.insert(name, value);
    }

    /// As [`Environment::set`], also recording visibility.
    pub fn set_with_visibility(
        &mut self,
        name: impl Into<String>,
        value: Value,
        mutable: bool,
        visibility: Visibility,
    ) {
        let name = name.into();
        self.visibility.insert(name.clone(), visibility);
        self.set(name, value, mutable);
    }

    /// Find the innermost frame containing `name`; write if mutable.
    ///
    /// Returns `(found, updated)`: `(true, true)` on a successful write,
    /// `(true, false)` if the binding exists but is immutable, `(false,
    /// false)` if absent anywhere in the chain.
    pub fn update(&mut self, name: &str, value: Value) -> (bool, bool) {
        if self.store.contains_key(name) {
            let is_mutable = *self.mutable.get(name).unwrap_or(&false);
            if is_mutable {
                self.store.insert(name.to_string(), value);
                (true, true)
            } else {
                (true, false)
            }
        } else if let Some(outer) = &self.outer {
            outer.borrow_mut().update(name, value)
        } else {
            (false, false)
        }
    }

    /// Chain-aware mutability query.
    pub fn is_mutable(&self, name: &str) -> Option<bool> {
        if let Some(m) = self.mutable.get(name) {
            return Some(*m);
        }
        self.outer.as_ref().and_then(|o| o.borrow().is_mutable(name))
    }

    pub fn enter_loop(&mut self) {
        self.loop_depth += 1;
    }

    pub fn exit_loop(&mut self) {
        self.loop_depth = self.loop_depth.saturating_sub(1);
    }

    pub fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }

    pub fn loop_depth(&self) -> u32 {
        self.loop_depth
    }

    pub fn register_struct_def(&mut self, def: StructDef) {
        self.struct_defs.insert(def.name.clone(), def);
    }

    pub fn get_struct_def(&self, name: &str) -> Option<StructDef> {
        if let Some(d) = self.struct_defs.get(name) {
            return Some(d.clone());
        }
        self.outer.as_ref().and_then(|o| o.borrow().get_struct_def(name))
    }

    pub fn import(&mut self, alias: impl Into<String>, module: impl Into<String>) {
        self.imports.insert(alias.into(), module.into());
    }

    pub fn get_import(&self, alias: &str) -> Option<String> {
        if let Some(m) = self.imports.get(alias) {
            return Some(m.clone());
        }
        self.outer.as_ref().and_then(|o| o.borrow().get_import(alias))
    }

    /// Bring a module into scope at file level in this frame.
    pub fn use_module(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        if !self.using.contains(&alias) {
            self.using.push(alias);
        }
    }

    /// De-duplicated union of this environment and all ancestors,
    /// order-preserving by first occurrence (this frame's entries first).
    pub fn get_using(&self) -> Vec<String> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        self.collect_using(&mut result, &mut seen);
        result
    }

    fn collect_using(&self, result: &mut Vec<String>, seen: &mut HashSet<String>) {
        for alias in &self.using {
            if seen.insert(alias.clone()) {
                result.push(alias.clone());
            }
        }
        if let Some(outer) = &self.outer {
            outer.borrow().collect_using(result, seen);
        }
    }

    pub fn register_module(&mut self, name: impl Into<String>, value: Value) {
        self.modules.insert(name.into(), value);
    }

    pub fn get_module(&self, name: &str) -> Option<Value> {
        if let Some(m) = self.modules.get(name) {
            return Some(m.clone());
        }
        self.outer.as_ref().and_then(|o| o.borrow().get_module(name))
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.get_module(name).is_some()
    }

    /// Chain-aware visibility lookup.
    pub fn get_visibility(&self, name: &str) -> Option<Visibility> {
        if let Some(v) = self.visibility.get(name) {
            return Some(*v);
        }
        self.outer.as_ref().and_then(|o| o.borrow().get_visibility(name))
    }

    /// Bindings whose visibility is `Public` in this frame only (no walk
    /// to outer).
    pub fn get_public_bindings(&self) -> HashMap<String, Value> {
        self.store
            .iter()
            .filter(|(name, _)| {
                matches!(
                    self.visibility.get(*name).copied().unwrap_or_default(),
                    Visibility::Public
                )
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Flat snapshot of every binding visible from this frame, walking
    /// outward. Inner bindings shadow outer (first occurrence wins).
    /// Used by the debugger's variable inspector (§4.2).
    pub fn flatten(&self) -> HashMap<String, Value> {
        let mut result = HashMap::new();
        self.collect_flat(&mut result);
        result
    }

    fn collect_flat(&self, result: &mut HashMap<String, Value>) {
        if let Some(outer) = &self.outer {
            outer.borrow().collect_flat(result);
        }
        for (name, value) in &self.store {
            result.insert(name.clone(), value.clone());
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}
