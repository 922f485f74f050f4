use htsql_catalog::{naming::normalize_name, ClassId, ModelGraph};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::binding::Binding;

/// What kind of lookup surface a [`ScopeFrame`] provides (§4.3 "Scopes").
#[derive(Debug, Clone)]
pub enum ScopeKind {
    /// All visible classes and user globals.
    Root,
    /// A class's attributes and links, plus in-scope defines.
    Class { class: ClassId },
    /// Kernel elements and the complement link back to `base_class`.
    Projection { base_class: ClassId, kernel: IndexMap<SmolStr, Binding>, complement_name: SmolStr },
}

impl ScopeKind {
    pub fn describe(&self) -> &'static str {
        match self {
            ScopeKind::Root => "root scope",
            ScopeKind::Class { .. } => "class scope",
            ScopeKind::Projection { .. } => "projection scope",
        }
    }
}

/// One level of the scope stack (§4.3). `current` is the flow binding new
/// identifier lookups attach themselves to as `base`.
#[derive(Debug, Clone)]
pub struct ScopeFrame {
    pub kind: ScopeKind,
    pub current: Option<Binding>,
    pub defines: IndexMap<SmolStr, Binding>,
}

/// The scope stack threaded through binding, plus the parallel `$name`
/// reference namespace.
pub struct Scopes<'g> {
    graph: &'g ModelGraph,
    frames: Vec<ScopeFrame>,
    references: IndexMap<SmolStr, Binding>,
}

impl<'g> Scopes<'g> {
    pub fn new(graph: &'g ModelGraph) -> Self {
        Self {
            graph,
            frames: vec![ScopeFrame { kind: ScopeKind::Root, current: None, defines: IndexMap::new() }],
            references: IndexMap::new(),
        }
    }

    pub fn graph(&self) -> &'g ModelGraph {
        self.graph
    }

    pub fn current(&self) -> &ScopeFrame {
        self.frames.last().expect("scope stack is never empty")
    }

    pub fn push_class(&mut self, class: ClassId, current: Binding) {
        self.frames.push(ScopeFrame { kind: ScopeKind::Class { class }, current: Some(current), defines: IndexMap::new() });
    }

    pub fn push_projection(
        &mut self,
        base_class: ClassId,
        current: Binding,
        kernel: IndexMap<SmolStr, Binding>,
        complement_name: SmolStr,
    ) {
        self.frames.push(ScopeFrame {
            kind: ScopeKind::Projection { base_class, kernel, complement_name },
            current: Some(current),
            defines: IndexMap::new(),
        });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn define(&mut self, name: &str, binding: Binding) {
        let key = normalize_name(name);
        self.frames.last_mut().expect("scope stack is never empty").defines.insert(key, binding);
    }

    pub fn lookup_define(&self, name: &str) -> Option<&Binding> {
        let key = normalize_name(name);
        self.frames.iter().rev().find_map(|f| f.defines.get(&key))
    }

    pub fn capture_reference(&mut self, name: &str, binding: Binding) {
        self.references.insert(normalize_name(name), binding);
    }

    pub fn lookup_reference(&self, name: &str) -> Option<&Binding> {
        self.references.get(&normalize_name(name))
    }

    pub fn scope_trail(&self) -> Vec<&'static str> {
        self.frames.iter().rev().map(|f| f.kind.describe()).collect()
    }
}
