//! Parent-linked binding frames kept in an arena.
//!
//! Frames are addressed by [`ScopeId`]. Blocks are strictly nested, so a
//! block's frames always sit at the end of the arena and are dropped again
//! by truncation when the block ends. A frame created earlier (the globals
//! frame a closure captured, say) outlives every block started after it.
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(usize);

#[derive(Debug)]
struct Frame<V, F> {
    parent: Option<ScopeId>,
    variables: BTreeMap<String, V>,
    functions: BTreeMap<(String, usize), F>,
}

impl<V, F> Frame<V, F> {
    fn new(parent: Option<ScopeId>) -> Frame<V, F> {
        Frame {
            parent,
            variables: BTreeMap::new(),
            functions: BTreeMap::new(),
        }
    }
}

/// State to hand back to [`Scopes::end_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Mark {
    current: ScopeId,
    len: usize,
}

#[derive(Debug)]
pub struct Scopes<V, F> {
    frames: Vec<Frame<V, F>>,
    current: ScopeId,
}

impl<V, F> Default for Scopes<V, F> {
    fn default() -> Self {
        Scopes::new()
    }
}

impl<V, F> Scopes<V, F> {
    /// A single root frame, which is also the current one.
    pub fn new() -> Scopes<V, F> {
        Scopes {
            frames: vec![Frame::new(None)],
            current: ScopeId(0),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.frame(scope).and_then(|frame| frame.parent)
    }

    /// Adds a frame without making it current.
    pub fn allocate(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.frames.push(Frame::new(parent));
        ScopeId(self.frames.len() - 1)
    }

    /// Makes a fresh child of `parent` the current frame.
    pub fn start_block(&mut self, parent: ScopeId) -> Mark {
        let mark = Mark {
            current: self.current,
            len: self.frames.len(),
        };
        self.current = self.allocate(Some(parent));
        mark
    }

    /// Drops every frame created since `mark` and restores its current frame.
    pub fn end_block(&mut self, mark: Mark) {
        self.frames.truncate(mark.len);
        self.current = mark.current;
    }

    pub fn define_variable(&mut self, name: &str, variable: V) {
        let current = self.current;
        self.define_variable_in(current, name, variable);
    }

    pub fn define_variable_in(&mut self, scope: ScopeId, name: &str, variable: V) {
        if let Some(frame) = self.frames.get_mut(scope.0) {
            frame.variables.insert(name.to_string(), variable);
        }
    }

    pub fn define_function(&mut self, name: &str, arity: usize, function: F) {
        let current = self.current;
        self.define_function_in(current, name, arity, function);
    }

    pub fn define_function_in(&mut self, scope: ScopeId, name: &str, arity: usize, function: F) {
        if let Some(frame) = self.frames.get_mut(scope.0) {
            frame.functions.insert((name.to_string(), arity), function);
        }
    }

    pub fn is_variable_defined_here(&self, name: &str) -> bool {
        self.frame(self.current)
            .map_or(false, |frame| frame.variables.contains_key(name))
    }

    pub fn is_function_defined_here(&self, name: &str, arity: usize) -> bool {
        self.frame(self.current).map_or(false, |frame| {
            frame.functions.contains_key(&(name.to_string(), arity))
        })
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&V> {
        self.lookup_variable_from(self.current, name)
    }

    pub fn lookup_variable_from(&self, scope: ScopeId, name: &str) -> Option<&V> {
        let id = self.find(scope, |frame| frame.variables.contains_key(name))?;
        self.frames[id.0].variables.get(name)
    }

    pub fn lookup_variable_mut(&mut self, name: &str) -> Option<&mut V> {
        let id = self.find(self.current, |frame| frame.variables.contains_key(name))?;
        self.frames[id.0].variables.get_mut(name)
    }

    pub fn lookup_function(&self, name: &str, arity: usize) -> Option<&F> {
        self.lookup_function_from(self.current, name, arity)
    }

    pub fn lookup_function_from(&self, scope: ScopeId, name: &str, arity: usize) -> Option<&F> {
        let key = (name.to_string(), arity);
        let id = self.find(scope, |frame| frame.functions.contains_key(&key))?;
        self.frames[id.0].functions.get(&key)
    }

    fn frame(&self, scope: ScopeId) -> Option<&Frame<V, F>> {
        self.frames.get(scope.0)
    }

    /// Nearest frame, walking up from `scope`, that satisfies `test`.
    fn find<P>(&self, scope: ScopeId, test: P) -> Option<ScopeId>
    where
        P: Fn(&Frame<V, F>) -> bool,
    {
        let mut next = Some(scope);
        while let Some(id) = next {
            let frame = self.frame(id)?;
            if test(frame) {
                return Some(id);
            }
            next = frame.parent;
        }
        None
    }
}

#[cfg(test)]
mod scope_tests {
    use crate::scope::Scopes;

    #[test]
    fn shadowing_hides_without_destroying() {
        let mut scopes: Scopes<i32, &str> = Scopes::new();
        scopes.define_variable("x", 1);
        let root = scopes.current();
        let mark = scopes.start_block(root);
        assert_eq!(scopes.lookup_variable("x"), Some(&1));
        scopes.define_variable("x", 2);
        assert_eq!(scopes.lookup_variable("x"), Some(&2));
        assert!(scopes.is_variable_defined_here("x"));
        scopes.end_block(mark);
        assert_eq!(scopes.lookup_variable("x"), Some(&1));
        assert_eq!(scopes.current(), root);
    }

    #[test]
    fn functions_are_keyed_by_arity() {
        let mut scopes: Scopes<i32, &str> = Scopes::new();
        scopes.define_function("f", 0, "nullary");
        scopes.define_function("f", 2, "binary");
        let mark = scopes.start_block(scopes.root());
        assert_eq!(scopes.lookup_function("f", 0), Some(&"nullary"));
        assert_eq!(scopes.lookup_function("f", 2), Some(&"binary"));
        assert_eq!(scopes.lookup_function("f", 1), None);
        assert!(!scopes.is_function_defined_here("f", 0));
        scopes.end_block(mark);
        assert!(scopes.is_function_defined_here("f", 2));
    }

    #[test]
    fn assignment_reaches_the_defining_frame() {
        let mut scopes: Scopes<i32, ()> = Scopes::new();
        scopes.define_variable("x", 1);
        let mark = scopes.start_block(scopes.root());
        if let Some(x) = scopes.lookup_variable_mut("x") {
            *x = 5;
        }
        assert!(scopes.lookup_variable_mut("y").is_none());
        scopes.end_block(mark);
        assert_eq!(scopes.lookup_variable("x"), Some(&5));
    }

    #[test]
    fn blocks_can_start_from_a_captured_frame() {
        let mut scopes: Scopes<i32, ()> = Scopes::new();
        let globals = scopes.allocate(Some(scopes.root()));
        scopes.define_variable_in(globals, "g", 7);
        let outer = scopes.start_block(globals);
        scopes.define_variable("local", 1);
        let inner = scopes.start_block(globals);
        assert_eq!(scopes.lookup_variable("g"), Some(&7));
        assert_eq!(scopes.lookup_variable("local"), None);
        assert_eq!(scopes.parent(scopes.current()), Some(globals));
        scopes.end_block(inner);
        assert_eq!(scopes.lookup_variable("local"), Some(&1));
        scopes.end_block(outer);
        assert_eq!(scopes.lookup_variable_from(globals, "g"), Some(&7));
    }
}
