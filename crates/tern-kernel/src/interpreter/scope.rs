//! Variable scope capability and the in-memory reference store.
//!
//! Scopes provide string-valued bindings with:
//! - Nested frames (push/pop around each command invocation)
//! - `set` that updates an existing binding wherever it lives
//! - `set_local` that always binds in the innermost frame
//! - An environment view for child processes

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::{Deref, DerefMut};

/// What the evaluator and the arithmetic parser need from variable storage.
///
/// Frames nest strictly LIFO. Implementations panic when asked to pop the
/// root frame; that is a caller bug.
pub trait Scope {
    /// Look a name up from innermost to outermost frame.
    fn get(&self, name: &str) -> Option<&str>;

    /// Update the innermost frame already binding `name`, or create it in
    /// the innermost frame.
    fn set(&mut self, name: &str, value: String);

    /// Bind `name` in the innermost frame only.
    fn set_local(&mut self, name: &str, value: String);

    fn push(&mut self);

    fn pop(&mut self);

    /// Materialize the environment for a child process, sorted by name.
    fn environ(&self) -> Vec<(String, String)>;
}

/// Frame stack of string bindings plus an export set.
///
/// Variables are looked up from innermost to outermost frame.
#[derive(Debug, Clone)]
pub struct VarScope {
    /// Stack of frames. Last element is the innermost.
    frames: Vec<HashMap<String, String>>,
    /// Root-frame names passed to child processes.
    exported: HashSet<String>,
}

impl VarScope {
    /// Create a scope with one empty root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
            exported: HashSet::new(),
        }
    }

    /// Seed the root frame from the process environment, exporting every
    /// inherited name. Non-UTF-8 entries are skipped.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Seed the root frame from `vars`, exporting every name.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut scope = Self::new();
        for (name, value) in vars {
            scope.set_exported(name, value);
        }
        scope
    }

    /// Set a variable and mark it as exported.
    pub fn set_exported(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.set(&name, value.into());
        self.exported.insert(name);
    }

    /// Mark a variable as exported. It need not exist yet.
    pub fn export(&mut self, name: impl Into<String>) {
        self.exported.insert(name.into());
    }

    pub fn is_exported(&self, name: &str) -> bool {
        self.exported.contains(name)
    }

    /// Remove a variable, searching from innermost to outermost frame.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.remove(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of frames, including the root.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl Default for VarScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope for VarScope {
    fn get(&self, name: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .map(String::as_str)
    }

    fn set(&mut self, name: &str, value: String) {
        if let Some(frame) = self
            .frames
            .iter_mut()
            .rev()
            .find(|frame| frame.contains_key(name))
        {
            frame.insert(name.to_string(), value);
        } else {
            self.set_local(name, value);
        }
    }

    fn set_local(&mut self, name: &str, value: String) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    fn push(&mut self) {
        self.frames.push(HashMap::new());
        tracing::debug!(depth = self.frames.len(), "scope frame pushed");
    }

    /// Panics if attempting to pop the root frame.
    fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
            tracing::debug!(depth = self.frames.len(), "scope frame popped");
        } else {
            panic!("cannot pop the root scope frame");
        }
    }

    fn environ(&self) -> Vec<(String, String)> {
        let mut env = BTreeMap::new();
        if let Some((root, pushed)) = self.frames.split_first() {
            for (name, value) in root {
                if self.exported.contains(name) {
                    env.insert(name.clone(), value.clone());
                }
            }
            for frame in pushed {
                for (name, value) in frame {
                    env.insert(name.clone(), value.clone());
                }
            }
        }
        env.into_iter().collect()
    }
}

/// A pushed frame that is popped when the guard drops.
///
/// Derefs to the scope, so work inside the frame goes through the guard.
pub struct FrameGuard<'s, S: Scope + ?Sized> {
    scope: &'s mut S,
}

impl<'s, S: Scope + ?Sized> FrameGuard<'s, S> {
    pub fn new(scope: &'s mut S) -> Self {
        scope.push();
        Self { scope }
    }
}

impl<S: Scope + ?Sized> Deref for FrameGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.scope
    }
}

impl<S: Scope + ?Sized> DerefMut for FrameGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.scope
    }
}

impl<S: Scope + ?Sized> Drop for FrameGuard<'_, S> {
    fn drop(&mut self) {
        self.scope.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_scope_has_one_frame() {
        let scope = VarScope::new();
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn set_and_get_variable() {
        let mut scope = VarScope::new();
        scope.set("X", "42".into());
        assert_eq!(scope.get("X"), Some("42"));
        assert_eq!(scope.get("Y"), None);
    }

    #[test]
    fn local_shadows_outer() {
        let mut scope = VarScope::new();
        scope.set("X", "outer".into());
        scope.push();
        scope.set_local("X", "inner".into());
        assert_eq!(scope.get("X"), Some("inner"));
        scope.pop();
        assert_eq!(scope.get("X"), Some("outer"));
    }

    #[test]
    fn set_updates_existing_binding_in_outer_frame() {
        let mut scope = VarScope::new();
        scope.set("X", "1".into());
        scope.push();
        scope.set("X", "2".into());
        scope.set("NEW", "fresh".into());
        scope.pop();
        assert_eq!(scope.get("X"), Some("2"));
        assert_eq!(scope.get("NEW"), None);
    }

    #[test]
    fn environ_exports_root_and_pushed_frames() {
        let mut scope = VarScope::from_vars([("PATH", "/bin"), ("HOME", "/root")]);
        scope.set("PRIVATE", "x".into());
        scope.push();
        scope.set_local("LOCAL", "y".into());
        scope.set_local("HOME", "/tmp".into());

        assert_eq!(
            scope.environ(),
            vec![
                ("HOME".to_string(), "/tmp".to_string()),
                ("LOCAL".to_string(), "y".to_string()),
                ("PATH".to_string(), "/bin".to_string()),
            ]
        );
    }

    #[test]
    fn remove_finds_innermost() {
        let mut scope = VarScope::new();
        scope.set("A", "1".into());
        scope.push();
        scope.set_local("A", "2".into());
        assert_eq!(scope.remove("A").as_deref(), Some("2"));
        assert_eq!(scope.get("A"), Some("1"));
        assert!(scope.contains("A"));
    }

    #[test]
    #[should_panic(expected = "cannot pop the root scope frame")]
    fn pop_root_frame_panics() {
        let mut scope = VarScope::new();
        scope.pop();
    }

    #[test]
    fn frame_guard_pops_on_early_exit() {
        fn fails(scope: &mut VarScope) -> Result<(), ()> {
            let mut frame = FrameGuard::new(scope);
            frame.set_local("T", "1".into());
            Err(())
        }

        let mut scope = VarScope::new();
        assert!(fails(&mut scope).is_err());
        assert_eq!(scope.depth(), 1);
        assert_eq!(scope.get("T"), None);
    }
}
