//! Lookup of macros by id and syntax.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use wr_xdom::Syntax;

use crate::error::MacroLookupError;
use crate::macros::Macro;

/// Registered macros.
///
/// A macro registered for a specific syntax takes precedence over one
/// registered for all syntaxes under the same id. Ids are case-insensitive.
#[derive(Clone, Default)]
pub struct MacroRegistry {
    generic: BTreeMap<String, Arc<dyn Macro>>,
    by_syntax: BTreeMap<(String, Syntax), Arc<dyn Macro>>,
}

impl MacroRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in macro.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::macros::builtin::register_all(&mut registry);
        registry
    }

    /// Register `m` for all syntaxes under its descriptor id.
    #[must_use]
    pub fn with_macro<M: Macro + 'static>(mut self, m: M) -> Self {
        self.register(Arc::new(m));
        self
    }

    pub fn register(&mut self, m: Arc<dyn Macro>) {
        let id = m.descriptor().id.to_ascii_lowercase();
        self.generic.insert(id, m);
    }

    /// Register `m` for `syntax` only.
    pub fn register_for_syntax(&mut self, m: Arc<dyn Macro>, syntax: Syntax) {
        let id = m.descriptor().id.to_ascii_lowercase();
        self.by_syntax.insert((id, syntax), m);
    }

    /// Register `m` under a hint: either `id` or `id/syntax-name/syntax-version`.
    ///
    /// Returns `false` and logs a warning when the hint has another shape.
    pub fn register_hint(&mut self, hint: &str, m: Arc<dyn Macro>) -> bool {
        let parts: Vec<&str> = hint.split('/').collect();
        match parts.as_slice() {
            [id] if !id.is_empty() => {
                self.generic.insert(id.to_ascii_lowercase(), m);
                true
            }
            [id, name, version] if !id.is_empty() && !name.is_empty() && !version.is_empty() => {
                self.by_syntax
                    .insert((id.to_ascii_lowercase(), Syntax::new(*name, *version)), m);
                true
            }
            _ => {
                tracing::warn!(
                    hint,
                    "Invalid macro hint: expected the macro id, optionally followed by \
                     /syntax-name/syntax-version; the macro is not registered"
                );
                false
            }
        }
    }

    /// Remove every registration of `id`.
    pub fn unregister(&mut self, id: &str) {
        let id = id.to_ascii_lowercase();
        self.generic.remove(&id);
        self.by_syntax.retain(|(key, _), _| *key != id);
    }

    /// Macro for `id`, preferring a registration for `syntax`.
    pub fn lookup(
        &self,
        id: &str,
        syntax: Option<&Syntax>,
    ) -> Result<Arc<dyn Macro>, MacroLookupError> {
        let key = id.to_ascii_lowercase();
        syntax
            .and_then(|syntax| self.by_syntax.get(&(key.clone(), syntax.clone())))
            .or_else(|| self.generic.get(&key))
            .map(Arc::clone)
            .ok_or_else(|| MacroLookupError::new(id, syntax))
    }

    /// Whether `id` is registered for all syntaxes (`None`) or specifically
    /// for `syntax`.
    pub fn exists(&self, id: &str, syntax: Option<&Syntax>) -> bool {
        let key = id.to_ascii_lowercase();
        match syntax {
            None => self.generic.contains_key(&key),
            Some(syntax) => self.by_syntax.contains_key(&(key, syntax.clone())),
        }
    }

    /// Ids usable in `syntax`, sorted.
    pub fn ids(&self, syntax: Option<&Syntax>) -> Vec<String> {
        let mut ids: BTreeSet<&String> = self.generic.keys().collect();
        if let Some(syntax) = syntax {
            ids.extend(
                self.by_syntax
                    .keys()
                    .filter(|(_, s)| s == syntax)
                    .map(|(id, _)| id),
            );
        }
        ids.into_iter().cloned().collect()
    }
}

impl std::fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroRegistry")
            .field("generic", &self.generic.keys().collect::<Vec<_>>())
            .field("by_syntax", &self.by_syntax.keys().collect::<Vec<_>>())
            .finish()
    }
}
