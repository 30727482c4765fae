//! Schema compiler cache.
//!
//! Compiled schemas are deduplicated by a canonical hash of the parsed
//! trees plus the semantic options. The hash is order-independent over
//! field maps (declaration order never changes identity) but order-
//! *dependent* over union alternatives, where order is meaningful.
//!
//! The cache is an explicit object, not ambient state: hosts and tests can
//! inject an isolated instance, and a process-lifetime default is provided
//! for the common one-schema-shape-per-program case. Entries are never
//! evicted. Concurrent get-or-insert is first-insert-wins; duplicate
//! compile work under a race is tolerated (compilation is pure), divergent
//! entries are not.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::ast::{Constraint, TypeNode};
use crate::engine::{CompiledSchema, SchemaOptions};

pub struct SchemaCache {
    // Key: (canonical hash, skip_optimization). The optimization flag never
    // enters the canonical hash; it only selects which compiled form to reuse.
    entries: Mutex<HashMap<(u64, bool), Arc<CompiledSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_or_compile(
        &self,
        hash: u64,
        skip_optimization: bool,
        build: impl FnOnce() -> Arc<CompiledSchema>,
    ) -> Arc<CompiledSchema> {
        let key = (hash, skip_optimization);
        if let Some(hit) = self.entries.lock().unwrap().get(&key) {
            return hit.clone();
        }
        // Build outside the lock; compilation is pure and idempotent, so a
        // racing builder just loses to whoever inserted first.
        let built = build();
        let mut map = self.entries.lock().unwrap();
        map.entry(key).or_insert(built).clone()
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Lazy<SchemaCache> = Lazy::new(SchemaCache::new);

/// Process-lifetime default cache used by [`crate::Schema::compile`].
pub fn global() -> &'static SchemaCache {
    &GLOBAL
}

// ---------------------------- Canonical hash -------------------------------- //

/// Hash of a whole field map plus the options that affect semantics.
/// `skip_optimization` is deliberately excluded: it changes performance,
/// never behavior.
pub fn canonical_hash(fields: &[(String, TypeNode)], options: &SchemaOptions) -> u64 {
    let mut h = DefaultHasher::new();
    options.strict.hash(&mut h);
    options.allow_unknown.hash(&mut h);
    options.loose.hash(&mut h);
    hash_field_map(fields, &mut h);
    h.finish()
}

/// Hash of a single node, used as per-field `source_hash` metadata.
pub fn node_hash(node: &TypeNode) -> u64 {
    let mut h = DefaultHasher::new();
    hash_node(node, &mut h);
    h.finish()
}

fn hash_field_map<H: Hasher>(fields: &[(String, TypeNode)], h: &mut H) {
    // Declaration order is irrelevant to identity: sort by name.
    let mut names: Vec<usize> = (0..fields.len()).collect();
    names.sort_by(|&a, &b| fields[a].0.cmp(&fields[b].0));
    fields.len().hash(h);
    for i in names {
        let (name, node) = &fields[i];
        name.hash(h);
        hash_node(node, h);
    }
}

fn hash_node<H: Hasher>(node: &TypeNode, h: &mut H) {
    match node {
        TypeNode::Primitive { kind, constraint } => {
            0u8.hash(h);
            kind.hash(h);
            hash_constraint(constraint, h);
        }
        TypeNode::Format { kind, constraint } => {
            1u8.hash(h);
            kind.hash(h);
            hash_constraint(constraint, h);
        }
        TypeNode::Literal(lit) => {
            2u8.hash(h);
            lit.hash(h);
        }
        TypeNode::Union(alts) => {
            // Alternative order is semantic (first match wins): keep it.
            3u8.hash(h);
            alts.len().hash(h);
            for alt in alts {
                hash_node(alt, h);
            }
        }
        TypeNode::ArrayOf {
            elem,
            min_items,
            max_items,
        } => {
            4u8.hash(h);
            min_items.hash(h);
            max_items.hash(h);
            hash_node(elem, h);
        }
        TypeNode::RecordOf { key, value } => {
            5u8.hash(h);
            hash_node(key, h);
            hash_node(value, h);
        }
        TypeNode::ObjectShape { fields } => {
            6u8.hash(h);
            hash_field_map(fields, h);
        }
        TypeNode::Conditional {
            predicate,
            then_branch,
            else_branch,
        } => {
            7u8.hash(h);
            predicate.hash(h);
            hash_node(then_branch, h);
            hash_node(else_branch, h);
        }
        TypeNode::Optional(inner) => {
            8u8.hash(h);
            hash_node(inner, h);
        }
    }
}

fn hash_constraint<H: Hasher>(constraint: &Option<Constraint>, h: &mut H) {
    match constraint {
        None => 0u8.hash(h),
        Some(Constraint::Range { min, max }) => {
            1u8.hash(h);
            min.hash(h);
            max.hash(h);
        }
        Some(Constraint::Pattern(p)) => {
            2u8.hash(h);
            p.hash(h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, TypeNode)> {
        pairs
            .iter()
            .map(|(name, expr)| (name.to_string(), parse(expr).unwrap()))
            .collect()
    }

    #[test]
    fn field_declaration_order_does_not_change_the_hash() {
        let opts = SchemaOptions::default();
        let a = canonical_hash(&fields(&[("id", "number"), ("name", "string")]), &opts);
        let b = canonical_hash(&fields(&[("name", "string"), ("id", "number")]), &opts);
        assert_eq!(a, b);
    }

    #[test]
    fn union_alternative_order_does_change_the_hash() {
        let opts = SchemaOptions::default();
        let a = canonical_hash(&fields(&[("v", "string|number")]), &opts);
        let b = canonical_hash(&fields(&[("v", "number|string")]), &opts);
        assert_ne!(a, b);
    }

    #[test]
    fn semantic_options_are_part_of_identity() {
        let f = fields(&[("id", "number")]);
        let a = canonical_hash(&f, &SchemaOptions::default());
        let b = canonical_hash(
            &f,
            &SchemaOptions {
                strict: true,
                ..SchemaOptions::default()
            },
        );
        assert_ne!(a, b);
        // skip_optimization is not identity
        let c = canonical_hash(
            &f,
            &SchemaOptions {
                skip_optimization: true,
                ..SchemaOptions::default()
            },
        );
        assert_eq!(a, c);
    }

    #[test]
    fn constraints_distinguish_otherwise_equal_nodes() {
        let opts = SchemaOptions::default();
        let a = canonical_hash(&fields(&[("n", "number(1,10)")]), &opts);
        let b = canonical_hash(&fields(&[("n", "number(1,11)")]), &opts);
        let c = canonical_hash(&fields(&[("n", "number")]), &opts);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn get_or_compile_returns_the_same_entry() {
        use crate::engine::Schema;
        let cache = SchemaCache::new();
        let mut def = indexmap::IndexMap::new();
        def.insert(
            "id".to_string(),
            crate::engine::FieldSpec::Expr("number".into()),
        );
        let a = Schema::compile_in(&cache, &def, SchemaOptions::default()).unwrap();
        let b = Schema::compile_in(&cache, &def, SchemaOptions::default()).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(a.hash(), b.hash());
    }
}
