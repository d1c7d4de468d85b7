//! The type descriptor / encoding program (C2, C3) and its process-lifetime
//! cache (C4).
//!
//! Rust has no runtime reflection, so there is no way to walk an arbitrary
//! `T`'s fields at encode time the way a Go `reflect.Type` can. Instead,
//! [`Describe::describe`] is implemented by `#[derive(Encode)]` for each
//! concrete type; calling it builds the same descriptor tree spec.md §3
//! describes, just produced by generated code rather than introspection.
//! [`ProgramCache`] then gives that tree the caching semantics (C4, spec
//! §4.5, §8) a reflection-based implementation would get for free: compiled
//! at most once per `(TypeId, FlagSet)`, and the same [`std::sync::Arc`]
//! handed back to every caller asking for that key again.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, RwLock};

use crate::fields::Candidate;

/// A bitset of compile-affecting options (spec §3's `FlagSet`). Currently
/// tracks the two documented examples: whether a byte slice/array's default
/// shape has been overridden by an `Options` choice that changes what gets
/// compiled for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlagSet(u32);

impl FlagSet {
    /// Byte slices compile to a raw JSON array of numbers instead of a
    /// base64 string.
    pub const RAW_BYTE_SLICE: FlagSet = FlagSet(1 << 0);
    /// Fixed-size byte arrays compile to a base64 string instead of a raw
    /// JSON array of numbers.
    pub const BYTE_ARRAY_AS_STRING: FlagSet = FlagSet(1 << 1);

    /// The empty flag set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Combine two flag sets.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether `flag` is set.
    pub const fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0
    }
}

/// A field of a [`Kind::Struct`], carrying everything the dominance
/// algorithm (spec §4.3, [`crate::fields`]) and the execution engine need.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    /// The field's visible name (after any rename attribute).
    pub name: &'static str,
    /// Whether `name` came from an explicit rename rather than the field's
    /// own identifier; feeds the dominance tie-break rule.
    pub explicit_name: bool,
    /// Whether this field is `#[musli_json(flatten)]`: its own fields splice
    /// into the parent object instead of nesting under `name`.
    pub flatten: bool,
    /// Whether this field is skipped when its value is the zero/empty value
    /// for its type (`omitempty`).
    pub omit_empty: bool,
    /// The field's own descriptor.
    pub node: Box<ProgramNode>,
}

/// The shape of a type, as far as JSON encoding is concerned.
#[derive(Debug, Clone)]
pub enum Kind {
    /// `null` only (e.g. `()`).
    Unit,
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Char,
    String,
    /// A byte sequence; the flag set occupied on its [`ProgramNode`]
    /// determines base64-string vs. number-array rendering.
    Bytes,
    /// `Option<T>`: `null` or the inner program.
    Option(Box<ProgramNode>),
    /// A homogeneous, dynamically-sized sequence.
    Slice(Box<ProgramNode>),
    /// A homogeneous, fixed-size sequence.
    Array {
        element: Box<ProgramNode>,
        len: usize,
    },
    /// A homogeneous map; `key` describes the key type purely for
    /// introspection; map keys are always rendered as strings.
    Map {
        key: Box<ProgramNode>,
        value: Box<ProgramNode>,
    },
    /// A struct, with dominance already resolved (spec §4.3): `fields`
    /// contains only the winning candidate for each visible name.
    Struct { fields: Vec<FieldMeta> },
    /// A heterogeneous, fixed-arity sequence (a multi-field tuple struct).
    Tuple(Vec<ProgramNode>),
    /// A `std::time::SystemTime` leaf: rendered per `TimeLayout`/
    /// `UnixTimestamp` (spec §4.1/§4.4).
    Time,
    /// A `std::time::Duration` leaf: rendered per `DurationFormat` (spec
    /// §4.1/§4.4).
    Duration,
    /// A type whose encoding is fully delegated to a marshaler capability
    /// (C7) rather than structural walking.
    Custom,
    /// A self-referential link back to an ancestor type, inserted instead of
    /// expanding the descriptor tree forever (spec §3, §4.3).
    Recursive(TypeId),
}

/// A compiled descriptor for one Rust type (spec §3's "encoding program",
/// the introspectable half of it; the executable half is the monomorphized
/// [`crate::encode::Encode::encode`] body the derive macro emits alongside
/// it).
#[derive(Debug, Clone)]
pub struct ProgramNode {
    /// The type's `std::any::type_name`, kept for diagnostics and tests.
    pub type_name: &'static str,
    pub kind: Kind,
}

impl ProgramNode {
    /// Construct a leaf or composite node.
    pub fn new(type_name: &'static str, kind: Kind) -> Self {
        Self { type_name, kind }
    }
}

/// Implemented by `#[derive(Encode)]` (and by hand for the primitive/
/// collection types this crate provides blanket [`crate::encode::Encode`]
/// impls for) to build a type's [`ProgramNode`].
pub trait Describe: 'static {
    /// Build this type's descriptor. `ancestors` is the stack of `TypeId`s
    /// currently being described, innermost last; implementations that
    /// recurse into a field/element type must push their own `TypeId`
    /// before recursing and pop it after, so that a cycle produces a
    /// [`Kind::Recursive`] link instead of infinite recursion.
    fn describe(ancestors: &mut Vec<TypeId>) -> ProgramNode;
}

/// Helper for [`Describe`] implementations: describes `T`, substituting a
/// [`Kind::Recursive`] node if `T` is already on the ancestor stack.
pub fn describe_child<T: Describe>(ancestors: &mut Vec<TypeId>) -> ProgramNode {
    let id = TypeId::of::<T>();
    if ancestors.contains(&id) {
        return ProgramNode::new(std::any::type_name::<T>(), Kind::Recursive(id));
    }
    ancestors.push(id);
    let node = T::describe(ancestors);
    ancestors.pop();
    node
}

/// The set of top-level display names `T`'s `Describe` impl actually
/// resolves as visible (spec §4.3's dominance/ambiguity algorithm already
/// applied), computed once per `T` and cached for the life of the process.
///
/// The generated `encode`/`encode_flatten` bodies use this to gate
/// `#[musli_json(flatten)]` writes: a shared "already written" set alone can
/// only implement "whichever candidate runs first wins", which is wrong for
/// the ambiguous case (spec §4.3: two same-depth candidates with no
/// tiebreak must be hidden from *both* sides, not resolved by encode
/// order). Consulting the pre-resolved visible set lets an ambiguous name be
/// dropped by every candidate, while leaving the ordinary shallower-wins
/// case alone (the shallow write still claims the name first via the
/// existing "already written" check).
pub fn visible_field_names<T: Describe>() -> &'static HashSet<&'static str> {
    static CACHE: OnceLock<HashSet<&'static str>> = OnceLock::new();
    CACHE.get_or_init(|| match T::describe(&mut Vec::new()).kind {
        Kind::Struct { fields } => fields.into_iter().map(|f| f.name).collect(),
        _ => HashSet::new(),
    })
}

/// Process-lifetime cache of compiled programs, keyed by `(TypeId,
/// FlagSet)` (spec §3, §4.5). Guarantees at-most-one compile per key even
/// under concurrent first use, and returns the same [`Arc`] to every caller
/// asking for the same key (spec §8's cache-identity property).
#[derive(Default)]
pub struct ProgramCache {
    entries: RwLock<HashMap<(TypeId, FlagSet), Arc<ProgramNode>>>,
}

impl ProgramCache {
    /// Construct an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached program for `(T, flags)`, compiling it via
    /// [`Describe::describe`] if this is the first request for that key.
    pub fn get_or_compile<T: Describe>(&self, flags: FlagSet) -> Arc<ProgramNode> {
        let key = (TypeId::of::<T>(), flags);

        if let Some(existing) = self.entries.read().unwrap().get(&key) {
            return existing.clone();
        }

        let mut entries = self.entries.write().unwrap();
        entries
            .entry(key)
            .or_insert_with(|| Arc::new(T::describe(&mut Vec::new())))
            .clone()
    }

    /// Number of distinct `(TypeId, FlagSet)` programs compiled so far.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether no programs have been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dominance resolution over a struct's raw candidate field list (spec
/// §4.3), producing the `fields` a [`Kind::Struct`] should carry. `all`
/// contains every field reachable from the struct being described,
/// including those nested inside `#[musli_json(flatten)]` fields, each
/// tagged with its embedding depth.
pub fn resolve_struct_fields(
    all: Vec<(Candidate, Box<ProgramNode>, bool)>,
) -> Vec<FieldMeta> {
    let (candidates, mut nodes): (Vec<Candidate>, Vec<(Box<ProgramNode>, bool)>) = all
        .into_iter()
        .map(|(candidate, node, omit_empty)| (candidate, (node, omit_empty)))
        .unzip();

    let visible = crate::fields::resolve_visible(candidates.clone());

    visible
        .into_iter()
        .map(|winner| {
            let original_index = candidates
                .iter()
                .position(|c| c.index == winner.index)
                .expect("winner came from `candidates`");
            let (node, omit_empty) = std::mem::replace(
                &mut nodes[original_index],
                (Box::new(ProgramNode::new("", Kind::Unit)), false),
            );
            FieldMeta {
                // Leaked once per (type, flags) compile and then held by the
                // `Arc<ProgramNode>` for the life of the process via
                // `ProgramCache` — equivalent to the cache's own retention,
                // not an additional leak.
                name: Box::leak(winner.name.into_boxed_str()),
                explicit_name: winner.explicit,
                flatten: winner.depth > 0,
                omit_empty,
                node,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf;

    impl Describe for Leaf {
        fn describe(_ancestors: &mut Vec<TypeId>) -> ProgramNode {
            ProgramNode::new("Leaf", Kind::Bool)
        }
    }

    struct Cyclic;

    impl Describe for Cyclic {
        fn describe(ancestors: &mut Vec<TypeId>) -> ProgramNode {
            let inner = describe_child::<Cyclic>(ancestors);
            ProgramNode::new(
                "Cyclic",
                Kind::Option(Box::new(inner)),
            )
        }
    }

    #[test]
    fn cache_compiles_once_and_returns_same_arc() {
        let cache = ProgramCache::new();
        let a = cache.get_or_compile::<Leaf>(FlagSet::empty());
        let b = cache.get_or_compile::<Leaf>(FlagSet::empty());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_flags_compile_distinct_programs() {
        let cache = ProgramCache::new();
        let a = cache.get_or_compile::<Leaf>(FlagSet::empty());
        let b = cache.get_or_compile::<Leaf>(FlagSet::RAW_BYTE_SLICE);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn self_referential_type_terminates_with_recursive_node() {
        let node = Cyclic::describe(&mut Vec::new());
        match node.kind {
            Kind::Option(inner) => match inner.kind {
                Kind::Recursive(id) => assert_eq!(id, TypeId::of::<Cyclic>()),
                other => panic!("expected Recursive, got {other:?}"),
            },
            other => panic!("expected Option, got {other:?}"),
        }
    }
}
