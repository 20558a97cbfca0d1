//! Predicates deciding whether an attribute write changes session state.
//!
//! Attribute writes that are not dirty are kept out of the session delta, so
//! stores that ship deltas instead of whole sessions skip them.

use std::fmt;

use serde_json::Value;

/// Decides whether replacing `old` with `new` makes an attribute dirty.
///
/// `None` on either side means the attribute is absent.
pub trait DirtyPredicate: Send + Sync + fmt::Debug {
    fn is_dirty(&self, old: Option<&Value>, new: Option<&Value>) -> bool;
}

/// Every write is dirty.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDirty;

impl DirtyPredicate for AlwaysDirty {
    fn is_dirty(&self, _old: Option<&Value>, _new: Option<&Value>) -> bool {
        true
    }
}

/// No write is dirty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverDirty;

impl DirtyPredicate for NeverDirty {
    fn is_dirty(&self, _old: Option<&Value>, _new: Option<&Value>) -> bool {
        false
    }
}

/// A write is dirty when the new value differs from the old one.
///
/// This is the default predicate for [`SessionAttributes`](crate::SessionAttributes).
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualsDirty;

impl DirtyPredicate for EqualsDirty {
    fn is_dirty(&self, old: Option<&Value>, new: Option<&Value>) -> bool {
        old != new
    }
}

/// Dirty only when both predicates say so.
#[derive(Debug, Clone, Copy)]
pub struct Both<A, B>(A, B);

impl<A: DirtyPredicate, B: DirtyPredicate> DirtyPredicate for Both<A, B> {
    fn is_dirty(&self, old: Option<&Value>, new: Option<&Value>) -> bool {
        self.0.is_dirty(old, new) && self.1.is_dirty(old, new)
    }
}

/// Dirty when either predicate says so.
#[derive(Debug, Clone, Copy)]
pub struct Either<A, B>(A, B);

impl<A: DirtyPredicate, B: DirtyPredicate> DirtyPredicate for Either<A, B> {
    fn is_dirty(&self, old: Option<&Value>, new: Option<&Value>) -> bool {
        self.0.is_dirty(old, new) || self.1.is_dirty(old, new)
    }
}

/// Combinators for building predicates out of smaller ones.
pub trait DirtyPredicateExt: DirtyPredicate + Sized {
    fn and<P: DirtyPredicate>(self, other: P) -> Both<Self, P> {
        Both(self, other)
    }

    fn or<P: DirtyPredicate>(self, other: P) -> Either<Self, P> {
        Either(self, other)
    }
}

impl<T: DirtyPredicate> DirtyPredicateExt for T {}
