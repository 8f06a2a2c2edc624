//! Opaque object handles with stable identity.
//!
//! The engine never inspects the objects it caches against beyond identity:
//! a handle wraps an arbitrary host payload together with a monotonically
//! assigned [`ObjectId`] that is never reused, so caches keyed by identity
//! stay unambiguous even after an object's storage is reclaimed.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Process-wide counter for assigning object identities.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// A stable identity token for an [`ObjectHandle`].
///
/// Identities are assigned monotonically and never reused, unlike raw
/// addresses. Two value-equal but distinct objects get different identities
/// and therefore independent caches, by design.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Returns the raw `u64` value of this identity.
    pub fn as_raw(self) -> u64 {
        self.0
    }

    fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct ObjectCore {
    id: ObjectId,
    label: String,
    payload: Box<dyn Any + Send + Sync>,
}

/// A cheap, clonable, shared handle to a host-owned object.
///
/// The payload is opaque to the engine; only the identity and the
/// human-readable label (used in error messages) are ever read. Equality and
/// hashing are by identity, not by payload value.
#[derive(Clone)]
pub struct ObjectHandle {
    core: Arc<ObjectCore>,
}

impl ObjectHandle {
    /// Wraps a host payload in a new handle with a fresh identity.
    ///
    /// The label defaults to `object#<id>`.
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        let id = ObjectId::next();
        Self {
            core: Arc::new(ObjectCore {
                id,
                label: format!("object{id}"),
                payload: Box::new(payload),
            }),
        }
    }

    /// Wraps a host payload with an explicit human-readable label.
    ///
    /// The label appears in resolution error messages, so naming the object
    /// after its role (`"leaf graph"`, `"watershed tree"`) pays off.
    pub fn with_label<T: Any + Send + Sync>(label: impl Into<String>, payload: T) -> Self {
        Self {
            core: Arc::new(ObjectCore {
                id: ObjectId::next(),
                label: label.into(),
                payload: Box::new(payload),
            }),
        }
    }

    /// Returns this object's identity token.
    pub fn id(&self) -> ObjectId {
        self.core.id
    }

    /// Returns the human-readable label.
    pub fn label(&self) -> &str {
        &self.core.label
    }

    /// Downcasts the payload to a concrete type.
    ///
    /// Returns `None` if the payload is of a different type.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.core.payload.downcast_ref()
    }

    /// Creates a non-owning reference to this object.
    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            id: self.core.id,
            core: Arc::downgrade(&self.core),
        }
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        self.core.id == other.core.id
    }
}

impl Eq for ObjectHandle {}

impl std::hash::Hash for ObjectHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.core.id.hash(state);
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.core.label)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHandle({}{})", self.core.label, self.core.id)
    }
}

/// A non-owning counterpart to [`ObjectHandle`].
///
/// Holding a `WeakObject` never extends the object's lifetime. Stores keyed
/// by identity keep one of these per entry to detect when the keyed object
/// has been dropped.
#[derive(Clone)]
pub struct WeakObject {
    id: ObjectId,
    core: Weak<ObjectCore>,
}

impl WeakObject {
    /// Returns the identity of the referenced object.
    ///
    /// The identity stays valid even after the object is dropped.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Attempts to recover a strong handle.
    pub fn upgrade(&self) -> Option<ObjectHandle> {
        self.core.upgrade().map(|core| ObjectHandle { core })
    }

    /// Returns `true` while at least one strong handle to the object exists.
    pub fn is_alive(&self) -> bool {
        self.core.strong_count() > 0
    }
}

impl fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakObject({}, alive: {})", self.id, self.is_alive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_identities_differ() {
        let a = ObjectHandle::new(1u32);
        let b = ObjectHandle::new(1u32);
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b, "value-equal payloads still get distinct identities");
    }

    #[test]
    fn clones_share_identity() {
        let a = ObjectHandle::new("payload");
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn payload_downcast() {
        let obj = ObjectHandle::new(vec![1u64, 2, 3]);
        assert_eq!(obj.payload::<Vec<u64>>(), Some(&vec![1u64, 2, 3]));
        assert!(obj.payload::<String>().is_none());
    }

    #[test]
    fn label_default_and_explicit() {
        let anon = ObjectHandle::new(());
        assert!(anon.label().starts_with("object#"));

        let named = ObjectHandle::with_label("leaf graph", ());
        assert_eq!(named.label(), "leaf graph");
        assert_eq!(format!("{named}"), "leaf graph");
    }

    #[test]
    fn weak_upgrade_while_alive() {
        let obj = ObjectHandle::new(7u8);
        let weak = obj.downgrade();
        assert!(weak.is_alive());
        assert_eq!(weak.upgrade().unwrap(), obj);
    }

    #[test]
    fn weak_dies_with_last_handle() {
        let obj = ObjectHandle::new(7u8);
        let weak = obj.downgrade();
        let id = obj.id();
        drop(obj);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
        assert_eq!(weak.id(), id, "identity outlives the object");
    }
}
