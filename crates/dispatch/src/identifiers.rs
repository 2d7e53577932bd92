//! Newtype identifiers used by the session and its adapters.
//!
//! Each identity concept is a distinct newtype so that a [`RequestId`] (one
//! `send` call) can never be confused with a [`TaskId`] (one transport task
//! inside an adapter), even though the two are created in lock-step.

use std::any::{type_name, TypeId};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (adapter-assigned counters).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

u64_id! {
    /// Identifies one transport task inside an adapter's task-properties set.
    ///
    /// Adapters allocate these from a monotonically increasing counter; the
    /// value is only unique per adapter instance.
    TaskId
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single `send` operation.
///
/// Generated fresh for every call, so two concurrent sends of the same
/// descriptor type never share an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`RequestId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Descriptor type tag
// ---------------------------------------------------------------------------

/// Runtime type tag of a request descriptor.
///
/// Equality is decided by [`TypeId`] alone; the type name is carried for
/// logging and snapshots.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorType {
    id: TypeId,
    name: &'static str,
}

impl DescriptorType {
    /// Returns the tag for descriptor type `R`.
    pub fn of<R: 'static>() -> Self {
        Self {
            id: TypeId::of::<R>(),
            name: type_name::<R>(),
        }
    }

    /// Returns `true` if this tag was produced for type `R`.
    pub fn is<R: 'static>(self) -> bool {
        self.id == TypeId::of::<R>()
    }

    /// Fully qualified type name of the descriptor.
    pub fn name(self) -> &'static str {
        self.name
    }
}

impl PartialEq for DescriptorType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DescriptorType {}

impl std::hash::Hash for DescriptorType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for DescriptorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
#[path = "identifiers_tests.rs"]
mod tests;
