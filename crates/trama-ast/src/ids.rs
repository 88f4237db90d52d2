//! Binding handles
//!
//! Opaque, hashable identities handed out by the front end. The translator
//! never looks inside them; every fact about a handle comes from the
//! [`BindingProvider`](crate::BindingProvider).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Create a handle from its raw index
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Raw index of this handle
            pub const fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

handle!(
    /// Identity of a declared type (class, interface, local or anonymous class)
    TypeId,
    "type#"
);
handle!(
    /// Identity of a method or constructor
    MethodId,
    "method#"
);
handle!(
    /// Identity of a variable: field, parameter or local
    VarId,
    "var#"
);
handle!(
    /// Identity of an expression node, used to key per-site metadata
    NodeId,
    "node#"
);

/// An executable body: a method/constructor, or the combined initializer of a type.
///
/// Field initializers and initializer blocks of the same staticness share one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BodyKey {
    /// Method or constructor body
    Method(MethodId),
    /// Instance or static initializer of a type
    Initializer {
        /// Type owning the initializer
        ty: TypeId,
        /// Static (class) initializer rather than instance initializer
        is_static: bool,
    },
}

impl BodyKey {
    /// Instance initializer body of `ty`
    pub const fn instance_init(ty: TypeId) -> Self {
        BodyKey::Initializer { ty, is_static: false }
    }

    /// Static initializer body of `ty`
    pub const fn static_init(ty: TypeId) -> Self {
        BodyKey::Initializer { ty, is_static: true }
    }
}

impl fmt::Display for BodyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyKey::Method(m) => write!(f, "{}", m),
            BodyKey::Initializer { ty, is_static: true } => write!(f, "<clinit {}>", ty),
            BodyKey::Initializer { ty, is_static: false } => write!(f, "<init {}>", ty),
        }
    }
}

/// Where a variable or method is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// Member of a type (fields and methods)
    Type(TypeId),
    /// Local or parameter of an executable body
    Body(BodyKey),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        assert_eq!(TypeId::new(3).to_string(), "type#3");
        assert_eq!(VarId(7).to_string(), "var#7");
        assert_eq!(BodyKey::static_init(TypeId(1)).to_string(), "<clinit type#1>");
    }

    #[test]
    fn test_handles_serialize_transparently() {
        let json = serde_json::to_string(&MethodId(42)).unwrap();
        assert_eq!(json, "42");
        let back: MethodId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MethodId(42));
    }
}
