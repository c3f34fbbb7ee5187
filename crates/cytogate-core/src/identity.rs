//! # Identity Newtypes
//!
//! Named identifiers used by gating strategies. Each identifier is a
//! distinct type: a [`TransformName`] cannot be passed where a
//! [`GateName`] is expected.
//!
//! ## Validation
//!
//! Names must be non-empty after trimming. Gate names additionally may not
//! contain `/`, which separates the components of a [`GatePath`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Separator used when a [`GatePath`] is rendered as a string.
pub const PATH_SEPARATOR: char = '/';

/// Implement `Deserialize` for string newtypes by routing through `new()`,
/// so invalid values are rejected at deserialization time.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

macro_rules! string_newtype {
    ($(#[$meta:meta])* $ty:ident, $kind:literal, reserved = [$($reserved:literal),*]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $ty(String);

        impl $ty {
            /// Create a validated identifier.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(ValidationError::Empty { kind: $kind });
                }
                $(
                    if value.contains($reserved) {
                        return Err(ValidationError::ReservedCharacter {
                            kind: $kind,
                            value,
                            character: $reserved,
                        });
                    }
                )*
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl_validating_deserialize!($ty);
    };
}

string_newtype!(
    /// Name of a gate. Unique within the children of one parent, not globally.
    GateName,
    "gate name",
    reserved = ['/']
);

string_newtype!(
    /// Name under which a transform is registered in a strategy.
    TransformName,
    "transform name",
    reserved = []
);

string_newtype!(
    /// Name under which a compensation matrix is registered in a strategy.
    CompensationName,
    "compensation name",
    reserved = []
);

/// Stable arena index of a gate node inside one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GateId(usize);

impl GateId {
    /// Wrap an arena index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// The arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Full path of a gate from the implicit root, including the gate itself.
///
/// The empty path denotes the root ("all events") population and renders
/// as `/`. `["Lymphocytes", "CD3+"]` renders as `/Lymphocytes/CD3+`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatePath(Vec<GateName>);

impl GatePath {
    /// The root path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from validated components.
    pub fn from_names(names: Vec<GateName>) -> Self {
        Self(names)
    }

    /// Parse `/A/B` (leading separator optional). `/` and `` yield the root.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let names = raw
            .split(PATH_SEPARATOR)
            .filter(|part| !part.is_empty())
            .map(GateName::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(names))
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path components, outermost first.
    pub fn names(&self) -> &[GateName] {
        &self.0
    }

    /// The last component, or `None` for the root.
    pub fn name(&self) -> Option<&GateName> {
        self.0.last()
    }

    /// Path of the parent, or `None` for the root.
    pub fn parent(&self) -> Option<GatePath> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Path of a child of this path.
    pub fn child(&self, name: GateName) -> GatePath {
        let mut names = self.0.clone();
        names.push(name);
        Self(names)
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether `self` is `other` or one of its ancestors.
    pub fn is_ancestor_of(&self, other: &GatePath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

impl fmt::Display for GatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for name in &self.0 {
            write!(f, "{PATH_SEPARATOR}{name}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for GatePath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_name_rejects_empty_and_separator() {
        assert!(GateName::new("Lymphocytes").is_ok());
        assert!(matches!(
            GateName::new("   "),
            Err(ValidationError::Empty { .. })
        ));
        assert!(matches!(
            GateName::new("a/b"),
            Err(ValidationError::ReservedCharacter { character: '/', .. })
        ));
    }

    #[test]
    fn transform_name_allows_slash() {
        assert!(TransformName::new("FL1/FL2").is_ok());
    }

    #[test]
    fn path_round_trips_through_display() {
        let path = GatePath::parse("/Singlets/Live/CD3+").unwrap();
        assert_eq!(path.depth(), 3);
        assert_eq!(path.to_string(), "/Singlets/Live/CD3+");
        assert_eq!(path.name().unwrap().as_str(), "CD3+");
        assert_eq!(path.parent().unwrap().to_string(), "/Singlets/Live");
    }

    #[test]
    fn root_path_renders_as_slash() {
        assert!(GatePath::parse("/").unwrap().is_root());
        assert!(GatePath::parse("").unwrap().is_root());
        assert_eq!(GatePath::root().to_string(), "/");
        assert!(GatePath::root().parent().is_none());
    }

    #[test]
    fn ancestry_is_prefix_based() {
        let a = GatePath::parse("/A").unwrap();
        let ab = GatePath::parse("/A/B").unwrap();
        let ac = GatePath::parse("/AC").unwrap();
        assert!(a.is_ancestor_of(&ab));
        assert!(GatePath::root().is_ancestor_of(&ab));
        assert!(!ab.is_ancestor_of(&a));
        assert!(!a.is_ancestor_of(&ac));
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<GateName, _> = serde_json::from_str("\"CD4\"");
        assert!(ok.is_ok());
        let bad: Result<GateName, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any path built from valid names survives display → parse.
        #[test]
        fn path_display_parse_is_lossless(names in prop::collection::vec("[A-Za-z0-9+\\- ]{0,6}[A-Za-z0-9+]", 0..6)) {
            let names: Vec<GateName> = names.into_iter().map(|n| GateName::new(n).unwrap()).collect();
            let path = GatePath::from_names(names);
            prop_assert_eq!(GatePath::parse(&path.to_string()).unwrap(), path);
        }
    }
}
