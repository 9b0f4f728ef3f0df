//! Identifier newtypes and time-index aliases.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Calendar year of a model period.
pub type Year = i32;
/// Representative day index.
pub type Day = usize;
/// Start hour of a time slice within a day (0..24).
pub type Hour = usize;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// An entity identifier such as `conv_elec_pv` or `trd_elec_it`.
    ///
    /// The part up to and including the first `_` is the group prefix
    /// sectors use to claim their entities.
    EntityId
);

string_id!(
    /// A commodity bus identifier such as `elecsupply`.
    FlowId
);

impl EntityId {
    /// Group prefix including the trailing underscore, e.g. `conv_`.
    pub fn group(&self) -> Option<&str> {
        self.0.find('_').map(|idx| &self.0[..=idx])
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

/// One (year, day, hour) cell of the time index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slice {
    pub year: Year,
    pub day: Day,
    pub hour: Hour,
}

impl Slice {
    pub fn new(year: Year, day: Day, hour: Hour) -> Self {
        Self { year, day, hour }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/d{}/h{}", self.year, self.day, self.hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_entity_group_prefix() {
        assert_eq!(EntityId::new("conv_elec_pv").group(), Some("conv_"));
        assert_eq!(EntityId::new("nogroup").group(), None);
        assert!(EntityId::new("trd_elec_it").has_prefix("trd_"));
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(FlowId::new("elecsupply"), 1.0);
        assert_eq!(map.get("elecsupply"), Some(&1.0));
    }

    #[test]
    fn test_serde_transparent() {
        let id = EntityId::new("dem_elec");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"dem_elec\"");
    }
}
