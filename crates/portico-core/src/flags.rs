//! Route access-control bitmasks.
//!
//! `SkipFlags` says which auth guards a route bypasses; `RoleFlags` says which
//! subject roles may call it. Both are thin newtypes so a skip mask can never
//! be passed where a role mask is expected.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Guards bypassed by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SkipFlags(u8);

impl SkipFlags {
    /// Run every guard.
    pub const NONE: SkipFlags = SkipFlags(0);
    /// Do not require `X-API-KEY`.
    pub const API_KEY: SkipFlags = SkipFlags(0x01);
    /// Do not require `X-ACCESS-TOKEN`.
    pub const TOKEN: SkipFlags = SkipFlags(0x02);
    /// Public route.
    pub const ALL: SkipFlags = SkipFlags(0x03);

    /// Build from raw bits, rejecting unknown bits.
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL.0 != 0 {
            return None;
        }
        Some(SkipFlags(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set.
    pub fn contains(self, other: SkipFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SkipFlags {
    type Output = SkipFlags;
    fn bitor(self, rhs: SkipFlags) -> SkipFlags {
        SkipFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for SkipFlags {
    fn bitor_assign(&mut self, rhs: SkipFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for SkipFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.contains(Self::API_KEY), self.contains(Self::TOKEN)) {
            (true, true) => f.write_str("api_key|token"),
            (true, false) => f.write_str("api_key"),
            (false, true) => f.write_str("token"),
            (false, false) => f.write_str("none"),
        }
    }
}

/// Subject role bitmask. Each role is a single bit chosen by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleFlags(u32);

impl RoleFlags {
    /// No role; on a route this means unrestricted.
    pub const NONE: RoleFlags = RoleFlags(0);

    /// Single role at bit position `bit` (0..32).
    pub const fn role(bit: u32) -> Option<RoleFlags> {
        if bit < 32 {
            Some(RoleFlags(1 << bit))
        } else {
            None
        }
    }

    pub const fn from_bits(bits: u32) -> RoleFlags {
        RoleFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when exactly one bit is set.
    pub const fn is_single_role(self) -> bool {
        self.0.is_power_of_two()
    }

    pub const fn intersects(self, other: RoleFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// Route-side check: `self` is the route mask, `subject` the caller's roles.
    pub const fn admits(self, subject: RoleFlags) -> bool {
        self.is_empty() || self.intersects(subject)
    }
}

impl BitOr for RoleFlags {
    type Output = RoleFlags;
    fn bitor(self, rhs: RoleFlags) -> RoleFlags {
        RoleFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for RoleFlags {
    fn bitor_assign(&mut self, rhs: RoleFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for RoleFlags {
    type Output = RoleFlags;
    fn bitand(self, rhs: RoleFlags) -> RoleFlags {
        RoleFlags(self.0 & rhs.0)
    }
}

impl fmt::Display for RoleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn skip_flags_compose() {
        let both = SkipFlags::API_KEY | SkipFlags::TOKEN;
        assert_eq!(both, SkipFlags::ALL);
        assert!(both.contains(SkipFlags::TOKEN));
        assert!(!SkipFlags::API_KEY.contains(SkipFlags::TOKEN));
        assert!(SkipFlags::NONE.is_empty());
    }

    #[test]
    fn skip_flags_reject_unknown_bits() {
        assert_eq!(SkipFlags::from_bits(2), Some(SkipFlags::TOKEN));
        assert!(SkipFlags::from_bits(4).is_none());
    }

    #[test]
    fn role_admission_rule() {
        let sales = RoleFlags::role(0).unwrap();
        let management = RoleFlags::role(4).unwrap();

        // unrestricted route admits anyone, including no role at all
        assert!(RoleFlags::NONE.admits(RoleFlags::NONE));
        assert!(RoleFlags::NONE.admits(sales));

        assert!(management.admits(management | sales));
        assert!(!management.admits(sales));
        assert!(!management.admits(RoleFlags::NONE));
        assert!((sales | management).admits(sales));
    }

    #[test]
    fn role_bits_are_bounded() {
        assert_eq!(RoleFlags::role(4).map(RoleFlags::bits), Some(16));
        assert!(RoleFlags::role(32).is_none());
        assert!(RoleFlags::from_bits(16).is_single_role());
        assert!(!RoleFlags::from_bits(3).is_single_role());
    }
}
