// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::marker::PhantomData;
use std::ops::{BitOr, BitOrAssign};

use num_traits::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A minimal bitset keyed by a primitive-valued enum. Object and attribute flags are stored this
/// way, both in memory and in the database dump (as the raw 32-bit word).
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct BitEnum<T: ToPrimitive> {
    value: u32,
    phantom: PhantomData<T>,
}

impl<T: ToPrimitive> Clone for BitEnum<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ToPrimitive> Copy for BitEnum<T> {}

fn bit_of<T: ToPrimitive>(value: &T) -> u32 {
    // Discriminants past the word width never match.
    value
        .to_u32()
        .and_then(|shift| 1u32.checked_shl(shift))
        .unwrap_or(0)
}

impl<T: ToPrimitive> BitEnum<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: 0,
            phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn from_u32(value: u32) -> Self {
        Self {
            value,
            phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn to_u32(&self) -> u32 {
        self.value
    }

    pub fn new_with(value: T) -> Self {
        let mut s = Self::new();
        s.set(value);
        s
    }

    #[must_use]
    pub fn all() -> Self {
        Self::from_u32(u32::MAX)
    }

    pub fn set(&mut self, value: T) {
        self.value |= bit_of(&value);
    }

    pub fn clear(&mut self, value: T) {
        self.value &= !bit_of(&value);
    }

    pub fn contains(&self, value: T) -> bool {
        let bit = bit_of(&value);
        bit != 0 && self.value & bit != 0
    }

    pub fn contains_all(&self, values: BitEnum<T>) -> bool {
        values.value & self.value == values.value
    }

    pub fn is_empty(&self) -> bool {
        self.value == 0
    }
}

impl<T: ToPrimitive> BitOr for BitEnum<T> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_u32(self.value | rhs.value)
    }
}

impl<T: ToPrimitive> Default for BitEnum<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ToPrimitive> BitOrAssign<T> for BitEnum<T> {
    fn bitor_assign(&mut self, rhs: T) {
        self.set(rhs);
    }
}

impl<T: ToPrimitive> BitOr<T> for BitEnum<T> {
    type Output = Self;

    fn bitor(self, rhs: T) -> Self::Output {
        let mut s = self;
        s.set(rhs);
        s
    }
}

impl<T: ToPrimitive> From<T> for BitEnum<T> {
    fn from(value: T) -> Self {
        Self::new_with(value)
    }
}

impl<T: ToPrimitive> Serialize for BitEnum<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.value)
    }
}

impl<'de, T: ToPrimitive> Deserialize<'de> for BitEnum<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from_u32)
    }
}

#[cfg(test)]
mod tests {
    use super::BitEnum;
    use crate::model::ObjFlag;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_clear_contains() {
        let mut flags = BitEnum::new_with(ObjFlag::Dark);
        flags |= ObjFlag::Haven;
        assert!(flags.contains(ObjFlag::Dark));
        assert!(flags.contains(ObjFlag::Haven));
        assert!(!flags.contains(ObjFlag::Quiet));
        flags.clear(ObjFlag::Dark);
        assert!(!flags.contains(ObjFlag::Dark));
        assert!(flags.contains_all(BitEnum::new_with(ObjFlag::Haven)));
    }

    #[test]
    fn serializes_as_word() {
        let flags = BitEnum::new_with(ObjFlag::Connect) | ObjFlag::Dark;
        let json = serde_json::to_string(&flags).unwrap();
        let back: BitEnum<ObjFlag> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }
}
