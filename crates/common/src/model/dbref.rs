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

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A handle to an object in the database. Negative values are the usual sentinels.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Dbref(pub i64);

pub const NOTHING: Dbref = Dbref(-1);
pub const AMBIGUOUS: Dbref = Dbref(-2);
pub const HOME: Dbref = Dbref(-3);

impl Dbref {
    #[must_use]
    pub const fn mk_id(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(&self) -> i64 {
        self.0
    }

    /// Parses the `#123` literal form. Anything else (including `#-1`) is `None`.
    pub fn parse_literal(s: &str) -> Option<Self> {
        let digits = s.trim().strip_prefix('#')?;
        let id: i64 = digits.parse().ok()?;
        (id >= 0).then_some(Self(id))
    }

    pub fn is_nothing(&self) -> bool {
        self.0 < 0
    }
}

impl Display for Dbref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn literal_forms() {
        assert_eq!(Dbref::parse_literal("#12"), Some(Dbref(12)));
        assert_eq!(Dbref::parse_literal(" #0 "), Some(Dbref(0)));
        assert_eq!(Dbref::parse_literal("#-1"), None);
        assert_eq!(Dbref::parse_literal("12"), None);
        assert_eq!(Dbref(7).to_string(), "#7");
    }
}
