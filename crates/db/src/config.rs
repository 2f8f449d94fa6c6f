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

use demuse_common::Dbref;
use demuse_common::model::PlayerClass;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// The all-powerful object. Nobody else controls it.
    pub root: Dbref,
    /// Where new players and guests start, and their home.
    pub player_start: Dbref,
    pub initial_credits: i64,
    pub default_class: PlayerClass,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            root: Dbref(1),
            player_start: Dbref(0),
            initial_credits: 2000,
            default_class: PlayerClass::Visitor,
        }
    }
}
