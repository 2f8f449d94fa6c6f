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

//! Name matching from a player's point of view: `me`, `here`, `#N`, `*player`, then the
//! player's inventory, the surrounding room's contents and its exits.

use demuse_common::model::{ObjectType, WorldStateError};
use demuse_common::Dbref;

use crate::memory_db::MemoryDb;

#[derive(Debug, PartialEq, Eq)]
enum Match {
    Exact(Dbref),
    Partial(Dbref),
}

/// Does `candidate` (a name, or an exit's `;`-separated alias list) match `name`?
fn name_match(candidate: &str, otype: ObjectType, name: &str) -> Option<bool> {
    if otype == ObjectType::Exit {
        let exact = candidate
            .split(';')
            .any(|alias| alias.trim().eq_ignore_ascii_case(name));
        return exact.then_some(true);
    }
    if candidate.eq_ignore_ascii_case(name) {
        return Some(true);
    }
    // Partial matches are on word prefixes.
    let lname = name.to_ascii_lowercase();
    let partial = candidate
        .split_whitespace()
        .any(|word| word.to_ascii_lowercase().starts_with(&lname));
    partial.then_some(false)
}

impl MemoryDb {
    fn match_list(&self, list: &[Dbref], name: &str, found: &mut Vec<Match>) {
        for &obj in list {
            let Ok(rec) = self.record(obj) else {
                continue;
            };
            match name_match(&rec.name, rec.otype, name) {
                Some(true) => found.push(Match::Exact(obj)),
                Some(false) => found.push(Match::Partial(obj)),
                None => {}
            }
        }
    }

    pub(crate) fn match_name(&self, who: Dbref, name: &str) -> Result<Dbref, WorldStateError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorldStateError::FailedMatch(name.to_string()));
        }
        let who_rec = self.record(who)?;
        if name.eq_ignore_ascii_case("me") {
            return Ok(who);
        }
        if name.eq_ignore_ascii_case("here") {
            if self.is_valid(who_rec.location) {
                return Ok(who_rec.location);
            }
            return Err(WorldStateError::FailedMatch(name.to_string()));
        }
        if let Some(obj) = Dbref::parse_literal(name) {
            if self.is_valid(obj) {
                return Ok(obj);
            }
            return Err(WorldStateError::FailedMatch(name.to_string()));
        }
        if let Some(pname) = name.strip_prefix('*') {
            return self
                .find_player(pname)
                .ok_or_else(|| WorldStateError::FailedMatch(name.to_string()));
        }

        let mut found = vec![];
        self.match_list(&who_rec.contents, name, &mut found);
        if let Ok(loc) = self.record(who_rec.location) {
            let neighbours: Vec<Dbref> = loc
                .contents
                .iter()
                .copied()
                .filter(|o| *o != who)
                .collect();
            self.match_list(&neighbours, name, &mut found);
            self.match_list(&loc.exits, name, &mut found);
        }

        let exact: Vec<Dbref> = found
            .iter()
            .filter_map(|m| match m {
                Match::Exact(o) => Some(*o),
                Match::Partial(_) => None,
            })
            .collect();
        let candidates: Vec<Dbref> = if exact.is_empty() {
            found
                .iter()
                .map(|m| match m {
                    Match::Exact(o) | Match::Partial(o) => *o,
                })
                .collect()
        } else {
            exact
        };
        match candidates.as_slice() {
            [] => Err(WorldStateError::FailedMatch(name.to_string())),
            [one] => Ok(*one),
            _ => Err(WorldStateError::AmbiguousMatch(name.to_string())),
        }
    }
}
