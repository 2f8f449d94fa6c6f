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

use thiserror::Error;

use crate::model::{Attribute, Dbref, ObjFlag, ObjectType, PlayerClass, Power};
use crate::util::BitEnum;

/// Errors related to the world state and operations on it.
#[derive(Error, Debug, Eq, PartialEq, Clone)]
pub enum WorldStateError {
    #[error("Object not found: {0}")]
    ObjectNotFound(Dbref),
    #[error("Attribute not found: {0}/{1}")]
    AttributeNotFound(Dbref, String),
    #[error("Object permission denied")]
    ObjectPermissionDenied,
    #[error("Failed object match: {0}")]
    FailedMatch(String),
    #[error("Ambiguous object match: {0}")]
    AmbiguousMatch(String),
    #[error("Player name already in use: {0}")]
    DuplicatePlayerName(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),

    // Catch-all for storage level errors.
    #[error("DB internal error: {0}")]
    DatabaseError(String),
}

impl WorldStateError {
    /// The in-game sentinel for this error, as substituted into evaluated text.
    pub fn to_sentinel(&self) -> &'static str {
        match self {
            Self::ObjectPermissionDenied => "#-1 Permission denied.",
            Self::AmbiguousMatch(_) => "#-2",
            _ => "#-1",
        }
    }
}

/// The object database as consumed by the evaluator, the scheduler and the command layer.
///
/// Queries are side-effect free. The only mutations the core performs are currency adjustments
/// (queue admission fees), flag changes (quarantine, connect state) and attribute writes
/// (the per-owner queue counter).
pub trait WorldState {
    /// Is `obj` a live object (in range and not destroyed)?
    fn valid(&self, obj: Dbref) -> bool;

    /// The number of object slots, live or not.
    fn db_top(&self) -> i64;

    fn name_of(&self, obj: Dbref) -> Result<String, WorldStateError>;

    /// The name with any colour markup applied. Without markup this is the plain name.
    fn cname_of(&self, obj: Dbref) -> Result<String, WorldStateError>;

    fn object_type(&self, obj: Dbref) -> Result<ObjectType, WorldStateError>;

    fn owner_of(&self, obj: Dbref) -> Result<Dbref, WorldStateError>;

    fn location_of(&self, obj: Dbref) -> Result<Dbref, WorldStateError>;

    fn zone_of(&self, obj: Dbref) -> Result<Dbref, WorldStateError>;

    /// Link target (home for players and things, destination for exits, drop-to for rooms).
    fn link_of(&self, obj: Dbref) -> Result<Dbref, WorldStateError>;

    /// Contents in list order.
    fn contents_of(&self, obj: Dbref) -> Result<Vec<Dbref>, WorldStateError>;

    /// Exits in list order.
    fn exits_of(&self, obj: Dbref) -> Result<Vec<Dbref>, WorldStateError>;

    fn parents_of(&self, obj: Dbref) -> Result<Vec<Dbref>, WorldStateError>;

    fn children_of(&self, obj: Dbref) -> Result<Vec<Dbref>, WorldStateError>;

    fn flags_of(&self, obj: Dbref) -> Result<BitEnum<ObjFlag>, WorldStateError>;

    fn set_flags_of(&mut self, obj: Dbref, flags: BitEnum<ObjFlag>)
    -> Result<(), WorldStateError>;

    /// The class of a player. Other objects report the class of their owner.
    fn class_of(&self, obj: Dbref) -> Result<PlayerClass, WorldStateError>;

    fn pennies_of(&self, obj: Dbref) -> Result<i64, WorldStateError>;

    /// Charges `cost` to the owner of `who`. Guests and owners with infinite money pay nothing.
    /// Returns false (and charges nothing) when funds are short.
    fn payfor(&mut self, who: Dbref, cost: i64) -> Result<bool, WorldStateError>;

    /// Credits `pennies` (which may be negative) to the owner of `who`. Whoever `payfor` lets off
    /// free collects nothing either.
    fn giveto(&mut self, who: Dbref, pennies: i64) -> Result<(), WorldStateError>;

    /// Looks up an attribute, falling back to inherited values from parents.
    fn attribute(&self, obj: Dbref, name: &str) -> Result<Option<Attribute>, WorldStateError>;

    /// Sets an attribute value. An empty value removes it.
    fn set_attribute(&mut self, obj: Dbref, name: &str, value: &str)
    -> Result<(), WorldStateError>;

    /// Attributes set directly on the object.
    fn attributes_of(&self, obj: Dbref) -> Result<Vec<Attribute>, WorldStateError>;

    /// Names of the attribute definitions made on the object itself.
    fn attribute_definitions(&self, obj: Dbref) -> Result<Vec<String>, WorldStateError>;

    fn can_see_attribute(&self, who: Dbref, obj: Dbref, attr: &Attribute) -> bool;

    /// Does `who` control `what` at the given power?
    fn controls(&self, who: Dbref, what: Dbref, power: Power) -> bool;

    /// Does `who` hold `power` at any level?
    fn has_power(&self, who: Dbref, power: Power) -> bool;

    /// Resolves a name (`me`, `here`, `#N`, `*player`, or a nearby object name) from the point
    /// of view of `who`.
    fn match_thing(&self, who: Dbref, name: &str) -> Result<Dbref, WorldStateError>;

    fn lookup_player(&self, name: &str) -> Option<Dbref>;

    fn created_at(&self, obj: Dbref) -> Result<i64, WorldStateError>;

    fn modified_at(&self, obj: Dbref) -> Result<i64, WorldStateError>;

    /// Approximate storage used by one object.
    fn object_bytes(&self, obj: Dbref) -> Result<usize, WorldStateError>;

    /// Checks a name and password, returning the player on success.
    fn connect_player(&self, name: &str, password: &str) -> Option<Dbref>;

    fn create_player(&mut self, name: &str, password: &str) -> Result<Dbref, WorldStateError>;

    /// Creates (or recycles) a guest player whose name begins with `prefix`.
    fn make_guest(&mut self, prefix: &str) -> Result<Dbref, WorldStateError>;

    /// Destroys a guest player once no session refers to it.
    fn destroy_guest(&mut self, guest: Dbref) -> Result<(), WorldStateError>;

    /// Every live object owned by `owner`.
    fn owned_by(&self, owner: Dbref) -> Result<Vec<Dbref>, WorldStateError> {
        let mut owned = vec![];
        for i in 0..self.db_top() {
            let obj = Dbref(i);
            if self.valid(obj) && self.owner_of(obj)? == owner {
                owned.push(obj);
            }
        }
        Ok(owned)
    }
}
