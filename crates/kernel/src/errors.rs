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
use demuse_common::model::WorldStateError;
use thiserror::Error;

/// Why a function call failed. The `Display` form is the text substituted in place of the
/// call's result, so players see it inline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("#-1 RECURSION_LIMIT")]
    RecursionLimit,
    #[error("#-1 Function ({0}) only expects {1} arguments")]
    WrongArgCount(&'static str, usize),
    #[error("#-1 WRONG NUMBER OF ARGS")]
    WrongNumberOfArgs,
    #[error("#-1 DIVISION BY ZERO")]
    DivisionByZero,
    #[error("#-1 OVERFLOW")]
    Overflow,
    #[error("#-1 Permission denied.")]
    PermissionDenied,
    #[error("#-1 NO MATCH")]
    NoMatch,
    /// A failed or invalid lookup, with no reason given.
    #[error("#-1")]
    Failed,
    #[error("#-2")]
    Ambiguous,
    /// A bad argument or a floating point domain error, with its reason.
    #[error("#-1 {0}")]
    Invalid(&'static str),
}

impl From<WorldStateError> for EvalError {
    fn from(err: WorldStateError) -> Self {
        match err {
            WorldStateError::AmbiguousMatch(_) => EvalError::Ambiguous,
            WorldStateError::ObjectPermissionDenied => EvalError::PermissionDenied,
            _ => EvalError::Failed,
        }
    }
}

/// Why a command could not be admitted to the queue. All but `Halted` have been reported to the
/// owner by the time they are returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Not enough money to queue command.")]
    InsufficientFunds,
    #[error("Run away object ({0}), commands halted")]
    RunAway(Dbref),
    #[error("OUT OF PIDS")]
    OutOfPids,
    /// The object is quarantined; admission is refused silently.
    #[error("Object {0} is halted")]
    Halted(Dbref),
    #[error(transparent)]
    World(#[from] WorldStateError),
}
