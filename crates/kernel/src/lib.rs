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

pub use crate::config::Config;
pub use crate::errors::{EvalError, SchedulerError};
pub use crate::runtime::{ExecContext, Runtime};
pub use crate::tasks::pid::Pid;
pub use crate::tasks::scheduler::{ScheduledCommand, Scheduler};

pub mod arena;
pub mod builtins;
pub mod commands;
pub mod config;
mod errors;
pub mod eval;
pub mod presence;
mod runtime;
pub mod tasks;
pub mod zones;

pub mod testing;

/// The ten `%0`-`%9` registers: wildcard captures, function arguments, or `@trigger` values.
/// An absent register substitutes as empty text.
pub type Env = [Option<String>; 10];
