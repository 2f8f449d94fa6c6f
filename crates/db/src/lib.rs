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

//! An in-memory object database, loaded from and dumped to a JSON file, together with the
//! permission oracle (`controls`, powers, attribute visibility) the rest of the server consults.

use thiserror::Error;

pub use config::DatabaseConfig;
pub use memory_db::MemoryDb;
pub use object::{AttrDef, AttrValue, ObjectRecord};

mod builtin_attrs;
mod config;
mod dump;
mod matching;
mod memory_db;
mod object;
mod passwords;
mod perms;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error on database file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed database file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("Unsupported database version {0}")]
    Version(u32),
}
