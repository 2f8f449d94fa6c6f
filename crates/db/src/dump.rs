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

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::memory_db::MemoryDb;
use crate::object::ObjectRecord;
use crate::DbError;

const DUMP_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct DumpFile {
    version: u32,
    config: DatabaseConfig,
    objects: Vec<Option<ObjectRecord>>,
}

impl MemoryDb {
    /// Loads a database previously written by [`MemoryDb::dump`].
    pub fn load(path: &Path) -> Result<Self, DbError> {
        let reader = BufReader::new(File::open(path)?);
        let dump: DumpFile = serde_json::from_reader(reader)?;
        if dump.version != DUMP_VERSION {
            return Err(DbError::Version(dump.version));
        }
        info!(
            "Loaded {} object slots from {}",
            dump.objects.len(),
            path.display()
        );
        Ok(MemoryDb::from_objects(dump.config, dump.objects))
    }

    /// Writes the database to `path`, via a temporary file renamed into place so a crash
    /// mid-dump leaves the previous dump intact.
    pub fn dump(&self, path: &Path) -> Result<(), DbError> {
        let tmp = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            let dump = DumpFile {
                version: DUMP_VERSION,
                config: self.config.clone(),
                objects: self.objects.clone(),
            };
            serde_json::to_writer(&mut writer, &dump)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        info!(
            "Dumped {} object slots to {}",
            self.objects.len(),
            path.display()
        );
        Ok(())
    }
}
