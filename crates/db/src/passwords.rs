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

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use demuse_common::model::WorldStateError;
use tracing::warn;

pub(crate) fn hash_password(password: &str) -> Result<String, WorldStateError> {
    let mut rng_core = OsRng;
    let salt = SaltString::generate(&mut rng_core);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            warn!("Failed to hash password: {}", e);
            WorldStateError::DatabaseError(e.to_string())
        })?;
    Ok(hash.to_string())
}

pub(crate) fn verify_password(stored: &str, password: &str) -> bool {
    let Ok(hash) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("potrzebie").unwrap();
        assert!(verify_password(&stored, "potrzebie"));
        assert!(!verify_password(&stored, "xyzzy"));
        assert!(!verify_password("not a hash", "potrzebie"));
    }
}
