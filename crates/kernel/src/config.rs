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

//! Config is created by the server binary (defaults, overlaid with an optional YAML file and then
//! command line flags) and handed to the runtime, whereupon it is available to all components.

use demuse_db::DatabaseConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queue: QueueConfig,
    pub eval: EvalConfig,
    pub net: NetConfig,
    pub server: ServerConfig,
    pub messages: MessagesConfig,
    pub database: DatabaseConfig,
}

/// Economy and fairness knobs of the command queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Admission fee charged per queued command, refunded when it runs or is halted.
    pub queue_cost: i64,
    /// One in `queue_loss + 1` admissions (roughly) costs an extra penny that is never refunded.
    /// Zero disables the surcharge.
    pub queue_loss: u32,
    /// Maximum outstanding commands per owner before the owner's objects are halted.
    pub max_queue: i64,
    /// After inserting, entries at or below this priority are run straight away.
    pub immediate_priority: i32,
    /// Due entries released per scheduler tick.
    pub queue_commands_per_tick: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_cost: 100,
            queue_loss: 150,
            max_queue: 1000,
            immediate_priority: -20,
            queue_commands_per_tick: 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub recursion_limit: i64,
    /// The (lower) limit applied when the privilege object is a guest.
    pub guest_recursion_limit: i64,
    /// What each level of evaluation costs against the limit.
    pub recursion_charge: i64,
    /// Evaluated text longer than this is truncated.
    pub max_eval_output: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 15000,
            guest_recursion_limit: 1000,
            recursion_charge: 10,
            max_eval_output: 1024,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub inet_port: u16,
    pub max_command_len: usize,
    /// Output budget for plain clients.
    pub max_output: usize,
    /// Output budget for clients that announced rich markup support.
    pub max_output_pueblo: usize,
    /// Quota refill interval.
    pub command_time_msec: u64,
    pub command_burst_size: i32,
    /// Quota added per elapsed interval.
    pub commands_per_time: i32,
    /// Descriptors held back from accept() so the process never runs out.
    pub reserved_descriptors: usize,
    /// Floor and ceiling for a player's `IdleTime`, in seconds.
    pub min_idle: i64,
    pub max_idle: i64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            inet_port: 4208,
            max_command_len: 1000,
            max_output: 32767,
            max_output_pueblo: 65534,
            command_time_msec: 1000,
            command_burst_size: 100,
            commands_per_time: 1,
            reserved_descriptors: 5,
            min_idle: 1200,
            max_idle: 3600,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub muse_name: String,
    pub guest_prefix: String,
    /// Seconds between periodic database dumps.
    pub dump_interval: i64,
    /// Where descriptor state is written across an in-place reboot.
    pub reboot_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            muse_name: "YourMUSE".to_string(),
            guest_prefix: "Guest".to_string(),
            dump_interval: 3600,
            reboot_file: "reboot.state".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub welcome: String,
    pub leave: String,
    pub flushed: String,
    pub reboot: String,
    /// Sent to restored sessions once a reboot has completed.
    pub online: String,
    pub shutdown: String,
    pub connect_fail: String,
    pub bad_password: String,
    pub create_fail: String,
    pub huh: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome: "Welcome to deMUSE.\nUse \"connect <name> <password>\" to connect, \
                      \"create <name> <password>\" to create a character, \
                      \"connect guest\" to look around, or \"WHO\" to see who is on.\n"
                .to_string(),
            leave: "Thanks for visiting. Come back soon!\n".to_string(),
            flushed: "<Output Flushed>\n".to_string(),
            reboot: "reloading, please hold.\n".to_string(),
            online: "online.\n".to_string(),
            shutdown: "Going down - Bye.\n".to_string(),
            connect_fail: "That player does not exist.\n".to_string(),
            bad_password: "Incorrect password.\n".to_string(),
            create_fail: "Either there is already a player with that name, or that name is illegal.\n"
                .to_string(),
            huh: "Huh?  (Type \"help\" for help.)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"queue": {"max_queue": 5}, "server": {"muse_name": "Test"}}"#)
                .unwrap();
        assert_eq!(config.queue.max_queue, 5);
        assert_eq!(config.queue.queue_cost, 100);
        assert_eq!(config.server.muse_name, "Test");
        assert_eq!(config.eval.guest_recursion_limit, 1000);
    }
}
