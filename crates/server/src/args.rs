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

use clap::builder::ValueHint;
use clap_derive::Parser;
use demuse_kernel::Config;
use eyre::eyre;
use figment::Figment;
use figment::providers::{Format as ProviderFormat, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const RESTORE_REBOOT_FLAG: &str = "--restore-reboot";

#[derive(Parser, Debug, Serialize, Deserialize)]
pub struct Args {
    #[arg(
        value_name = "input-db",
        help = "Database to load at startup",
        value_hint = ValueHint::FilePath,
        default_value = "db/muse.db"
    )]
    pub input_db: PathBuf,

    #[arg(
        value_name = "output-db",
        help = "Where periodic and shutdown dumps are written (defaults to the input database)",
        value_hint = ValueHint::FilePath
    )]
    pub output_db: Option<PathBuf>,

    #[arg(
        value_name = "log-file",
        help = "File to append the server log to, instead of standard error",
        value_hint = ValueHint::FilePath
    )]
    pub log_file: Option<PathBuf>,

    #[arg(value_name = "port", help = "Port to accept player connections on")]
    pub port: Option<u16>,

    #[arg(
        long,
        value_name = "config",
        help = "Path to configuration (YAML) file to use, if any. If not specified, defaults are used.\
                Configuration file values can be overridden by command line arguments.",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[arg(long, help = "Enable debug logging", default_value = "false")]
    pub debug: bool,

    /// Set by the server itself when it re-executes after a reboot.
    #[arg(long, hide = true, default_value = "false")]
    pub restore_reboot: bool,
}

impl Args {
    pub fn output_path(&self) -> PathBuf {
        self.output_db.clone().unwrap_or_else(|| self.input_db.clone())
    }

    /// Defaults, then the YAML file if one was given, then command line values.
    pub fn load_config(&self) -> Result<Config, eyre::Report> {
        let config = match &self.config_file {
            Some(config_path) => Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Yaml::file(config_path))
                .extract::<Config>()
                .map_err(|e| {
                    eyre!(
                        "Failed to parse configuration from {:?}: {}",
                        config_path,
                        e
                    )
                })?,
            None => Config::default(),
        };
        Ok(self.merge_config(config))
    }

    fn merge_config(&self, mut config: Config) -> Config {
        if let Some(port) = self.port {
            config.net.inet_port = port;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn positionals_in_order() {
        let args = Args::parse_from(["demuse", "in.db", "out.db", "muse.log", "4201"]);
        assert_eq!(args.input_db, PathBuf::from("in.db"));
        assert_eq!(args.output_path(), PathBuf::from("out.db"));
        assert_eq!(args.log_file, Some(PathBuf::from("muse.log")));
        assert_eq!(args.port, Some(4201));
        assert!(!args.restore_reboot);
    }

    #[test]
    fn output_defaults_to_input() {
        let args = Args::parse_from(["demuse", "in.db"]);
        assert_eq!(args.output_path(), PathBuf::from("in.db"));
    }

    #[test]
    fn file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "net:\n  inet_port: 5000\nqueue:\n  max_queue: 7").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = Args::parse_from(["demuse", "in.db", "--config-file", &path]);
        let config = args.load_config().unwrap();
        assert_eq!(config.net.inet_port, 5000);
        assert_eq!(config.queue.max_queue, 7);
        assert_eq!(config.queue.queue_cost, 100);

        let args = Args::parse_from(["demuse", "in.db", "out.db", "log", "6000", "--config-file", &path]);
        assert_eq!(args.load_config().unwrap().net.inet_port, 6000);
    }
}
