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

use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::os::fd::FromRawFd;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use demuse_common::tracing;
use demuse_db::MemoryDb;
use demuse_kernel::Config;
use demuse_server::args::Args;
use demuse_server::reboot::RebootState;
use demuse_server::server::{Exit, Server};
use eyre::{Report, WrapErr, eyre};
use socket2::{Domain, Socket, Type};
use ::tracing::{error, info, warn};

/// Deeply nested evaluation recurses on the native stack.
const SERVER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Password given to the root player of a freshly made database.
const INITIAL_ROOT_PASSWORD: &str = "potrzebie";

fn load_db(path: &Path, config: &Config) -> Result<MemoryDb, Report> {
    if path.exists() {
        let db = MemoryDb::load(path)
            .wrap_err_with(|| format!("Couldn't load {}", path.display()))?;
        info!(path = %path.display(), "Loaded database");
        return Ok(db);
    }
    warn!(path = %path.display(), "No database found; starting a minimal world");
    MemoryDb::minimal(config.database.clone(), INITIAL_ROOT_PASSWORD)
        .map_err(|e| eyre!("Unable to build a minimal world: {e}"))
}

fn bind_listener(port: u16) -> Result<TcpListener, Report> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket
        .bind(&addr.into())
        .wrap_err_with(|| format!("Unable to bind port {port}"))?;
    socket.listen(128)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::parse();
    tracing::init_tracing(args.debug, args.log_file.as_deref())
        .map_err(|e| eyre!("Unable to configure logging: {}", e))?;
    let config = args.load_config()?;

    info!(pid = std::process::id(), "deMUSE starting");
    let db = load_db(&args.input_db, &config)?;

    let reboot_file = Path::new(&config.server.reboot_file).to_path_buf();
    let restored = if args.restore_reboot && reboot_file.exists() {
        Some(RebootState::read(&reboot_file)?)
    } else {
        None
    };
    let listener = match &restored {
        // SAFETY: the listening socket was kept open across exec by the previous image.
        Some(state) => unsafe { TcpListener::from_raw_fd(state.listener_fd) },
        None => bind_listener(config.net.inet_port)?,
    };

    let output_db = args.output_path();
    let handle = std::thread::Builder::new()
        .name("demuse-server".to_string())
        .stack_size(SERVER_STACK_SIZE)
        .spawn(move || -> Result<(), Report> {
            let mut server = Server::new(db, config, listener, output_db);
            server.install_signals()?;
            if let Some(state) = restored {
                server.restore(state);
            }
            server.startup();
            match server.run() {
                Exit::Shutdown => server.shutdown(),
                Exit::Reboot => Err(server.reboot(&reboot_file)),
            }
        })?;

    match handle.join() {
        Ok(Ok(())) => {
            info!("Shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = ?e, "Server stopped with an error");
            Err(e)
        }
        Err(_) => {
            error!("Server thread panicked");
            exit(1);
        }
    }
}
