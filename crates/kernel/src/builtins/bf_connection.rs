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

//! Functions about connected sessions.

use demuse_common::Dbref;
use demuse_common::model::{ConnectionInfo, ObjectType, Power};

use crate::builtins::Arity::Fixed;
use crate::builtins::{BfCallState, Builtin};
use crate::errors::EvalError;

/// What a non-player pays to list who is connected.
const LWHO_COST: i64 = 50;

impl BfCallState<'_, '_> {
    /// The session of the player named by argument 0 (`me` meaning the caller).
    fn session_of_arg(&self) -> Option<ConnectionInfo> {
        let name = self.arg(0);
        let who = if name.eq_ignore_ascii_case("me") {
            self.privs
        } else {
            self.exec.world.lookup_player(name)?
        };
        self.exec.connections.connection_of(who)
    }
}

/// Usage: `lwho()`
/// Every connected player. Objects pay for the privilege.
fn bf_lwho(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let privs = bf_args.privs;
    if !bf_args.exec.is_type(privs, ObjectType::Player)
        && !bf_args.exec.world.payfor(privs, LWHO_COST)?
    {
        bf_args
            .exec
            .notify(privs, "You don't have enough pennies.");
        return Ok(String::new());
    }
    let players: Vec<String> = bf_args
        .exec
        .connections
        .connected()
        .into_iter()
        .map(|c| c.player)
        .filter(|p| *p > Dbref(0))
        .map(|p| p.to_string())
        .collect();
    Ok(players.join(" "))
}

/// Usage: `idle(player)`
/// Seconds since `player` last typed anything.
fn bf_idle(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let session = bf_args.session_of_arg().ok_or(EvalError::Failed)?;
    Ok((bf_args.exec.rt.now() - session.last_time).to_string())
}

/// Usage: `onfor(player)`
/// Seconds since `player` connected.
fn bf_onfor(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let session = bf_args.session_of_arg().ok_or(EvalError::Failed)?;
    Ok((bf_args.exec.rt.now() - session.connected_at).to_string())
}

fn bf_port(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let session = bf_args.session_of_arg().ok_or(EvalError::Failed)?;
    Ok(session.descriptor.to_string())
}

/// Usage: `host(player)`
/// `user@address` of `player`'s session. Needs the Who power over them.
fn bf_host(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let session = bf_args.session_of_arg().ok_or(EvalError::Failed)?;
    if !bf_args.controls(session.player, Power::Who) {
        return Err(EvalError::Failed);
    }
    Ok(format!("{}@{}", session.user, session.addr))
}

pub(crate) fn register_bf_connection(builtins: &mut Vec<Builtin>) {
    builtins.extend([
        Builtin::new("lwho", Fixed(0), bf_lwho),
        Builtin::new("idle", Fixed(1), bf_idle),
        Builtin::new("onfor", Fixed(1), bf_onfor),
        Builtin::new("port", Fixed(1), bf_port),
        Builtin::new("host", Fixed(1), bf_host),
    ]);
}

#[cfg(test)]
mod tests {
    use crate::testing::TestWorld;
    use demuse_common::model::ObjectType;
    use pretty_assertions::assert_eq;

    #[test]
    fn session_queries() {
        let mut world = TestWorld::new();
        let player = world.player;
        world.advance(100);
        world.connections.connect(player, 7, world.rt.now());
        world.advance(30);
        assert_eq!(world.eval("lwho()"), player.to_string());
        assert_eq!(world.eval("idle(me)"), "30");
        assert_eq!(world.eval("onfor(Tester)"), "30");
        assert_eq!(world.eval("port(me)"), "7");
        assert_eq!(world.eval("idle(Nobody)"), "#-1");
        // Players always control themselves.
        assert_eq!(world.eval("host(me)"), "user7@127.0.0.1");
        let root = world.root;
        assert_eq!(world.eval_as(root, "host(Tester)"), "user7@127.0.0.1");
        let other = world.add_player("Other");
        world.connections.connect(other, 8, world.rt.now());
        assert_eq!(world.eval("host(Other)"), "#-1");
    }

    #[test]
    fn objects_pay_for_lwho() {
        let mut world = TestWorld::new();
        let (player, room) = (world.player, world.room);
        world.connections.connect(player, 3, 0);
        let puppet = world.create("puppet", ObjectType::Thing, player, room);
        world.db.set_pennies(player, 60).unwrap();
        assert_eq!(world.eval_as(puppet, "lwho()"), player.to_string());
        assert_eq!(world.eval_as(puppet, "lwho()"), "");
        assert!(
            world
                .messages_for(puppet)
                .contains(&"You don't have enough pennies.".to_string())
        );
    }
}
