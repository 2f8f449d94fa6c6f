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

//! The top-level command path, shared by typed input and released queue entries: speech
//! tokens, forcing, the queue-control commands, and `$pattern:action` attributes.

use ahash::AHashSet;
use demuse_common::model::{AttrFlag, Attribute, ObjectType, Power};
use demuse_common::{Dbref, NOTHING};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};
use tracing::{debug, info, trace, warn};

use crate::Env;
use crate::eval::text::{atol, parse_up};
use crate::eval::wild::wild_match;
use crate::runtime::ExecContext;
use crate::zones::zones;

/// Inherited `$commands` are looked for this many parents up.
const MAX_INHERIT_DEPTH: usize = 20;

/// The commands built into the dispatcher. A typed word selects one when it is a prefix of the
/// full name at least `min_len` characters long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
enum BuiltinCommand {
    #[strum(serialize = "say")]
    Say,
    #[strum(serialize = "pose")]
    Pose,
    #[strum(serialize = "think")]
    Think,
    #[strum(serialize = "@wait")]
    Wait,
    #[strum(serialize = "@trigger")]
    Trigger,
    #[strum(serialize = "@switch")]
    Switch,
    // Must precede @force, which shares its first four characters.
    #[strum(serialize = "@foreach")]
    Foreach,
    #[strum(serialize = "@force")]
    Force,
    #[strum(serialize = "@halt")]
    Halt,
    #[strum(serialize = "@ps")]
    Ps,
}

impl BuiltinCommand {
    fn min_len(self) -> usize {
        match self {
            Self::Say | Self::Pose | Self::Think => 2,
            Self::Foreach => 5,
            _ => 3,
        }
    }

    fn lookup(word: &str) -> Option<Self> {
        let word = word.to_ascii_lowercase();
        Self::iter().find(|c| {
            let name: &'static str = (*c).into();
            word.len() >= c.min_len() && name.starts_with(&word)
        })
    }
}

/// `arg1 = arg2`, or just `arg1`, as speech commands put a split message back together.
fn reconstruct_message(arg1: &str, arg2: &str) -> String {
    if arg2.is_empty() {
        arg1.to_string()
    } else {
        format!("{arg1} = {arg2}")
    }
}

/// Skips a `/lock/` section at the start of a `$command` action. `None` when it is unterminated.
fn skip_lock(action: &str) -> Option<&str> {
    let Some(body) = action.strip_prefix('/') else {
        return Some(action);
    };
    let mut in_brackets = false;
    for (i, c) in body.char_indices() {
        match c {
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            '/' if !in_brackets => return Some(&body[i + 1..]),
            _ => {}
        }
    }
    None
}

impl ExecContext<'_> {
    /// Runs one command line as `actor`. A `cause` of `NOTHING` marks typed input.
    pub fn process_command(&mut self, actor: Dbref, text: &str, cause: Dbref) {
        if !self.world.valid(actor) {
            warn!(actor = %actor, "Command for an invalid object");
            return;
        }
        let direct = cause == NOTHING;
        let cause = if direct { actor } else { cause };
        // Nothing may make root act on its behalf.
        if actor == self.rt.config.database.root && cause != actor {
            return;
        }

        let command = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if direct {
            debug!(actor = %actor, command = %command, "Direct command");
        } else {
            trace!(actor = %actor, cause = %cause, command = %command, "Caused command");
        }
        self.rt.reset_depth();
        if command.is_empty() || self.try_force(actor, &command) {
            return;
        }

        let mut chars = command.chars();
        match chars.next() {
            Some('"') => return self.do_say(actor, chars.as_str()),
            Some(':') => return self.do_pose(actor, chars.as_str(), false),
            Some(';') => return self.do_pose(actor, chars.as_str(), true),
            Some('.') => return self.do_think(actor, chars.as_str()),
            _ => {}
        }

        let (word, rest) = command.split_once(' ').unwrap_or((command.as_str(), ""));
        let Some(builtin) = BuiltinCommand::lookup(word) else {
            if !self.match_dollar_commands(actor, &command) {
                let huh = self.rt.config.messages.huh.clone();
                self.notify(actor, &huh);
            }
            return;
        };

        let mut after = rest;
        let arg1 = match parse_up(&mut after, '=') {
            Some(raw) => self.evaluate(raw, actor, cause),
            None => String::new(),
        };
        match builtin {
            BuiltinCommand::Say => {
                let arg2 = self.evaluate(after, actor, cause);
                self.do_say(actor, &reconstruct_message(&arg1, &arg2));
            }
            BuiltinCommand::Pose => {
                let arg2 = self.evaluate(after, actor, cause);
                self.do_pose(actor, &reconstruct_message(&arg1, &arg2), false);
            }
            BuiltinCommand::Think => {
                let arg2 = self.evaluate(after, actor, cause);
                self.do_think(actor, &reconstruct_message(&arg1, &arg2));
            }
            BuiltinCommand::Wait => {
                let arg2 = self.evaluate(after, actor, cause);
                if let Err(e) = self.wait_que(actor, atol(&arg1), &arg2, cause) {
                    debug!(actor = %actor, error = %e, "@wait not queued");
                }
            }
            BuiltinCommand::Trigger => {
                let argv = self.evaluate_list(after, actor, cause);
                self.do_trigger(actor, &arg1, &argv);
            }
            BuiltinCommand::Switch => {
                let argv = self.evaluate_list(after, actor, cause);
                self.do_switch(actor, &arg1, &argv, cause);
            }
            BuiltinCommand::Foreach => {
                let arg2 = self.evaluate(after, actor, cause);
                self.do_foreach(actor, &arg1, &arg2, cause);
            }
            BuiltinCommand::Force => {
                let arg2 = self.evaluate(after, actor, cause);
                self.do_force(actor, &arg1, &arg2);
            }
            BuiltinCommand::Halt => {
                let arg2 = self.evaluate(after, actor, cause);
                self.do_halt(actor, &arg1, &arg2);
            }
            BuiltinCommand::Ps => self.do_queue(actor),
        }
    }

    /// Evaluates each top-level comma separated piece of `text`.
    fn evaluate_list(&mut self, text: &str, privs: Dbref, doer: Dbref) -> Vec<String> {
        let mut rest = text;
        let mut out = vec![];
        while let Some(piece) = parse_up(&mut rest, ',') {
            out.push(self.evaluate(piece, privs, doer));
        }
        out
    }

    /// The name other objects hear `obj` speak under.
    fn spoken_name(&self, obj: Dbref) -> String {
        self.world
            .cname_of(obj)
            .unwrap_or_else(|_| self.name(obj))
    }

    fn do_say(&mut self, actor: Dbref, message: &str) {
        let location = self.location(actor);
        if !self.world.valid(location) {
            return;
        }
        let text = self.pronoun_substitute(actor, message, actor);
        let name = self.spoken_name(actor);
        self.notify(actor, &format!("You say \"{text}\""));
        self.notify_in(location, actor, &format!("{name} says \"{text}\""));
    }

    fn do_pose(&mut self, actor: Dbref, message: &str, possessive: bool) {
        let location = self.location(actor);
        if !self.world.valid(location) {
            return;
        }
        let text = self.pronoun_substitute(actor, message, actor);
        let name = self.spoken_name(actor);
        let line = if !possessive {
            format!("{name} {text}")
        } else if self.name(actor).to_ascii_lowercase().ends_with('s') {
            format!("{name}' {text}")
        } else {
            format!("{name}'s {text}")
        };
        self.notify_in(location, NOTHING, &line);
    }

    fn do_think(&mut self, actor: Dbref, message: &str) {
        let location = self.location(actor);
        if !self.world.valid(location) {
            return;
        }
        let text = self.pronoun_substitute(actor, message, actor);
        let name = self.spoken_name(actor);
        self.notify_in(location, NOTHING, &format!("{name} . o O ( {text} )"));
    }

    /// `#N command` is shorthand for `@force #N=command`.
    fn try_force(&mut self, actor: Dbref, command: &str) -> bool {
        let Some(rest) = command.strip_prefix('#') else {
            return false;
        };
        let Some((num, forced)) = rest.split_once(' ') else {
            return false;
        };
        if num.is_empty() || !num.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        self.do_force(actor, &format!("#{num}"), forced);
        true
    }

    /// `@force object=command`: queues `command` as an object the actor controls.
    pub fn do_force(&mut self, actor: Dbref, what: &str, command: &str) {
        let victim = match self.world.match_thing(actor, what) {
            Ok(v) if self.world.controls(actor, v, Power::Modify) => v,
            _ => {
                self.notify(actor, "Sorry.");
                return;
            }
        };
        let victim_owner = self.owner(victim);
        if victim_owner != self.owner(actor) {
            info!(actor = %actor, victim = %victim, command, "Forced");
        }
        if victim_owner == self.rt.config.database.root {
            self.notify(actor, "You can't force root!!");
            return;
        }
        if let Err(e) = self.parse_que(victim, command, actor) {
            debug!(victim = %victim, error = %e, "Forced command not queued");
        }
    }

    /// `@trigger object/attribute=args`: queues the attribute as the object, with the
    /// arguments in `%0`-`%9`.
    pub fn do_trigger(&mut self, actor: Dbref, object: &str, argv: &[String]) {
        let target = object.split_once('/').and_then(|(obj, attr_name)| {
            let thing = self.world.match_thing(actor, obj).ok()?;
            let attr = self.world.attribute(thing, attr_name).ok()??;
            self.world
                .can_see_attribute(actor, thing, &attr)
                .then_some((thing, attr))
        });
        let Some((thing, attr)) = target else {
            self.notify(actor, "No match.");
            return;
        };
        if !self.world.controls(actor, thing, Power::Modify) {
            self.notify(actor, "Permission denied.");
            return;
        }
        if thing == self.rt.config.database.root {
            self.notify(actor, "You can't trigger root.");
            return;
        }

        let env: Env = std::array::from_fn(|i| argv.get(i).cloned());
        let saved = std::mem::replace(&mut self.rt.env, env);
        if let Err(e) = self.parse_que(thing, &attr.value, actor) {
            debug!(thing = %thing, error = %e, "Triggered action not queued");
        }
        self.rt.env = saved;

        if !self.is_quiet(actor) {
            let msg = format!("{} - Triggered.", self.spoken_name(thing));
            self.notify(actor, &msg);
        }
    }

    /// `@switch value=pattern,action,...[,default]`: queues the action of every matching
    /// pattern, or the default when none match.
    pub fn do_switch(&mut self, actor: Dbref, value: &str, argv: &[String], cause: Dbref) {
        let mut any = false;
        let mut pairs = argv.chunks_exact(2);
        for pair in pairs.by_ref() {
            if wild_match(&pair[0], value).is_some() {
                any = true;
                if let Err(e) = self.parse_que(actor, &pair[1], cause) {
                    debug!(actor = %actor, error = %e, "@switch action not queued");
                    return;
                }
            }
        }
        if let [default] = pairs.remainder()
            && !any
            && let Err(e) = self.parse_que(actor, default, cause)
        {
            debug!(actor = %actor, error = %e, "@switch default not queued");
        }
    }

    /// `@foreach list=command`: queues `command` once per word, with the word in `%0`.
    pub fn do_foreach(&mut self, actor: Dbref, list: &str, command: &str, cause: Dbref) {
        let saved = std::mem::take(&mut self.rt.env);
        let mut rest = list;
        while let Some(word) = parse_up(&mut rest, ' ') {
            let mut env: Env = std::array::from_fn(|_| Some(String::new()));
            env[0] = Some(word.to_string());
            self.rt.env = env;
            if let Err(e) = self.parse_que(actor, command, cause) {
                debug!(actor = %actor, error = %e, "@foreach stopped");
                break;
            }
        }
        self.rt.env = saved;
    }

    /// Tries `text` against `$pattern:action` attributes nearby: the location's contents, the
    /// actor's inventory, the location, its exits, then every zone. The nearby sources stop at
    /// the first that matches; zones are always tried.
    fn match_dollar_commands(&mut self, actor: Dbref, text: &str) -> bool {
        let location = self.location(actor);
        let contents = self.world.contents_of(location).unwrap_or_default();
        let inventory = self.world.contents_of(actor).unwrap_or_default();
        let exits = self.world.exits_of(location).unwrap_or_default();

        let mut matched = self.list_check(&contents, actor, text)
            || self.list_check(&inventory, actor, text)
            || self.atr_match(location, actor, text)
            || self.list_check(&exits, actor, text);
        for zone in zones(&*self.world, actor) {
            matched = self.list_check(&[zone], actor, text) || matched;
        }
        matched
    }

    /// Players only ever match their own `$commands`, and nothing else matches its own.
    fn list_check(&mut self, things: &[Dbref], actor: Dbref, text: &str) -> bool {
        let mut matched = false;
        for &thing in things {
            let is_player = self.is_type(thing, ObjectType::Player);
            if (thing == actor) != is_player {
                continue;
            }
            matched |= self.atr_match(thing, actor, text);
        }
        matched
    }

    fn atr_match(&mut self, thing: Dbref, actor: Dbref, text: &str) -> bool {
        if !self.world.valid(thing) {
            return false;
        }
        let mut matched = false;
        for attr in self.command_attributes(thing) {
            if attr.has(AttrFlag::Lock) {
                continue;
            }
            let Some((pattern, action)) = attr
                .value
                .strip_prefix('$')
                .and_then(|body| body.split_once(':'))
            else {
                continue;
            };
            let Some(action) = skip_lock(action) else {
                continue;
            };
            let Some(captures) = wild_match(pattern, text) else {
                continue;
            };
            // A disabled command hides every later one on the object.
            if attr.has(AttrFlag::Haven) {
                return false;
            }
            matched = true;
            trace!(thing = %thing, attribute = %attr.name, "Matched $command");
            let saved = std::mem::replace(&mut self.rt.env, captures);
            if let Err(e) = self.parse_que(thing, action, actor) {
                debug!(thing = %thing, error = %e, "$command action not queued");
            }
            self.rt.env = saved;
        }
        matched
    }

    /// Attributes set on `thing`, then any inheritable ones its parents set that it does not
    /// override.
    fn command_attributes(&self, thing: Dbref) -> Vec<Attribute> {
        let mut attrs = self.world.attributes_of(thing).unwrap_or_default();
        let mut names: AHashSet<String> =
            attrs.iter().map(|a| a.name.to_ascii_lowercase()).collect();
        let mut visited = AHashSet::from([thing]);
        let mut frontier = self.world.parents_of(thing).unwrap_or_default();
        for _ in 0..MAX_INHERIT_DEPTH {
            if frontier.is_empty() {
                break;
            }
            let mut next = vec![];
            for parent in frontier {
                if !visited.insert(parent) {
                    continue;
                }
                for attr in self.world.attributes_of(parent).unwrap_or_default() {
                    if attr.has(AttrFlag::Inherit) && names.insert(attr.name.to_ascii_lowercase())
                    {
                        attrs.push(attr);
                    }
                }
                next.extend(self.world.parents_of(parent).unwrap_or_default());
            }
            frontier = next;
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::TestWorld;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn lossless() -> TestWorld {
        let mut config = Config::default();
        config.queue.queue_loss = 0;
        TestWorld::with_config(config)
    }

    #[test_case("say", Some(BuiltinCommand::Say); "full name")]
    #[test_case("SA", Some(BuiltinCommand::Say); "abbreviated")]
    #[test_case("s", None; "too short")]
    #[test_case("@for", Some(BuiltinCommand::Force); "force abbreviation")]
    #[test_case("@fore", Some(BuiltinCommand::Foreach); "foreach abbreviation")]
    #[test_case("@forc", Some(BuiltinCommand::Force); "force past the fork")]
    #[test_case("@ps", Some(BuiltinCommand::Ps); "ps")]
    #[test_case("@psx", None; "longer than the name")]
    fn builtin_lookup(word: &str, expected: Option<BuiltinCommand>) {
        assert_eq!(BuiltinCommand::lookup(word), expected);
    }

    #[test]
    fn lock_sections_are_skipped() {
        assert_eq!(skip_lock("/me/say hi"), Some("say hi"));
        assert_eq!(skip_lock("/[v(va)/x]/go"), Some("go"));
        assert_eq!(skip_lock("/never closed"), None);
        assert_eq!(skip_lock("plain"), Some("plain"));
    }

    #[test]
    fn speech_tokens() {
        let mut world = lossless();
        let player = world.player;
        let other = world.add_player("Listener");

        world.command(player, "\"hello   there");
        assert_eq!(world.messages_for(player), vec!["You say \"hello there\"".to_string()]);
        assert_eq!(
            world.messages_for(other),
            vec!["Tester says \"hello there\"".to_string()]
        );

        world.take_messages();
        world.command(player, ":waves.");
        world.command(player, ";hat is red.");
        world.command(player, ".hmm");
        assert_eq!(
            world.messages_for(other),
            vec![
                "Tester waves.".to_string(),
                "Tester's hat is red.".to_string(),
                "Tester . o O ( hmm )".to_string(),
            ]
        );

        world.take_messages();
        world.command(other, ";hat is blue.");
        assert_eq!(world.messages_for(player), vec!["Listener's hat is blue.".to_string()]);
    }

    #[test]
    fn say_rejoins_split_messages_and_evaluates() {
        let mut world = lossless();
        let player = world.player;
        world.command(player, "say a=b");
        world.command(player, "\"[add(1,2)] apples");
        assert_eq!(
            world.messages_for(player),
            vec![
                "You say \"a = b\"".to_string(),
                "You say \"3 apples\"".to_string()
            ]
        );
    }

    #[test]
    fn unknown_commands_say_huh() {
        let mut world = lossless();
        let player = world.player;
        world.command(player, "xyzzy");
        assert_eq!(
            world.messages_for(player),
            vec!["Huh?  (Type \"help\" for help.)".to_string()]
        );
    }

    #[test]
    fn dollar_commands_queue_their_action() {
        let mut world = lossless();
        let (player, room) = (world.player, world.room);
        let button = world.create("button", ObjectType::Thing, player, room);
        world.set_attr(button, "VA", "$push *:think pushed %0");
        world.command(player, "push the  red one");
        assert!(world.messages_for(player).is_empty());
        assert_eq!(world.rt.scheduler.len(), 1);

        world.run_queue();
        assert_eq!(
            world.messages_for(player),
            vec!["button . o O ( pushed the red one )".to_string()]
        );
        assert_eq!(world.pennies(player), 10000);
    }

    #[test]
    fn players_only_match_their_own_commands() {
        let mut world = lossless();
        let player = world.player;
        let other = world.add_player("Other");
        world.set_attr(other, "VA", "$wave:think waving");
        world.command(player, "wave");
        assert_eq!(
            world.messages_for(player),
            vec!["Huh?  (Type \"help\" for help.)".to_string()]
        );
        world.command(other, "wave");
        world.run_queue();
        assert!(world.messages_for(player).contains(&"Other . o O ( waving )".to_string()));
    }

    #[test]
    fn zones_provide_commands() {
        let mut world = lossless();
        let (player, room, root) = (world.player, world.room, world.root);
        let annex = world.create("Annex", ObjectType::Room, root, NOTHING);
        let zone = world.create("zone", ObjectType::Thing, root, annex);
        world.db.set_zone(room, zone).unwrap();
        world.set_attr(zone, "VB", "$ring:think ding");
        world.command(player, "ring");
        assert!(world.messages_for(player).is_empty());
        assert!(
            world
                .rt
                .scheduler
                .iter()
                .any(|c| c.player == zone && c.command == "think ding")
        );
    }

    #[test]
    fn switch_queues_every_match_or_the_default() {
        let mut world = lossless();
        let player = world.player;
        world.command(player, "@switch apple=a*,{think first},*e,{think second},{think default}");
        world.run_queue();
        world.command(player, "@switch pear=a*,{think first},{think default}");
        world.run_queue();
        assert_eq!(
            world.messages_for(player),
            vec![
                "Tester . o O ( first )".to_string(),
                "Tester . o O ( second )".to_string(),
                "Tester . o O ( default )".to_string(),
            ]
        );
    }

    #[test]
    fn foreach_and_wait() {
        let mut world = lossless();
        let player = world.player;
        world.command(player, "@foreach x y=think %0");
        world.command(player, "@wait 10=think late");
        assert_eq!(world.rt.scheduler.len(), 3);
        world.run_queue();
        assert_eq!(
            world.messages_for(player),
            vec!["Tester . o O ( x )".to_string(), "Tester . o O ( y )".to_string()]
        );
        world.advance(10);
        world.run_queue();
        assert!(world.messages_for(player).contains(&"Tester . o O ( late )".to_string()));
        assert!(world.rt.scheduler.is_empty());
    }

    #[test]
    fn trigger_binds_arguments() {
        let mut world = lossless();
        let (player, room, root) = (world.player, world.room, world.root);
        let gadget = world.create("gadget", ObjectType::Thing, player, room);
        world.set_attr(gadget, "VA", "think got %0 and %1");
        world.command(player, "@trigger gadget/va=one,two");
        assert!(world.messages_for(player).contains(&"gadget - Triggered.".to_string()));
        world.run_queue();
        assert!(
            world
                .messages_for(player)
                .contains(&"gadget . o O ( got one and two )".to_string())
        );

        world.take_messages();
        world.command(player, "@trigger gadget/vz");
        world.command(player, "@trigger here/desc");
        let stone = world.create("stone", ObjectType::Thing, root, room);
        world.set_attr(stone, "Desc", "A stone.");
        world.command(player, "@trigger stone/desc");
        assert_eq!(
            world.messages_for(player),
            vec![
                "No match.".to_string(),
                "No match.".to_string(),
                "Permission denied.".to_string()
            ]
        );
    }

    #[test]
    fn force_requires_control() {
        let mut world = lossless();
        let (player, room, root) = (world.player, world.room, world.root);
        let puppet = world.create("puppet", ObjectType::Thing, player, room);
        world.command(player, &format!("{puppet} :bows."));
        world.run_queue();
        assert!(world.messages_for(player).contains(&"puppet bows.".to_string()));

        let statue = world.create("statue", ObjectType::Thing, root, room);
        world.take_messages();
        world.command(player, "@force statue=:moves.");
        world.command(player, "@force nothing-here=:moves.");
        assert_eq!(
            world.messages_for(player),
            vec!["Sorry.".to_string(), "Sorry.".to_string()]
        );
        world.command(root, "@force statue=:moves.");
        assert!(world.messages_for(root).contains(&"You can't force root!!".to_string()));
        assert!(world.rt.scheduler.is_empty());
        assert_ne!(statue, puppet);
    }

    #[test]
    fn root_cannot_be_made_to_act() {
        let mut world = lossless();
        let (player, root) = (world.player, world.root);
        world.exec().process_command(root, "think hi", player);
        assert!(world.messages_for(root).is_empty());
        world.command(root, "think mine");
        assert!(world.messages_for(root).contains(&"Root Player . o O ( mine )".to_string()));
    }
}
