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

//! Behavioural properties of the queue and the evaluator, run against the in-memory world.

use demuse_common::model::{AttrFlag, ObjFlag, ObjectType, PlayerClass, WorldState};
use demuse_common::util::BitEnum;
use demuse_kernel::testing::TestWorld;
use demuse_kernel::{Config, Pid, SchedulerError};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_case::test_case;

const START: i64 = 10000;

fn lossless() -> TestWorld {
    let mut config = Config::default();
    config.queue.queue_loss = 0;
    TestWorld::with_config(config)
}

#[test]
fn fees_are_refunded_exactly_once() {
    let mut world = lossless();
    let (player, room, root) = (world.player, world.room, world.root);
    let gadget = world.create("gadget", ObjectType::Thing, player, room);
    let cost = world.rt.config.queue.queue_cost;
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..400 {
        match rng.random_range(0..6) {
            0 => {
                let actor = if rng.random_bool(0.5) { player } else { gadget };
                world.exec().parse_que(actor, "think a; think b", player).unwrap();
            }
            1 => {
                let wait = rng.random_range(0..5);
                world.exec().wait_que(gadget, wait, "think later", player).unwrap();
            }
            2 => {
                world.exec().do_top();
            }
            3 => {
                let pids: Vec<Pid> = world.rt.scheduler.iter().map(|c| c.pid).collect();
                let pid = if pids.is_empty() || rng.random_bool(0.2) {
                    Pid(31000)
                } else {
                    pids[rng.random_range(0..pids.len())]
                };
                world.exec().halt_process(player, pid);
            }
            4 => {
                let target = if rng.random_bool(0.5) { player } else { gadget };
                world.exec().halt_player(target, "");
            }
            _ => world.advance(1),
        }
        let queued = world.rt.scheduler.len() as i64;
        assert_eq!(START - world.pennies(player), cost * queued);
        assert_eq!(world.rt.scheduler.outstanding(player), queued);
    }

    world.exec().halt_all(root);
    assert_eq!(world.pennies(player), START);
    assert_eq!(world.attr(player, "Queue"), "");
}

#[test]
fn guests_queue_for_free() {
    let mut world = lossless();
    let guest = world.add_player("Guest1");
    world.db.set_class(guest, PlayerClass::Guest).unwrap();

    for _ in 0..5 {
        world.exec().wait_que(guest, 1, "think x", guest).unwrap();
    }
    world.exec().parse_que(guest, "think y", guest).unwrap();
    let pid = world.rt.scheduler.iter().map(|c| c.pid).next().unwrap();
    world.exec().halt_process(guest, pid);
    world.advance(1);
    while world.exec().do_top() {}

    assert_eq!(world.rt.scheduler.len(), 0);
    assert_eq!(world.pennies(guest), START);
}

#[test]
fn due_entries_run_by_priority_then_insertion() {
    let mut world = lossless();
    let player = world.player;
    let queue = |world: &mut TestWorld, text: &str, priority: i32, wait: i64| {
        world
            .exec()
            .big_que(player, text, player, priority, wait)
            .unwrap();
    };
    queue(&mut world, "think B", 3, 5);
    queue(&mut world, "think A", 1, 5);
    queue(&mut world, "think C", 3, 5);
    queue(&mut world, "think D", 0, 100);

    assert!(!world.exec().do_top());
    world.advance(5);
    while world.exec().do_top() {}
    assert_eq!(
        world.messages_for(player),
        vec![
            "Tester . o O ( A )".to_string(),
            "Tester . o O ( B )".to_string(),
            "Tester . o O ( C )".to_string(),
        ]
    );
    assert_eq!(world.rt.scheduler.len(), 1);
}

#[test]
fn runaway_recursion_is_cut_off() {
    let mut config = Config::default();
    config.eval.recursion_limit = 3000;
    let mut world = TestWorld::with_config(config);
    let player = world.player;
    world
        .db
        .define_attribute(player, "loop", BitEnum::new_with(AttrFlag::Function))
        .unwrap();
    world.set_attr(player, "loop", "[loop()]");
    assert_eq!(world.eval("loop()"), "#-1 RECURSION_LIMIT");
}

#[test]
fn guests_have_a_lower_recursion_bound() {
    let mut world = TestWorld::new();
    let guest = world.add_player("Guest1");
    world.db.set_class(guest, PlayerClass::Guest).unwrap();

    let depth = 150;
    let expr = format!("{}1{}", "add(1,".repeat(depth), ")".repeat(depth));
    let player = world.player;
    assert_eq!(world.eval_as(player, &expr), (depth + 1).to_string());
    assert_ne!(world.eval_as(guest, &expr), (depth + 1).to_string());

    // s() hands its argument back untouched, so the sentinel reaches the top.
    let expr = format!("{}x{}", "s(".repeat(depth), ")".repeat(depth));
    assert_eq!(world.eval_as(player, &expr), "x");
    assert_eq!(world.eval_as(guest, &expr), "#-1 RECURSION_LIMIT");
}

#[test]
fn runaway_objects_are_purged_and_quarantined() {
    let mut config = Config::default();
    config.queue.queue_loss = 0;
    config.queue.max_queue = 3;
    let mut world = TestWorld::with_config(config);
    let (player, room) = (world.player, world.room);
    let gadget = world.create("gadget", ObjectType::Thing, player, room);

    world
        .exec()
        .parse_que(gadget, "think 1; think 2; think 3", player)
        .unwrap();
    assert_eq!(world.rt.scheduler.len(), 3);
    let err = world.exec().parse_que(gadget, "think 4", player).unwrap_err();
    assert_eq!(err, SchedulerError::RunAway(gadget));

    assert!(world.rt.scheduler.is_empty());
    assert_eq!(world.pennies(player), START);
    assert_eq!(world.attr(player, "Queue"), "");
    assert!(world.db.flags_of(gadget).unwrap().contains(ObjFlag::Haven));
    assert!(
        world
            .messages_for(player)
            .contains(&format!("Run away object (gadget({gadget})), commands halted"))
    );
    assert_eq!(
        world.exec().parse_que(gadget, "think 5", player),
        Err(SchedulerError::Halted(gadget))
    );
}

#[test]
fn directors_are_never_quarantined() {
    let mut config = Config::default();
    config.queue.max_queue = 1;
    let mut world = TestWorld::with_config(config);
    let (root, room) = (world.root, world.room);
    let engine = world.create("engine", ObjectType::Thing, root, room);
    world
        .exec()
        .parse_que(engine, "think 1", root)
        .unwrap();
    assert!(world.exec().parse_que(engine, "think 2", root).is_err());
    assert!(!world.db.flags_of(engine).unwrap().contains(ObjFlag::Haven));
    assert!(world.exec().parse_que(engine, "think 3", root).is_ok());
}

#[test_case("div(7,0)", "#-1 DIVISION BY ZERO"; "div by zero")]
#[test_case("mod(-7,0)", "#-1 DIVISION BY ZERO"; "mod by zero")]
#[test_case("add(9223372036854775807,1)", "#-1 OVERFLOW"; "add overflow")]
#[test_case("sub(-9223372036854775807,2)", "#-1 OVERFLOW"; "sub overflow")]
#[test_case("mul(4294967296,4294967296)", "#-1 OVERFLOW"; "mul overflow")]
#[test_case("add(2,3)", "5"; "add")]
#[test_case("mul(-4,5)", "-20"; "mul")]
fn arithmetic_sentinels(expr: &str, expected: &str) {
    let mut world = TestWorld::new();
    assert_eq!(world.eval(expr), expected);
}

#[test_case("strlen(hello)", "5"; "right arity")]
#[test_case("strlen(a,b)", "#-1 Function (strlen) only expects 1 arguments"; "too many")]
#[test_case("add(1)", "#-1 Function (add) only expects 2 arguments"; "too few")]
fn arity_is_enforced(expr: &str, expected: &str) {
    let mut world = TestWorld::new();
    assert_eq!(world.eval(expr), expected);
}

#[test_case("{a(b,c)}", "a(b,c)"; "braced")]
#[test_case("a(b,c)", "a(b,c)"; "unknown function")]
#[test_case("add(2,3)", "5"; "known function")]
fn braces_are_literal(expr: &str, expected: &str) {
    let mut world = TestWorld::new();
    assert_eq!(world.eval(expr), expected);
}

#[test]
fn halting_a_missing_process_changes_nothing() {
    let mut world = lossless();
    let player = world.player;
    let pid = world.exec().parse_que(player, "think x", player).unwrap()[0];
    assert!(world.exec().do_top());
    let pennies = world.pennies(player);

    world.exec().halt_process(player, pid);
    world.exec().halt_process(player, pid);
    assert_eq!(world.pennies(player), pennies);
    let not_found = "@halt: Sorry. That process ID wasn't found.".to_string();
    let reported: Vec<String> = world
        .messages_for(player)
        .into_iter()
        .filter(|m| m.starts_with("@halt"))
        .collect();
    assert_eq!(reported, vec![not_found.clone(), not_found]);
}

#[test]
fn enqueue_and_drain() {
    let mut world = lossless();
    let player = world.player;
    world
        .exec()
        .big_que(player, "say hello", player, 5, 0)
        .unwrap();
    assert!(world.rt.scheduler.test_top());
    assert_eq!(world.pennies(player), START - 100);

    assert!(world.exec().do_top());
    assert_eq!(world.messages_for(player), vec!["You say \"hello\"".to_string()]);
    assert_eq!(world.pennies(player), START);
    assert!(!world.rt.scheduler.test_top());
}

#[test]
fn delayed_wait() {
    let mut world = lossless();
    let player = world.player;
    world.exec().wait_que(player, 10, "say later", player).unwrap();
    world.advance(9);
    assert!(!world.exec().do_top());
    assert!(world.messages_for(player).is_empty());
    world.advance(1);
    assert!(world.exec().do_top());
    assert_eq!(world.messages_for(player), vec!["You say \"later\"".to_string()]);
}

#[test]
fn fund_shortfall() {
    let mut world = lossless();
    let player = world.player;
    world.db.set_pennies(player, 0).unwrap();
    let err = world
        .exec()
        .parse_que(player, "say nothing", player)
        .unwrap_err();
    assert_eq!(err, SchedulerError::InsufficientFunds);
    assert_eq!(
        world.messages_for(player),
        vec!["Not enough money to queue command.".to_string()]
    );
    assert!(!world.rt.scheduler.test_top());
    assert_eq!(world.db.pennies_of(player).unwrap(), 0);
}
