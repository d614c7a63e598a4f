//! Integration tests for void_volumes
//!
//! Tests the full detection pipeline: index lookup, transitions, cooldowns and dispatch

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use void_volumes::*;

#[derive(Default)]
struct Store {
    volumes: BTreeMap<String, Volume>,
    revision: u64,
}

impl Store {
    fn create(&mut self, name: &str, min: [f64; 3], max: [f64; 3]) {
        let bounds = VolumeBounds::from_corners(min, max).unwrap();
        let volume = Volume::new(name, "world", bounds).unwrap();
        self.volumes.insert(volume.key(), volume);
        self.revision += 1;
    }

    fn add_action(&mut self, name: &str, kind: TransitionKind, action: Action) {
        self.volumes
            .get_mut(&volume_key(name))
            .unwrap()
            .add_action(kind, action);
        self.revision += 1;
    }

    fn delete(&mut self, name: &str) {
        self.volumes.remove(&volume_key(name));
        self.revision += 1;
    }
}

impl VolumeSource for Store {
    fn get(&self, name: &str) -> Option<&Volume> {
        self.volumes.get(&volume_key(name))
    }

    fn volumes(&self) -> Box<dyn Iterator<Item = &Volume> + '_> {
        Box::new(self.volumes.values())
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Default)]
struct ConsoleHost {
    ran: Vec<String>,
    failures: usize,
}

impl ActionHost for ConsoleHost {
    fn run_as_entity(&mut self, entity: &EntitySnapshot, command: &str) -> Result<(), String> {
        self.ran.push(format!("{}: {}", entity.name, command));
        Ok(())
    }

    fn run_as_system(&mut self, command: &str) -> Result<(), String> {
        self.ran.push(command.to_string());
        Ok(())
    }

    fn send_message(&mut self, _entity: &EntitySnapshot, text: &str) -> Result<(), String> {
        self.ran.push(text.to_string());
        Ok(())
    }

    fn teleport(&mut self, _entity: &EntitySnapshot, destination: &Destination) -> Result<(), String> {
        let p = &destination.position;
        self.ran.push(format!("tp {} {} {}", p.x, p.y, p.z));
        Ok(())
    }

    fn report_failure(&mut self, _entity: &EntitySnapshot, _error: &DispatchError) {
        self.failures += 1;
    }
}

fn alex(x: f64, y: f64, z: f64) -> EntitySnapshot {
    EntitySnapshot::new(EntityId(7), "Alex", Position::new("world", x, y, z))
}

#[test]
fn test_scenario_enter_settle_leave() {
    let mut store = Store::default();
    store.create("box", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    let outcome = engine.on_move(&alex(5.0, 5.0, 5.0), &store, &mut host);
    assert!(outcome.transitions().is_empty());

    let outcome = engine.on_move(&alex(0.0, 0.0, 0.0), &store, &mut host);
    assert_eq!(outcome.transitions(), vec![TransitionEvent::enter(EntityId(7), "box")]);

    let outcome = engine.on_move(&alex(0.5, 0.5, 0.5), &store, &mut host);
    assert!(outcome.transitions().is_empty());

    let outcome = engine.on_move(&alex(5.0, 5.0, 5.0), &store, &mut host);
    assert_eq!(outcome.transitions(), vec![TransitionEvent::leave(EntityId(7), "box")]);
}

#[test]
fn test_scenario_overlapping_volumes() {
    let mut store = Store::default();
    store.create("A", [0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
    store.create("B", [5.0, 0.0, 0.0], [15.0, 10.0, 10.0]);
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    let outcome = engine.on_move(&alex(3.0, 1.0, 1.0), &store, &mut host);
    assert_eq!(outcome.transitions(), vec![TransitionEvent::enter(EntityId(7), "a")]);

    let outcome = engine.on_move(&alex(7.0, 1.0, 1.0), &store, &mut host);
    assert_eq!(outcome.transitions(), vec![TransitionEvent::enter(EntityId(7), "b")]);
    assert_eq!(engine.membership(EntityId(7)), vec!["a", "b"]);
}

#[test]
fn test_scenario_delete_while_inside() {
    let mut store = Store::default();
    store.create("V", [0.0, 0.0, 0.0], [4.0, 4.0, 4.0]);
    store.add_action("V", TransitionKind::Leave, Action::RunAsSystem("say bye".into()));
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    engine.on_move(&alex(1.0, 1.0, 1.0), &store, &mut host);
    assert!(engine.is_inside(EntityId(7), "v"));

    store.delete("V");
    engine.forget_volume("V");

    let outcome = engine.on_move(&alex(20.0, 1.0, 1.0), &store, &mut host);
    assert!(outcome.transitions().is_empty());
    assert!(host.ran.is_empty());
    assert_eq!(host.failures, 0);
}

#[test]
fn test_delete_without_explicit_purge_is_caught_by_revision() {
    let mut store = Store::default();
    store.create("V", [0.0, 0.0, 0.0], [4.0, 4.0, 4.0]);
    store.add_action("V", TransitionKind::Leave, Action::RunAsSystem("say bye".into()));
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    engine.on_move(&alex(1.0, 1.0, 1.0), &store, &mut host);
    store.delete("V");

    let outcome = engine.on_move(&alex(20.0, 1.0, 1.0), &store, &mut host);
    assert!(outcome.transitions().is_empty());
    assert!(host.ran.is_empty());
}

#[test]
fn test_scenario_cooldown_suppresses_second_enter() {
    let mut store = Store::default();
    store.create("pad", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    store.add_action("pad", TransitionKind::Enter, Action::RunAsSystem("give %entity% 1".into()));
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    engine.on_move(&alex(0.5, 0.5, 0.5), &store, &mut host);
    engine.advance(Duration::from_millis(300));
    engine.on_move(&alex(5.0, 0.5, 0.5), &store, &mut host);
    engine.advance(Duration::from_millis(300));
    let outcome = engine.on_move(&alex(0.5, 0.5, 0.5), &store, &mut host);

    assert_eq!(outcome.transitions(), vec![TransitionEvent::enter(EntityId(7), "pad")]);
    assert!(matches!(
        outcome.events()[0].disposition,
        Disposition::Suppressed { .. }
    ));
    assert_eq!(host.ran, vec!["give Alex 1"]);

    // Window elapsed
    engine.advance(Duration::from_secs(3));
    engine.on_move(&alex(5.0, 0.5, 0.5), &store, &mut host);
    engine.on_move(&alex(0.5, 0.5, 0.5), &store, &mut host);
    assert_eq!(host.ran, vec!["give Alex 1", "give Alex 1"]);
}

#[test]
fn test_cooldown_is_per_direction() {
    let mut store = Store::default();
    store.create("pad", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    store.add_action("pad", TransitionKind::Enter, Action::RunAsSystem("in".into()));
    store.add_action("pad", TransitionKind::Leave, Action::RunAsSystem("out".into()));
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    engine.on_move(&alex(0.5, 0.5, 0.5), &store, &mut host);
    engine.on_move(&alex(5.0, 0.5, 0.5), &store, &mut host);
    engine.on_move(&alex(0.5, 0.5, 0.5), &store, &mut host);
    engine.on_move(&alex(5.0, 0.5, 0.5), &store, &mut host);

    assert_eq!(host.ran, vec!["in", "out"]);
}

#[test]
fn test_empty_action_list_does_not_consume_cooldown() {
    let mut store = Store::default();
    store.create("pad", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    let outcome = engine.on_move(&alex(0.5, 0.5, 0.5), &store, &mut host);
    assert_eq!(outcome.events()[0].disposition, Disposition::NoActions);
    assert!(engine.cooldowns().is_empty());

    engine.on_move(&alex(5.0, 0.5, 0.5), &store, &mut host);
    store.add_action("pad", TransitionKind::Enter, Action::RunAsSystem("now".into()));
    engine.on_move(&alex(0.5, 0.5, 0.5), &store, &mut host);
    assert_eq!(host.ran, vec!["now"]);
}

#[test]
fn test_disabled_cooldowns_never_suppress() {
    let mut config = TriggerConfig::default();
    config.cooldowns.enabled = false;
    let mut store = Store::default();
    store.create("pad", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    store.add_action("pad", TransitionKind::Enter, Action::RunAsSystem("hit".into()));
    let mut engine = TriggerEngine::new(&config);
    let mut host = ConsoleHost::default();

    for _ in 0..3 {
        engine.on_move(&alex(0.5, 0.5, 0.5), &store, &mut host);
        engine.on_move(&alex(5.0, 0.5, 0.5), &store, &mut host);
    }
    assert_eq!(host.ran.len(), 3);
}

#[test]
fn test_leaves_are_processed_before_enters() {
    let mut store = Store::default();
    store.create("west", [0.0, 0.0, 0.0], [3.0, 3.0, 3.0]);
    store.create("east", [4.0, 0.0, 0.0], [7.0, 3.0, 3.0]);
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut engine = TriggerEngine::default();
    let enter_log = Arc::clone(&order);
    let leave_log = Arc::clone(&order);
    engine.add_handler(
        TransitionHandler::new()
            .on_enter(move |e| enter_log.lock().push(format!("enter {}", e.volume)))
            .on_leave(move |e| leave_log.lock().push(format!("leave {}", e.volume))),
    );
    let mut host = ConsoleHost::default();

    engine.on_move(&alex(1.0, 1.0, 1.0), &store, &mut host);
    engine.on_move(&alex(5.0, 1.0, 1.0), &store, &mut host);

    assert_eq!(*order.lock(), vec!["enter west", "leave west", "enter east"]);
}

#[test]
fn test_repeated_sample_is_idempotent() {
    let mut store = Store::default();
    store.create("a", [0.0, 0.0, 0.0], [3.0, 3.0, 3.0]);
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    engine.on_move(&alex(1.0, 1.0, 1.0), &store, &mut host);
    for _ in 0..5 {
        assert!(engine
            .on_teleport(&alex(1.0, 1.0, 1.0), &store, &mut host)
            .transitions()
            .is_empty());
    }
}

#[test]
fn test_stored_templates_are_unchanged() {
    let mut store = Store::default();
    store.create("a", [0.0, 0.0, 0.0], [3.0, 3.0, 3.0]);
    store.add_action("a", TransitionKind::Enter, Action::RunAsEntity("/warp %entity%".into()));
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    engine.on_move(&alex(1.0, 1.0, 1.0), &store, &mut host);

    assert_eq!(host.ran, vec!["Alex: warp Alex"]);
    let stored = store.get("a").unwrap().actions(TransitionKind::Enter);
    assert_eq!(stored[0].payload(), "/warp %entity%");
}

#[test]
fn test_permission_revoked_mid_session() {
    let allowed = Arc::new(Mutex::new(true));
    let gate = Arc::clone(&allowed);
    let mut store = Store::default();
    store.create("a", [0.0, 0.0, 0.0], [3.0, 3.0, 3.0]);
    store.add_action("a", TransitionKind::Enter, Action::SendMessage("hi".into()));
    let mut config = TriggerConfig::default();
    config.cooldowns.enabled = false;
    let mut engine = TriggerEngine::new(&config).with_permission(move |_: &EntitySnapshot| *gate.lock());
    let mut host = ConsoleHost::default();

    engine.on_move(&alex(1.0, 1.0, 1.0), &store, &mut host);
    *allowed.lock() = false;
    assert_eq!(engine.on_move(&alex(2.0, 1.0, 1.0), &store, &mut host), UpdateOutcome::Denied);
    assert!(engine.membership(EntityId(7)).is_empty());

    *allowed.lock() = true;
    engine.on_move(&alex(2.0, 1.0, 1.0), &store, &mut host);
    assert_eq!(host.ran, vec!["hi", "hi"]);
}

#[test]
fn test_malformed_teleport_does_not_stop_list() {
    let mut store = Store::default();
    store.create("a", [0.0, 0.0, 0.0], [3.0, 3.0, 3.0]);
    store.add_action("a", TransitionKind::Enter, Action::Teleport("1 2".into()));
    store.add_action("a", TransitionKind::Enter, Action::SendMessage("still here".into()));
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    let outcome = engine.on_move(&alex(1.0, 1.0, 1.0), &store, &mut host);

    assert_eq!(
        outcome.events()[0].disposition,
        Disposition::Fired { executed: 1, failed: 1 }
    );
    assert_eq!(host.ran, vec!["still here"]);
    assert_eq!(host.failures, 1);
    assert!(engine.take_pending_teleports().is_empty());
}

#[test]
fn test_other_world_is_ignored() {
    let mut store = Store::default();
    store.create("a", [0.0, 0.0, 0.0], [3.0, 3.0, 3.0]);
    let mut engine = TriggerEngine::default();
    let mut host = ConsoleHost::default();

    let nether = EntitySnapshot::new(EntityId(7), "Alex", Position::new("nether", 1.0, 1.0, 1.0));
    assert!(engine.on_move(&nether, &store, &mut host).transitions().is_empty());
}
