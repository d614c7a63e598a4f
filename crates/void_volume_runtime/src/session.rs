//! A running host: store, engine and simulated world driven by commands

use std::time::Duration;

use void_volume_store::{persist, StoreError, VolumeStore};
use void_volumes::{Disposition, EntityId, EventRecord, Position, TransitionKind, TriggerEngine, UpdateOutcome};

use crate::config::RuntimeConfig;
use crate::metrics::TransitionMetrics;
use crate::trace::{parse_script, Command, TraceError};
use crate::world::{PermissionTable, SimWorld};

/// Teleport actions that land in another teleporting volume are followed at
/// most this many times per update
pub const MAX_TELEPORT_CHAIN: usize = 8;

/// Default spawn for `connect` without a position
const SPAWN_WORLD: &str = "world";

/// Host state for one run
pub struct Session {
    config: RuntimeConfig,
    store: VolumeStore,
    engine: TriggerEngine,
    world: SimWorld,
    metrics: TransitionMetrics,
    dirty: bool,
}

impl Session {
    /// Create a session over a loaded store
    pub fn new(config: RuntimeConfig, store: VolumeStore) -> Self {
        let permissions = PermissionTable::new(config.permission_node.clone(), config.grant_by_default)
            .with_filter(config.entities.clone());
        let metrics = TransitionMetrics::new();

        let mut engine = TriggerEngine::new(&config.triggers).with_permission(permissions.clone());
        engine.add_handler(metrics.handler());
        engine.sync(&store);

        Self {
            config,
            store,
            engine,
            world: SimWorld::new(permissions),
            metrics,
            dirty: false,
        }
    }

    /// Parse and run a whole script, returning every output line
    pub fn run_script(&mut self, text: &str) -> Result<Vec<String>, TraceError> {
        let commands = parse_script(text)?;
        let mut output = Vec::new();
        for (line, command) in commands {
            log::debug!("line {}: {:?}", line, command);
            output.extend(self.execute(command));
        }
        Ok(output)
    }

    /// Run one command, returning its output lines
    pub fn execute(&mut self, command: Command) -> Vec<String> {
        let mut out = Vec::new();
        match command {
            Command::Connect { id, name, spawn } => {
                let spawn = spawn.unwrap_or_else(|| Position::new(SPAWN_WORLD, 0.0, 0.0, 0.0));
                let snapshot = self.world.connect(id, &name, spawn).clone();
                self.engine.on_connect(id);
                let outcome = self.engine.on_move(&snapshot, &self.store, &mut self.world);
                self.report(&outcome, &mut out);
                self.settle_teleports(&mut out);
            }
            Command::Disconnect { id } => {
                self.engine.on_disconnect(id);
                if self.world.disconnect(id).is_none() {
                    out.push(format!("entity {} is not online", id));
                }
            }
            Command::Move { id, position } => self.update_position(id, position, false, &mut out),
            Command::Teleport { id, position } => self.update_position(id, position, true, &mut out),
            Command::Wait(duration) => self.engine.advance(duration),
            Command::Tick(count) => self.engine.advance(self.config.tick() * count),
            Command::Grant { id } => self.world.permissions().grant(id),
            Command::Revoke { id } => self.world.permissions().revoke(id),
            Command::Create { name, world, a, b } => {
                let result = self.store.create_volume(&name, &world, a, b).map(|_| ());
                self.after_edit(result, format!("created volume {}", name), &mut out);
            }
            Command::Delete { name } => {
                let result = self.store.delete_volume(&name).map(|_| ());
                if result.is_ok() {
                    self.engine.forget_volume(&name);
                }
                self.after_edit(result, format!("deleted volume {}", name), &mut out);
            }
            Command::AddAction { target, kind, action } => {
                let result = self.store.add_action_to(&target, kind, &action);
                let message = match &result {
                    Ok(count) => format!("added {} action to {} volume(s)", kind, count),
                    Err(_) => String::new(),
                };
                self.after_edit(result.map(|_| ()), message, &mut out);
            }
            Command::ClearActions { target, kind } => {
                let result = self.store.clear_actions_of(&target, kind);
                let message = match &result {
                    Ok(count) => format!("cleared actions of {} volume(s)", count),
                    Err(_) => String::new(),
                };
                self.after_edit(result.map(|_| ()), message, &mut out);
            }
            Command::CloneActions { source, target } => {
                let result = self.store.clone_actions(&source, &target);
                self.after_edit(result, format!("copied actions from {} to {}", source, target), &mut out);
            }
            Command::Group { name, members } => {
                let result = self.store.create_group(&name, members).map(|_| ());
                self.after_edit(result, format!("created group {}", name), &mut out);
            }
            Command::Ungroup { name } => {
                let result = self.store.delete_group(&name).map(|_| ());
                self.after_edit(result, format!("deleted group {}", name), &mut out);
            }
            Command::GroupAdd { group, volume } => {
                let result = self.store.add_to_group(&group, &volume);
                self.after_edit(result, format!("added {} to group {}", volume, group), &mut out);
            }
            Command::GroupRemove { group, volume } => {
                let result = self.store.remove_from_group(&group, &volume);
                let message = match &result {
                    Ok(true) => format!("removed {} from group {}; group deleted", volume, group),
                    Ok(false) => format!("removed {} from group {}", volume, group),
                    Err(_) => String::new(),
                };
                self.after_edit(result.map(|_| ()), message, &mut out);
            }
            Command::List => self.list(&mut out),
            Command::Info { name } => self.info(&name, &mut out),
            Command::Reload => match persist::load(&self.config.store_path) {
                Ok(store) => {
                    self.store = store;
                    self.engine.sync(&self.store);
                    self.dirty = false;
                    out.push(format!("reloaded {} volume(s)", self.store.len()));
                }
                Err(e) => out.push(format!("error: {}", e)),
            },
            Command::Save => match self.save() {
                Ok(()) => out.push(format!("saved {} volume(s)", self.store.len())),
                Err(e) => out.push(format!("error: {}", e)),
            },
            Command::Status => self.status(&mut out),
        }
        out
    }

    fn update_position(&mut self, id: EntityId, position: Position, teleported: bool, out: &mut Vec<String>) {
        let Some(snapshot) = self.world.move_entity(id, position) else {
            out.push(format!("entity {} is not online", id));
            return;
        };
        let outcome = if teleported {
            self.engine.on_teleport(&snapshot, &self.store, &mut self.world)
        } else {
            self.engine.on_move(&snapshot, &self.store, &mut self.world)
        };
        self.report(&outcome, out);
        self.settle_teleports(out);
    }

    /// Re-check entities moved by teleport actions once the move has landed
    fn settle_teleports(&mut self, out: &mut Vec<String>) {
        for _ in 0..MAX_TELEPORT_CHAIN {
            let pending = self.engine.take_pending_teleports();
            if pending.is_empty() {
                return;
            }
            for id in pending {
                if let Some(snapshot) = self.world.snapshot(id).cloned() {
                    let outcome = self.engine.on_teleport(&snapshot, &self.store, &mut self.world);
                    self.report(&outcome, out);
                }
            }
        }
        let dropped = self.engine.take_pending_teleports();
        if !dropped.is_empty() {
            log::warn!(
                "Teleport chain longer than {} for {:?}, not re-checking further",
                MAX_TELEPORT_CHAIN,
                dropped
            );
        }
    }

    fn report(&mut self, outcome: &UpdateOutcome, out: &mut Vec<String>) {
        for record in outcome.events() {
            out.push(self.describe(record));
        }
        out.extend(self.world.take_transcript());
    }

    fn describe(&self, record: &EventRecord) -> String {
        let event = &record.event;
        let who = self
            .world
            .snapshot(event.entity)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| event.entity.to_string());
        let verb = match event.kind {
            TransitionKind::Enter => "entered",
            TransitionKind::Leave => "left",
        };
        let detail = match &record.disposition {
            Disposition::Fired { failed: 0, .. } => String::new(),
            Disposition::Fired { failed, .. } => format!(" ({} action(s) failed)", failed),
            Disposition::Suppressed { remaining } => format!(" (cooldown {:.1}s)", remaining.as_secs_f64()),
            Disposition::NoActions => String::new(),
            Disposition::Missing => " (volume gone)".to_string(),
        };
        format!("{} {} {}{}", who, verb, event.volume, detail)
    }

    fn after_edit(&mut self, result: void_volume_store::Result<()>, message: String, out: &mut Vec<String>) {
        match result {
            Ok(()) => {
                self.dirty = true;
                self.engine.sync(&self.store);
                out.push(message);
            }
            Err(e) => out.push(format!("error: {}", e)),
        }
    }

    fn list(&self, out: &mut Vec<String>) {
        if self.store.is_empty() {
            out.push("no volumes defined".to_string());
            return;
        }
        out.push(format!("{} volume(s)", self.store.len()));
        for volume in self.store.list_all() {
            out.push(format!(
                "  {} ({}) {} -> {}",
                volume.name(),
                volume.world(),
                corner(volume.bounds().min()),
                corner(volume.bounds().max())
            ));
        }
    }

    fn info(&self, name: &str, out: &mut Vec<String>) {
        let Some(volume) = self.store.get(name) else {
            out.push(format!("error: {}", StoreError::VolumeNotFound(name.to_string())));
            return;
        };
        let bounds = volume.bounds();
        out.push(format!("volume {} in {}", volume.name(), volume.world()));
        out.push(format!("  min {}", corner(bounds.min())));
        out.push(format!("  max {}", corner(bounds.max())));
        out.push(format!("  size {} block(s)", bounds.volume()));

        let groups = self.store.groups_for_volume(name);
        if !groups.is_empty() {
            out.push(format!("  groups: {}", groups.join(", ")));
        }
        for kind in [TransitionKind::Enter, TransitionKind::Leave] {
            let actions = volume.actions(kind);
            if actions.is_empty() {
                out.push(format!("  {} actions: none", kind));
                continue;
            }
            out.push(format!("  {} actions:", kind));
            for (i, action) in actions.iter().enumerate() {
                out.push(format!("    {}. {}", i + 1, action));
            }
        }
    }

    fn status(&self, out: &mut Vec<String>) {
        out.push(format!(
            "{} volume(s), {} group(s), {} online, {} tracked, t={:.2}s",
            self.store.len(),
            self.store.group_names().len(),
            self.world.online_count(),
            self.engine.tracked_count(),
            self.engine.now().as_secs_f64()
        ));
        for (volume, counts) in self.metrics.snapshot() {
            out.push(format!("  {}: {} enter(s), {} leave(s)", volume, counts.enters, counts.leaves));
        }
    }

    /// Write the store to the configured path
    pub fn save(&mut self) -> void_volume_store::Result<()> {
        persist::save(&self.store, &self.config.store_path)?;
        self.dirty = false;
        Ok(())
    }

    /// Whether the store changed since the last save
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Volume store
    pub fn store(&self) -> &VolumeStore {
        &self.store
    }

    /// Trigger engine
    pub fn engine(&self) -> &TriggerEngine {
        &self.engine
    }

    /// Transition counters
    pub fn metrics(&self) -> &TransitionMetrics {
        &self.metrics
    }

    /// Simulated clock
    pub fn now(&self) -> Duration {
        self.engine.now()
    }
}

fn corner(c: [f64; 3]) -> String {
    format!("{} {} {}", c[0], c[1], c[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_volumes::EntityFilter;

    fn session() -> Session {
        Session::new(RuntimeConfig::default(), VolumeStore::new())
    }

    #[test]
    fn test_enter_runs_actions_and_reports() {
        let mut session = session();
        let out = session
            .run_script(
                "create spawn world 0 0 0 4 4 4\n\
                 action spawn enter message Welcome %entity%\n\
                 connect 1 Steve world 10 1 1\n\
                 move 1 world 1 1 1\n",
            )
            .unwrap();

        assert_eq!(
            out,
            vec![
                "created volume spawn",
                "added enter action to 1 volume(s)",
                "Steve entered spawn",
                "[to Steve] Welcome Steve",
            ]
        );
        assert!(session.is_dirty());
    }

    #[test]
    fn test_cooldown_shows_in_output() {
        let mut session = session();
        let out = session
            .run_script(
                "create pad world 0 0 0 1 1 1\n\
                 action pad enter console ping\n\
                 connect 1 Steve world 5 0 0\n\
                 move 1 world 0 0 0\n\
                 move 1 world 5 0 0\n\
                 wait 1000\n\
                 move 1 world 0 0 0\n",
            )
            .unwrap();

        assert_eq!(out.last().unwrap(), "Steve entered pad (cooldown 2.0s)");
        assert_eq!(out.iter().filter(|l| *l == "[console] ping").count(), 1);
    }

    #[test]
    fn test_teleport_action_chain_is_settled() {
        let mut session = session();
        let out = session
            .run_script(
                "create pad world 0 0 0 0 0 0\n\
                 create landing world 100 0 100 102 3 102\n\
                 action pad enter teleport 101 1 101\n\
                 connect 1 Steve world 5 0 0\n\
                 move 1 world 0.5 0.5 0.5\n",
            )
            .unwrap();

        assert!(out.contains(&"[tp Steve] world 101 1 101".to_string()));
        assert!(out.ends_with(&["Steve left pad".to_string(), "Steve entered landing".to_string()]));
        assert!(session.engine().is_inside(EntityId(1), "landing"));
    }

    #[test]
    fn test_store_errors_are_reported() {
        let mut session = session();
        let out = session
            .run_script("create a world 0 0 0 1 1 1\ncreate A world 0 0 0 1 1 1\ngroup g a\n")
            .unwrap_err();
        assert!(matches!(out, TraceError::Usage { line: 3, .. }));

        let out = session.execute(Command::Delete { name: "nope".into() });
        assert_eq!(out, vec!["error: Volume not found: nope"]);
    }

    #[test]
    fn test_blocked_entity_never_triggers() {
        let mut config = RuntimeConfig::default();
        config.entities = EntityFilter::new().block_entities([EntityId(13)]);
        let mut session = Session::new(config, VolumeStore::new());

        let out = session
            .run_script(
                "create a world 0 0 0 3 3 3
                 connect 13 Bot world 1 1 1
                 grant 13
                 move 13 world 2 1 1
                 connect 2 Alex world 1 1 1
",
            )
            .unwrap();

        assert_eq!(out, vec!["created volume a", "Alex entered a"]);
        assert!(!session.engine().is_inside(EntityId(13), "a"));
    }

    #[test]
    fn test_revoked_entity_is_ignored() {
        let mut session = session();
        let out = session
            .run_script(
                "create a world 0 0 0 3 3 3\n\
                 connect 2 Alex world 10 0 0\n\
                 revoke 2\n\
                 move 2 world 1 1 1\n\
                 grant 2\n\
                 move 2 world 2 1 1\n",
            )
            .unwrap();

        assert_eq!(out.last().unwrap(), "Alex entered a");
        assert_eq!(out.iter().filter(|l| l.contains("entered")).count(), 1);
    }
}
