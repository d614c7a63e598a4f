//! Action execution against the host

use crate::action::{Action, ActionKind, TeleportTarget};
use crate::error::DispatchError;
use crate::types::{EntitySnapshot, Position};

/// Where a teleport action moves an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub position: Position,
    pub yaw: f32,
    pub pitch: f32,
}

/// The world the engine acts on.
///
/// Errors are free-form host messages; the dispatcher wraps them in
/// [`DispatchError::Rejected`].
pub trait ActionHost {
    /// Run a command as the entity
    fn run_as_entity(&mut self, entity: &EntitySnapshot, command: &str) -> Result<(), String>;

    /// Run a command as the server console
    fn run_as_system(&mut self, command: &str) -> Result<(), String>;

    /// Send a chat message to the entity. `text` has placeholders resolved
    /// and is otherwise verbatim; colour codes such as `&a` are left for the
    /// host to render.
    fn send_message(&mut self, entity: &EntitySnapshot, text: &str) -> Result<(), String>;

    /// Move the entity
    fn teleport(&mut self, entity: &EntitySnapshot, destination: &Destination) -> Result<(), String>;

    /// Tell the entity one of its actions failed
    fn report_failure(&mut self, _entity: &EntitySnapshot, _error: &DispatchError) {}
}

/// Outcome of running an action list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Actions that completed
    pub executed: usize,
    /// Failed actions with their list index
    pub failures: Vec<(usize, DispatchError)>,
    /// Destination of the last successful teleport
    pub teleported: Option<Destination>,
}

impl DispatchReport {
    /// Whether every action completed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Executes action lists in order with per-action fault isolation
#[derive(Debug, Default)]
pub struct ActionDispatcher {
    executed_total: u64,
    failed_total: u64,
}

impl ActionDispatcher {
    /// Create a new dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute one action. Placeholders are resolved on a copy of the payload.
    pub fn execute<H>(
        &mut self,
        entity: &EntitySnapshot,
        action: &Action,
        host: &mut H,
    ) -> Result<Option<Destination>, DispatchError>
    where
        H: ActionHost + ?Sized,
    {
        let kind = action.kind();
        let payload = action.resolve(entity);
        let rejected = |reason: String| DispatchError::Rejected { kind, reason };

        let result = match action {
            Action::RunAsEntity(_) => {
                let command = command_text(kind, &payload)?;
                host.run_as_entity(entity, command).map_err(rejected).map(|_| None)
            }
            Action::RunAsSystem(_) => {
                let command = command_text(kind, &payload)?;
                host.run_as_system(command).map_err(rejected).map(|_| None)
            }
            Action::SendMessage(_) => host.send_message(entity, &payload).map_err(rejected).map(|_| None),
            Action::Teleport(_) => {
                let target = TeleportTarget::parse(&payload)?;
                let (yaw, pitch) = target.facing.unwrap_or((entity.yaw, entity.pitch));
                let destination = Destination {
                    position: Position::new(entity.position.world.clone(), target.x, target.y, target.z),
                    yaw,
                    pitch,
                };
                host.teleport(entity, &destination)
                    .map_err(rejected)
                    .map(|_| Some(destination))
            }
        };

        match result {
            Ok(_) => self.executed_total += 1,
            Err(_) => self.failed_total += 1,
        }
        result
    }

    /// Execute a list in order. A failing action is logged and reported to
    /// the host; the remaining actions still run.
    pub fn execute_all<H>(
        &mut self,
        entity: &EntitySnapshot,
        actions: &[Action],
        host: &mut H,
    ) -> DispatchReport
    where
        H: ActionHost + ?Sized,
    {
        let mut report = DispatchReport::default();
        for (index, action) in actions.iter().enumerate() {
            match self.execute(entity, action, host) {
                Ok(teleported) => {
                    report.executed += 1;
                    if teleported.is_some() {
                        report.teleported = teleported;
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Action #{} ({}) failed for entity {}: {}",
                        index,
                        action.kind(),
                        entity.id,
                        e
                    );
                    host.report_failure(entity, &e);
                    report.failures.push((index, e));
                }
            }
        }
        report
    }

    /// Actions completed since creation
    pub fn executed_total(&self) -> u64 {
        self.executed_total
    }

    /// Actions failed since creation
    pub fn failed_total(&self) -> u64 {
        self.failed_total
    }
}

/// Command text without one leading slash
fn command_text(kind: ActionKind, payload: &str) -> Result<&str, DispatchError> {
    let command = payload.trim();
    let command = command.strip_prefix('/').unwrap_or(command);
    if command.is_empty() {
        return Err(DispatchError::EmptyPayload(kind));
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;

    #[derive(Default)]
    struct RecordingHost {
        log: Vec<String>,
        failures: Vec<String>,
        refuse_messages: bool,
    }

    impl ActionHost for RecordingHost {
        fn run_as_entity(&mut self, entity: &EntitySnapshot, command: &str) -> Result<(), String> {
            self.log.push(format!("{}> {}", entity.name, command));
            Ok(())
        }

        fn run_as_system(&mut self, command: &str) -> Result<(), String> {
            self.log.push(format!("console> {}", command));
            Ok(())
        }

        fn send_message(&mut self, entity: &EntitySnapshot, text: &str) -> Result<(), String> {
            if self.refuse_messages {
                return Err("chat disabled".into());
            }
            self.log.push(format!("to {}: {}", entity.name, text));
            Ok(())
        }

        fn teleport(&mut self, entity: &EntitySnapshot, d: &Destination) -> Result<(), String> {
            self.log.push(format!(
                "tp {} {} {} {} {} {}",
                entity.name, d.position.x, d.position.y, d.position.z, d.yaw, d.pitch
            ));
            Ok(())
        }

        fn report_failure(&mut self, _entity: &EntitySnapshot, error: &DispatchError) {
            self.failures.push(error.to_string());
        }
    }

    fn bob() -> EntitySnapshot {
        EntitySnapshot::new(EntityId(5), "Bob", Position::new("world", 1.0, 2.0, 3.0))
            .with_facing(45.0, 10.0)
    }

    #[test]
    fn test_commands_strip_slash_and_substitute() {
        let mut host = RecordingHost::default();
        let mut dispatcher = ActionDispatcher::new();
        let actions = vec![
            Action::RunAsEntity("/spawn".into()),
            Action::RunAsSystem("give %entity% bread".into()),
            Action::SendMessage("Welcome %entity% (#%id%)".into()),
        ];

        let report = dispatcher.execute_all(&bob(), &actions, &mut host);

        assert!(report.is_clean());
        assert_eq!(report.executed, 3);
        assert_eq!(
            host.log,
            vec!["Bob> spawn", "console> give Bob bread", "to Bob: Welcome Bob (#5)"]
        );
        assert_eq!(actions[1].payload(), "give %entity% bread");
    }

    #[test]
    fn test_message_colour_codes_reach_host_verbatim() {
        let mut host = RecordingHost::default();
        let mut dispatcher = ActionDispatcher::new();

        dispatcher
            .execute(&bob(), &Action::SendMessage("&aHello &l%entity%".into()), &mut host)
            .unwrap();

        assert_eq!(host.log, vec!["to Bob: &aHello &lBob"]);
    }

    #[test]
    fn test_teleport_keeps_facing_when_omitted() {
        let mut host = RecordingHost::default();
        let mut dispatcher = ActionDispatcher::new();

        let report = dispatcher.execute_all(&bob(), &[Action::Teleport("10 64 -3".into())], &mut host);

        assert_eq!(host.log, vec!["tp Bob 10 64 -3 45 10"]);
        let destination = report.teleported.unwrap();
        assert_eq!(destination.position, Position::new("world", 10.0, 64.0, -3.0));
    }

    #[test]
    fn test_teleport_with_facing() {
        let mut host = RecordingHost::default();
        let mut dispatcher = ActionDispatcher::new();

        dispatcher.execute_all(&bob(), &[Action::Teleport("0 0 0 180 -90".into())], &mut host);
        assert_eq!(host.log, vec!["tp Bob 0 0 0 180 -90"]);
    }

    #[test]
    fn test_failure_does_not_abort_list() {
        let mut host = RecordingHost::default();
        let mut dispatcher = ActionDispatcher::new();
        let actions = vec![
            Action::Teleport("1 two 3".into()),
            Action::RunAsSystem("  ".into()),
            Action::RunAsSystem("after".into()),
        ];

        let report = dispatcher.execute_all(&bob(), &actions, &mut host);

        assert_eq!(report.executed, 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].0, 0);
        assert_eq!(report.failures[1].1, DispatchError::EmptyPayload(ActionKind::RunAsSystem));
        assert!(report.teleported.is_none());
        assert_eq!(host.log, vec!["console> after"]);
        assert_eq!(host.failures.len(), 2);
        assert_eq!(dispatcher.failed_total(), 2);
        assert_eq!(dispatcher.executed_total(), 1);
    }

    #[test]
    fn test_host_rejection_is_reported() {
        let mut host = RecordingHost {
            refuse_messages: true,
            ..Default::default()
        };
        let mut dispatcher = ActionDispatcher::new();

        let err = dispatcher
            .execute(&bob(), &Action::SendMessage("hi".into()), &mut host)
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Rejected {
                kind: ActionKind::SendMessage,
                reason: "chat disabled".into()
            }
        );
    }
}
