use std::fs;
use std::path::Path;

use ninja_engine::{InputAction, InputCollector, InputSnapshot, InputSource};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KeyEvent {
    pub(crate) tick: u64,
    pub(crate) action: InputAction,
    pub(crate) pressed: bool,
}

/// Parses `<tick> <action> <down|up|tap>` lines. `tap` is a press on `tick`
/// and a release on the following tick. Blank lines and `#` comments are
/// skipped.
pub(crate) fn parse_input_script(content: &str) -> Result<Vec<KeyEvent>, String> {
    let mut events = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line_number = index + 1;
        let fields = trimmed.split_whitespace().collect::<Vec<_>>();
        let [tick, action, edge] = fields.as_slice() else {
            return Err(format!(
                "line {line_number}: expected '<tick> <action> <down|up|tap>', got '{trimmed}'"
            ));
        };
        let tick = tick
            .parse::<u64>()
            .map_err(|_| format!("line {line_number}: invalid tick '{tick}' (expected u64)"))?;
        let action = InputAction::from_name(action)
            .ok_or_else(|| format!("line {line_number}: unknown action '{action}'"))?;
        match *edge {
            "down" => events.push(KeyEvent {
                tick,
                action,
                pressed: true,
            }),
            "up" => events.push(KeyEvent {
                tick,
                action,
                pressed: false,
            }),
            "tap" => {
                events.push(KeyEvent {
                    tick,
                    action,
                    pressed: true,
                });
                events.push(KeyEvent {
                    tick: tick + 1,
                    action,
                    pressed: false,
                });
            }
            other => {
                return Err(format!(
                    "line {line_number}: invalid edge '{other}' (expected down, up or tap)"
                ))
            }
        }
    }
    Ok(events)
}

/// Replays a key-event timeline through an [`InputCollector`], standing in
/// for a keyboard.
#[derive(Debug, Default)]
pub(crate) struct ScriptedInput {
    events: Vec<KeyEvent>,
    next: usize,
    collector: InputCollector,
}

impl ScriptedInput {
    pub(crate) fn new(mut events: Vec<KeyEvent>) -> Self {
        events.sort_by_key(|event| event.tick);
        Self {
            events,
            next: 0,
            collector: InputCollector::new(),
        }
    }

    pub(crate) fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|error| format!("read input script '{}': {error}", path.display()))?;
        let events = parse_input_script(&content)
            .map_err(|error| format!("input script '{}': {error}", path.display()))?;
        info!(path = %path.display(), events = events.len(), "input_script_loaded");
        Ok(Self::new(events))
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.next >= self.events.len()
    }
}

impl InputSource for ScriptedInput {
    fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot {
        let was_finished = self.is_finished();
        while let Some(event) = self.events.get(self.next) {
            if event.tick > tick {
                break;
            }
            self.collector.handle_key(event.action, event.pressed);
            self.next += 1;
        }
        if !was_finished && self.is_finished() {
            debug!(tick, "input_script_finished");
        }
        self.collector.snapshot_for_tick()
    }
}
