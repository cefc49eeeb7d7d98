use crate::error::InjectorError;
use serde::Serialize;

/// Abstract camera movement, translated into OS events by the injector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MovementIntent {
    /// Discrete jump plus a simulated click.
    Recenter { x: f64, y: f64 },
    /// Continuous movement with the drag held; the first one of a gesture
    /// engages the drag at its position.
    DragMove { x: f64, y: f64 },
    ReleaseDrag,
}

impl MovementIntent {
    pub fn name(&self) -> &'static str {
        match self {
            MovementIntent::Recenter { .. } => "recenter",
            MovementIntent::DragMove { .. } => "drag_move",
            MovementIntent::ReleaseDrag => "release_drag",
        }
    }
}

/// Capability that turns intents into input events.
pub trait InputInjector: Send {
    fn dispatch(&mut self, intent: MovementIntent) -> Result<(), InjectorError>;

    fn flush(&mut self) -> Result<(), InjectorError> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Logs intents without acting on them. Used when no journal is configured.
pub struct TracingInjector {
    click_hold_ms: u64,
}

impl TracingInjector {
    pub fn new(click_hold_ms: u64) -> Self {
        Self { click_hold_ms }
    }
}

impl InputInjector for TracingInjector {
    fn dispatch(&mut self, intent: MovementIntent) -> Result<(), InjectorError> {
        match intent {
            MovementIntent::Recenter { x, y } => {
                tracing::info!(
                    "Recenter to ({:.3}, {:.3}), click held {}ms",
                    x,
                    y,
                    self.click_hold_ms
                );
            }
            MovementIntent::DragMove { x, y } => {
                tracing::debug!("Drag to ({:.3}, {:.3})", x, y);
            }
            MovementIntent::ReleaseDrag => {
                tracing::debug!("Release drag");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "TracingInjector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_serialize_with_type_tag() {
        let intent = MovementIntent::Recenter { x: 0.25, y: 0.5 };
        let json = serde_json::to_value(intent).expect("json");
        assert_eq!(json, serde_json::json!({"type": "recenter", "x": 0.25, "y": 0.5}));
        let json = serde_json::to_value(MovementIntent::ReleaseDrag).expect("json");
        assert_eq!(json, serde_json::json!({"type": "release_drag"}));
    }
}
