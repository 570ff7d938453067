use super::{BehaviorSource, Intent, Observation};

/// Deterministic rules: follow the navigation hint, attack when in range.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedBehavior;

impl BehaviorSource for ScriptedBehavior {
    fn decide(&mut self, observation: &Observation) -> Intent {
        let movement = observation
            .destination
            .map(|destination| {
                let mut offset = destination - observation.position;
                offset.y = 0.0;
                offset.normalize_or_zero()
            })
            .unwrap_or_default();

        Intent {
            movement,
            attack: observation.target_visible && observation.in_attack_range(),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
