//! Health & lifecycle: hit points, the terminal dead latch, collider gate.

use serde::{Deserialize, Serialize};

/// Hit points.
///
/// Инвариант: 0 ≤ current ≤ max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    current: u32,
    max: u32,
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            return 0.0;
        }
        self.current as f32 / self.max as f32
    }

    pub fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Subtract, clamping at 0. Returns true when this call emptied the pool.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        let was_alive = self.current > 0;
        self.current = self.current.saturating_sub(amount);
        was_alive && self.current == 0
    }
}

/// Dead latch and collider state.
///
/// `dead` is monotonic: once set it never clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    dead: bool,
    colliders_enabled: bool,
    death_notified: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            dead: false,
            colliders_enabled: true,
            death_notified: false,
        }
    }
}

impl Lifecycle {
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn colliders_enabled(&self) -> bool {
        self.colliders_enabled
    }

    pub fn death_notified(&self) -> bool {
        self.death_notified
    }

    /// Enter the dead state: colliders go off immediately.
    ///
    /// Returns true only for the first call; the caller emits the single
    /// death notification on that return.
    pub fn mark_dead(&mut self) -> bool {
        self.dead = true;
        self.colliders_enabled = false;
        if self.death_notified {
            return false;
        }
        self.death_notified = true;
        true
    }
}

/// Result of `ApplyDamage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Agent already dead: nothing changed.
    Ignored,
    /// Invulnerability window swallowed the hit.
    Absorbed,
    Wounded { interrupted: bool },
    Killed,
}

impl DamageOutcome {
    pub fn is_lethal(&self) -> bool {
        matches!(self, DamageOutcome::Killed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_clamps_at_zero() {
        let mut health = Health::new(100);
        assert!(!health.take_damage(40));
        assert_eq!(health.current(), 60);
        assert!(health.take_damage(1000));
        assert_eq!(health.current(), 0);
        // Повторный урон по пустому пулу — не "летальный"
        assert!(!health.take_damage(10));
        assert_eq!(health.fraction(), 0.0);
    }

    #[test]
    fn test_mark_dead_notifies_once() {
        let mut lifecycle = Lifecycle::default();
        assert!(lifecycle.colliders_enabled());

        assert!(lifecycle.mark_dead());
        assert!(lifecycle.is_dead());
        assert!(!lifecycle.colliders_enabled());

        assert!(!lifecycle.mark_dead());
        assert!(lifecycle.is_dead());
    }
}
