//! Charge-based piercing power.
//!
//! Normal hits build up charge. Once full the power is `ready`, and the next
//! collision that deals damage switches to `piercing`: a shared damage pool
//! is spent across every piece the ball touches until it runs out or the
//! ball bounces.

use serde::{Deserialize, Serialize};
use shared::PowerSnapshot;

/// Hot-reloadable tuning values, all at least 1. Fields missing from a
/// config file keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerTunables {
    pub charge_max: u32,
    pub charge_per_hit: u32,
    pub special_damage: u32,
}

impl Default for PowerTunables {
    fn default() -> Self {
        Self {
            charge_max: 10,
            charge_per_hit: 1,
            special_damage: 3,
        }
    }
}

impl PowerTunables {
    pub fn is_valid(&self) -> bool {
        self.charge_max >= 1 && self.charge_per_hit >= 1 && self.special_damage >= 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerState {
    pub charge: u32,
    pub max_charge: u32,
    pub gain_per_hit: u32,
    pub special_damage: u32,
    pub ready: bool,
    pub piercing: bool,
    pub remaining_damage: u32,
}

impl PowerState {
    pub fn new(tunables: PowerTunables) -> Self {
        Self {
            charge: 0,
            max_charge: tunables.charge_max.max(1),
            gain_per_hit: tunables.charge_per_hit,
            special_damage: tunables.special_damage,
            ready: false,
            piercing: false,
            remaining_damage: 0,
        }
    }

    pub fn tunables(&self) -> PowerTunables {
        PowerTunables {
            charge_max: self.max_charge,
            charge_per_hit: self.gain_per_hit,
            special_damage: self.special_damage,
        }
    }

    /// Applies new tuning without disturbing an ongoing piercing shot.
    pub fn apply_tunables(&mut self, tunables: PowerTunables) {
        self.max_charge = tunables.charge_max.max(1);
        self.gain_per_hit = tunables.charge_per_hit;
        self.special_damage = tunables.special_damage;
        self.charge = self.charge.min(self.max_charge);
        if !self.piercing {
            self.ready = self.charge >= self.max_charge;
        }
    }

    /// Credits charge for hit points removed in normal mode.
    pub fn record_damage(&mut self, hp_removed: u32) {
        if self.ready || self.piercing {
            return;
        }
        let gained = self.gain_per_hit.saturating_mul(hp_removed);
        self.charge = self.charge.saturating_add(gained).min(self.max_charge);
        if self.charge >= self.max_charge {
            self.ready = true;
        }
    }

    pub fn begin_piercing(&mut self) {
        self.ready = false;
        self.piercing = true;
        self.remaining_damage = self.special_damage;
        self.charge = 0;
    }

    /// Leaves piercing mode (or discards a pending power) and starts charging
    /// from zero again.
    pub fn reset_charge(&mut self) {
        self.charge = 0;
        self.ready = false;
        self.piercing = false;
        self.remaining_damage = 0;
    }

    /// Takes up to `wanted` from the shared pool.
    pub fn draw(&mut self, wanted: u32) -> u32 {
        let taken = wanted.min(self.remaining_damage);
        self.remaining_damage -= taken;
        taken
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_damage == 0
    }

    pub fn snapshot(&self) -> PowerSnapshot {
        PowerSnapshot {
            charge: self.charge,
            max_charge: self.max_charge,
            charge_per_hit: self.gain_per_hit,
            ready: self.ready,
            active: self.piercing,
            special_damage: self.special_damage,
            remaining_damage: self.remaining_damage,
        }
    }
}
