//! Run state carried across levels
//!
//! Lives, currency, the single stored power-up slot and the purchased
//! upgrade tiers survive level transitions; everything else is rebuilt per
//! level. Serializable so the presentation layer (or a future save surface)
//! can snapshot it.

use serde::{Deserialize, Serialize};

use crate::sim::archetype::PowerupKind;

/// The three upgrade tracks sold in shop levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Movement speed
    Boots,
    /// Fire cooldown
    Gun,
    /// Bullet damage
    Ammo,
}

/// Purchased tier per track. -1 means nothing bought yet; each purchase
/// moves to the next tier. Caps sit just under the best power-up buff for
/// the same stat, so buffs always stay worth picking up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrades {
    pub boots: i8,
    pub gun: i8,
    pub ammo: i8,
}

impl Default for Upgrades {
    fn default() -> Self {
        Self {
            boots: -1,
            gun: -1,
            ammo: -1,
        }
    }
}

impl Upgrades {
    pub fn tier(&self, kind: UpgradeKind) -> i8 {
        match kind {
            UpgradeKind::Boots => self.boots,
            UpgradeKind::Gun => self.gun,
            UpgradeKind::Ammo => self.ammo,
        }
    }

    fn tier_mut(&mut self, kind: UpgradeKind) -> &mut i8 {
        match kind {
            UpgradeKind::Boots => &mut self.boots,
            UpgradeKind::Gun => &mut self.gun,
            UpgradeKind::Ammo => &mut self.ammo,
        }
    }
}

/// Coin cost of buying `next_tier` on a track; `None` once the track is
/// maxed out.
pub fn upgrade_cost(kind: UpgradeKind, next_tier: i8) -> Option<u32> {
    let costs: &[u32] = match kind {
        UpgradeKind::Boots => &[8, 20],
        UpgradeKind::Gun => &[10, 20, 30],
        UpgradeKind::Ammo => &[15, 30, 45],
    };
    usize::try_from(next_tier).ok().and_then(|i| costs.get(i)).copied()
}

/// Everything that outlives a single level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Hitting an enemy at 0 lives ends the run
    pub lives: i32,
    pub coins: u32,
    /// The single power-up slot
    pub stored_powerup: Option<PowerupKind>,
    pub upgrades: Upgrades,
    pub current_level: i32,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            lives: 0,
            coins: 0,
            stored_powerup: None,
            upgrades: Upgrades::default(),
            current_level: -1,
        }
    }

    /// Buy the next tier of a track if it exists and the coins are there.
    /// Unaffordable or maxed-out attempts are silent no-ops.
    pub fn purchase(&mut self, kind: UpgradeKind) -> bool {
        let next = self.upgrades.tier(kind) + 1;
        let Some(cost) = upgrade_cost(kind, next) else {
            return false;
        };
        if self.coins < cost {
            return false;
        }
        self.coins -= cost;
        *self.upgrades.tier_mut(kind) += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_increments_tier_and_spends() {
        let mut run = RunState::new();
        run.coins = 10;
        assert!(run.purchase(UpgradeKind::Boots));
        assert_eq!(run.upgrades.boots, 0);
        assert_eq!(run.coins, 2);
    }

    #[test]
    fn test_purchase_unaffordable_is_noop() {
        let mut run = RunState::new();
        run.coins = 7;
        assert!(!run.purchase(UpgradeKind::Boots));
        assert_eq!(run.upgrades.boots, -1);
        assert_eq!(run.coins, 7);
    }

    #[test]
    fn test_purchase_stops_at_max_tier() {
        let mut run = RunState::new();
        run.coins = 1000;
        assert!(run.purchase(UpgradeKind::Gun));
        assert!(run.purchase(UpgradeKind::Gun));
        assert!(run.purchase(UpgradeKind::Gun));
        assert!(!run.purchase(UpgradeKind::Gun), "gun track is maxed");
        assert_eq!(run.upgrades.gun, 2);
        assert_eq!(run.coins, 1000 - 10 - 20 - 30);
    }

    #[test]
    fn test_cost_table() {
        assert_eq!(upgrade_cost(UpgradeKind::Boots, 0), Some(8));
        assert_eq!(upgrade_cost(UpgradeKind::Boots, 2), None);
        assert_eq!(upgrade_cost(UpgradeKind::Ammo, 2), Some(45));
        assert_eq!(upgrade_cost(UpgradeKind::Ammo, -1), None);
    }

    #[test]
    fn test_run_state_serde_roundtrip() {
        let mut run = RunState::new();
        run.lives = 3;
        run.coins = 42;
        run.stored_powerup = Some(PowerupKind::Nova);
        run.upgrades.gun = 1;

        let json = serde_json::to_string(&run).unwrap();
        let back: RunState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.lives, 3);
        assert_eq!(back.coins, 42);
        assert_eq!(back.stored_powerup, Some(PowerupKind::Nova));
        assert_eq!(back.upgrades, run.upgrades);
    }
}
