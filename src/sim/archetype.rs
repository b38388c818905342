//! Enemy kinds and their static tuning tables
//!
//! One enum plus constant per-kind stats replaces any per-kind code: a single
//! steering/combat implementation reads these tables. Drop tables are
//! per-kind weighted rolls over two coin tiers, the nine power-up kinds and a
//! dominant "nothing" weight.

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Enemy category with fixed base stats and behavior profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Fast fodder, spawns 1-3 at a time from the lane tiles
    Grunt,
    /// Slow and tough; crushes deployed Sappers on contact
    Brute,
    /// Very fast lane spawner with twitchy steering
    Scuttler,
    /// Slow bullet sponge, spawns 1-3 at a time
    Husk,
    /// Flyer, ignores ground obstacles, spawns anywhere along an edge
    Wasp,
    /// Tougher, faster flyer
    Wraith,
    /// Pathfinds to a reserved tile and deploys there as a stationary hazard
    Sapper,
}

/// How the spawn planner places an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnStyle {
    /// One spawn at a random lane tile on a random edge
    Lane,
    /// 1-3 simultaneous spawns at distinct lane tiles, count sampled from the
    /// level's weight table
    LaneMulti,
    /// One spawn at a uniform offset within the middle 80% of a random edge
    Flying,
    /// One spawn pathing to a reserved deploy tile
    Pathing,
}

/// Per-kind constants. One static instance per archetype.
#[derive(Debug)]
pub struct Stats {
    pub health: i32,
    /// Pixels per second
    pub speed: f32,
    /// Scale on the angle-weighted steering correction toward the player
    pub momentum: f32,
    pub spawn_style: SpawnStyle,
    /// How long death ashes linger on the ground, if they do
    pub death_linger_ms: Option<f32>,
    pub drops: DropTable,
}

impl Archetype {
    pub fn stats(self) -> &'static Stats {
        match self {
            Archetype::Grunt => &GRUNT,
            Archetype::Brute => &BRUTE,
            Archetype::Scuttler => &SCUTTLER,
            Archetype::Husk => &HUSK,
            Archetype::Wasp => &WASP,
            Archetype::Wraith => &WRAITH,
            Archetype::Sapper => &SAPPER,
        }
    }

    #[inline]
    pub fn is_flying(self) -> bool {
        self.stats().spawn_style == SpawnStyle::Flying
    }
}

/// Health a Sapper settles at when its deploy animation finishes, keyed by
/// the health it had left while moving: damage taken on the way in carries
/// over into the deployed form.
pub fn sapper_deployed_health(run_health: i32) -> i32 {
    match run_health {
        2 => 7,
        1 => 3,
        other => panic!("sapper deployed with impossible health {other}"),
    }
}

/// The nine power-up kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerupKind {
    /// Speed boost
    Stim,
    /// One more life, applies on pickup
    ExtraLife,
    /// Fastest fire cooldown
    Minigun,
    /// Clears every non-boss enemy from the field
    Nuke,
    /// Speed + fire rate + side shots
    Overcharge,
    /// Two extra bullets at +/-10 degrees
    Scatter,
    /// Random teleport plus a field-wide enemy stun
    Cloak,
    /// Freeze stage, then contact kills enemies instead of the player
    Berserk,
    /// Fire in all eight directions at once
    Nova,
}

/// What a drop on the floor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropKind {
    /// Currency, worth 1 or 5
    Coin(u32),
    Powerup(PowerupKind),
}

/// Weighted drop roll. Weights are relative; `none` dominates so most kills
/// drop nothing.
#[derive(Debug, Clone, Copy)]
pub struct DropTable {
    pub coin_one: u32,
    pub coin_five: u32,
    pub stim: u32,
    pub extra_life: u32,
    pub minigun: u32,
    pub nuke: u32,
    pub overcharge: u32,
    pub scatter: u32,
    pub cloak: u32,
    pub berserk: u32,
    pub nova: u32,
    pub none: u32,
}

impl DropTable {
    fn entries(&self) -> [(Option<DropKind>, u32); 12] {
        [
            (Some(DropKind::Coin(1)), self.coin_one),
            (Some(DropKind::Coin(5)), self.coin_five),
            (Some(DropKind::Powerup(PowerupKind::Stim)), self.stim),
            (
                Some(DropKind::Powerup(PowerupKind::ExtraLife)),
                self.extra_life,
            ),
            (Some(DropKind::Powerup(PowerupKind::Minigun)), self.minigun),
            (Some(DropKind::Powerup(PowerupKind::Nuke)), self.nuke),
            (
                Some(DropKind::Powerup(PowerupKind::Overcharge)),
                self.overcharge,
            ),
            (Some(DropKind::Powerup(PowerupKind::Scatter)), self.scatter),
            (Some(DropKind::Powerup(PowerupKind::Cloak)), self.cloak),
            (Some(DropKind::Powerup(PowerupKind::Berserk)), self.berserk),
            (Some(DropKind::Powerup(PowerupKind::Nova)), self.nova),
            (None, self.none),
        ]
    }

    /// Weighted roll; `None` means no drop.
    pub fn roll(&self, rng: &mut Pcg32) -> Option<DropKind> {
        let entries = self.entries();
        let total: u32 = entries.iter().map(|(_, w)| w).sum();
        debug_assert!(total > 0, "drop table has no weight");
        let mut pick = rng.random_range(0..total);
        for (kind, weight) in entries {
            if pick < weight {
                return kind;
            }
            pick -= weight;
        }
        unreachable!("roll exceeded total weight")
    }
}

static GRUNT: Stats = Stats {
    health: 1,
    speed: 30.0,
    momentum: 0.001,
    spawn_style: SpawnStyle::LaneMulti,
    death_linger_ms: Some(10_000.0),
    drops: DropTable {
        coin_one: 35,
        coin_five: 0,
        stim: 4,
        extra_life: 2,
        minigun: 3,
        nuke: 3,
        overcharge: 1,
        scatter: 4,
        cloak: 4,
        berserk: 3,
        nova: 4,
        none: 250,
    },
};

static BRUTE: Stats = Stats {
    health: 3,
    speed: 20.0,
    momentum: 0.001,
    spawn_style: SpawnStyle::Lane,
    death_linger_ms: Some(10_000.0),
    drops: DropTable {
        coin_one: 35,
        coin_five: 10,
        stim: 3,
        extra_life: 3,
        minigun: 2,
        nuke: 2,
        overcharge: 2,
        scatter: 2,
        cloak: 2,
        berserk: 2,
        nova: 3,
        none: 250,
    },
};

static SCUTTLER: Stats = Stats {
    health: 2,
    speed: 50.0,
    momentum: 0.005,
    spawn_style: SpawnStyle::Lane,
    death_linger_ms: Some(10_000.0),
    drops: DropTable {
        coin_one: 25,
        coin_five: 10,
        stim: 4,
        extra_life: 2,
        minigun: 3,
        nuke: 3,
        overcharge: 1,
        scatter: 4,
        cloak: 4,
        berserk: 3,
        nova: 4,
        none: 250,
    },
};

static HUSK: Stats = Stats {
    health: 6,
    speed: 10.0,
    momentum: 0.001,
    spawn_style: SpawnStyle::LaneMulti,
    death_linger_ms: None,
    drops: DropTable {
        coin_one: 25,
        coin_five: 10,
        stim: 2,
        extra_life: 5,
        minigun: 3,
        nuke: 3,
        overcharge: 4,
        scatter: 3,
        cloak: 2,
        berserk: 2,
        nova: 2,
        none: 250,
    },
};

static WASP: Stats = Stats {
    health: 1,
    speed: 25.0,
    momentum: 0.001,
    spawn_style: SpawnStyle::Flying,
    death_linger_ms: None,
    drops: DropTable {
        coin_one: 30,
        coin_five: 5,
        stim: 4,
        extra_life: 2,
        minigun: 3,
        nuke: 3,
        overcharge: 1,
        scatter: 4,
        cloak: 4,
        berserk: 3,
        nova: 4,
        none: 250,
    },
};

static WRAITH: Stats = Stats {
    health: 3,
    speed: 35.0,
    momentum: 0.002,
    spawn_style: SpawnStyle::Flying,
    death_linger_ms: None,
    drops: DropTable {
        coin_one: 25,
        coin_five: 10,
        stim: 4,
        extra_life: 2,
        minigun: 3,
        nuke: 3,
        overcharge: 1,
        scatter: 4,
        cloak: 4,
        berserk: 3,
        nova: 4,
        none: 250,
    },
};

static SAPPER: Stats = Stats {
    health: 2,
    speed: 35.0,
    momentum: 0.001,
    spawn_style: SpawnStyle::Pathing,
    death_linger_ms: Some(10_000.0),
    drops: DropTable {
        coin_one: 30,
        coin_five: 20,
        stim: 2,
        extra_life: 3,
        minigun: 3,
        nuke: 2,
        overcharge: 3,
        scatter: 2,
        cloak: 2,
        berserk: 2,
        nova: 3,
        none: 250,
    },
};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_drop_roll_stays_in_table() {
        let mut rng = Pcg32::seed_from_u64(42);
        let table = &Archetype::Grunt.stats().drops;
        for _ in 0..1000 {
            // Grunt never drops a five-coin (weight 0)
            if let Some(DropKind::Coin(value)) = table.roll(&mut rng) {
                assert_eq!(value, 1);
            }
        }
    }

    #[test]
    fn test_drop_roll_mostly_nothing() {
        let mut rng = Pcg32::seed_from_u64(7);
        let table = &Archetype::Brute.stats().drops;
        let nothing = (0..1000).filter(|_| table.roll(&mut rng).is_none()).count();
        // none weight is 250 of 316 total; allow generous slack
        assert!(nothing > 600, "expected mostly empty rolls, got {nothing}");
    }

    #[test]
    fn test_sapper_deployed_health_remap() {
        assert_eq!(sapper_deployed_health(2), 7);
        assert_eq!(sapper_deployed_health(1), 3);
    }

    #[test]
    #[should_panic]
    fn test_sapper_deployed_health_rejects_zero() {
        sapper_deployed_health(0);
    }

    #[test]
    fn test_spawn_styles() {
        assert_eq!(Archetype::Grunt.stats().spawn_style, SpawnStyle::LaneMulti);
        assert_eq!(Archetype::Husk.stats().spawn_style, SpawnStyle::LaneMulti);
        assert_eq!(Archetype::Brute.stats().spawn_style, SpawnStyle::Lane);
        assert_eq!(Archetype::Sapper.stats().spawn_style, SpawnStyle::Pathing);
        assert!(Archetype::Wasp.is_flying());
        assert!(Archetype::Wraith.is_flying());
        assert!(!Archetype::Sapper.is_flying());
    }
}
