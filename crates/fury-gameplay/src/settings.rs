//! Simulation tunables.
//!
//! One [`Settings`] value is owned by the [`World`](crate::world::World) and
//! lent to every state machine through the tick context. Units are pixels and
//! seconds; `z` velocities are negative when moving up, away from the ground.

use fury_common::{SettingsError, Vec2};
use serde::{Deserialize, Serialize};

/// Offsets of the four attack slots relative to the player's feet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotOffsets {
    /// Slot above and to the left of the player.
    pub top_left: Vec2,
    /// Slot above and to the right of the player.
    pub top_right: Vec2,
    /// Slot below and to the left of the player.
    pub bottom_left: Vec2,
    /// Slot below and to the right of the player.
    pub bottom_right: Vec2,
}

impl Default for SlotOffsets {
    fn default() -> Self {
        Self {
            top_left: Vec2::new(-14.0, -3.0),
            top_right: Vec2::new(14.0, -3.0),
            bottom_left: Vec2::new(-14.0, 3.0),
            bottom_right: Vec2::new(14.0, 3.0),
        }
    }
}

/// Gameplay tunables shared by every simulated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Screen ===
    /// Logical screen width (camera width).
    pub screen_width: f32,
    /// Logical screen height (camera height).
    pub screen_height: f32,

    // === Physics ===
    /// Downward acceleration applied to `z` velocity.
    pub gravity: f32,
    /// `z` value of the ground plane.
    pub ground_level: f32,
    /// Initial `z` velocity of a player jump.
    pub jump_velocity: f32,

    // === Player ===
    /// Player starting health.
    pub player_health: i32,
    /// Damage of a regular player hit.
    pub player_damage: i32,
    /// Player walking speed.
    pub player_speed: f32,
    /// Seconds without attacking after which the combo restarts.
    pub combo_timeout: f32,
    /// Frame duration of the attack animations.
    pub attack_frame_duration: f32,
    /// Damage of the airborne drop kick.
    pub drop_kick_damage: i32,
    /// Pick up weapons on contact instead of waiting for the interact input.
    pub auto_pickup: bool,

    // === Enemies ===
    /// Enemy starting health.
    pub enemy_health: i32,
    /// Damage of an enemy melee hit.
    pub enemy_damage: i32,
    /// Enemy running speed.
    pub enemy_speed: f32,
    /// Seconds an enemy waits in its slot before attacking.
    pub enemy_attack_cooldown: f32,
    /// Distance at which an enemy counts as arrived at its slot.
    pub slot_arrival_threshold: f32,
    /// Attack slot offsets around the player.
    pub slot_offsets: SlotOffsets,
    /// Seconds a knocked-down enemy stays on the ground.
    pub on_ground_duration: f32,
    /// Longest time an enemy keeps flying back before falling.
    pub flying_back_duration: f32,
    /// Damage dealt to anything a flying-back enemy crashes into.
    pub flying_back_collateral_damage: i32,
    /// Fraction of speed kept when a flying-back enemy bounces off a wall.
    pub wall_bounce_factor: f32,

    // === Knockback ===
    /// Horizontal knockback speed of a normal hit.
    pub knockback_normal: f32,
    /// Horizontal knockback speed of a knockdown hit.
    pub knockback_knockdown: f32,
    /// Horizontal knockback speed of a power hit.
    pub knockback_power: f32,
    /// Upward `z` velocity given to knocked-down entities.
    pub knockdown_pop_velocity: f32,

    // === Barrels ===
    /// Barrel starting health.
    pub barrel_health: i32,
    /// Horizontal speed of a destroyed barrel.
    pub barrel_knockback: f32,
    /// Upward `z` velocity of a destroyed barrel.
    pub barrel_pop_velocity: f32,

    // === Collectibles ===
    /// Speed of a thrown weapon.
    pub thrown_velocity: f32,
    /// Damage of a thrown weapon.
    pub thrown_damage: i32,
    /// Upward `z` velocity of a dropped item.
    pub drop_pop_velocity: f32,
    /// Sideways speed of a dropped item.
    pub drop_sideways_velocity: f32,
    /// Health restored by food.
    pub food_heal: i32,
    /// Shots in a freshly picked gun.
    pub gun_ammo: u32,

    // === Bullets ===
    /// Damage of a bullet.
    pub bullet_damage: i32,
    /// Reach of a bullet trace.
    pub bullet_length: f32,
    /// Thickness of a bullet trace.
    pub bullet_thickness: f32,
    /// Fade rate of a bullet trace, in visible percent per second.
    pub bullet_fade_rate: f32,

    // === Animation ===
    /// Default fade rate, in visible percent per second.
    pub fade_rate: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Screen
            screen_width: 100.0,
            screen_height: 64.0,

            // Physics
            gravity: 200.0,
            ground_level: 0.0,
            jump_velocity: -100.0,

            // Player
            player_health: 100,
            player_damage: 12,
            player_speed: 30.0,
            combo_timeout: 0.6,
            attack_frame_duration: 0.05,
            drop_kick_damage: 20,
            auto_pickup: true,

            // Enemies
            enemy_health: 40,
            enemy_damage: 8,
            enemy_speed: 20.0,
            enemy_attack_cooldown: 1.0,
            slot_arrival_threshold: 1.0,
            slot_offsets: SlotOffsets::default(),
            on_ground_duration: 0.6,
            flying_back_duration: 0.6,
            flying_back_collateral_damage: 5,
            wall_bounce_factor: 0.5,

            // Knockback
            knockback_normal: 15.0,
            knockback_knockdown: 25.0,
            knockback_power: 70.0,
            knockdown_pop_velocity: -60.0,

            // Barrels
            barrel_health: 20,
            barrel_knockback: 40.0,
            barrel_pop_velocity: -50.0,

            // Collectibles
            thrown_velocity: 120.0,
            thrown_damage: 15,
            drop_pop_velocity: -60.0,
            drop_sideways_velocity: 15.0,
            food_heal: 30,
            gun_ammo: 3,

            // Bullets
            bullet_damage: 30,
            bullet_length: 100.0,
            bullet_thickness: 0.6,
            bullet_fade_rate: 400.0,

            // Animation
            fade_rate: 100.0,
        }
    }
}

impl Settings {
    /// Parse settings from RON text. Missing fields keep their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::from_str(text).map_err(|e| SettingsError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to pretty RON text.
    pub fn to_ron_string(&self) -> Result<String, SettingsError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        fn positive(name: &'static str, value: f32) -> Result<(), SettingsError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(SettingsError::Invalid {
                    name,
                    reason: format!("must be positive, got {value}"),
                })
            }
        }

        positive("screen_width", self.screen_width)?;
        positive("screen_height", self.screen_height)?;
        positive("gravity", self.gravity)?;
        positive("attack_frame_duration", self.attack_frame_duration)?;
        positive("slot_arrival_threshold", self.slot_arrival_threshold)?;
        positive("fade_rate", self.fade_rate)?;
        positive("bullet_fade_rate", self.bullet_fade_rate)?;

        if self.jump_velocity >= 0.0 {
            return Err(SettingsError::Invalid {
                name: "jump_velocity",
                reason: "must point up (negative)".into(),
            });
        }
        if self.combo_timeout < 0.0 {
            return Err(SettingsError::Invalid {
                name: "combo_timeout",
                reason: "must not be negative".into(),
            });
        }
        if self.gun_ammo == 0 {
            return Err(SettingsError::Invalid {
                name: "gun_ammo",
                reason: "a gun needs at least one shot".into(),
            });
        }
        Ok(())
    }

    /// Horizontal knockback speed for a hit severity.
    #[must_use]
    pub fn knockback_speed(&self, severity: crate::damage::HitSeverity) -> f32 {
        use crate::damage::HitSeverity;
        match severity {
            HitSeverity::Normal => self.knockback_normal,
            HitSeverity::Knockdown => self.knockback_knockdown,
            HitSeverity::Power => self.knockback_power,
        }
    }
}
