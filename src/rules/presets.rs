use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::rules::bonus::{AuxiliaryRoll, Bonus, InputKind, ValuePredicate, fragment};

/// Fields a caller may override on a preset. Anything left `None` keeps the preset default.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusOverrides {
    pub description: Option<String>,
    pub to_hit_bonus: Option<String>,
    pub damage_bonus: Option<String>,
    pub crit_bonus_override: Option<String>,
    pub other_rolls: Option<Vec<AuxiliaryRoll>>,
    pub can_crit: Option<bool>,
    pub enabled: Option<bool>,
    pub hide: Option<bool>,
    /// Turns the preset into a radio in this exclusion group.
    pub group: Option<String>,
}

impl BonusOverrides {
    pub fn apply(self, mut bonus: Bonus) -> Bonus {
        if let Some(description) = self.description {
            bonus.description = description;
        }
        if let Some(to_hit) = self.to_hit_bonus {
            bonus.to_hit_bonus = fragment(&to_hit);
        }
        if let Some(damage) = self.damage_bonus {
            bonus.damage_bonus = fragment(&damage);
        }
        if let Some(crit) = self.crit_bonus_override {
            bonus.crit_bonus_override = fragment(&crit);
        }
        if let Some(other_rolls) = self.other_rolls {
            bonus.other_rolls = other_rolls;
        }
        if let Some(can_crit) = self.can_crit {
            bonus.can_crit = can_crit;
        }
        if let Some(enabled) = self.enabled {
            bonus.enabled = enabled;
        }
        if let Some(hide) = self.hide {
            bonus.hide = hide;
        }
        if let Some(group) = self.group {
            bonus.input = InputKind::Radio { group };
        }
        bonus
    }
}

pub type PresetFactory = fn(BonusOverrides) -> Bonus;

pub fn great_weapon_master(overrides: BonusOverrides) -> Bonus {
    overrides.apply(
        Bonus::check("Great Weapon Master")
            .to_hit("-5[GWM]")
            .damage("+10[GWM]"),
    )
}

pub fn sharpshooter(overrides: BonusOverrides) -> Bonus {
    overrides.apply(
        Bonus::check("Sharpshooter")
            .to_hit("-5[Sharpshooter]")
            .damage("+10[Sharpshooter]"),
    )
}

/// Hidden and on by default: rerolls one damage die and adds a die on a crit.
pub fn piercer(overrides: BonusOverrides) -> Bonus {
    overrides.apply(
        Bonus::check("Piercer")
            .crit_override("+1d6[Piercer Crit]")
            .enabled(true)
            .hidden(true)
            .other_roll(AuxiliaryRoll::new("Piercer Replacement", "+1d8", false)),
    )
}

pub fn green_flame_blade(overrides: BonusOverrides) -> Bonus {
    overrides.apply(
        Bonus::check("Green Flame Blade")
            .damage("+2d8[GFB]")
            .other_roll(AuxiliaryRoll::new("GFB Proximity Damage", "3+2d8", true)),
    )
}

pub fn booming_blade(overrides: BonusOverrides) -> Bonus {
    overrides.apply(
        Bonus::check("Booming Blade")
            .damage("+2d8[Booming Blade]")
            .other_roll(AuxiliaryRoll::new(
                "Booming Blade (movement)",
                "+3d8",
                false,
            )),
    )
}

/// Named presets and number-input predicates available to attack configurations.
#[derive(Debug, Clone, Default)]
pub struct BonusCatalog {
    presets: FxHashMap<String, PresetFactory>,
    predicates: FxHashMap<String, ValuePredicate>,
}

impl BonusCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in presets plus the `nonzero` predicate.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        catalog
            .register_preset("great_weapon_master", great_weapon_master)
            .register_preset("sharpshooter", sharpshooter)
            .register_preset("piercer", piercer)
            .register_preset("green_flame_blade", green_flame_blade)
            .register_preset("booming_blade", booming_blade)
            .register_predicate(ValuePredicate::nonzero());
        catalog
    }

    pub fn register_preset(&mut self, name: &str, factory: PresetFactory) -> &mut Self {
        self.presets.insert(name.to_string(), factory);
        self
    }

    /// Registers `predicate` under its own name, replacing any previous one.
    pub fn register_predicate(&mut self, predicate: ValuePredicate) -> &mut Self {
        self.predicates
            .insert(predicate.name().to_string(), predicate);
        self
    }

    pub fn preset(&self, name: &str, overrides: BonusOverrides) -> Option<Bonus> {
        self.presets.get(name).map(|factory| factory(overrides))
    }

    pub fn predicate(&self, name: &str) -> Option<&ValuePredicate> {
        self.predicates.get(name)
    }

    pub fn preset_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.presets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
