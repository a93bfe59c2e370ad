use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    roll_parser::parse_formula,
    rules::{
        bonus::{AuxiliaryRoll, Bonus, BonusGroup, BonusNode, InputKind, flatten, fragment},
        presets::{BonusCatalog, BonusOverrides},
    },
};

pub const DEFAULT_CRIT_THRESHOLD: u32 = 20;

/// Immutable description of a weapon or ability attack.
///
/// Resolution attempts clone what they need; the template itself is never mutated.
#[derive(Debug, Clone)]
pub struct Attack {
    pub title: String,
    pub roll_to_hit: bool,
    pub can_crit: bool,
    /// Advantage rolls 3d20 instead of 2d20 (e.g. Elven Accuracy).
    pub super_advantage: bool,
    pub damage_base: String,
    pub to_hit_bonus: String,
    pub damage_bonus: String,
    /// A kept to-hit die at or above this value is a critical hit.
    pub crit_threshold: u32,
    pub bonuses: Vec<BonusNode>,
}

impl Attack {
    pub fn all_bonuses(&self) -> Vec<&Bonus> {
        flatten(&self.bonuses)
    }

    pub fn from_config(config: AttackConfig, catalog: &BonusCatalog) -> Result<Self, ConfigError> {
        let mut builder = AttackBuilder::new(&config.title)
            .roll_to_hit(config.roll_to_hit)
            .can_crit(config.can_crit)
            .super_advantage(config.super_advantage)
            .to_hit_bonus(&config.to_hit_bonus)
            .damage_bonus(&config.damage_bonus)
            .crit_threshold(config.crit_threshold);
        if let Some(damage_base) = &config.damage_base {
            builder = builder.damage_base(damage_base);
        }
        for bonus in config.bonuses {
            builder = builder.bonus(bonus.resolve(catalog)?);
        }
        builder.build()
    }

    pub fn from_json(json: &str, catalog: &BonusCatalog) -> Result<Self, ConfigError> {
        let config: AttackConfig = serde_json::from_str(json)?;
        Self::from_config(config, catalog)
    }

    pub fn load(path: &Path, catalog: &BonusCatalog) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: AttackConfig = serde_json::from_reader(reader)?;
        Self::from_config(config, catalog)
    }
}

pub struct AttackBuilder {
    attack: Attack,
}

impl AttackBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            attack: Attack {
                title: title.to_string(),
                roll_to_hit: true,
                can_crit: true,
                super_advantage: false,
                damage_base: String::new(),
                to_hit_bonus: String::new(),
                damage_bonus: String::new(),
                crit_threshold: DEFAULT_CRIT_THRESHOLD,
                bonuses: Vec::new(),
            },
        }
    }

    pub fn roll_to_hit(mut self, roll_to_hit: bool) -> Self {
        self.attack.roll_to_hit = roll_to_hit;
        self
    }

    pub fn can_crit(mut self, can_crit: bool) -> Self {
        self.attack.can_crit = can_crit;
        self
    }

    pub fn super_advantage(mut self, super_advantage: bool) -> Self {
        self.attack.super_advantage = super_advantage;
        self
    }

    pub fn damage_base(mut self, damage_base: &str) -> Self {
        self.attack.damage_base = damage_base.trim().to_string();
        self
    }

    pub fn to_hit_bonus(mut self, to_hit_bonus: &str) -> Self {
        self.attack.to_hit_bonus = fragment(to_hit_bonus).unwrap_or_default();
        self
    }

    pub fn damage_bonus(mut self, damage_bonus: &str) -> Self {
        self.attack.damage_bonus = fragment(damage_bonus).unwrap_or_default();
        self
    }

    pub fn crit_threshold(mut self, crit_threshold: u32) -> Self {
        self.attack.crit_threshold = crit_threshold;
        self
    }

    pub fn bonus(mut self, bonus: impl Into<BonusNode>) -> Self {
        self.attack.bonuses.push(bonus.into());
        self
    }

    /// Validates every expression on the attack and its bonus tree.
    pub fn build(self) -> Result<Attack, ConfigError> {
        let attack = self.attack;
        if attack.title.trim().is_empty() {
            return Err(ConfigError::MissingTitle);
        }
        if attack.damage_base.is_empty() {
            return Err(ConfigError::MissingDamageBase(attack.title));
        }

        check_expression(&attack.title, "damage base", &attack.damage_base)?;
        check_expression(&attack.title, "to-hit bonus", &attack.to_hit_bonus)?;
        check_expression(&attack.title, "damage bonus", &attack.damage_bonus)?;
        for bonus in attack.all_bonuses() {
            check_bonus(bonus)?;
        }

        Ok(attack)
    }
}

fn check_bonus(bonus: &Bonus) -> Result<(), ConfigError> {
    let owner = &bonus.description;
    if let InputKind::Radio { group } = &bonus.input {
        if group.trim().is_empty() {
            return Err(ConfigError::MissingRadioGroup(owner.clone()));
        }
    }
    for (field, expression) in [
        ("to-hit bonus", &bonus.to_hit_bonus),
        ("damage bonus", &bonus.damage_bonus),
        ("crit override", &bonus.crit_bonus_override),
    ] {
        if let Some(expression) = expression {
            check_expression(owner, field, expression)?;
        }
    }
    for roll in &bonus.other_rolls {
        check_expression(&roll.description, "auxiliary roll", &roll.roll)?;
    }
    Ok(())
}

fn check_expression(owner: &str, field: &'static str, expression: &str) -> Result<(), ConfigError> {
    parse_formula(expression)
        .map(|_| ())
        .map_err(|source| ConfigError::InvalidExpression {
            owner: owner.to_string(),
            field,
            expression: expression.to_string(),
            source,
        })
}

fn default_true() -> bool {
    true
}

fn default_crit_threshold() -> u32 {
    DEFAULT_CRIT_THRESHOLD
}

/// JSON form of an [`Attack`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttackConfig {
    pub title: String,
    #[serde(default = "default_true")]
    pub roll_to_hit: bool,
    #[serde(default = "default_true")]
    pub can_crit: bool,
    #[serde(default)]
    pub super_advantage: bool,
    #[serde(default)]
    pub damage_base: Option<String>,
    #[serde(default)]
    pub to_hit_bonus: String,
    #[serde(default)]
    pub damage_bonus: String,
    #[serde(default = "default_crit_threshold")]
    pub crit_threshold: u32,
    #[serde(default)]
    pub bonuses: Vec<BonusConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BonusConfig {
    Number(LeafConfig),
    Check(LeafConfig),
    Radio(LeafConfig),
    Group(GroupConfig),
    Preset(PresetConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafConfig {
    pub description: String,
    #[serde(default)]
    pub to_hit_bonus: Option<String>,
    #[serde(default)]
    pub damage_bonus: Option<String>,
    #[serde(default)]
    pub crit_bonus_override: Option<String>,
    /// Name of a catalog predicate; number inputs default to `nonzero`.
    #[serde(default)]
    pub predicate: Option<String>,
    /// Exclusion group, required for radios.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub other_rolls: Vec<AuxiliaryRoll>,
    #[serde(default = "default_true")]
    pub can_crit: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub hide: bool,
    #[serde(default)]
    pub bonuses: Vec<BonusConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub description: String,
    #[serde(default)]
    pub hide: bool,
    #[serde(default)]
    pub bonuses: Vec<BonusConfig>,
    // Groups never carry modifiers; these exist to reject configs that try.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_hit_bonus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_bonus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit_bonus_override: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetConfig {
    pub preset: String,
    #[serde(default)]
    pub overrides: BonusOverrides,
}

impl BonusConfig {
    pub fn resolve(self, catalog: &BonusCatalog) -> Result<BonusNode, ConfigError> {
        match self {
            BonusConfig::Number(leaf) => {
                let name = leaf.predicate.clone().unwrap_or_else(|| "nonzero".to_string());
                let predicate = catalog
                    .predicate(&name)
                    .cloned()
                    .ok_or(ConfigError::UnknownPredicate(name))?;
                leaf.resolve(InputKind::Number(predicate), catalog)
            }
            BonusConfig::Check(leaf) => leaf.resolve(InputKind::Check, catalog),
            BonusConfig::Radio(leaf) => {
                let group = leaf
                    .group
                    .clone()
                    .ok_or_else(|| ConfigError::MissingRadioGroup(leaf.description.clone()))?;
                leaf.resolve(InputKind::Radio { group }, catalog)
            }
            BonusConfig::Group(group) => {
                let has_modifiers = [
                    &group.to_hit_bonus,
                    &group.damage_bonus,
                    &group.crit_bonus_override,
                ]
                .into_iter()
                .any(|m| m.as_deref().and_then(fragment).is_some());
                if has_modifiers {
                    return Err(ConfigError::GroupModifiers(group.description));
                }
                let mut node = BonusGroup::new(&group.description).hidden(group.hide);
                for child in group.bonuses {
                    node = node.child(child.resolve(catalog)?);
                }
                Ok(node.into())
            }
            BonusConfig::Preset(preset) => catalog
                .preset(&preset.preset, preset.overrides)
                .map(BonusNode::Bonus)
                .ok_or(ConfigError::UnknownPreset(preset.preset)),
        }
    }
}

impl LeafConfig {
    fn resolve(self, input: InputKind, catalog: &BonusCatalog) -> Result<BonusNode, ConfigError> {
        let mut bonus = Bonus::new(&self.description, input)
            .can_crit(self.can_crit)
            .enabled(self.enabled)
            .hidden(self.hide);
        bonus.to_hit_bonus = self.to_hit_bonus.as_deref().and_then(fragment);
        bonus.damage_bonus = self.damage_bonus.as_deref().and_then(fragment);
        bonus.crit_bonus_override = self.crit_bonus_override.as_deref().and_then(fragment);
        bonus.other_rolls = self.other_rolls;
        for child in self.bonuses {
            bonus = bonus.child(child.resolve(catalog)?);
        }
        Ok(bonus.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn longsword() -> AttackBuilder {
        AttackBuilder::new("Longsword")
            .damage_base("1d8")
            .to_hit_bonus("+5")
            .damage_bonus("+3")
    }

    #[test]
    fn test_builder_defaults() {
        let attack = longsword().build().unwrap();
        assert!(attack.roll_to_hit);
        assert!(attack.can_crit);
        assert!(!attack.super_advantage);
        assert_eq!(attack.crit_threshold, 20);
        assert!(attack.all_bonuses().is_empty());
    }

    #[test]
    fn test_missing_damage_base_is_rejected() {
        let err = AttackBuilder::new("Shove").build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingDamageBase(title) if title == "Shove"));
    }

    #[test]
    fn test_malformed_bonus_expression_is_rejected() {
        let err = longsword()
            .bonus(Bonus::check("Broken").damage("+2dd8"))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidExpression { ref owner, .. } if owner == "Broken"
        ));
    }

    #[test]
    fn test_from_json_with_presets_and_groups() {
        let json = r#"{
            "title": "Rapier",
            "damage_base": "1d8",
            "to_hit_bonus": "+7",
            "damage_bonus": "+4",
            "bonuses": [
                { "kind": "preset", "preset": "piercer" },
                { "kind": "preset", "preset": "booming_blade", "overrides": { "enabled": true } },
                {
                    "kind": "group",
                    "description": "Hunter",
                    "bonuses": [
                        { "kind": "check", "description": "Hunter's Mark", "damage_bonus": "+1d6[HM]" },
                        { "kind": "number", "description": "Bardic Inspiration", "to_hit_bonus": "+1d8" }
                    ]
                },
                { "kind": "radio", "description": "Cover", "group": "cover", "to_hit_bonus": "-2" }
            ]
        }"#;
        let attack = Attack::from_json(json, &BonusCatalog::standard()).unwrap();
        assert!(attack.roll_to_hit);
        assert_eq!(attack.crit_threshold, 20);

        let names: Vec<&str> = attack
            .all_bonuses()
            .iter()
            .map(|b| b.description.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "Piercer",
                "Booming Blade",
                "Hunter's Mark",
                "Bardic Inspiration",
                "Cover"
            ]
        );
        assert!(attack.all_bonuses()[1].enabled);
        assert!(matches!(
            &attack.all_bonuses()[3].input,
            InputKind::Number(p) if p.name() == "nonzero"
        ));
    }

    #[test]
    fn test_config_errors() {
        let catalog = BonusCatalog::standard();
        let cases = [
            (
                r#"{ "title": "A", "bonuses": [] }"#,
                "missing damage base",
            ),
            (
                r#"{ "title": "A", "damage_base": "1d6", "bonuses": [{ "kind": "preset", "preset": "vorpal" }] }"#,
                "unknown preset",
            ),
            (
                r#"{ "title": "A", "damage_base": "1d6", "bonuses": [{ "kind": "number", "description": "N", "predicate": "nope" }] }"#,
                "unknown predicate",
            ),
            (
                r#"{ "title": "A", "damage_base": "1d6", "bonuses": [{ "kind": "radio", "description": "R" }] }"#,
                "radio without group",
            ),
            (
                r#"{ "title": "A", "damage_base": "1d6", "bonuses": [{ "kind": "group", "description": "G", "damage_bonus": "+1" }] }"#,
                "group with modifiers",
            ),
        ];
        for (json, case) in cases {
            assert!(Attack::from_json(json, &catalog).is_err(), "{case}");
        }
    }
}
