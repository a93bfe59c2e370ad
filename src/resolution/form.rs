use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::rules::{
    attack::Attack,
    bonus::{BonusId, BonusNode, InputKind},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    Number,
    Checkbox { checked: bool },
    Radio { group: String, checked: bool },
}

/// One input rendered for a visible bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormControl {
    pub id: BonusId,
    pub description: String,
    /// Descriptions of the enclosing groups, outermost first.
    pub groups: Vec<String>,
    pub kind: ControlKind,
}

/// What the presenter shows: one control per visible bonus, in flatten order.
/// The two custom modifier fields are implied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackForm {
    pub title: String,
    pub controls: Vec<FormControl>,
}

impl AttackForm {
    pub fn build(attack: &Attack) -> Self {
        let mut controls = Vec::new();
        collect(&attack.bonuses, &mut Vec::new(), false, &mut controls);
        Self {
            title: attack.title.clone(),
            controls,
        }
    }

    /// Finds a control by description, ignoring case.
    pub fn find(&self, description: &str) -> Option<&FormControl> {
        self.controls
            .iter()
            .find(|c| c.description.eq_ignore_ascii_case(description.trim()))
    }

    /// The submission a user would send by confirming without touching anything.
    pub fn defaults(&self, confirmation: Confirmation) -> Submission {
        let mut submission = Submission::confirmed(confirmation);
        for control in &self.controls {
            match &control.kind {
                ControlKind::Number => {}
                ControlKind::Checkbox { checked } | ControlKind::Radio { checked, .. } => {
                    submission
                        .values
                        .insert(control.id, InputValue::Checked(*checked));
                }
            }
        }
        submission
    }

    pub fn pretty_print(&self, f: &mut impl std::fmt::Write) -> std::fmt::Result {
        writeln!(f, "{}", self.title)?;
        for control in &self.controls {
            let indent = "  ".repeat(control.groups.len() + 1);
            match &control.kind {
                ControlKind::Number => writeln!(f, "{}[#] {}", indent, control.description)?,
                ControlKind::Checkbox { checked } => writeln!(
                    f,
                    "{}[{}] {}",
                    indent,
                    if *checked { "x" } else { " " },
                    control.description
                )?,
                ControlKind::Radio { group, checked } => writeln!(
                    f,
                    "{}({}) {} <{}>",
                    indent,
                    if *checked { "*" } else { " " },
                    control.description,
                    group
                )?,
            }
        }
        writeln!(f, "  custom to-hit: ____")?;
        write!(f, "  custom damage: ____")
    }
}

fn collect(
    nodes: &[BonusNode],
    groups: &mut Vec<String>,
    hidden: bool,
    out: &mut Vec<FormControl>,
) {
    for node in nodes {
        match node {
            BonusNode::Group(group) => {
                groups.push(group.description.clone());
                collect(&group.children, groups, hidden || group.hide, out);
                groups.pop();
            }
            BonusNode::Bonus(bonus) => {
                let hidden = hidden || bonus.hide;
                collect(&bonus.children, groups, hidden, out);
                if hidden {
                    continue;
                }
                let Some(id) = bonus.id else {
                    continue;
                };
                let kind = match &bonus.input {
                    InputKind::Number(_) => ControlKind::Number,
                    InputKind::Check => ControlKind::Checkbox {
                        checked: bonus.enabled,
                    },
                    InputKind::Radio { group } => ControlKind::Radio {
                        group: group.clone(),
                        checked: bonus.enabled,
                    },
                };
                out.push(FormControl {
                    id,
                    description: bonus.description.clone(),
                    groups: groups.clone(),
                    kind,
                });
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    Number(String),
    Checked(bool),
}

/// The presenter's answer to an [`AttackForm`].
#[derive(Debug, Default, Clone)]
pub struct Submission {
    pub confirmation: Confirmation,
    pub values: FxHashMap<BonusId, InputValue>,
    pub to_hit_custom: Option<String>,
    pub damage_custom: Option<String>,
}

impl Submission {
    pub fn confirmed(confirmation: Confirmation) -> Self {
        Self {
            confirmation,
            ..Default::default()
        }
    }

    pub fn cancelled() -> Self {
        Self::confirmed(Confirmation::Cancelled)
    }

    pub fn value(mut self, id: BonusId, value: InputValue) -> Self {
        self.values.insert(id, value);
        self
    }

    pub fn checked(self, id: BonusId, checked: bool) -> Self {
        self.value(id, InputValue::Checked(checked))
    }

    pub fn number(self, id: BonusId, value: &str) -> Self {
        self.value(id, InputValue::Number(value.to_string()))
    }

    pub fn to_hit_custom(mut self, modifier: &str) -> Self {
        self.to_hit_custom = Some(modifier.to_string());
        self
    }

    pub fn damage_custom(mut self, modifier: &str) -> Self {
        self.damage_custom = Some(modifier.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        resolution::context::ResolutionContext,
        rules::{
            attack::AttackBuilder,
            bonus::{Bonus, BonusGroup, ValuePredicate},
            presets::{BonusOverrides, piercer},
        },
    };

    fn presented_form() -> AttackForm {
        let attack = AttackBuilder::new("Rapier")
            .damage_base("1d8")
            .bonus(piercer(BonusOverrides::default()))
            .bonus(
                BonusGroup::new("Spells")
                    .child(Bonus::check("Hex").damage("+1d6[Hex]").enabled(true))
                    .child(
                        BonusGroup::new("Secret")
                            .hidden(true)
                            .child(Bonus::check("Hidden Blade")),
                    ),
            )
            .bonus(Bonus::number(
                "Sneak Attack dice",
                ValuePredicate::scaled_dice("sneak", 6, "Sneak"),
            ))
            .build()
            .unwrap();
        let mut ctx = ResolutionContext::new(&attack);
        ctx.present().unwrap()
    }

    #[test]
    fn test_hidden_bonuses_are_not_presented() {
        let form = presented_form();
        let names: Vec<_> = form.controls.iter().map(|c| c.description.as_str()).collect();
        assert_eq!(names, vec!["Hex", "Sneak Attack dice"]);
    }

    #[test]
    fn test_controls_carry_groups_and_defaults() {
        let form = presented_form();
        let hex = form.find("hex").unwrap();
        assert_eq!(hex.groups, vec!["Spells".to_string()]);
        assert_eq!(hex.kind, ControlKind::Checkbox { checked: true });
        assert_eq!(form.find("Sneak Attack dice").unwrap().kind, ControlKind::Number);
    }

    #[test]
    fn test_defaults_keep_checkbox_state() {
        let form = presented_form();
        let hex = form.find("Hex").unwrap().id;
        let submission = form.defaults(Confirmation::Advantage);
        assert_eq!(submission.confirmation, Confirmation::Advantage);
        assert_eq!(submission.values.get(&hex), Some(&InputValue::Checked(true)));
        assert_eq!(submission.values.len(), 1);
    }

    #[test]
    fn test_pretty_print() {
        let form = presented_form();
        let mut buf = String::new();
        form.pretty_print(&mut buf).unwrap();
        assert!(buf.starts_with("Rapier\n"));
        assert!(buf.contains("    [x] Hex"));
        assert!(buf.contains("  [#] Sneak Attack dice"));
        assert!(!buf.contains("Piercer"));
    }
}
