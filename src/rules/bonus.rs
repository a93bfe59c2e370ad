use std::sync::Arc;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::resolution::context::ResolutionContext;

/// Identifies a bonus within a single resolution attempt.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Ord,
    Eq,
    Hash,
    From,
    Into,
    Display,
    Serialize,
    Deserialize,
)]
#[display("b{_0}")]
pub struct BonusId(pub u32);

type PredicateFn = dyn Fn(&mut ResolutionContext, &mut Bonus, &str) -> bool + Send + Sync;

/// Decides whether a number-input bonus is enabled for the value the user entered.
///
/// The predicate may rewrite the bonus (e.g. turn "3" into `+3d6`) or the
/// attempt's context. It gets a working copy of the bonus while the context
/// still holds the whole tree; the copy is written back afterwards. It never
/// sees the template [`Attack`](crate::rules::attack::Attack).
#[derive(Clone)]
pub struct ValuePredicate {
    name: String,
    func: Arc<PredicateFn>,
}

impl ValuePredicate {
    pub fn new(
        name: &str,
        func: impl Fn(&mut ResolutionContext, &mut Bonus, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, context: &mut ResolutionContext, bonus: &mut Bonus, value: &str) -> bool {
        (self.func)(context, bonus, value)
    }

    /// Enabled for any non-zero integer.
    pub fn nonzero() -> Self {
        Self::new("nonzero", |_, _, value| {
            value.trim().parse::<i64>().map(|n| n != 0).unwrap_or(false)
        })
    }

    /// Enabled for a positive count; sets the bonus damage to `+{count}d{sides}[{label}]`.
    pub fn scaled_dice(name: &str, sides: u32, label: &str) -> Self {
        let label = label.to_string();
        Self::new(name, move |_, bonus, value| {
            match value.trim().parse::<u32>() {
                Ok(count) if count > 0 => {
                    bonus.damage_bonus = Some(format!("+{}d{}[{}]", count, sides, label));
                    true
                }
                _ => false,
            }
        })
    }
}

impl std::fmt::Debug for ValuePredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ValuePredicate").field(&self.name).finish()
    }
}

/// The form control a leaf bonus is bound to.
#[derive(Debug, Clone)]
pub enum InputKind {
    Number(ValuePredicate),
    Check,
    /// Mutually exclusive with the other radios sharing `group`.
    Radio { group: String },
}

/// A secondary roll reported alongside the attack while its bonus is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryRoll {
    pub description: String,
    pub roll: String,
    #[serde(default)]
    pub can_crit: bool,
}

impl AuxiliaryRoll {
    pub fn new(description: &str, roll: &str, can_crit: bool) -> Self {
        Self {
            description: description.to_string(),
            roll: roll.to_string(),
            can_crit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bonus {
    pub id: Option<BonusId>,
    pub description: String,
    pub input: InputKind,
    pub to_hit_bonus: Option<String>,
    pub damage_bonus: Option<String>,
    /// Replaces this bonus's dice in the crit roll.
    pub crit_bonus_override: Option<String>,
    pub other_rolls: Vec<AuxiliaryRoll>,
    pub children: Vec<BonusNode>,
    /// Carried from configuration. The crit roll takes this bonus's dice either way.
    pub can_crit: bool,
    pub enabled: bool,
    pub hide: bool,
}

impl Bonus {
    pub fn new(description: &str, input: InputKind) -> Self {
        Self {
            id: None,
            description: description.to_string(),
            input,
            to_hit_bonus: None,
            damage_bonus: None,
            crit_bonus_override: None,
            other_rolls: Vec::new(),
            children: Vec::new(),
            can_crit: true,
            enabled: false,
            hide: false,
        }
    }

    pub fn check(description: &str) -> Self {
        Self::new(description, InputKind::Check)
    }

    pub fn radio(description: &str, group: &str) -> Self {
        Self::new(
            description,
            InputKind::Radio {
                group: group.to_string(),
            },
        )
    }

    pub fn number(description: &str, predicate: ValuePredicate) -> Self {
        Self::new(description, InputKind::Number(predicate))
    }

    pub fn to_hit(mut self, expression: &str) -> Self {
        self.to_hit_bonus = fragment(expression);
        self
    }

    pub fn damage(mut self, expression: &str) -> Self {
        self.damage_bonus = fragment(expression);
        self
    }

    pub fn crit_override(mut self, expression: &str) -> Self {
        self.crit_bonus_override = fragment(expression);
        self
    }

    pub fn other_roll(mut self, roll: AuxiliaryRoll) -> Self {
        self.other_rolls.push(roll);
        self
    }

    pub fn child(mut self, child: impl Into<BonusNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn hidden(mut self, hide: bool) -> Self {
        self.hide = hide;
        self
    }

    pub fn can_crit(mut self, can_crit: bool) -> Self {
        self.can_crit = can_crit;
        self
    }

    pub(crate) fn without_children(&self) -> Self {
        Self {
            children: Vec::new(),
            ..self.clone()
        }
    }
}

/// A labelled container. Groups carry no modifiers and are never applied themselves.
#[derive(Debug, Clone)]
pub struct BonusGroup {
    pub description: String,
    pub hide: bool,
    pub children: Vec<BonusNode>,
}

impl BonusGroup {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            hide: false,
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<BonusNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn hidden(mut self, hide: bool) -> Self {
        self.hide = hide;
        self
    }
}

#[derive(Debug, Clone, From)]
pub enum BonusNode {
    Group(BonusGroup),
    Bonus(Bonus),
}

impl BonusNode {
    pub fn children(&self) -> &[BonusNode] {
        match self {
            BonusNode::Group(group) => &group.children,
            BonusNode::Bonus(bonus) => &bonus.children,
        }
    }
}

/// Depth-first list of every non-group bonus. A node's children come before the node itself.
pub fn flatten(nodes: &[BonusNode]) -> Vec<&Bonus> {
    let mut out = Vec::new();
    flatten_inner(nodes, &mut out);
    out
}

fn flatten_inner<'a>(nodes: &'a [BonusNode], out: &mut Vec<&'a Bonus>) {
    for node in nodes {
        flatten_inner(node.children(), out);
        if let BonusNode::Bonus(bonus) = node {
            out.push(bonus);
        }
    }
}

/// Rebuilds a flat tree from the flattened leaves, dropping their nested children.
pub fn flatten_into_tree(nodes: &[BonusNode]) -> Vec<BonusNode> {
    flatten(nodes)
        .into_iter()
        .map(|bonus| BonusNode::Bonus(bonus.without_children()))
        .collect()
}

pub(crate) fn find_bonus_mut(nodes: &mut [BonusNode], id: BonusId) -> Option<&mut Bonus> {
    for node in nodes {
        match node {
            BonusNode::Group(group) => {
                if let Some(found) = find_bonus_mut(&mut group.children, id) {
                    return Some(found);
                }
            }
            BonusNode::Bonus(bonus) => {
                if bonus.id == Some(id) {
                    return Some(bonus);
                }
                if let Some(found) = find_bonus_mut(&mut bonus.children, id) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Visits the same bonuses as [`flatten`], in the same order, mutably.
pub(crate) fn for_each_bonus_mut(nodes: &mut [BonusNode], f: &mut impl FnMut(&mut Bonus)) {
    for node in nodes {
        match node {
            BonusNode::Group(group) => for_each_bonus_mut(&mut group.children, f),
            BonusNode::Bonus(bonus) => {
                for_each_bonus_mut(&mut bonus.children, f);
                f(bonus);
            }
        }
    }
}

/// Normalizes an expression fragment that is appended to a larger expression.
///
/// Blank input becomes `None`; anything not starting with `+` or `-` gets a leading `+`.
pub fn fragment(expression: &str) -> Option<String> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.starts_with('+') || trimmed.starts_with('-') {
        Some(trimmed.to_string())
    } else {
        Some(format!("+{}", trimmed))
    }
}
