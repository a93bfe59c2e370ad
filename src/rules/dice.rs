use serde::{Deserialize, Serialize};

use crate::{error::DiceError, statistics::roller::Roller};

/// Upper bound on the dice count of a single term.
pub const MAX_DICE_PER_TERM: u32 = 1000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum Sign {
    #[default]
    Plus,
    Minus,
}

impl Sign {
    /// `None` if negating `value` overflows.
    pub fn apply(self, value: i32) -> Option<i32> {
        match self {
            Sign::Plus => Some(value),
            Sign::Minus => value.checked_neg(),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Sign::Plus => '+',
            Sign::Minus => '-',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum Keep {
    Highest(u32),
    Lowest(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct DiceTerm {
    pub count: u32,
    pub sides: u32,
    pub keep: Option<Keep>,
}

impl DiceTerm {
    pub fn new(count: u32, sides: u32) -> Self {
        Self {
            count,
            sides,
            keep: None,
        }
    }

    pub fn keep(mut self, keep: Keep) -> Self {
        self.keep = Some(keep);
        self
    }

    pub fn pretty_print(&self, f: &mut impl std::fmt::Write) -> std::fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.keep {
            None => {}
            Some(Keep::Highest(1)) => write!(f, "kh")?,
            Some(Keep::Lowest(1)) => write!(f, "kl")?,
            Some(Keep::Highest(n)) => write!(f, "kh{}", n)?,
            Some(Keep::Lowest(n)) => write!(f, "kl{}", n)?,
        }
        Ok(())
    }

    /// Rolls every die and marks the ones dropped by the keep modifier as inactive.
    pub fn roll(&self, roller: &mut Roller) -> Result<Vec<DieResult>, DiceError> {
        if self.sides == 0 {
            return Err(DiceError::InvalidDie(self.sides));
        }
        if self.count > MAX_DICE_PER_TERM {
            return Err(DiceError::TooManyDice {
                count: self.count,
                limit: MAX_DICE_PER_TERM,
            });
        }

        let mut results = Vec::with_capacity(self.count as usize);
        for _ in 0..self.count {
            results.push(DieResult {
                result: roller.roll_die(self.sides)?,
                active: true,
            });
        }

        if let Some(keep) = self.keep {
            let mut order: Vec<usize> = (0..results.len()).collect();
            let kept = match keep {
                Keep::Highest(n) => {
                    order.sort_by(|a, b| results[*b].result.cmp(&results[*a].result));
                    n
                }
                Keep::Lowest(n) => {
                    order.sort_by(|a, b| results[*a].result.cmp(&results[*b].result));
                    n
                }
            };
            for idx in order.into_iter().skip(kept as usize) {
                results[idx].active = false;
            }
        }

        Ok(results)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum TermKind {
    Dice(DiceTerm),
    Flat(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct FormulaTerm {
    pub sign: Sign,
    pub kind: TermKind,
    pub label: Option<String>,
}

impl FormulaTerm {
    /// The term as written, without its sign.
    pub fn formula(&self) -> String {
        let mut buf = String::new();
        match &self.kind {
            TermKind::Dice(dice) => {
                dice.pretty_print(&mut buf).ok();
            }
            TermKind::Flat(value) => buf.push_str(&value.to_string()),
        }
        if let Some(label) = &self.label {
            buf.push('[');
            buf.push_str(label);
            buf.push(']');
        }
        buf
    }

    pub fn is_dice(&self) -> bool {
        matches!(self.kind, TermKind::Dice(_))
    }
}

/// A parsed dice expression: a signed sum of dice and flat terms.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct RollFormula {
    pub terms: Vec<FormulaTerm>,
}

impl RollFormula {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn dice_terms(&self) -> impl Iterator<Item = &FormulaTerm> {
        self.terms.iter().filter(|t| t.is_dice())
    }

    pub fn roll(&self, roller: &mut Roller) -> Result<RollResult, DiceError> {
        let overflow = || DiceError::Overflow(self.to_string());
        let mut total: i32 = 0;
        let mut terms = Vec::with_capacity(self.terms.len());

        for term in &self.terms {
            let rolled = match &term.kind {
                TermKind::Dice(dice) => {
                    let results = dice.roll(roller)?;
                    let mut sum: i32 = 0;
                    for die in results.iter().filter(|r| r.active) {
                        let value = i32::try_from(die.result).map_err(|_| overflow())?;
                        sum = sum.checked_add(value).ok_or_else(overflow)?;
                    }
                    total = total
                        .checked_add(term.sign.apply(sum).ok_or_else(overflow)?)
                        .ok_or_else(overflow)?;
                    RolledTerm::Dice(DiceGroup {
                        sign: term.sign,
                        term: *dice,
                        label: term.label.clone(),
                        results,
                    })
                }
                TermKind::Flat(value) => {
                    total = total
                        .checked_add(term.sign.apply(*value).ok_or_else(overflow)?)
                        .ok_or_else(overflow)?;
                    RolledTerm::Flat {
                        sign: term.sign,
                        value: *value,
                        label: term.label.clone(),
                    }
                }
            };
            terms.push(rolled);
        }

        Ok(RollResult {
            formula: self.to_string(),
            total,
            terms,
        })
    }
}

impl std::fmt::Display for RollFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 || term.sign == Sign::Minus {
                write!(f, "{}", term.sign.symbol())?;
            }
            write!(f, "{}", term.formula())?;
        }
        Ok(())
    }
}

impl TryFrom<&str> for RollFormula {
    type Error = DiceError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        crate::roll_parser::parse_formula(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieResult {
    pub result: u32,
    /// False when the die was dropped by a keep modifier.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceGroup {
    pub sign: Sign,
    pub term: DiceTerm,
    pub label: Option<String>,
    pub results: Vec<DieResult>,
}

impl DiceGroup {
    /// The original formula of this group, e.g. `2d20kh` or `1d6[Piercer Crit]`.
    pub fn formula(&self) -> String {
        FormulaTerm {
            sign: self.sign,
            kind: TermKind::Dice(self.term),
            label: self.label.clone(),
        }
        .formula()
    }

    pub fn active_results(&self) -> impl Iterator<Item = u32> + '_ {
        self.results.iter().filter(|r| r.active).map(|r| r.result)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RolledTerm {
    Dice(DiceGroup),
    Flat {
        sign: Sign,
        value: i32,
        label: Option<String>,
    },
}

/// An evaluated dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub formula: String,
    pub total: i32,
    pub terms: Vec<RolledTerm>,
}

impl RollResult {
    pub fn dice(&self) -> impl Iterator<Item = &DiceGroup> {
        self.terms.iter().filter_map(|t| match t {
            RolledTerm::Dice(group) => Some(group),
            RolledTerm::Flat { .. } => None,
        })
    }

    /// True if any kept die shows `threshold` or more. Dropped dice never count.
    pub fn any_active_at_least(&self, threshold: u32) -> bool {
        self.dice()
            .any(|group| group.active_results().any(|r| r >= threshold))
    }

    pub fn pretty_print(&self, f: &mut impl std::fmt::Write) -> std::fmt::Result {
        write!(f, "{}", self.formula)?;
        let mut first = true;
        for group in self.dice() {
            f.write_str(if first { " (" } else { " " })?;
            first = false;
            write!(f, "{}: [", group.formula())?;
            for (i, die) in group.results.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                if die.active {
                    write!(f, "{}", die.result)?;
                } else {
                    write!(f, "~{}", die.result)?;
                }
            }
            write!(f, "]")?;
        }
        if !first {
            write!(f, ")")?;
        }
        write!(f, " = {}", self.total)
    }
}
