use serde::Serialize;

use crate::rules::dice::RollResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtherRollOutcome {
    pub description: String,
    pub roll: RollResult,
    /// Dice-only companion rolled on a critical hit for crit-eligible rolls.
    pub crit_roll: Option<RollResult>,
}

impl OtherRollOutcome {
    pub fn total(&self) -> i32 {
        self.roll
            .total
            .saturating_add(self.crit_roll.as_ref().map_or(0, |r| r.total))
    }
}

/// Everything rolled for one resolved attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackOutcome {
    pub title: String,
    pub to_hit: Option<RollResult>,
    pub is_crit: bool,
    pub damage: RollResult,
    pub crit: Option<RollResult>,
    pub other_rolls: Vec<OtherRollOutcome>,
}

impl AttackOutcome {
    /// Damage plus crit dice, if any.
    pub fn damage_total(&self) -> i32 {
        self.damage
            .total
            .saturating_add(self.crit.as_ref().map_or(0, |r| r.total))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn pretty_print(&self, f: &mut impl std::fmt::Write) -> std::fmt::Result {
        writeln!(f, "{}", self.title)?;
        if let Some(to_hit) = &self.to_hit {
            write!(f, "  To hit: ")?;
            to_hit.pretty_print(f)?;
            if self.is_crit {
                write!(f, " CRIT!")?;
            }
            writeln!(f)?;
        }

        write!(f, "  Damage: ")?;
        self.damage.pretty_print(f)?;
        if let Some(crit) = &self.crit {
            write!(f, " + crit ")?;
            crit.pretty_print(f)?;
            write!(f, " = {}", self.damage_total())?;
        }

        for other in &self.other_rolls {
            writeln!(f)?;
            write!(f, "  {}: ", other.description)?;
            other.roll.pretty_print(f)?;
            if let Some(crit) = &other.crit_roll {
                write!(f, " + crit ")?;
                crit.pretty_print(f)?;
                write!(f, " = {}", other.total())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rules::dice::RollFormula, statistics::roller::Roller};

    fn roll(expression: &str, script: &[u32]) -> RollResult {
        RollFormula::try_from(expression)
            .unwrap()
            .roll(&mut Roller::scripted(script.iter().copied()))
            .unwrap()
    }

    fn crit_outcome() -> AttackOutcome {
        AttackOutcome {
            title: "Rapier".to_string(),
            to_hit: Some(roll("2d20kh+5", &[7, 20])),
            is_crit: true,
            damage: roll("1d8+3", &[6]),
            crit: Some(roll("+1d8", &[4])),
            other_rolls: vec![OtherRollOutcome {
                description: "GFB Proximity Damage".to_string(),
                roll: roll("3+2d8", &[1, 2]),
                crit_roll: Some(roll("2d8", &[8, 8])),
            }],
        }
    }

    #[test]
    fn test_totals() {
        let outcome = crit_outcome();
        assert_eq!(outcome.damage_total(), 13);
        assert_eq!(outcome.other_rolls[0].total(), 22);
    }

    #[test]
    fn test_pretty_print() {
        let mut buf = String::new();
        crit_outcome().pretty_print(&mut buf).unwrap();
        assert_eq!(
            buf,
            "Rapier\n\
             \x20 To hit: 2d20kh+5 (2d20kh: [~7, 20]) = 25 CRIT!\n\
             \x20 Damage: 1d8+3 (1d8: [6]) = 9 + crit 1d8 (1d8: [4]) = 4 = 13\n\
             \x20 GFB Proximity Damage: 3+2d8 (2d8: [1, 2]) = 6 + crit 2d8 (2d8: [8, 8]) = 16 = 22"
        );
    }

    #[test]
    fn test_json_has_totals() {
        let json = crit_outcome().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["is_crit"], true);
        assert_eq!(value["damage"]["total"], 9);
        assert_eq!(value["other_rolls"][0]["crit_roll"]["total"], 16);
    }
}
