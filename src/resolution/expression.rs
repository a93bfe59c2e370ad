use crate::{
    error::DiceError,
    resolution::{context::ResolutionContext, evaluator::DiceEvaluator},
    rules::dice::{RollFormula, RollResult},
};

/// The to-hit expression, or an empty string if the attack does not roll to hit.
///
/// Advantage wins over disadvantage when both are set.
pub fn to_hit_expression(ctx: &ResolutionContext) -> String {
    if !ctx.attack.roll_to_hit {
        return String::new();
    }

    let mut expression = String::from(if ctx.advantage {
        if ctx.attack.super_advantage {
            "3d20kh"
        } else {
            "2d20kh"
        }
    } else if ctx.disadvantage {
        "2d20kl"
    } else {
        "1d20"
    });
    expression.push_str(&ctx.attack.to_hit_bonus);
    for bonus in &ctx.applied_bonuses {
        if let Some(modifier) = &bonus.to_hit_bonus {
            expression.push_str(modifier);
        }
    }
    if let Some(custom) = &ctx.to_hit_bonus_custom {
        expression.push_str(custom);
    }
    expression
}

pub fn damage_expression(ctx: &ResolutionContext) -> String {
    let mut expression = ctx.attack.damage_base.clone();
    expression.push_str(&ctx.attack.damage_bonus);
    for bonus in &ctx.applied_bonuses {
        if let Some(modifier) = &bonus.damage_bonus {
            expression.push_str(modifier);
        }
    }
    if let Some(custom) = &ctx.damage_bonus_custom {
        expression.push_str(custom);
    }
    expression
}

/// The dice a critical hit adds: base and custom damage dice, then each applied
/// bonus's crit override or, failing that, its damage dice. Flat terms never crit.
pub fn crit_expression(
    ctx: &ResolutionContext,
    evaluator: &dyn DiceEvaluator,
) -> Result<String, DiceError> {
    let mut expression = String::new();
    push_dice_terms(&mut expression, &evaluator.parse(&base_damage(ctx))?);

    for bonus in &ctx.applied_bonuses {
        if let Some(crit_override) = &bonus.crit_bonus_override {
            expression.push_str(crit_override);
        } else if let Some(damage) = &bonus.damage_bonus {
            push_dice_terms(&mut expression, &evaluator.parse(damage)?);
        }
    }
    Ok(expression)
}

/// The dice of an evaluated roll as a new expression, e.g. `3+2d8` gives `2d8`.
pub fn dice_only(roll: &RollResult) -> String {
    roll.dice()
        .map(|group| group.formula())
        .collect::<Vec<_>>()
        .join("+")
}

fn base_damage(ctx: &ResolutionContext) -> String {
    let mut expression = ctx.attack.damage_base.clone();
    expression.push_str(&ctx.attack.damage_bonus);
    if let Some(custom) = &ctx.damage_bonus_custom {
        expression.push_str(custom);
    }
    expression
}

fn push_dice_terms(expression: &mut String, formula: &RollFormula) {
    for term in formula.dice_terms() {
        expression.push('+');
        expression.push_str(&term.formula());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        resolution::{
            evaluator::RollerEvaluator,
            form::{Confirmation, Submission},
        },
        rules::{
            attack::{Attack, AttackBuilder},
            bonus::Bonus,
            presets::{BonusOverrides, booming_blade, great_weapon_master, piercer},
        },
        statistics::roller::Roller,
    };

    fn rapier() -> AttackBuilder {
        AttackBuilder::new("Rapier")
            .damage_base("1d8")
            .to_hit_bonus("+5")
            .damage_bonus("+3")
    }

    /// Presents the attack and enables every visible bonus.
    fn bound(attack: &Attack, submission: Submission) -> ResolutionContext {
        let mut ctx = ResolutionContext::new(attack);
        let form = ctx.present().unwrap();
        let mut full = submission;
        for control in &form.controls {
            full = full.checked(control.id, true);
        }
        ctx.bind(full).unwrap();
        ctx
    }

    #[test]
    fn test_plain_attack() {
        let attack = rapier().build().unwrap();
        let ctx = bound(&attack, Submission::confirmed(Confirmation::Normal));
        assert_eq!(to_hit_expression(&ctx), "1d20+5");
        assert_eq!(damage_expression(&ctx), "1d8+3");
    }

    #[test]
    fn test_advantage_variants() {
        let attack = rapier().build().unwrap();
        let ctx = bound(&attack, Submission::confirmed(Confirmation::Advantage));
        assert_eq!(to_hit_expression(&ctx), "2d20kh+5");
        let ctx = bound(&attack, Submission::confirmed(Confirmation::Disadvantage));
        assert_eq!(to_hit_expression(&ctx), "2d20kl+5");

        let elven = rapier().super_advantage(true).build().unwrap();
        let ctx = bound(&elven, Submission::confirmed(Confirmation::Advantage));
        assert_eq!(to_hit_expression(&ctx), "3d20kh+5");
        let ctx = bound(&elven, Submission::confirmed(Confirmation::Normal));
        assert_eq!(to_hit_expression(&ctx), "1d20+5");
    }

    #[test]
    fn test_advantage_beats_disadvantage() {
        let attack = rapier().build().unwrap();
        let mut ctx = bound(&attack, Submission::confirmed(Confirmation::Advantage));
        ctx.disadvantage = true;
        assert_eq!(to_hit_expression(&ctx), "2d20kh+5");
    }

    #[test]
    fn test_no_to_hit_roll() {
        let attack = rapier().roll_to_hit(false).build().unwrap();
        let ctx = bound(&attack, Submission::confirmed(Confirmation::Advantage));
        assert_eq!(to_hit_expression(&ctx), "");
    }

    #[test]
    fn test_bonuses_and_custom_modifiers_in_order() {
        let attack = rapier()
            .bonus(great_weapon_master(BonusOverrides::default()))
            .bonus(Bonus::check("Bless").to_hit("+1d4[Bless]"))
            .build()
            .unwrap();
        let ctx = bound(
            &attack,
            Submission::confirmed(Confirmation::Normal)
                .to_hit_custom("1")
                .damage_custom("+1d4"),
        );
        assert_eq!(to_hit_expression(&ctx), "1d20+5-5[GWM]+1d4[Bless]+1");
        assert_eq!(damage_expression(&ctx), "1d8+3+10[GWM]+1d4");
    }

    #[test]
    fn test_crit_drops_flat_terms() {
        let attack = rapier()
            .bonus(great_weapon_master(BonusOverrides::default()))
            .build()
            .unwrap();
        let ctx = bound(
            &attack,
            Submission::confirmed(Confirmation::Normal).damage_custom("2+1d4"),
        );
        let evaluator = RollerEvaluator::new(Roller::test_rng());
        assert_eq!(crit_expression(&ctx, &evaluator).unwrap(), "+1d8+1d4");
    }

    #[test]
    fn test_crit_override_replaces_bonus_dice() {
        let attack = rapier()
            .bonus(piercer(BonusOverrides::default()))
            .bonus(Bonus::check("Hex").damage("+1d6[Hex]"))
            .bonus(booming_blade(BonusOverrides::default()))
            .build()
            .unwrap();
        let ctx = bound(&attack, Submission::confirmed(Confirmation::Normal));
        assert_eq!(damage_expression(&ctx), "1d8+3+1d6[Hex]+2d8[Booming Blade]");
        let evaluator = RollerEvaluator::new(Roller::test_rng());
        assert_eq!(
            crit_expression(&ctx, &evaluator).unwrap(),
            "+1d8+1d6[Piercer Crit]+1d6[Hex]+2d8[Booming Blade]"
        );
    }

    #[test]
    fn test_bonus_can_crit_flag_does_not_filter_dice() {
        let attack = AttackBuilder::new("Rapier")
            .damage_base("1d8")
            .bonus(
                Bonus::check("Hex")
                    .damage("+1d6[Hex]")
                    .can_crit(false)
                    .enabled(true)
                    .hidden(true),
            )
            .build()
            .unwrap();
        let ctx = bound(&attack, Submission::confirmed(Confirmation::Normal));
        let evaluator = RollerEvaluator::new(Roller::test_rng());
        assert_eq!(crit_expression(&ctx, &evaluator).unwrap(), "+1d8+1d6[Hex]");
    }

    #[test]
    fn test_dice_only() {
        let mut roller = Roller::scripted([3, 5]);
        let roll = RollFormula::try_from("3+2d8").unwrap().roll(&mut roller).unwrap();
        assert_eq!(dice_only(&roll), "2d8");

        let roll = RollFormula::try_from("1d6[Fire]+1d4-2")
            .unwrap()
            .roll(&mut roller)
            .unwrap();
        assert_eq!(dice_only(&roll), "1d6[Fire]+1d4");
    }
}
