use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    error::ResolveError,
    resolution::{
        context::{AttemptState, ResolutionContext},
        form::{Confirmation, InputValue, Submission},
    },
    rules::bonus::{BonusId, InputKind, find_bonus_mut, flatten, fragment},
};

/// Binds the presenter's submission onto the attempt.
///
/// Returns `Ok(false)` and moves to `Cancelled` when the user declined; otherwise
/// fills the applied bonuses and auxiliary rolls in flatten order.
pub fn bind(ctx: &mut ResolutionContext, submission: Submission) -> Result<bool, ResolveError> {
    ctx.expect_state(AttemptState::AwaitingInput, "bind")?;

    match submission.confirmation {
        Confirmation::Cancelled => {
            log::debug!("{} cancelled", ctx.attack.title);
            ctx.state = AttemptState::Cancelled;
            return Ok(false);
        }
        Confirmation::Advantage => ctx.advantage = true,
        Confirmation::Disadvantage => ctx.disadvantage = true,
        Confirmation::Normal => {}
    }

    let ids: Vec<BonusId> = flatten(&ctx.attack.bonuses)
        .iter()
        .filter_map(|bonus| bonus.id)
        .collect();
    for id in ids {
        bind_bonus(ctx, id, &submission.values);
    }

    let mut radio_groups = FxHashSet::default();
    for bonus in flatten(&ctx.attack.bonuses) {
        if !bonus.enabled {
            continue;
        }
        if let InputKind::Radio { group } = &bonus.input {
            if !radio_groups.insert(group.as_str()) {
                log::warn!(
                    "more than one bonus enabled in radio group {}, applying {} as well",
                    group,
                    bonus.description
                );
            }
        }
        ctx.other_rolls.extend(bonus.other_rolls.iter().cloned());
        ctx.applied_bonuses.push(bonus.without_children());
    }

    ctx.to_hit_bonus_custom = submission.to_hit_custom.as_deref().and_then(fragment);
    ctx.damage_bonus_custom = submission.damage_custom.as_deref().and_then(fragment);

    log::debug!(
        "{} bound with {} applied bonuses and {} auxiliary rolls",
        ctx.attack.title,
        ctx.applied_bonuses.len(),
        ctx.other_rolls.len()
    );
    ctx.state = AttemptState::Bound;
    Ok(true)
}

fn bind_bonus(ctx: &mut ResolutionContext, id: BonusId, values: &FxHashMap<BonusId, InputValue>) {
    // Hidden bonuses keep their configured state.
    if !ctx.was_presented(id) {
        return;
    }
    let Some(bonus) = find_bonus_mut(&mut ctx.attack.bonuses, id) else {
        return;
    };

    let (predicate, raw) = match (&bonus.input, values.get(&id)) {
        (InputKind::Number(predicate), Some(InputValue::Number(raw))) if !raw.trim().is_empty() => {
            (predicate.clone(), raw.trim())
        }
        (InputKind::Check | InputKind::Radio { .. }, Some(InputValue::Checked(checked))) => {
            bonus.enabled = *checked;
            return;
        }
        _ => {
            bonus.enabled = false;
            return;
        }
    };

    // The predicate works on a copy so the context keeps the whole tree meanwhile.
    let mut working = bonus.without_children();
    working.enabled = predicate.call(ctx, &mut working, raw);
    if let Some(bonus) = find_bonus_mut(&mut ctx.attack.bonuses, id) {
        working.children = std::mem::take(&mut bonus.children);
        *bonus = working;
    }
}
