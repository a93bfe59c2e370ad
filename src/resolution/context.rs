use rustc_hash::FxHashSet;

use crate::{
    error::ResolveError,
    resolution::{binder, form::AttackForm, form::Submission},
    rules::{
        attack::Attack,
        bonus::{AuxiliaryRoll, Bonus, BonusId, for_each_bonus_mut},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptState {
    Idle,
    AwaitingInput,
    Bound,
    Resolved,
    Cancelled,
}

/// Per-attempt working state. Owns a private copy of the attack so binding can
/// rewrite bonuses without touching the template.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub attack: Attack,
    pub advantage: bool,
    pub disadvantage: bool,
    pub to_hit_bonus_custom: Option<String>,
    pub damage_bonus_custom: Option<String>,
    /// Enabled bonuses in flatten order, filled by the binder.
    pub applied_bonuses: Vec<Bonus>,
    pub other_rolls: Vec<AuxiliaryRoll>,
    pub(crate) state: AttemptState,
    pub(crate) presented: FxHashSet<BonusId>,
    next_id: u32,
}

impl ResolutionContext {
    pub fn new(attack: &Attack) -> Self {
        Self {
            attack: attack.clone(),
            advantage: false,
            disadvantage: false,
            to_hit_bonus_custom: None,
            damage_bonus_custom: None,
            applied_bonuses: Vec::new(),
            other_rolls: Vec::new(),
            state: AttemptState::Idle,
            presented: FxHashSet::default(),
            next_id: 0,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Assigns fresh bonus identifiers and builds the form for the presenter.
    pub fn present(&mut self) -> Result<AttackForm, ResolveError> {
        self.expect_state(AttemptState::Idle, "present")?;

        let next_id = &mut self.next_id;
        for_each_bonus_mut(&mut self.attack.bonuses, &mut |bonus: &mut Bonus| {
            *next_id += 1;
            bonus.id = Some(BonusId(*next_id));
        });

        let form = AttackForm::build(&self.attack);
        self.presented = form.controls.iter().map(|control| control.id).collect();
        self.state = AttemptState::AwaitingInput;
        log::debug!(
            "presenting {} with {} controls",
            self.attack.title,
            form.controls.len()
        );
        Ok(form)
    }

    /// Applies the presenter's answer. Returns false if the attempt was cancelled.
    pub fn bind(&mut self, submission: Submission) -> Result<bool, ResolveError> {
        binder::bind(self, submission)
    }

    pub fn was_presented(&self, id: BonusId) -> bool {
        self.presented.contains(&id)
    }

    pub(crate) fn expect_state(
        &self,
        expected: AttemptState,
        action: &'static str,
    ) -> Result<(), ResolveError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ResolveError::InvalidState {
                action,
                state: self.state,
            })
        }
    }
}
