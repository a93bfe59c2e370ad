use async_trait::async_trait;
use futures_util::future::try_join_all;

use crate::{
    error::{ResolveError, RollStage},
    resolution::{
        context::{AttemptState, ResolutionContext},
        evaluator::DiceEvaluator,
        expression::{crit_expression, damage_expression, dice_only, to_hit_expression},
        form::{AttackForm, Submission},
        report::{AttackOutcome, OtherRollOutcome},
    },
    rules::{attack::Attack, bonus::AuxiliaryRoll, dice::RollResult},
};

/// Shows the attack form to a user and returns their answer.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn present(&self, form: &AttackForm) -> anyhow::Result<Submission>;
}

/// Receives every resolved attack.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, outcome: &AttackOutcome) -> anyhow::Result<()>;
}

/// Writes reports through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn deliver(&self, outcome: &AttackOutcome) -> anyhow::Result<()> {
        let mut buf = String::new();
        outcome.pretty_print(&mut buf)?;
        for line in buf.lines() {
            log::info!("{}", line);
        }
        Ok(())
    }
}

/// Drives one attack from form to report.
pub struct AttackResolver<E> {
    evaluator: E,
}

impl<E: DiceEvaluator> AttackResolver<E> {
    pub fn new(evaluator: E) -> Self {
        Self { evaluator }
    }

    /// Presents, binds, resolves and delivers a single attempt.
    ///
    /// Returns `Ok(None)` if the user cancelled; nothing is delivered in that case.
    pub async fn run(
        &self,
        attack: &Attack,
        presenter: &dyn Presenter,
        sink: &dyn ReportSink,
    ) -> Result<Option<AttackOutcome>, ResolveError> {
        let mut ctx = ResolutionContext::new(attack);
        let form = ctx.present()?;
        let submission = presenter
            .present(&form)
            .await
            .map_err(ResolveError::Presenter)?;
        if !ctx.bind(submission)? {
            return Ok(None);
        }

        let outcome = self.resolve(&mut ctx).await?;
        sink.deliver(&outcome)
            .await
            .map_err(ResolveError::Transport)?;
        Ok(Some(outcome))
    }

    /// Rolls to-hit, damage, crit dice and auxiliary rolls, in that order.
    pub async fn resolve(&self, ctx: &mut ResolutionContext) -> Result<AttackOutcome, ResolveError> {
        ctx.expect_state(AttemptState::Bound, "resolve")?;

        let to_hit_expression = to_hit_expression(ctx);
        let damage_expression = damage_expression(ctx);
        let crit_expression = crit_expression(ctx, &self.evaluator)
            .map_err(|e| ResolveError::evaluation(RollStage::Crit, &damage_expression, e))?;
        log::debug!(
            "{}: to-hit `{}`, damage `{}`, crit `{}`",
            ctx.attack.title,
            to_hit_expression,
            damage_expression,
            crit_expression
        );

        let mut is_crit = false;
        let to_hit = if to_hit_expression.is_empty() {
            None
        } else {
            let roll = self.evaluate(RollStage::ToHit, &to_hit_expression).await?;
            is_crit = ctx.attack.can_crit && roll.any_active_at_least(ctx.attack.crit_threshold);
            Some(roll)
        };

        let damage = self.evaluate(RollStage::Damage, &damage_expression).await?;
        let crit = if is_crit {
            Some(self.evaluate(RollStage::Crit, &crit_expression).await?)
        } else {
            None
        };

        let other_rolls = try_join_all(
            ctx.other_rolls
                .iter()
                .map(|roll| self.evaluate_other_roll(roll, is_crit)),
        )
        .await?;

        ctx.state = AttemptState::Resolved;
        Ok(AttackOutcome {
            title: ctx.attack.title.clone(),
            to_hit,
            is_crit,
            damage,
            crit,
            other_rolls,
        })
    }

    async fn evaluate_other_roll(
        &self,
        other: &AuxiliaryRoll,
        is_crit: bool,
    ) -> Result<OtherRollOutcome, ResolveError> {
        let roll = self.evaluate(RollStage::Auxiliary, &other.roll).await?;
        let crit_roll = if is_crit && other.can_crit {
            let dice = dice_only(&roll);
            if dice.is_empty() {
                None
            } else {
                Some(self.evaluate(RollStage::Auxiliary, &dice).await?)
            }
        } else {
            None
        };
        Ok(OtherRollOutcome {
            description: other.description.clone(),
            roll,
            crit_roll,
        })
    }

    async fn evaluate(&self, stage: RollStage, expression: &str) -> Result<RollResult, ResolveError> {
        self.evaluator
            .evaluate(expression)
            .await
            .map_err(|e| ResolveError::evaluation(stage, expression, e))
    }
}
