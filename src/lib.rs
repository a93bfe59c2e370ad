pub mod error;
pub mod resolution;
pub mod roll_parser;
pub mod rules;
pub mod statistics;

pub mod prelude {
    pub use crate::{
        error::{ConfigError, DiceError, ResolveError, RollStage},
        resolution::{
            context::{AttemptState, ResolutionContext},
            evaluator::{DiceEvaluator, RollerEvaluator},
            form::{AttackForm, Confirmation, ControlKind, FormControl, InputValue, Submission},
            report::{AttackOutcome, OtherRollOutcome},
            resolver::{AttackResolver, LogSink, Presenter, ReportSink},
        },
        rules::{
            attack::{Attack, AttackBuilder, AttackConfig},
            bonus::{AuxiliaryRoll, Bonus, BonusGroup, BonusId, BonusNode, InputKind, ValuePredicate, flatten},
            dice::{RollFormula, RollResult},
            presets::{BonusCatalog, BonusOverrides},
        },
        statistics::roller::Roller,
    };
}
