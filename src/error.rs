use thiserror::Error;

use crate::resolution::context::AttemptState;

/// Errors raised while parsing or rolling a single dice formula.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("failed to parse dice expression `{0}`")]
    Parse(String),
    #[error("invalid die size d{0}")]
    InvalidDie(u32),
    #[error("too many dice in one term ({count}, limit {limit})")]
    TooManyDice { count: u32, limit: u32 },
    #[error("total of `{0}` does not fit in 32 bits")]
    Overflow(String),
    #[error("dice roller is unavailable")]
    RollerUnavailable,
}

/// Malformed attack or bonus definitions, reported when the attack is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("attack `{0}` has no base damage expression")]
    MissingDamageBase(String),
    #[error("attack has no title")]
    MissingTitle,
    #[error("invalid {field} expression `{expression}` on `{owner}`")]
    InvalidExpression {
        owner: String,
        field: &'static str,
        expression: String,
        #[source]
        source: DiceError,
    },
    #[error("unknown bonus preset `{0}`")]
    UnknownPreset(String),
    #[error("unknown value predicate `{0}`")]
    UnknownPredicate(String),
    #[error("radio bonus `{0}` has no exclusion group")]
    MissingRadioGroup(String),
    #[error("group `{0}` cannot carry its own modifiers")]
    GroupModifiers(String),
    #[error("failed to read attack configuration")]
    Io(#[from] std::io::Error),
    #[error("failed to parse attack configuration")]
    Json(#[from] serde_json::Error),
}

/// The roll being evaluated when a resolution attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RollStage {
    #[display("to-hit")]
    ToHit,
    #[display("damage")]
    Damage,
    #[display("crit")]
    Crit,
    #[display("auxiliary")]
    Auxiliary,
}

/// Failures of a single resolution attempt. None of these leave a partial result behind.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to evaluate {stage} expression `{expression}`")]
    Evaluation {
        stage: RollStage,
        expression: String,
        #[source]
        source: DiceError,
    },
    #[error("cannot {action} while the attempt is {state:?}")]
    InvalidState {
        action: &'static str,
        state: AttemptState,
    },
    #[error("presenter failed")]
    Presenter(#[source] anyhow::Error),
    #[error("report delivery failed")]
    Transport(#[source] anyhow::Error),
}

impl ResolveError {
    pub fn evaluation(stage: RollStage, expression: &str, source: DiceError) -> Self {
        Self::Evaluation {
            stage,
            expression: expression.to_string(),
            source,
        }
    }
}
