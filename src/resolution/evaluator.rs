use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    error::DiceError,
    roll_parser::parse_formula,
    rules::dice::{RollFormula, RollResult},
    statistics::roller::Roller,
};

/// Parses and rolls dice expressions for the resolver.
#[async_trait]
pub trait DiceEvaluator: Send + Sync {
    fn parse(&self, expression: &str) -> Result<RollFormula, DiceError> {
        parse_formula(expression)
    }

    async fn evaluate(&self, expression: &str) -> Result<RollResult, DiceError>;
}

/// Rolls locally with a [`Roller`].
#[derive(Debug)]
pub struct RollerEvaluator {
    roller: Mutex<Roller>,
}

impl RollerEvaluator {
    pub fn new(roller: Roller) -> Self {
        Self {
            roller: Mutex::new(roller),
        }
    }
}

impl Default for RollerEvaluator {
    fn default() -> Self {
        Self::new(Roller::new())
    }
}

#[async_trait]
impl DiceEvaluator for RollerEvaluator {
    async fn evaluate(&self, expression: &str) -> Result<RollResult, DiceError> {
        let formula = self.parse(expression)?;
        let result = {
            let mut roller = self
                .roller
                .lock()
                .map_err(|_| DiceError::RollerUnavailable)?;
            formula.roll(&mut roller)?
        };
        log::debug!("rolled {} = {}", result.formula, result.total);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_evaluate_with_script() {
        let evaluator = RollerEvaluator::new(Roller::scripted([4, 6]));
        let result = evaluator.evaluate("2d6+1").await.unwrap();
        assert_eq!(result.total, 11);
        assert_eq!(result.formula, "2d6+1");
    }

    #[tokio::test]
    async fn test_evaluate_reports_parse_errors() {
        let evaluator = RollerEvaluator::default();
        assert!(matches!(
            evaluator.evaluate("1d8+").await,
            Err(DiceError::Parse(_))
        ));
    }
}
