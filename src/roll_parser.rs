use crate::{
    error::DiceError,
    rules::dice::{DiceTerm, FormulaTerm, Keep, RollFormula, Sign, TermKind},
};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{char, digit1, one_of, space0},
    combinator::{all_consuming, map, map_res, opt, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
};

/// Parses a dice expression such as `2d20kh+5-5[GWM]`.
///
/// Blank input parses to the empty formula.
pub fn parse_formula(input: &str) -> Result<RollFormula, DiceError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(RollFormula::default());
    }

    match all_consuming(formula).parse(trimmed) {
        Ok((_, formula)) => Ok(formula),
        Err(_) => Err(DiceError::Parse(input.to_string())),
    }
}

fn formula(input: &str) -> IResult<&str, RollFormula> {
    let (input, (first_sign, (first_kind, first_label))) =
        pair(opt(sign), preceded(space0, term)).parse(input)?;
    let (input, rest) =
        many0(preceded(space0, pair(sign, preceded(space0, term)))).parse(input)?;

    let mut terms = vec![FormulaTerm {
        sign: first_sign.unwrap_or_default(),
        kind: first_kind,
        label: first_label,
    }];
    terms.extend(rest.into_iter().map(|(sign, (kind, label))| FormulaTerm {
        sign,
        kind,
        label,
    }));

    Ok((input, RollFormula { terms }))
}

fn sign(input: &str) -> IResult<&str, Sign> {
    alt((value(Sign::Plus, char('+')), value(Sign::Minus, char('-')))).parse(input)
}

fn term(input: &str) -> IResult<&str, (TermKind, Option<String>)> {
    pair(
        alt((map(dice, TermKind::Dice), map(flat, TermKind::Flat))),
        opt(preceded(space0, label)),
    )
    .parse(input)
}

fn dice(input: &str) -> IResult<&str, DiceTerm> {
    let (input, (count, _, sides, keep)) =
        (opt(unsigned), one_of("dD"), unsigned, opt(keep)).parse(input)?;

    Ok((
        input,
        DiceTerm {
            count: count.unwrap_or(1),
            sides,
            keep,
        },
    ))
}

fn keep(input: &str) -> IResult<&str, Keep> {
    alt((
        map(preceded(tag("kh"), opt(unsigned)), |n| {
            Keep::Highest(n.unwrap_or(1))
        }),
        map(preceded(tag("kl"), opt(unsigned)), |n| {
            Keep::Lowest(n.unwrap_or(1))
        }),
        map(preceded(char('k'), opt(unsigned)), |n| {
            Keep::Highest(n.unwrap_or(1))
        }),
    ))
    .parse(input)
}

fn label(input: &str) -> IResult<&str, String> {
    map(delimited(char('['), is_not("]"), char(']')), |s: &str| {
        s.to_string()
    })
    .parse(input)
}

fn unsigned(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |s: &str| s.parse::<u32>()).parse(input)
}

fn flat(input: &str) -> IResult<&str, i32> {
    map_res(digit1, |s: &str| s.parse::<i32>()).parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dice_term(sign: Sign, count: u32, sides: u32) -> FormulaTerm {
        FormulaTerm {
            sign,
            kind: TermKind::Dice(DiceTerm::new(count, sides)),
            label: None,
        }
    }

    #[test]
    fn test_parse_simple() {
        let formula = parse_formula("1d8+3").unwrap();
        assert_eq!(
            formula.terms,
            vec![
                dice_term(Sign::Plus, 1, 8),
                FormulaTerm {
                    sign: Sign::Plus,
                    kind: TermKind::Flat(3),
                    label: None,
                },
            ]
        );
        assert_eq!(formula.to_string(), "1d8+3");
    }

    #[test]
    fn test_parse_keep_and_labels() {
        let formula = parse_formula("2d20kh+5-5[GWM]").unwrap();
        assert_eq!(
            formula.terms[0].kind,
            TermKind::Dice(DiceTerm::new(2, 20).keep(Keep::Highest(1)))
        );
        assert_eq!(formula.terms[2].sign, Sign::Minus);
        assert_eq!(formula.terms[2].label.as_deref(), Some("GWM"));
        assert_eq!(formula.to_string(), "2d20kh+5-5[GWM]");
    }

    #[test]
    fn test_parse_leading_sign_fragment() {
        let formula = parse_formula("+1d6[Piercer Crit]").unwrap();
        assert_eq!(formula.terms.len(), 1);
        assert_eq!(formula.terms[0].formula(), "1d6[Piercer Crit]");
    }

    #[test]
    fn test_parse_whitespace_and_implicit_count() {
        let formula = parse_formula(" d20 + 4d6kl3 - 2 ").unwrap();
        assert_eq!(formula.terms[0].kind, TermKind::Dice(DiceTerm::new(1, 20)));
        assert_eq!(
            formula.terms[1].kind,
            TermKind::Dice(DiceTerm::new(4, 6).keep(Keep::Lowest(3)))
        );
        assert_eq!(formula.terms[2].sign, Sign::Minus);
    }

    #[test]
    fn test_parse_blank_is_empty() {
        assert!(parse_formula("").unwrap().is_empty());
        assert!(parse_formula("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_formula("1d").is_err());
        assert!(parse_formula("+").is_err());
        assert!(parse_formula("1d8+").is_err());
        assert!(parse_formula("fireball").is_err());
        assert!(parse_formula("1d8[unclosed").is_err());
    }
}
