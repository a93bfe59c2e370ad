use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use critforge::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Attack JSON file path
    #[arg(short, long, value_name = "FILE")]
    attack: Option<PathBuf>,

    /// Use a demo attack instead of loading from file
    #[arg(long, default_value_t = false, conflicts_with = "attack")]
    demo: bool,

    /// Print the attack form and exit
    #[arg(long, default_value_t = false)]
    list: bool,

    /// Enable a checkbox bonus by description
    #[arg(long, value_name = "DESCRIPTION")]
    check: Vec<String>,

    /// Disable a checkbox bonus that is on by default
    #[arg(long, value_name = "DESCRIPTION")]
    uncheck: Vec<String>,

    /// Select a radio bonus, clearing the rest of its group
    #[arg(long, value_name = "DESCRIPTION")]
    radio: Vec<String>,

    /// Enter a value for a number bonus
    #[arg(long, value_name = "DESCRIPTION=VALUE")]
    number: Vec<String>,

    /// Custom to-hit modifier
    #[arg(long, value_name = "MODIFIER", allow_hyphen_values = true)]
    to_hit: Option<String>,

    /// Custom damage modifier
    #[arg(long, value_name = "MODIFIER", allow_hyphen_values = true)]
    damage: Option<String>,

    #[arg(long, default_value_t = false, conflicts_with = "disadvantage")]
    advantage: bool,

    #[arg(long, default_value_t = false)]
    disadvantage: bool,

    /// Decline the attack form
    #[arg(long, default_value_t = false)]
    cancel: bool,

    /// Random seed for reproducibility
    #[arg(long, default_value = None)]
    seed: Option<u64>,

    /// Print the outcome as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log every expression and roll
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn confirmation(&self) -> Confirmation {
        if self.cancel {
            Confirmation::Cancelled
        } else if self.advantage {
            Confirmation::Advantage
        } else if self.disadvantage {
            Confirmation::Disadvantage
        } else {
            Confirmation::Normal
        }
    }
}

/// Answers the attack form from command-line flags.
/// Controls that are not mentioned keep their defaults.
struct FlagPresenter<'a> {
    args: &'a Args,
}

impl<'a> FlagPresenter<'a> {
    fn control<'f>(form: &'f AttackForm, description: &str) -> anyhow::Result<&'f FormControl> {
        form.find(description)
            .with_context(|| format!("no bonus named `{}` on {}", description, form.title))
    }
}

#[async_trait]
impl<'a> Presenter for FlagPresenter<'a> {
    async fn present(&self, form: &AttackForm) -> anyhow::Result<Submission> {
        let confirmation = self.args.confirmation();
        if confirmation == Confirmation::Cancelled {
            return Ok(Submission::cancelled());
        }

        let mut submission = form.defaults(confirmation);
        for description in &self.args.check {
            submission = submission.checked(Self::control(form, description)?.id, true);
        }
        for description in &self.args.uncheck {
            submission = submission.checked(Self::control(form, description)?.id, false);
        }
        for description in &self.args.radio {
            let selected = Self::control(form, description)?;
            let ControlKind::Radio { group, .. } = &selected.kind else {
                anyhow::bail!("`{}` is not a radio bonus", description);
            };
            for control in &form.controls {
                if matches!(&control.kind, ControlKind::Radio { group: g, .. } if g == group) {
                    submission = submission.checked(control.id, control.id == selected.id);
                }
            }
        }
        for entry in &self.args.number {
            let (description, value) = entry
                .split_once('=')
                .with_context(|| format!("expected DESCRIPTION=VALUE, got `{}`", entry))?;
            submission = submission.number(Self::control(form, description)?.id, value);
        }
        if let Some(to_hit) = &self.args.to_hit {
            submission = submission.to_hit_custom(to_hit);
        }
        if let Some(damage) = &self.args.damage {
            submission = submission.damage_custom(damage);
        }
        Ok(submission)
    }
}

struct StdoutSink {
    json: bool,
}

#[async_trait]
impl ReportSink for StdoutSink {
    async fn deliver(&self, outcome: &AttackOutcome) -> anyhow::Result<()> {
        if self.json {
            println!("{}", outcome.to_json()?);
        } else {
            let mut buf = String::new();
            outcome.pretty_print(&mut buf)?;
            println!("{}", buf);
        }
        Ok(())
    }
}

fn catalog() -> BonusCatalog {
    let mut catalog = BonusCatalog::standard();
    catalog.register_predicate(ValuePredicate::scaled_dice(
        "sneak_attack",
        6,
        "Sneak Attack",
    ));
    catalog
}

pub fn demo_attack(catalog: &BonusCatalog) -> Result<Attack, ConfigError> {
    let sneak_attack = catalog
        .predicate("sneak_attack")
        .cloned()
        .ok_or_else(|| ConfigError::UnknownPredicate("sneak_attack".to_string()))?;

    AttackBuilder::new("Rapier")
        .damage_base("1d8")
        .to_hit_bonus("+7")
        .damage_bonus("+4")
        .bonus(catalog.preset("piercer", BonusOverrides::default()).ok_or_else(|| {
            ConfigError::UnknownPreset("piercer".to_string())
        })?)
        .bonus(Bonus::number("Sneak Attack dice", sneak_attack))
        .bonus(
            BonusGroup::new("Spells")
                .child(Bonus::check("Bless").to_hit("+1d4[Bless]"))
                .child(Bonus::check("Hunter's Mark").damage("+1d6[Hunter's Mark]"))
                .child(
                    catalog
                        .preset("booming_blade", BonusOverrides::default())
                        .ok_or_else(|| ConfigError::UnknownPreset("booming_blade".to_string()))?,
                ),
        )
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::builder()
        .format_timestamp_secs()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();
    log::debug!("Starting with args: {:?}", args);

    let catalog = catalog();
    let attack = if args.demo {
        log::info!("Using demo attack");
        demo_attack(&catalog)?
    } else {
        let path = args
            .attack
            .as_ref()
            .context("either --attack <FILE> or --demo is required")?;
        log::info!("Loading attack from {}", path.display());
        Attack::load(path, &catalog).with_context(|| format!("loading {}", path.display()))?
    };

    if args.list {
        let mut ctx = ResolutionContext::new(&attack);
        let form = ctx.present()?;
        let mut buf = String::new();
        form.pretty_print(&mut buf)?;
        println!("{}", buf);
        return Ok(());
    }

    let roller = match args.seed {
        Some(seed) => Roller::from_seed(seed),
        None => Roller::new(),
    };
    let resolver = AttackResolver::new(RollerEvaluator::new(roller));
    let presenter = FlagPresenter { args: &args };
    let sink = StdoutSink { json: args.json };

    match resolver.run(&attack, &presenter, &sink).await? {
        Some(outcome) => log::debug!("{} resolved, crit: {}", outcome.title, outcome.is_crit),
        None => log::info!("Attack cancelled"),
    }

    Ok(())
}
