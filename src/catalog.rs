use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::SimulationKind;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDefinition {
    pub level_id: u32,
    pub min_xp: u64,
    pub display_name: String,
    #[serde(default)]
    pub unlocked_features: Vec<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Condition under which a badge or achievement unlocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum UnlockRule {
    CompleteSimulation { simulation: SimulationKind },
    CompleteAll { simulations: Vec<SimulationKind> },
    TotalCompletions { count: u32 },
    DistinctSimulations { count: u32 },
    StreakAtLeast { days: u32 },
    LevelAtLeast { level: u32 },
    /// Any simulation with a best score of 100.
    PerfectScore,
    PerfectScoresOnDistinct { count: u32 },
    CompletionsInOneDay { count: u32 },
    CompletedBeforeHour { hour: u32 },
    CompletedFromHour { hour: u32 },
}

impl UnlockRule {
    pub fn required_level(&self) -> Option<u32> {
        match self {
            UnlockRule::LevelAtLeast { level } => Some(*level),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub rule: UnlockRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub hidden: bool,
    pub rule: UnlockRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakTier {
    pub min_days: u32,
    pub bonus_pct: u32,
}

/// Percentage bonuses added on top of a simulation's base XP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusRules {
    pub first_attempt_pct: u32,
    pub perfect_score_threshold: u8,
    pub perfect_score_pct: u32,
    /// Ascending by `min_days`; only the highest reached tier applies.
    pub streak_tiers: Vec<StreakTier>,
}

impl BonusRules {
    pub fn streak_bonus_pct(&self, streak_days: u32) -> u32 {
        self.streak_tiers
            .iter()
            .rev()
            .find(|tier| streak_days >= tier.min_days)
            .map_or(0, |tier| tier.bonus_pct)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetClass {
    pub id: String,
    pub name: String,
    pub mean_return: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDocument {
    levels: Vec<LevelDefinition>,
    badges: Vec<BadgeDefinition>,
    #[serde(default)]
    achievements: Vec<AchievementDefinition>,
    base_xp: BTreeMap<SimulationKind, u32>,
    bonuses: BonusRules,
    asset_classes: Vec<AssetClass>,
}

/// Levels, unlockables, XP table and market parameters. Always validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CatalogDocument")]
pub struct Catalog {
    levels: Vec<LevelDefinition>,
    badges: Vec<BadgeDefinition>,
    achievements: Vec<AchievementDefinition>,
    base_xp: BTreeMap<SimulationKind, u32>,
    bonuses: BonusRules,
    asset_classes: Vec<AssetClass>,
}

impl TryFrom<CatalogDocument> for Catalog {
    type Error = CatalogError;

    fn try_from(doc: CatalogDocument) -> Result<Self, Self::Error> {
        validate(&doc).map_err(CatalogError::Invalid)?;
        Ok(Catalog {
            levels: doc.levels,
            badges: doc.badges,
            achievements: doc.achievements,
            base_xp: doc.base_xp,
            bonuses: doc.bonuses,
            asset_classes: doc.asset_classes,
        })
    }
}

impl Catalog {
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        Catalog::try_from(doc)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Catalog::from_json_str(&json)
    }

    pub fn levels(&self) -> &[LevelDefinition] {
        &self.levels
    }

    pub fn badges(&self) -> &[BadgeDefinition] {
        &self.badges
    }

    pub fn achievements(&self) -> &[AchievementDefinition] {
        &self.achievements
    }

    pub fn bonuses(&self) -> &BonusRules {
        &self.bonuses
    }

    pub fn asset_classes(&self) -> &[AssetClass] {
        &self.asset_classes
    }

    pub fn base_xp(&self, simulation: SimulationKind) -> u32 {
        self.base_xp.get(&simulation).copied().unwrap_or(0)
    }

    /// Highest level whose threshold `xp` has reached.
    pub fn level_for(&self, xp: u64) -> &LevelDefinition {
        self.levels
            .iter()
            .rev()
            .find(|level| xp >= level.min_xp)
            .unwrap_or(&self.levels[0])
    }

    pub fn badge(&self, id: &str) -> Option<&BadgeDefinition> {
        self.badges.iter().find(|b| b.id == id)
    }

    pub fn achievement(&self, id: &str) -> Option<&AchievementDefinition> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn asset_class(&self, id: &str) -> Option<&AssetClass> {
        self.asset_classes.iter().find(|a| a.id == id)
    }

    pub fn standard() -> Self {
        Catalog {
            levels: standard_levels(),
            badges: standard_badges(),
            achievements: standard_achievements(),
            base_xp: SimulationKind::ALL
                .into_iter()
                .map(|kind| (kind, standard_base_xp(kind)))
                .collect(),
            bonuses: BonusRules {
                first_attempt_pct: 20,
                perfect_score_threshold: 95,
                perfect_score_pct: 50,
                streak_tiers: vec![
                    StreakTier { min_days: 3, bonus_pct: 10 },
                    StreakTier { min_days: 7, bonus_pct: 25 },
                    StreakTier { min_days: 30, bonus_pct: 100 },
                ],
            },
            asset_classes: standard_asset_classes(),
        }
    }
}

/// Upper bound for any single XP bonus percentage.
pub const MAX_BONUS_PCT: u32 = 1_000;

fn validate(doc: &CatalogDocument) -> Result<(), String> {
    let first = doc.levels.first().ok_or("no levels defined")?;
    if first.min_xp != 0 {
        return Err(format!("first level requires {} xp, expected 0", first.min_xp));
    }
    for pair in doc.levels.windows(2) {
        if pair[1].level_id <= pair[0].level_id || pair[1].min_xp <= pair[0].min_xp {
            return Err(format!(
                "level {} does not strictly follow level {}",
                pair[1].level_id, pair[0].level_id
            ));
        }
    }

    let level_ids: BTreeSet<u32> = doc.levels.iter().map(|l| l.level_id).collect();
    let rules = doc
        .badges
        .iter()
        .map(|b| (b.id.as_str(), &b.rule))
        .chain(doc.achievements.iter().map(|a| (a.id.as_str(), &a.rule)));
    for (id, rule) in rules {
        match rule {
            UnlockRule::LevelAtLeast { level } if !level_ids.contains(level) => {
                return Err(format!("{id} requires unknown level {level}"));
            }
            UnlockRule::CompletedBeforeHour { hour } | UnlockRule::CompletedFromHour { hour }
                if *hour > 23 =>
            {
                return Err(format!("{id} uses hour {hour}"));
            }
            UnlockRule::CompleteAll { simulations } if simulations.is_empty() => {
                return Err(format!("{id} requires an empty set of simulations"));
            }
            _ => {}
        }
    }

    unique("badge", doc.badges.iter().map(|b| b.id.as_str()))?;
    unique("achievement", doc.achievements.iter().map(|a| a.id.as_str()))?;

    if let Some(kind) = SimulationKind::ALL
        .into_iter()
        .find(|kind| !doc.base_xp.contains_key(kind))
    {
        return Err(format!("no base xp for {kind}"));
    }

    for pair in doc.bonuses.streak_tiers.windows(2) {
        if pair[1].min_days <= pair[0].min_days {
            return Err("streak tiers must ascend by min_days".to_string());
        }
    }
    if doc.bonuses.perfect_score_threshold > 100 {
        return Err("perfect score threshold above 100".to_string());
    }
    if let Some(pct) = [doc.bonuses.first_attempt_pct, doc.bonuses.perfect_score_pct]
        .into_iter()
        .chain(doc.bonuses.streak_tiers.iter().map(|tier| tier.bonus_pct))
        .find(|&pct| pct > MAX_BONUS_PCT)
    {
        return Err(format!("bonus of {pct}% exceeds {MAX_BONUS_PCT}%"));
    }

    if doc.asset_classes.is_empty() {
        return Err("no asset classes defined".to_string());
    }
    unique("asset class", doc.asset_classes.iter().map(|a| a.id.as_str()))?;
    for asset in &doc.asset_classes {
        if !asset.mean_return.is_finite() || !(-1.0..=1.0).contains(&asset.mean_return) {
            return Err(format!("asset class {} has mean return {}", asset.id, asset.mean_return));
        }
        if !asset.volatility.is_finite() || asset.volatility < 0.0 {
            return Err(format!("asset class {} has volatility {}", asset.id, asset.volatility));
        }
    }
    Ok(())
}

fn unique<'a>(what: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(format!("duplicate {what} id {id}"));
        }
    }
    Ok(())
}

fn standard_base_xp(kind: SimulationKind) -> u32 {
    match kind {
        SimulationKind::CoffeeShopEffect => 100,
        SimulationKind::PaycheckGame => 200,
        SimulationKind::BudgetBuilder => 300,
        SimulationKind::EmergencyFund => 300,
        SimulationKind::CarPayment => 250,
        SimulationKind::CreditCardTrap => 250,
        SimulationKind::CompoundInterest => 400,
        SimulationKind::MarketSimulator => 600,
    }
}

fn level(level_id: u32, min_xp: u64, display_name: &str, features: &[&str]) -> LevelDefinition {
    LevelDefinition {
        level_id,
        min_xp,
        display_name: display_name.to_string(),
        unlocked_features: features.iter().map(|f| f.to_string()).collect(),
    }
}

fn standard_levels() -> Vec<LevelDefinition> {
    vec![
        level(1, 0, "Financial Newbie", &["level_1_simulations", "progress_tracking"]),
        level(
            2,
            1_000,
            "Money Apprentice",
            &["level_2_simulations", "debt_analysis", "budget_templates"],
        ),
        level(
            3,
            3_000,
            "Budget Warrior",
            &["level_3_simulations", "investment_basics"],
        ),
        level(
            4,
            7_000,
            "Wealth Builder",
            &["level_4_simulations", "advanced_investing", "tax_optimization"],
        ),
        level(
            5,
            13_000,
            "Investment Guru",
            &["all_simulations", "monte_carlo_analysis", "portfolio_optimization"],
        ),
        level(6, 20_000, "Financial Master", &["master_badge", "mentor_status"]),
    ]
}

fn badge(id: &str, name: &str, description: &str, rarity: Rarity, rule: UnlockRule) -> BadgeDefinition {
    BadgeDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        rarity,
        rule,
    }
}

fn completes(simulation: SimulationKind) -> UnlockRule {
    UnlockRule::CompleteSimulation { simulation }
}

fn standard_badges() -> Vec<BadgeDefinition> {
    use Rarity::*;
    use SimulationKind::*;

    vec![
        badge(
            "first_steps",
            "First Steps",
            "Completed your first simulation",
            Common,
            UnlockRule::TotalCompletions { count: 1 },
        ),
        badge(
            "coffee_conscious",
            "Coffee Conscious",
            "Discovered the coffee shop effect",
            Common,
            completes(CoffeeShopEffect),
        ),
        badge(
            "paycheck_pro",
            "Paycheck Pro",
            "Mastered the paycheck game",
            Common,
            completes(PaycheckGame),
        ),
        badge(
            "budget_beginner",
            "Budget Beginner",
            "Created your first budget",
            Common,
            completes(BudgetBuilder),
        ),
        badge(
            "emergency_ready",
            "Emergency Ready",
            "Built a strong emergency fund strategy",
            Rare,
            completes(EmergencyFund),
        ),
        badge(
            "debt_destroyer",
            "Debt Destroyer",
            "Completed all debt simulations",
            Rare,
            UnlockRule::CompleteAll {
                simulations: vec![CreditCardTrap, CarPayment],
            },
        ),
        badge(
            "streak_warrior",
            "Streak Warrior",
            "7-day learning streak",
            Rare,
            UnlockRule::StreakAtLeast { days: 7 },
        ),
        badge(
            "perfect_score",
            "Perfect Score",
            "Achieved a perfect score in any simulation",
            Rare,
            UnlockRule::PerfectScore,
        ),
        badge(
            "level_3_achieved",
            "Budget Warrior",
            "Reached Level 3: Budget Warrior",
            Rare,
            UnlockRule::LevelAtLeast { level: 3 },
        ),
        badge(
            "compound_master",
            "Compound Master",
            "Unlocked the power of compound interest",
            Epic,
            completes(CompoundInterest),
        ),
        badge(
            "monte_carlo_expert",
            "Monte Carlo Expert",
            "Ran a Monte Carlo market simulation",
            Legendary,
            completes(MarketSimulator),
        ),
        badge(
            "simulation_completionist",
            "Simulation Completionist",
            "Completed 10 simulations",
            Epic,
            UnlockRule::TotalCompletions { count: 10 },
        ),
        badge(
            "financial_master",
            "Financial Master",
            "Reached Level 6: Financial Master",
            Legendary,
            UnlockRule::LevelAtLeast { level: 6 },
        ),
    ]
}

fn achievement(id: &str, name: &str, description: &str, hidden: bool, rule: UnlockRule) -> AchievementDefinition {
    AchievementDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        hidden,
        rule,
    }
}

fn standard_achievements() -> Vec<AchievementDefinition> {
    vec![
        achievement(
            "speed_runner",
            "Speed Runner",
            "Complete 5 simulations in one day",
            false,
            UnlockRule::CompletionsInOneDay { count: 5 },
        ),
        achievement(
            "perfectionist",
            "Perfectionist",
            "Get perfect scores on 3 different simulations",
            false,
            UnlockRule::PerfectScoresOnDistinct { count: 3 },
        ),
        achievement(
            "dedicated_learner",
            "Dedicated Learner",
            "Maintain a 30-day streak",
            false,
            UnlockRule::StreakAtLeast { days: 30 },
        ),
        achievement(
            "early_bird",
            "Early Bird",
            "Complete a simulation before 7 AM",
            true,
            UnlockRule::CompletedBeforeHour { hour: 7 },
        ),
        achievement(
            "night_owl",
            "Night Owl",
            "Complete a simulation after 11 PM",
            true,
            UnlockRule::CompletedFromHour { hour: 23 },
        ),
    ]
}

fn asset(id: &str, name: &str, mean_return: f64, volatility: f64) -> AssetClass {
    AssetClass {
        id: id.to_string(),
        name: name.to_string(),
        mean_return,
        volatility,
    }
}

fn standard_asset_classes() -> Vec<AssetClass> {
    vec![
        asset("aggressive_stocks", "Aggressive stocks", 0.12, 0.22),
        asset("large_cap_stocks", "Large-cap stocks", 0.10, 0.16),
        asset("balanced", "Balanced portfolio", 0.08, 0.10),
        asset("conservative", "Conservative portfolio", 0.06, 0.07),
        asset("bonds", "Bonds", 0.04, 0.05),
        asset("savings", "High-yield savings", 0.025, 0.001),
    ]
}
