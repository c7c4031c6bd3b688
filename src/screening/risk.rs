use serde::{Deserialize, Serialize};

use super::domain::{Candidate, DomainColor, RiskFlags};
use super::scoring::ScoreCard;

/// Classification boundaries. `risk_caution`/`total_strong` gate green,
/// `risk_alert`/`total_weak` gate red; everything between is yellow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub risk_caution: f32,
    pub risk_alert: f32,
    pub total_strong: u8,
    pub total_weak: u8,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            risk_caution: 40.0,
            risk_alert: 70.0,
            total_strong: 70,
            total_weak: 40,
        }
    }
}

/// Blend weights for one risk dimension over the three shared components:
/// competence inverse, compensation signal, and cultural inverse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub competence: f32,
    pub compensation: f32,
    pub culture: f32,
}

impl RiskWeights {
    fn blend(&self, competence: f32, compensation: f32, culture: f32) -> f32 {
        let sum = self.competence + self.compensation + self.culture;
        if sum <= 0.0 {
            return 0.0;
        }
        let value = (competence * self.competence
            + compensation * self.compensation
            + culture * self.culture)
            / sum;
        round1(value.clamp(0.0, 100.0))
    }
}

/// Salary-ask banding against the market average, expressed as overage
/// percentages and the risk value each band maps to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompensationBands {
    pub high_overage_pct: f64,
    pub medium_overage_pct: f64,
    pub high_risk: f32,
    pub medium_risk: f32,
    pub low_risk: f32,
    /// Applied when either the ask or the market figure is missing.
    pub neutral_risk: f32,
}

impl Default for CompensationBands {
    fn default() -> Self {
        Self {
            high_overage_pct: 30.0,
            medium_overage_pct: 15.0,
            high_risk: 80.0,
            medium_risk: 40.0,
            low_risk: 10.0,
            neutral_risk: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub thresholds: RiskThresholds,
    pub retention: RiskWeights,
    pub salary: RiskWeights,
    pub cultural: RiskWeights,
    pub compensation: CompensationBands,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            retention: RiskWeights {
                competence: 0.7,
                compensation: 0.1,
                culture: 0.2,
            },
            salary: RiskWeights {
                competence: 0.2,
                compensation: 0.7,
                culture: 0.1,
            },
            cultural: RiskWeights {
                competence: 0.2,
                compensation: 0.1,
                culture: 0.7,
            },
            compensation: CompensationBands::default(),
        }
    }
}

/// Pure classification: identical score and candidate input always yields
/// identical risks and color. No counters, no clock, no randomness.
pub fn classify(
    card: &ScoreCard,
    candidate: &Candidate,
    market_salary: Option<f64>,
    config: &RiskConfig,
) -> (RiskFlags, DomainColor) {
    let competence = 100.0 - (f32::from(card.accuracy) + f32::from(card.depth)) / 2.0;
    let compensation = compensation_risk(candidate.salary_ask, market_salary, &config.compensation);
    let culture = 100.0 - f32::from(card.cultural);

    let flags = RiskFlags {
        retention: config.retention.blend(competence, compensation, culture),
        salary: config.salary.blend(competence, compensation, culture),
        cultural: config.cultural.blend(competence, compensation, culture),
    };
    let color = domain_color(card.total, &flags, &config.thresholds);
    (flags, color)
}

/// Exhaustive, boundary-exact color rule. The green and red predicates are
/// mutually exclusive by construction, so match order carries no hidden
/// tie-break.
pub fn domain_color(total: u8, flags: &RiskFlags, thresholds: &RiskThresholds) -> DomainColor {
    if flags.any_at_or_above(thresholds.risk_alert) || total < thresholds.total_weak {
        DomainColor::Red
    } else if flags.all_below(thresholds.risk_caution) && total >= thresholds.total_strong {
        DomainColor::Green
    } else {
        DomainColor::Yellow
    }
}

fn compensation_risk(
    ask: Option<f64>,
    market: Option<f64>,
    bands: &CompensationBands,
) -> f32 {
    let (ask, market) = match (ask, market) {
        (Some(ask), Some(market)) if market > 0.0 => (ask, market),
        _ => return bands.neutral_risk,
    };

    let overage_pct = (ask - market) / market * 100.0;
    if overage_pct >= bands.high_overage_pct {
        bands.high_risk
    } else if overage_pct >= bands.medium_overage_pct {
        bands.medium_risk
    } else {
        bands.low_risk
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
