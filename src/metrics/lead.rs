use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::days_between;
use crate::models::{CompanySize, Lead, LeadQuality};

/// Awards `points` when a value is strictly greater than `above`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub above: i64,
    pub points: i32,
}

/// Awards `points` when the last contact is at most `within_days` old.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecencyBand {
    pub within_days: i64,
    pub points: i32,
}

const fn step(above: i64, points: i32) -> Threshold {
    Threshold { above, points }
}

const fn band(within_days: i64, points: i32) -> RecencyBand {
    RecencyBand { within_days, points }
}

/// Tunable constants of the lead scorer.
///
/// Step tables are evaluated in order and only the first matching entry
/// scores, so they must be listed from the highest threshold down.
/// `Default` is the production model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadScoringRules {
    pub demographic_cap: i32,
    pub behavioral_cap: i32,
    pub engagement_cap: i32,
    pub total_cap: i32,
    pub hot_threshold: i32,
    pub warm_threshold: i32,
    pub large_company_points: i32,
    pub medium_company_points: i32,
    pub revenue_steps: Vec<Threshold>,
    pub executive_title_points: i32,
    /// Lowercase substrings matched against the job title.
    pub executive_keywords: Vec<String>,
    pub visit_steps: Vec<Threshold>,
    pub open_steps: Vec<Threshold>,
    pub click_steps: Vec<Threshold>,
    pub interaction_steps: Vec<Threshold>,
    pub recency_bands: Vec<RecencyBand>,
}

impl Default for LeadScoringRules {
    fn default() -> Self {
        Self {
            demographic_cap: 30,
            behavioral_cap: 40,
            engagement_cap: 30,
            total_cap: 100,
            hot_threshold: 80,
            warm_threshold: 50,
            large_company_points: 10,
            medium_company_points: 5,
            revenue_steps: vec![step(1_000_000, 10), step(100_000, 5)],
            executive_title_points: 10,
            executive_keywords: ["ceo", "cto", "manager", "director"]
                .into_iter()
                .map(String::from)
                .collect(),
            visit_steps: vec![step(10, 15), step(5, 10), step(0, 5)],
            open_steps: vec![step(5, 10), step(2, 5)],
            // clicks outweigh opens on purpose
            click_steps: vec![step(3, 15), step(0, 10)],
            interaction_steps: vec![step(10, 20), step(5, 15), step(0, 10)],
            recency_bands: vec![band(7, 10), band(30, 5)],
        }
    }
}

impl LeadScoringRules {
    pub fn quality_for(&self, score: i32) -> LeadQuality {
        if score >= self.hot_threshold {
            LeadQuality::Hot
        } else if score >= self.warm_threshold {
            LeadQuality::Warm
        } else {
            LeadQuality::Cold
        }
    }
}

impl LeadQuality {
    pub fn from_score(score: i32, rules: &LeadScoringRules) -> Self {
        rules.quality_for(score)
    }
}

/// The five values written back to a lead by one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadScoreBreakdown {
    pub demographic_score: i32,
    pub behavioral_score: i32,
    pub engagement_score: i32,
    pub lead_score: i32,
    pub quality: LeadQuality,
}

fn first_step(value: i64, steps: &[Threshold]) -> i32 {
    steps
        .iter()
        .find(|s| value > s.above)
        .map_or(0, |s| s.points)
}

fn demographic(lead: &Lead, rules: &LeadScoringRules) -> i32 {
    let mut score = match lead.company_size {
        Some(CompanySize::Large | CompanySize::Enterprise) => rules.large_company_points,
        Some(CompanySize::Medium) => rules.medium_company_points,
        Some(CompanySize::Small) | None => 0,
    };

    if let Some(revenue) = &lead.annual_revenue {
        score += rules
            .revenue_steps
            .iter()
            .find(|s| *revenue > BigDecimal::from(s.above))
            .map_or(0, |s| s.points);
    }

    if let Some(title) = &lead.job_title {
        let title = title.to_lowercase();
        if rules
            .executive_keywords
            .iter()
            .any(|k| title.contains(k.to_lowercase().as_str()))
        {
            score += rules.executive_title_points;
        }
    }

    score.min(rules.demographic_cap)
}

fn behavioral(lead: &Lead, rules: &LeadScoringRules) -> i32 {
    let score = first_step(lead.website_visits.into(), &rules.visit_steps)
        + first_step(lead.email_opens.into(), &rules.open_steps)
        + first_step(lead.email_clicks.into(), &rules.click_steps);
    score.min(rules.behavioral_cap)
}

fn engagement(lead: &Lead, now: DateTime<Utc>, rules: &LeadScoringRules) -> i32 {
    let mut score = first_step(lead.total_interactions.into(), &rules.interaction_steps);

    if let Some(last_contact) = lead.last_contact_date {
        let days = days_between(last_contact, now);
        score += rules
            .recency_bands
            .iter()
            .find(|b| days <= b.within_days)
            .map_or(0, |b| b.points);
    }

    score.min(rules.engagement_cap)
}

/// Scores a lead from its profile and interaction counters.
///
/// Each sub-score is capped on its own before summation; quality depends on
/// the total only.
pub fn score_lead(lead: &Lead, now: DateTime<Utc>, rules: &LeadScoringRules) -> LeadScoreBreakdown {
    let demographic_score = demographic(lead, rules);
    let behavioral_score = behavioral(lead, rules);
    let engagement_score = engagement(lead, now, rules);
    let lead_score = (demographic_score + behavioral_score + engagement_score).min(rules.total_cap);

    LeadScoreBreakdown {
        demographic_score,
        behavioral_score,
        engagement_score,
        lead_score,
        quality: rules.quality_for(lead_score),
    }
}

impl Lead {
    /// Recomputes and assigns all derived score fields, returning the total.
    pub fn calculate_lead_score(&mut self, now: DateTime<Utc>, rules: &LeadScoringRules) -> i32 {
        let breakdown = score_lead(self, now, rules);
        self.apply_score(&breakdown);
        breakdown.lead_score
    }

    pub fn apply_score(&mut self, breakdown: &LeadScoreBreakdown) {
        self.demographic_score = breakdown.demographic_score;
        self.behavioral_score = breakdown.behavioral_score;
        self.engagement_score = breakdown.engagement_score;
        self.lead_score = breakdown.lead_score;
        self.quality = Some(breakdown.quality);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hot_lead(now: DateTime<Utc>) -> Lead {
        let mut lead = Lead::new("L-0001", now);
        lead.company_size = Some(CompanySize::Enterprise);
        lead.annual_revenue = Some(BigDecimal::from(2_000_000));
        lead.job_title = Some("CTO".to_string());
        lead.website_visits = 12;
        lead.email_opens = 6;
        lead.email_clicks = 4;
        lead.total_interactions = 11;
        lead.last_contact_date = Some(now - Duration::days(3));
        lead
    }

    #[test]
    fn fully_engaged_enterprise_lead_is_hot() {
        let now = Utc::now();
        let mut lead = hot_lead(now);
        let total = lead.calculate_lead_score(now, &LeadScoringRules::default());

        assert_eq!(total, 100);
        assert_eq!(lead.demographic_score, 30);
        assert_eq!(lead.behavioral_score, 40);
        assert_eq!(lead.engagement_score, 30);
        assert_eq!(lead.quality, Some(LeadQuality::Hot));
    }

    #[test]
    fn blank_lead_scores_zero_and_cold() {
        let now = Utc::now();
        let lead = Lead::new("L-0002", now);
        let b = score_lead(&lead, now, &LeadScoringRules::default());
        assert_eq!(b.lead_score, 0);
        assert_eq!(b.quality, LeadQuality::Cold);
    }

    #[test]
    fn thresholds_are_strict() {
        let now = Utc::now();
        let rules = LeadScoringRules::default();
        let mut lead = Lead::new("L-0003", now);
        lead.website_visits = 10;
        lead.email_opens = 5;
        lead.email_clicks = 3;
        let b = score_lead(&lead, now, &rules);
        // 10 visits -> 10, 5 opens -> 5, 3 clicks -> 10
        assert_eq!(b.behavioral_score, 25);

        lead.annual_revenue = Some(BigDecimal::from(1_000_000));
        assert_eq!(score_lead(&lead, now, &rules).demographic_score, 5);
    }

    #[test]
    fn recency_bands_are_inclusive() {
        let now = Utc::now();
        let rules = LeadScoringRules::default();
        let mut lead = Lead::new("L-0004", now);

        lead.last_contact_date = Some(now - Duration::days(7));
        assert_eq!(score_lead(&lead, now, &rules).engagement_score, 10);
        lead.last_contact_date = Some(now - Duration::days(30));
        assert_eq!(score_lead(&lead, now, &rules).engagement_score, 5);
        lead.last_contact_date = Some(now - Duration::days(31));
        assert_eq!(score_lead(&lead, now, &rules).engagement_score, 0);
    }

    #[test]
    fn title_match_is_case_insensitive_substring() {
        let now = Utc::now();
        let rules = LeadScoringRules::default();
        let mut lead = Lead::new("L-0005", now);
        lead.job_title = Some("Regional Sales MANAGER".into());
        assert_eq!(score_lead(&lead, now, &rules).demographic_score, 10);
        lead.job_title = Some("Engineer".into());
        assert_eq!(score_lead(&lead, now, &rules).demographic_score, 0);
    }

    #[test]
    fn small_company_scores_nothing() {
        let now = Utc::now();
        let rules = LeadScoringRules::default();
        let mut lead = Lead::new("L-0006", now);
        lead.company_size = Some(CompanySize::Small);
        assert_eq!(score_lead(&lead, now, &rules).demographic_score, 0);
        lead.company_size = Some(CompanySize::Medium);
        assert_eq!(score_lead(&lead, now, &rules).demographic_score, 5);
    }

    #[test]
    fn quality_boundaries() {
        let rules = LeadScoringRules::default();
        assert_eq!(LeadQuality::from_score(49, &rules), LeadQuality::Cold);
        assert_eq!(LeadQuality::from_score(50, &rules), LeadQuality::Warm);
        assert_eq!(LeadQuality::from_score(79, &rules), LeadQuality::Warm);
        assert_eq!(LeadQuality::from_score(80, &rules), LeadQuality::Hot);
    }

    #[test]
    fn partial_rules_file_keeps_defaults() {
        let rules: LeadScoringRules = serde_json::from_str(r#"{"hot_threshold": 90}"#).unwrap();
        assert_eq!(rules.hot_threshold, 90);
        assert_eq!(rules.warm_threshold, 50);
        assert_eq!(rules.click_steps, LeadScoringRules::default().click_steps);
    }
}
