//! Aggregate metrics over a set of stored repositories: averages, top
//! repositories, language breakdown and recent activity.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::query::RepositoryView;
use crate::types::NOT_AVAILABLE;

pub const DEFAULT_TOP: usize = 10;
const RECENT_WINDOW_DAYS: i64 = 182;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub total: usize,
    pub stars: MetricSummary,
    pub forks: MetricSummary,
    pub top_by_stars: Vec<RankedRepository>,
    pub top_by_forks: Vec<RankedRepository>,
    pub languages: Vec<LanguageStats>,
    pub updated_last_six_months: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub total: u64,
    pub mean: f64,
    pub median: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedRepository {
    pub name: String,
    pub owner: String,
    pub stars: u64,
    pub forks: u64,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageStats {
    pub language: String,
    pub repositories: usize,
    pub mean_stars: f64,
    pub mean_forks: f64,
}

impl RepositoryStats {
    /// `top` bounds every ranked list. `now` anchors the recent-activity
    /// window.
    pub fn compute(repos: &[RepositoryView], top: usize, now: DateTime<Utc>) -> Self {
        let stars: Vec<u64> = repos.iter().map(|r| r.stars).collect();
        let forks: Vec<u64> = repos.iter().map(|r| r.forks).collect();

        let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
        let updated_last_six_months = repos
            .iter()
            .filter_map(|r| r.last_updated.as_deref())
            .filter_map(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .filter(|ts| ts.with_timezone(&Utc) >= cutoff)
            .count();

        Self {
            total: repos.len(),
            stars: MetricSummary::of(&stars),
            forks: MetricSummary::of(&forks),
            top_by_stars: ranked(repos, top, |r| r.stars),
            top_by_forks: ranked(repos, top, |r| r.forks),
            languages: languages(repos, top),
            updated_last_six_months,
        }
    }
}

impl MetricSummary {
    fn of(values: &[u64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let total: u64 = values.iter().sum();
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
        } else {
            sorted[mid] as f64
        };
        Self {
            total,
            mean: total as f64 / values.len() as f64,
            median,
        }
    }
}

fn ranked<F>(repos: &[RepositoryView], top: usize, key: F) -> Vec<RankedRepository>
where
    F: Fn(&RepositoryView) -> u64,
{
    let mut sorted: Vec<&RepositoryView> = repos.iter().collect();
    sorted.sort_by(|a, b| key(b).cmp(&key(a)).then_with(|| a.name.cmp(&b.name)));
    sorted
        .into_iter()
        .take(top)
        .map(|r| RankedRepository {
            name: r.name.clone(),
            owner: r.owner.clone(),
            stars: r.stars,
            forks: r.forks,
            language: r.language.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        })
        .collect()
}

fn languages(repos: &[RepositoryView], top: usize) -> Vec<LanguageStats> {
    let mut groups: HashMap<&str, (usize, u64, u64)> = HashMap::new();
    for repo in repos {
        let language = repo.language.as_deref().unwrap_or(NOT_AVAILABLE);
        let entry = groups.entry(language).or_default();
        entry.0 += 1;
        entry.1 += repo.stars;
        entry.2 += repo.forks;
    }

    let mut out: Vec<LanguageStats> = groups
        .into_iter()
        .map(|(language, (count, stars, forks))| LanguageStats {
            language: language.to_string(),
            repositories: count,
            mean_stars: stars as f64 / count as f64,
            mean_forks: forks as f64 / count as f64,
        })
        .collect();
    out.sort_by(|a, b| {
        b.repositories
            .cmp(&a.repositories)
            .then_with(|| a.language.cmp(&b.language))
    });
    out.truncate(top);
    out
}
