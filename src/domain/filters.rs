use serde::{Deserialize, Serialize};

use crate::domain::transaction::Transaction;

/// Criterion value meaning "do not filter on this field".
pub const ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: String,
    #[serde(rename = "type")]
    pub insight_type: String,
    pub title: String,
    pub description: String,
    /// Score in `0..=100`.
    pub confidence: u8,
    pub impact: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

pub fn confidence_level(confidence: u8) -> ConfidenceLevel {
    match confidence {
        0..50 => ConfidenceLevel::Low,
        50..80 => ConfidenceLevel::Medium,
        _ => ConfidenceLevel::High,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightFilter {
    #[serde(rename = "type")]
    pub insight_type: Option<String>,
    pub min_confidence: Option<u8>,
    pub impact: Option<String>,
}

impl InsightFilter {
    pub fn matches(&self, insight: &Insight) -> bool {
        criterion_matches(self.insight_type.as_deref(), &insight.insight_type)
            && self
                .min_confidence
                .is_none_or(|minimum| insight.confidence >= minimum)
            && criterion_matches(self.impact.as_deref(), &insight.impact)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    #[serde(alias = "search")]
    pub search_query: Option<String>,
    #[serde(alias = "type")]
    pub type_filter: Option<String>,
    #[serde(alias = "status")]
    pub status_filter: Option<String>,
}

impl TransactionFilter {
    pub fn matches(&self, transaction: &Transaction) -> bool {
        criterion_matches(
            self.type_filter.as_deref(),
            transaction.transaction_type.as_str(),
        ) && criterion_matches(self.status_filter.as_deref(), transaction.status.as_str())
            && self.matches_search(transaction)
    }

    fn matches_search(&self, transaction: &Transaction) -> bool {
        let Some(query) = self
            .search_query
            .as_deref()
            .filter(|query| !query.is_empty())
        else {
            return true;
        };

        let needle = query.to_lowercase();
        [
            Some(transaction.id.as_str()),
            Some(transaction.description.as_str()),
            transaction.station_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

fn criterion_matches(criterion: Option<&str>, value: &str) -> bool {
    match criterion {
        None | Some(ALL) => true,
        Some(expected) => expected == value,
    }
}

pub fn filter_insights(insights: &[Insight], filter: &InsightFilter) -> Vec<Insight> {
    insights
        .iter()
        .filter(|insight| filter.matches(insight))
        .cloned()
        .collect()
}

pub fn filter_transactions(
    transactions: &[Transaction],
    filter: &TransactionFilter,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|transaction| filter.matches(transaction))
        .cloned()
        .collect()
}
