use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Dashboard counters derived from the full application set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Agency name to count of applications that were not rejected.
    pub agency_participation: BTreeMap<String, usize>,
    pub total_incentive: u64,
}

/// Payout rollup for one agency across its approved applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencySummary {
    pub agency_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub participation_count: usize,
    pub total_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub name: String,
    pub address: String,
}
