use std::collections::{BTreeMap, HashMap};

use super::views::{AgencySummary, Stats, StoreEntry};
use crate::workflows::incentive::applications::domain::{Application, ApplicationStatus};

/// Status counts, non-rejected participation per agency, and the approved payout total.
pub fn compute_stats(apps: &[Application]) -> Stats {
    let mut stats = Stats {
        total: apps.len(),
        ..Stats::default()
    };

    for app in apps {
        match app.status {
            ApplicationStatus::Pending => stats.pending += 1,
            ApplicationStatus::Approved => {
                stats.approved += 1;
                stats.total_incentive =
                    stats.total_incentive.saturating_add(app.incentive_amount);
            }
            ApplicationStatus::Rejected => stats.rejected += 1,
        }

        if app.status != ApplicationStatus::Rejected {
            *stats
                .agency_participation
                .entry(app.agency_name.clone())
                .or_insert(0) += 1;
        }
    }

    stats
}

/// Per-agency rollup over approved applications.
///
/// Bank name and account number are overwritten by every application visited,
/// so the last approved record in `apps` order wins. Agencies appear in the
/// order they were first seen.
pub fn compute_agency_summaries(apps: &[Application]) -> Vec<AgencySummary> {
    let mut summaries: Vec<AgencySummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for app in apps
        .iter()
        .filter(|app| app.status == ApplicationStatus::Approved)
    {
        let slot = *index.entry(app.agency_name.as_str()).or_insert_with(|| {
            summaries.push(AgencySummary {
                agency_name: app.agency_name.clone(),
                bank_name: String::new(),
                account_number: String::new(),
                participation_count: 0,
                total_amount: 0,
            });
            summaries.len() - 1
        });

        let summary = &mut summaries[slot];
        summary.participation_count += 1;
        summary.total_amount = summary.total_amount.saturating_add(app.incentive_amount);
        summary.bank_name = app.bank_name.clone();
        summary.account_number = app.account_number.clone();
    }

    summaries
}

/// Distinct stores seen in submissions merged over `seeds`, sorted by name.
///
/// Submitted addresses replace seeded ones; among submissions the last one in
/// `apps` order wins.
/// Records missing either a name or an address are ignored.
pub fn store_directory(apps: &[Application], seeds: &[StoreEntry]) -> Vec<StoreEntry> {
    let mut stores: BTreeMap<String, String> = BTreeMap::new();

    for app in apps {
        let name = app.store_name.trim();
        let address = app.store_address.trim();
        if name.is_empty() || address.is_empty() {
            continue;
        }
        stores.insert(name.to_string(), address.to_string());
    }

    for seed in seeds {
        stores
            .entry(seed.name.clone())
            .or_insert_with(|| seed.address.clone());
    }

    stores
        .into_iter()
        .map(|(name, address)| StoreEntry { name, address })
        .collect()
}
