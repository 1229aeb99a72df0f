//! Chain candidates: connected components of related transactions.
//!
//! Transactions are linked when they share a match id, an order id, or the
//! user-curated `ids` of a persisted chain. Consecutive transactions on the same
//! account and underlying are also linked when they fall within the chain window,
//! unless either one is already claimed by a user-curated chain.

use super::report::{RunReport, Warning};
use super::union_find::DisjointSet;
use crate::domain::{Chain, ChainStatus, Decimal, InstrumentKey, Transaction};
use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Default proximity window for heuristic links.
pub const DEFAULT_CHAIN_WINDOW_SECS: i64 = 300;

/// A connected component, named but not yet reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateChain {
    /// Name derived from the earliest transaction, before collision suffixes.
    pub base_name: String,
    /// Unique name within this run.
    pub chain_id: String,
    pub status: ChainStatus,
    /// Member ids in chronological order.
    pub transaction_ids: Vec<String>,
    pub earliest: NaiveDateTime,
}

/// First free name among `base`, `base.2`, `base.3`, ...
pub fn unique_name(base: &str, taken: &BTreeSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}.{}", base, n))
        .find(|name| !taken.contains(name))
        .unwrap_or_else(|| base.to_string())
}

/// Base chain name: `<account>.<yymmdd_HHMMSS>.<underlying>`.
pub fn chain_name(txn: &Transaction) -> String {
    format!(
        "{}.{}.{}",
        txn.account,
        txn.datetime.format("%y%m%d_%H%M%S"),
        txn.underlying().trim_start_matches('/')
    )
}

/// True when every instrument nets to zero.
pub fn is_flat<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> bool {
    net_by_instrument(transactions)
        .values()
        .all(|quantity| quantity.is_zero())
}

/// Net signed quantity per instrument.
pub fn net_by_instrument<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> BTreeMap<InstrumentKey, Decimal> {
    let mut net: BTreeMap<InstrumentKey, Decimal> = BTreeMap::new();
    for txn in transactions {
        *net.entry(txn.instrument_key()).or_default() += txn.position_delta();
    }
    net
}

pub struct ChainBuilder<'a> {
    pool: &'a [&'a Transaction],
    window: Duration,
    set: DisjointSet,
    /// Underlyings per component root.
    underlyings: HashMap<usize, BTreeSet<&'a str>>,
}

impl<'a> ChainBuilder<'a> {
    /// `pool` must be in chronological order.
    pub fn new(pool: &'a [&'a Transaction], window: Duration) -> Self {
        Self {
            pool,
            window,
            set: DisjointSet::new(pool.len()),
            underlyings: HashMap::new(),
        }
    }

    /// Build named candidates from the pool.
    ///
    /// `persisted` are the non-fixed chains of the database; `taken` holds names
    /// already in use.
    pub fn build(
        mut self,
        persisted: &[&Chain],
        taken: &BTreeSet<String>,
        report: &mut RunReport,
    ) -> Vec<CandidateChain> {
        let pool = self.pool;
        let index: HashMap<&str, usize> = pool
            .iter()
            .enumerate()
            .map(|(i, t)| (t.transaction_id.as_str(), i))
            .collect();

        self.link_shared(|t| t.match_id.as_deref());
        self.link_shared(|t| t.order_id.as_deref());

        let mut claimed: HashSet<usize> = HashSet::new();
        for chain in persisted {
            let members: Vec<usize> = chain
                .ids
                .iter()
                .filter_map(|id| index.get(id.as_str()).copied())
                .collect();
            if let Some((&first, rest)) = members.split_first() {
                for &other in rest {
                    self.set.union(first, other);
                }
            }
            claimed.extend(members);
        }

        self.link_by_time(&claimed, report);
        self.into_candidates(taken)
    }

    fn link_shared(&mut self, field: impl Fn(&Transaction) -> Option<&str>) {
        let pool = self.pool;
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        for (i, &txn) in pool.iter().enumerate() {
            let Some(value) = field(txn) else { continue };
            match first_seen.get(value) {
                Some(&first) => {
                    self.set.union(first, i);
                }
                None => {
                    first_seen.insert(value, i);
                }
            }
        }
    }

    fn link_by_time(&mut self, claimed: &HashSet<usize>, report: &mut RunReport) {
        let pool = self.pool;
        for (i, &txn) in pool.iter().enumerate() {
            let root = self.set.find(i);
            self.underlyings
                .entry(root)
                .or_default()
                .insert(txn.underlying());
        }

        let mut streams: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
        for (i, &txn) in pool.iter().enumerate() {
            streams
                .entry((txn.account.as_str(), txn.underlying()))
                .or_default()
                .push(i);
        }

        for indices in streams.values() {
            for pair in indices.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if claimed.contains(&a) || claimed.contains(&b) {
                    continue;
                }
                if pool[b].datetime - pool[a].datetime > self.window {
                    continue;
                }
                let (ra, rb) = (self.set.find(a), self.set.find(b));
                if ra == rb {
                    continue;
                }
                let left = self.underlyings.remove(&ra).unwrap_or_default();
                let right = self.underlyings.remove(&rb).unwrap_or_default();
                if left != right {
                    report.warn(Warning::AmbiguousUnderlying {
                        first_id: pool[a].transaction_id.clone(),
                        second_id: pool[b].transaction_id.clone(),
                        underlyings: left.union(&right).map(|u| u.to_string()).collect(),
                    });
                    self.underlyings.insert(ra, left);
                    self.underlyings.insert(rb, right);
                    continue;
                }
                let root = self.set.union(a, b);
                self.underlyings.insert(root, left);
            }
        }
    }

    fn into_candidates(mut self, taken: &BTreeSet<String>) -> Vec<CandidateChain> {
        let pool = self.pool;
        let mut groups = self.set.groups();
        groups.sort_by_key(|members| {
            let earliest = members.iter().map(|&i| pool[i].datetime).min();
            let smallest = members
                .iter()
                .map(|&i| pool[i].transaction_id.as_str())
                .min();
            (earliest, smallest)
        });

        let mut taken = taken.clone();
        let mut candidates = Vec::with_capacity(groups.len());
        for members in groups {
            let Some(first) = members
                .iter()
                .map(|&i| pool[i])
                .min_by(|a, b| (a.datetime, a.underlying()).cmp(&(b.datetime, b.underlying())))
            else {
                continue;
            };
            let base_name = chain_name(first);
            let chain_id = unique_name(&base_name, &taken);
            taken.insert(chain_id.clone());

            let status = if is_flat(members.iter().map(|&i| pool[i])) {
                ChainStatus::Closed
            } else {
                ChainStatus::Active
            };
            candidates.push(CandidateChain {
                base_name,
                chain_id,
                status,
                transaction_ids: members
                    .iter()
                    .map(|&i| pool[i].transaction_id.clone())
                    .collect(),
                earliest: first.datetime,
            });
        }

        tracing::debug!("Built {} candidate chains", candidates.len());
        candidates
    }
}
