//! Reconciliation of freshly built chains against the persisted chain database.
//!
//! User-fixed chains (FINAL or IGNORE) are kept verbatim and their transactions
//! are withheld from clustering. A candidate holding a chain's curated `ids`
//! continues that chain; every other persisted chain is matched to the candidate
//! it overlaps most, so chain ids stay stable across re-imports.

use super::chain_builder::{is_flat, net_by_instrument, unique_name, CandidateChain, ChainBuilder};
use super::report::{RunReport, Warning};
use crate::domain::{Chain, ChainDatabase, ChainStatus, Effect, Transaction};
use crate::error::EngineError;
use chrono::Duration;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Opening rows placed on a different order more than this long after the
/// previous initial row are adjustments, not part of the initial position.
const INIT_WINDOW_SECS: i64 = 300;

/// Assign chain ids and init flags to `transactions` and produce the new database.
///
/// `transactions` must be in chronological order. The database is not modified;
/// on error nothing should be persisted.
pub fn chain_transactions(
    transactions: &mut [Transaction],
    db: &ChainDatabase,
    window: Duration,
    report: &mut RunReport,
) -> Result<ChainDatabase, EngineError> {
    let index: HashMap<String, usize> = transactions
        .iter()
        .enumerate()
        .map(|(i, t)| (t.transaction_id.clone(), i))
        .collect();

    for chain in &db.chains {
        for id in chain.all_ids() {
            if !index.contains_key(id) {
                report.warn(Warning::UnknownChainTransaction {
                    chain_id: chain.chain_id.clone(),
                    transaction_id: id.clone(),
                });
            }
        }
    }

    // Fixed chains keep their membership verbatim.
    let mut assignment: HashMap<usize, String> = HashMap::new();
    let mut output: Vec<Chain> = Vec::new();
    for chain in db.chains.iter().filter(|c| c.status.is_fixed()) {
        let members: Vec<usize> = chain
            .all_ids()
            .filter_map(|id| index.get(id).copied())
            .collect();
        if chain.status == ChainStatus::Final {
            validate_final(chain, members.iter().map(|&i| &transactions[i]))?;
        }
        for i in members {
            assignment.insert(i, chain.chain_id.clone());
        }
        output.push(chain.clone());
    }

    let pool: Vec<&Transaction> = transactions
        .iter()
        .enumerate()
        .filter(|(i, _)| !assignment.contains_key(i))
        .map(|(_, t)| t)
        .collect();
    let persisted: Vec<&Chain> = db.chains.iter().filter(|c| !c.status.is_fixed()).collect();

    let fixed_names: BTreeSet<String> = output.iter().map(|c| c.chain_id.clone()).collect();
    let candidates = ChainBuilder::new(&pool, window).build(&persisted, &fixed_names, report);

    let Reuse { reused, held } = assign_reuse(&candidates, &persisted, report);
    let reused_chains: HashSet<&str> = reused.values().map(|c| c.chain_id.as_str()).collect();

    let mut taken = fixed_names;
    taken.extend(reused_chains.iter().map(|id| id.to_string()));

    // Ids curated by a chain that keeps its own entry never appear in another chain.
    let mut held_ids: HashMap<&str, &str> = HashMap::new();
    for chain in persisted
        .iter()
        .filter(|c| !reused_chains.contains(c.chain_id.as_str()))
    {
        if chain.ids.is_empty() && chain.metadata.is_empty() {
            tracing::debug!("Dropping stale chain {}", chain.chain_id);
            continue;
        }
        let mut kept = (*chain).clone();
        kept.auto_ids.clear();
        if held.contains(chain.chain_id.as_str()) {
            kept.status = chain_status(kept.ids.iter(), &index, transactions);
        } else {
            report.warn(Warning::OrphanedChain {
                chain_id: chain.chain_id.clone(),
            });
        }
        for id in &chain.ids {
            held_ids.insert(id.as_str(), chain.chain_id.as_str());
        }
        taken.insert(kept.chain_id.clone());
        output.push(kept);
    }

    let mut fresh = 0usize;
    for (position, candidate) in candidates.iter().enumerate() {
        let members: Vec<&String> = candidate
            .transaction_ids
            .iter()
            .filter(|id| !held_ids.contains_key(id.as_str()))
            .collect();
        let chain = match reused.get(&position) {
            Some(previous) => {
                let mut chain = (*previous).clone();
                let curated: HashSet<&str> = chain.ids.iter().map(String::as_str).collect();
                let mut auto_ids: Vec<String> = members
                    .iter()
                    .filter(|id| !curated.contains(id.as_str()))
                    .map(|id| id.to_string())
                    .collect();
                auto_ids.sort();
                chain.auto_ids = auto_ids;
                chain.status = chain_status(chain.all_ids(), &index, transactions);
                chain
            }
            None => {
                if members.is_empty() {
                    continue;
                }
                fresh += 1;
                let chain_id = unique_name(&candidate.base_name, &taken);
                taken.insert(chain_id.clone());
                let mut auto_ids: Vec<String> = members.iter().map(|id| id.to_string()).collect();
                auto_ids.sort();
                let status = chain_status(auto_ids.iter(), &index, transactions);
                Chain::new(chain_id, status).with_auto_ids(auto_ids)
            }
        };
        for id in &members {
            if let Some(&i) = index.get(id.as_str()) {
                assignment.insert(i, chain.chain_id.clone());
            }
        }
        output.push(chain);
    }
    for (id, chain_id) in &held_ids {
        if let Some(&i) = index.get(*id) {
            assignment.insert(i, chain_id.to_string());
        }
    }

    for (i, txn) in transactions.iter_mut().enumerate() {
        txn.chain_id = assignment.get(&i).cloned();
        txn.init = false;
    }
    mark_initial(transactions);

    output.sort_by(|a, b| a.chain_id.cmp(&b.chain_id));
    tracing::info!(
        "Reconciled {} chains ({} reused, {} new)",
        output.len(),
        reused.len(),
        fresh
    );

    Ok(ChainDatabase {
        chains: output,
        split_transactions: db.split_transactions.clone(),
    })
}

/// Reject a FINAL chain that still holds an open position.
pub fn validate_final<'a>(
    chain: &Chain,
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> Result<(), EngineError> {
    let net = net_by_instrument(transactions);
    match net.iter().find(|(_, quantity)| !quantity.is_zero()) {
        Some((key, quantity)) => Err(EngineError::FinalChainNotFlat {
            chain_id: chain.chain_id.clone(),
            symbol: key.symbol.to_string(),
            quantity: *quantity,
        }),
        None => Ok(()),
    }
}

/// Net-zero membership is `Closed`, anything else `Active`.
fn chain_status<'a>(
    ids: impl Iterator<Item = &'a String>,
    index: &HashMap<String, usize>,
    transactions: &[Transaction],
) -> ChainStatus {
    let members = ids.filter_map(|id| index.get(id)).map(|&i| &transactions[i]);
    if is_flat(members) {
        ChainStatus::Closed
    } else {
        ChainStatus::Active
    }
}

/// Outcome of pairing candidates with persisted chains.
struct Reuse<'c> {
    /// Candidate position -> persisted chain it continues.
    reused: HashMap<usize, &'c Chain>,
    /// Chains whose curated ids landed in a candidate owned by another curated chain.
    held: HashSet<&'c str>,
}

/// Pair candidates with the persisted chains they continue.
///
/// A candidate holding a chain's curated `ids` continues that chain; when it holds
/// the `ids` of several chains the smallest chain id wins and the conflict is
/// reported. Remaining pairs are taken greedily by descending overlap, then
/// chain id, then candidate name. Each side is used at most once.
fn assign_reuse<'c>(
    candidates: &[CandidateChain],
    persisted: &[&'c Chain],
    report: &mut RunReport,
) -> Reuse<'c> {
    let mut candidate_of: HashMap<&str, usize> = HashMap::new();
    for (c, candidate) in candidates.iter().enumerate() {
        for id in &candidate.transaction_ids {
            candidate_of.insert(id.as_str(), c);
        }
    }

    let mut claims: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (p, chain) in persisted.iter().enumerate() {
        if let Some(&c) = chain.ids.iter().find_map(|id| candidate_of.get(id.as_str())) {
            claims.entry(c).or_default().push(p);
        }
    }

    let mut used: HashSet<usize> = HashSet::new();
    let mut reuse = Reuse {
        reused: HashMap::new(),
        held: HashSet::new(),
    };
    for (c, mut claimants) in claims {
        claimants.sort_by(|&a, &b| persisted[a].chain_id.cmp(&persisted[b].chain_id));
        used.extend(claimants.iter().copied());
        reuse.reused.insert(c, persisted[claimants[0]]);
        if claimants.len() > 1 {
            report.warn(Warning::CuratedChainConflict {
                chain_ids: claimants
                    .iter()
                    .map(|&p| persisted[p].chain_id.clone())
                    .collect(),
            });
            reuse
                .held
                .extend(claimants[1..].iter().map(|&p| persisted[p].chain_id.as_str()));
        }
    }

    let mut owner: HashMap<&str, Vec<usize>> = HashMap::new();
    for (position, chain) in persisted.iter().enumerate() {
        if used.contains(&position) {
            continue;
        }
        let ids: HashSet<&str> = chain.all_ids().map(String::as_str).collect();
        for id in ids {
            owner.entry(id).or_default().push(position);
        }
    }

    let mut pairs: Vec<(usize, &str, &str, usize, usize)> = Vec::new();
    for (c, candidate) in candidates.iter().enumerate() {
        if reuse.reused.contains_key(&c) {
            continue;
        }
        let mut overlap: HashMap<usize, usize> = HashMap::new();
        for id in &candidate.transaction_ids {
            for &p in owner.get(id.as_str()).into_iter().flatten() {
                *overlap.entry(p).or_default() += 1;
            }
        }
        for (p, count) in overlap {
            pairs.push((
                count,
                persisted[p].chain_id.as_str(),
                candidate.chain_id.as_str(),
                c,
                p,
            ));
        }
    }
    pairs.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(b.1)).then(a.2.cmp(b.2)));

    for (_, _, _, c, p) in pairs {
        if reuse.reused.contains_key(&c) || used.contains(&p) {
            continue;
        }
        used.insert(p);
        reuse.reused.insert(c, persisted[p]);
    }
    reuse
}

/// Flag the opening legs each chain started with.
fn mark_initial(transactions: &mut [Transaction]) {
    let mut by_chain: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, txn) in transactions.iter().enumerate() {
        if txn.effect != Effect::Opening {
            continue;
        }
        if let Some(chain_id) = &txn.chain_id {
            by_chain.entry(chain_id.as_str()).or_default().push(i);
        }
    }

    let mut initial: Vec<usize> = Vec::new();
    let window = Duration::seconds(INIT_WINDOW_SECS);
    for mut members in by_chain.into_values() {
        members.sort_by(|&a, &b| {
            let (ta, tb) = (&transactions[a], &transactions[b]);
            (ta.datetime, &ta.transaction_id).cmp(&(tb.datetime, &tb.transaction_id))
        });
        let Some((&first, rest)) = members.split_first() else {
            continue;
        };
        initial.push(first);
        let mut previous = &transactions[first];
        for &i in rest {
            let txn = &transactions[i];
            if txn.order_id != previous.order_id && txn.datetime - previous.datetime > window {
                break;
            }
            initial.push(i);
            previous = txn;
        }
    }

    for i in initial {
        transactions[i].init = true;
    }
}
