//! User-driven chain status changes.
//!
//! Only the user moves a chain into FINAL or IGNORE. Finalizing promotes the
//! automatically attached ids into the curated `ids` list so the chain's
//! membership no longer depends on clustering.

use super::chain_builder::net_by_instrument;
use super::reconcile::validate_final;
use crate::domain::{Chain, ChainDatabase, ChainStatus, Decimal, InstrumentKey, Transaction};
use crate::error::EngineError;
use std::collections::{BTreeMap, HashSet};

/// Net signed quantity per instrument held by a chain.
pub fn net_quantities(chain: &Chain, transactions: &[Transaction]) -> BTreeMap<InstrumentKey, Decimal> {
    let ids: HashSet<&str> = chain.all_ids().map(String::as_str).collect();
    net_by_instrument(
        transactions
            .iter()
            .filter(|t| ids.contains(t.transaction_id.as_str())),
    )
}

fn chain_mut<'d>(db: &'d mut ChainDatabase, chain_id: &str) -> Result<&'d mut Chain, EngineError> {
    db.get_mut(chain_id)
        .ok_or_else(|| EngineError::ChainNotFound(chain_id.to_string()))
}

fn promote_auto_ids(chain: &mut Chain) {
    let mut ids: Vec<String> = std::mem::take(&mut chain.ids);
    let known: HashSet<String> = ids.iter().cloned().collect();
    ids.extend(
        std::mem::take(&mut chain.auto_ids)
            .into_iter()
            .filter(|id| !known.contains(id)),
    );
    chain.ids = ids;
}

/// Mark a chain FINAL. Rejected while any instrument holds an open position.
pub fn finalize_chain(
    db: &mut ChainDatabase,
    chain_id: &str,
    transactions: &[Transaction],
) -> Result<(), EngineError> {
    let chain = chain_mut(db, chain_id)?;
    let ids: HashSet<&str> = chain.all_ids().map(String::as_str).collect();
    validate_final(
        chain,
        transactions
            .iter()
            .filter(|t| ids.contains(t.transaction_id.as_str())),
    )?;

    promote_auto_ids(chain);
    chain.status = ChainStatus::Final;
    tracing::info!("Finalized chain {}", chain_id);
    Ok(())
}

/// Mark a chain IGNORE. Always allowed.
pub fn ignore_chain(db: &mut ChainDatabase, chain_id: &str) -> Result<(), EngineError> {
    let chain = chain_mut(db, chain_id)?;
    chain.status = ChainStatus::Ignore;
    tracing::info!("Ignoring chain {}", chain_id);
    Ok(())
}

/// Accept a chain's automatic membership and optionally file it under a group.
pub fn accept_chain(
    db: &mut ChainDatabase,
    chain_id: &str,
    group: Option<&str>,
) -> Result<(), EngineError> {
    let chain = chain_mut(db, chain_id)?;
    promote_auto_ids(chain);
    if let Some(group) = group {
        chain.metadata.group = Some(group.to_string());
    }
    Ok(())
}
