//! Zero-crossing splitting of closing transactions that flip a position.

use crate::domain::{Decimal, Effect, Transaction};

/// Apportion `total` across `quantities` proportionally.
///
/// Every share but the largest is rounded to cents; the largest takes the
/// remainder so the shares sum exactly to `total`. Ties go to the later part.
pub fn apportion(total: Decimal, quantities: &[Decimal]) -> Vec<Decimal> {
    let whole: Decimal = quantities.iter().sum();
    let largest = quantities
        .iter()
        .enumerate()
        .fold(0, |best, (i, q)| if *q >= quantities[best] { i } else { best });

    let mut shares: Vec<Decimal> = quantities
        .iter()
        .map(|q| total.share(*q, whole))
        .collect();
    if shares.is_empty() {
        return shares;
    }
    let others: Decimal = shares
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != largest)
        .map(|(_, s)| *s)
        .sum();
    shares[largest] = total - others;
    shares
}

/// Outcome of passing a closing transaction through the splitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutcome {
    /// The transaction fits within the open quantity.
    Unchanged(Transaction),
    /// The transaction crossed zero and was replaced by two fragments.
    Crossed {
        closing: Transaction,
        opening: Transaction,
    },
}

/// Split a closing transaction whose quantity exceeds `open_quantity`.
///
/// The closing fragment reuses the original id with a `.1` suffix and takes exactly
/// the open amount; the opening fragment (`.2`) carries the remainder.
pub fn split_zero_crossing(txn: Transaction, open_quantity: Decimal) -> SplitOutcome {
    let open_quantity = open_quantity.abs();
    if txn.quantity <= open_quantity || open_quantity.is_zero() {
        return SplitOutcome::Unchanged(txn);
    }

    let close_qty = open_quantity;
    let open_qty = txn.quantity - open_quantity;
    let quantities = [close_qty, open_qty];
    let costs = apportion(txn.cost, &quantities);
    let commissions = apportion(txn.commissions, &quantities);
    let fees = apportion(txn.fees, &quantities);

    tracing::debug!(
        "Splitting {} across zero: close {} / open {}",
        txn.transaction_id,
        close_qty,
        open_qty
    );

    let mut closing = txn.clone();
    closing.transaction_id = format!("{}.1", txn.transaction_id);
    closing.quantity = close_qty;
    closing.cost = costs[0];
    closing.commissions = commissions[0];
    closing.fees = fees[0];
    closing.effect = Effect::Closing;

    let mut opening = txn;
    opening.transaction_id = format!("{}.2", opening.transaction_id);
    opening.quantity = open_qty;
    opening.cost = costs[1];
    opening.commissions = commissions[1];
    opening.fees = fees[1];
    opening.effect = Effect::Opening;
    opening.match_id = None;

    SplitOutcome::Crossed { closing, opening }
}
