use chrono::{NaiveDate, NaiveDateTime};
use tradechains::engine::Warning;
use tradechains::{
    Account, ChainDatabase, Compiler, Decimal, Effect, InitialPosition, Instruction, RowType,
    Symbol, Transaction,
};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn trade(
    id: &str,
    time: NaiveDateTime,
    symbol: &str,
    instruction: Instruction,
    qty: &str,
    price: &str,
) -> Transaction {
    let sign = match instruction {
        Instruction::Buy => d("-1"),
        Instruction::Sell => d("1"),
    };
    Transaction::new(
        Account::new("x1"),
        id,
        time,
        RowType::Trade,
        Symbol::new(symbol),
        Some(instruction),
        d(qty),
        d(qty) * d(price) * sign,
    )
}

fn buy(id: &str, time: NaiveDateTime, qty: &str, price: &str) -> Transaction {
    trade(id, time, "XYZ", Instruction::Buy, qty, price)
}

fn sell(id: &str, time: NaiveDateTime, qty: &str, price: &str) -> Transaction {
    trade(id, time, "XYZ", Instruction::Sell, qty, price)
}

fn run(log: Vec<Transaction>) -> tradechains::RunOutput {
    Compiler::default()
        .run(log, &[], &ChainDatabase::default())
        .unwrap()
}

#[test]
fn test_close_past_zero_flips_to_short() {
    let log = vec![
        buy("t1", at(2, 10), "10", "1").with_effect(Effect::Opening),
        sell("t2", at(5, 10), "15", "2"),
    ];
    let output = run(log);

    let ids: Vec<_> = output
        .transactions
        .iter()
        .map(|t| t.transaction_id.as_str())
        .collect();
    assert_eq!(ids, vec!["t1", "t2.1", "t2.2"]);

    let closing = &output.transactions[1];
    assert_eq!(closing.effect, Effect::Closing);
    assert_eq!(closing.quantity, d("10"));
    assert_eq!(closing.cost, d("20"));
    assert_eq!(closing.price, d("2"));

    let opening = &output.transactions[2];
    assert_eq!(opening.effect, Effect::Opening);
    assert_eq!(opening.quantity, d("5"));
    assert_eq!(opening.cost, d("10"));
    assert_eq!(opening.instruction, Some(Instruction::Sell));

    assert_eq!(output.matches.len(), 1);
    let matched = &output.matches[0];
    assert_eq!(matched.closing_id, "t2.1");
    assert_eq!(matched.quantity, d("10"));
    assert_eq!(matched.consumed.len(), 1);
    assert_eq!(matched.consumed[0].opening_id, "t1");
    assert_eq!(output.transactions[0].match_id, closing.match_id);
    assert_ne!(opening.match_id, closing.match_id);

    assert_eq!(output.positions.len(), 1);
    assert_eq!(output.positions[0].quantity, d("-5"));
    assert!(output.report.is_clean());
}

#[test]
fn test_fifo_across_lots() {
    let log = vec![
        buy("a", at(2, 10), "3", "10"),
        buy("b", at(3, 10), "4", "11"),
        sell("c", at(4, 10), "5", "12"),
        sell("e", at(5, 10), "2", "13"),
    ];
    let output = run(log);

    assert_eq!(output.matches.len(), 2);
    let first = &output.matches[0];
    assert_eq!(first.closing_id, "c");
    let consumed: Vec<_> = first
        .consumed
        .iter()
        .map(|c| (c.opening_id.as_str(), c.quantity))
        .collect();
    assert_eq!(consumed, vec![("a", d("3")), ("b", d("2"))]);

    let second = &output.matches[1];
    assert_eq!(second.consumed[0].opening_id, "b");
    assert_eq!(second.consumed[0].quantity, d("2"));

    // Every row of the episode carries the id of the row that opened it.
    assert!(output
        .transactions
        .iter()
        .all(|t| t.match_id.as_deref() == Some("&a")));
    assert!(output.positions.is_empty());
}

#[test]
fn test_matched_quantity_never_exceeds_opened() {
    let log = vec![
        buy("a", at(2, 10), "2", "1"),
        sell("b", at(3, 10), "7", "1"),
        buy("c", at(4, 10), "9", "1"),
        sell("e", at(5, 10), "1", "1"),
    ];
    let output = run(log);

    for m in &output.matches {
        let consumed: Decimal = m.consumed.iter().map(|c| c.quantity).sum();
        assert_eq!(consumed, m.quantity);
    }
    let opened: Decimal = output
        .transactions
        .iter()
        .filter(|t| t.effect == Effect::Opening)
        .map(|t| t.quantity)
        .sum();
    let matched: Decimal = output.matches.iter().map(|m| m.quantity).sum();
    assert!(matched <= opened);

    let net: Decimal = output.transactions.iter().map(|t| t.position_delta()).sum();
    assert_eq!(net, d("3"));
    assert_eq!(output.positions[0].quantity, d("3"));
}

#[test]
fn test_unmatched_close_is_flagged() {
    let log = vec![sell("t1", at(2, 10), "3", "5").with_effect(Effect::Closing)];
    let output = run(log);

    assert_eq!(output.transactions.len(), 2);
    let synthetic = &output.transactions[0];
    assert!(synthetic.transaction_id.starts_with("synth-"));
    assert_eq!(synthetic.row_type, RowType::Open);
    assert_eq!(synthetic.cost, Decimal::zero());
    assert_eq!(synthetic.chain_id, output.transactions[1].chain_id);

    assert_eq!(output.report.flagged.len(), 1);
    assert!(matches!(
        output.report.warnings.as_slice(),
        [Warning::UnmatchedClose { transaction_id, .. }] if transaction_id == "t1"
    ));
}

#[test]
fn test_initial_positions_seed_inventory() {
    let position = InitialPosition {
        account: Account::new("x1"),
        symbol: Symbol::new("XYZ_240119_C50"),
        instruction: Instruction::Sell,
        quantity: d("2"),
        cost: d("300"),
        as_of: at(10, 0),
    };
    let mut expire = Transaction::new(
        Account::new("x1"),
        "x",
        at(19, 16),
        RowType::Expire,
        Symbol::new("XYZ_240119_C50"),
        None,
        Decimal::zero(),
        Decimal::zero(),
    );
    expire.description = "Expired".to_string();

    let output = Compiler::default()
        .run(
            vec![buy("t1", at(5, 10), "1", "1"), expire],
            &[position],
            &ChainDatabase::default(),
        )
        .unwrap();

    let seed = &output.transactions[0];
    assert!(seed.transaction_id.starts_with("open-"));
    assert!(seed.datetime < at(5, 10));

    let expired = output
        .transactions
        .iter()
        .find(|t| t.transaction_id == "x")
        .unwrap();
    assert_eq!(expired.instruction, Some(Instruction::Buy));
    assert_eq!(expired.quantity, d("2"));
    assert_eq!(expired.match_id, seed.match_id);
    assert_eq!(output.positions.len(), 1);
    assert_eq!(output.positions[0].symbol, Symbol::new("XYZ"));
}

#[test]
fn test_conflicting_duplicates_abort() {
    let err = Compiler::default()
        .run(
            vec![buy("t1", at(2, 10), "1", "1"), buy("t1", at(2, 10), "2", "1")],
            &[],
            &ChainDatabase::default(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        tradechains::EngineError::DuplicateTransaction("t1".to_string())
    );
}
