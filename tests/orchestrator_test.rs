use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tempfile::TempDir;
use tradechains::{
    Account, AppError, Chain, ChainDatabase, ChainStatus, ChainStore, CsvTransactionSource,
    Decimal, EngineError, Instruction, JsonChainStore, MemoryChainStore, MockDataSource,
    Orchestrator, RowType, RunSettings, StoreError, Symbol, Transaction,
};

/// Store whose database loads fine but can never be written.
#[derive(Debug, Default)]
struct ReadOnlyStore;

#[async_trait]
impl ChainStore for ReadOnlyStore {
    async fn load(&self) -> Result<ChainDatabase, StoreError> {
        Ok(ChainDatabase::default())
    }

    async fn save(&self, _db: &ChainDatabase) -> Result<(), StoreError> {
        Err(StoreError::Io {
            path: "chains.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn trade(id: &str, time: NaiveDateTime, instruction: Instruction, qty: i64) -> Transaction {
    let cost = match instruction {
        Instruction::Buy => Decimal::from(-qty * 100),
        Instruction::Sell => Decimal::from(qty * 100),
    };
    Transaction::new(
        Account::new("x1"),
        id,
        time,
        RowType::Trade,
        Symbol::new("XYZ"),
        Some(instruction),
        Decimal::from(qty),
        cost,
    )
}

fn source() -> MockDataSource {
    MockDataSource::new().with_transactions(vec![
        trade("t1", at(2, 10), Instruction::Buy, 10),
        trade("t2", at(3, 10), Instruction::Sell, 4),
    ])
}

const CSV: &str = "\
account,transaction_id,datetime,row_type,order_id,symbol,effect,instruction,quantity,price,cost,commissions,fees,description
x1,t1,2024-01-02 10:00:00,Trade,o1,XYZ,,BUY,10,100,-1000,1,0.05,Bought XYZ
x1,t2,2024-01-03 10:00:00,Trade,o2,XYZ,,SELL,10,110,1100,1,0.05,Sold XYZ
";

#[tokio::test]
async fn test_run_saves_chains() {
    let store = MemoryChainStore::default();
    let orchestrator = Orchestrator::new(
        Arc::new(source()),
        Arc::new(store.clone()),
        RunSettings::default(),
    );

    let output = orchestrator.run().await.unwrap();
    assert_eq!(store.save_count().await, 1);
    assert_eq!(store.snapshot().await, output.chains);
    assert_eq!(output.chains.chains[0].status, ChainStatus::Active);

    // Nothing changed, so the second run does not rewrite the store.
    orchestrator.run().await.unwrap();
    assert_eq!(store.save_count().await, 1);
}

#[tokio::test]
async fn test_dry_run_leaves_store_alone() {
    let store = MemoryChainStore::default();
    let settings = RunSettings {
        dry_run: true,
        ..RunSettings::default()
    };
    let orchestrator = Orchestrator::new(Arc::new(source()), Arc::new(store.clone()), settings);

    let output = orchestrator.run().await.unwrap();
    assert_eq!(output.chains.chains.len(), 1);
    assert_eq!(store.save_count().await, 0);
    assert!(store.snapshot().await.chains.is_empty());
}

#[tokio::test]
async fn test_source_failure_writes_nothing() {
    let store = MemoryChainStore::default();
    let orchestrator = Orchestrator::new(
        Arc::new(source().with_failure("disk gone")),
        Arc::new(store.clone()),
        RunSettings::default(),
    );

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, AppError::DataSource(_)));
    assert_eq!(store.save_count().await, 0);
}

#[tokio::test]
async fn test_failed_save_writes_no_annotations() {
    let dir = TempDir::new().unwrap();
    let out_path = dir.path().join("annotated.csv");
    let settings = RunSettings {
        output_path: Some(out_path.clone()),
        ..RunSettings::default()
    };
    let orchestrator = Orchestrator::new(Arc::new(source()), Arc::new(ReadOnlyStore), settings);

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, AppError::Store(StoreError::Io { .. })));
    assert!(!out_path.exists());
}

#[tokio::test]
async fn test_fatal_engine_error_keeps_database_file() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("chains.json");
    let store = JsonChainStore::new(db_path.clone());
    store
        .save(&ChainDatabase::new(vec![
            Chain::new("held", ChainStatus::Final).with_ids(["t1"]),
        ]))
        .await
        .unwrap();
    let before = tokio::fs::read(&db_path).await.unwrap();

    let orchestrator = Orchestrator::new(
        Arc::new(source()),
        Arc::new(store),
        RunSettings::default(),
    );
    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Engine(EngineError::FinalChainNotFlat { .. })
    ));

    let after = tokio::fs::read(&db_path).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_csv_to_json_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("transactions.csv");
    let db_path = dir.path().join("chains.json");
    let out_path = dir.path().join("annotated.csv");
    tokio::fs::write(&csv_path, CSV).await.unwrap();

    let settings = RunSettings {
        output_path: Some(out_path.clone()),
        ..RunSettings::default()
    };
    let orchestrator = Orchestrator::new(
        Arc::new(CsvTransactionSource::new(csv_path)),
        Arc::new(JsonChainStore::new(db_path.clone())),
        settings,
    );

    orchestrator.run().await.unwrap();
    let first = tokio::fs::read_to_string(&db_path).await.unwrap();
    assert!(first.contains("\"chain_id\": \"x1.240102_100000.XYZ\""));
    assert!(first.contains("\"status\": \"CLOSED\""));

    orchestrator.run().await.unwrap();
    let second = tokio::fs::read_to_string(&db_path).await.unwrap();
    assert_eq!(first, second);

    let annotated = tokio::fs::read_to_string(&out_path).await.unwrap();
    assert!(annotated.contains("x1.240102_100000.XYZ"));
    assert!(annotated.contains("&t1"));
}
