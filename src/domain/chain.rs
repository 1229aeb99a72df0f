//! Chain and chain database types.
//!
//! A chain is a user-reviewable group of transactions representing one logical
//! trade. The chain database is the persisted, hand-editable set of chains plus
//! pending manual split directives.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Review status of a chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainStatus {
    /// Has an open position.
    #[default]
    Active,
    /// Net quantity is zero in every instrument.
    Closed,
    /// Accepted by the user; never touched by automatic processing.
    Final,
    /// Dismissed by the user; never touched by automatic processing.
    Ignore,
}

impl ChainStatus {
    /// Statuses only the user can assign, which the engine treats as frozen.
    pub fn is_fixed(&self) -> bool {
        matches!(self, ChainStatus::Final | ChainStatus::Ignore)
    }
}

/// User-entered annotations, preserved verbatim across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vol_implied: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vol_realized: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub xrefs: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub long_term: bool,
    /// Hand-entered keys with no dedicated field, written back untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ChainMetadata {
    /// True if the user has not annotated anything.
    pub fn is_empty(&self) -> bool {
        *self == ChainMetadata::default()
    }
}

/// A named group of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub chain_id: String,
    #[serde(default)]
    pub status: ChainStatus,
    #[serde(flatten)]
    pub metadata: ChainMetadata,
    /// User-curated transaction ids; authoritative.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    /// Transaction ids attached automatically; recomputed every run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_ids: Vec<String>,
}

impl Chain {
    pub fn new(chain_id: impl Into<String>, status: ChainStatus) -> Self {
        Self {
            chain_id: chain_id.into(),
            status,
            metadata: ChainMetadata::default(),
            ids: Vec::new(),
            auto_ids: Vec::new(),
        }
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auto_ids<I, S>(mut self, auto_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auto_ids = auto_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Every transaction id the chain references, user-curated first.
    pub fn all_ids(&self) -> impl Iterator<Item = &String> {
        self.ids.iter().chain(self.auto_ids.iter())
    }
}

/// One part of a manual split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPart {
    pub id: String,
    pub quantity: Decimal,
}

/// A user directive partitioning one transaction into several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDirective {
    /// Id of the transaction to split.
    pub id: String,
    pub parts: Vec<SplitPart>,
}

/// The persisted set of chains plus pending split directives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDatabase {
    #[serde(default)]
    pub chains: Vec<Chain>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub split_transactions: Vec<SplitDirective>,
}

impl ChainDatabase {
    pub fn new(chains: Vec<Chain>) -> Self {
        Self {
            chains,
            split_transactions: Vec::new(),
        }
    }

    pub fn get(&self, chain_id: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    pub fn get_mut(&mut self, chain_id: &str) -> Option<&mut Chain> {
        self.chains.iter_mut().find(|c| c.chain_id == chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_omitted() {
        let chain = Chain::new("x1.240102_100000.XYZ", ChainStatus::Closed).with_auto_ids(["t1"]);
        let json = serde_json::to_value(&chain).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "chain_id": "x1.240102_100000.XYZ",
                "status": "CLOSED",
                "auto_ids": ["t1"],
            })
        );
    }

    #[test]
    fn test_metadata_roundtrip_is_flat() {
        let raw = r#"{
            "chain_id": "c1",
            "status": "FINAL",
            "group": "income",
            "strategy": "Vertical",
            "tags": ["earnings"],
            "target": "0.5",
            "ids": ["t1", "t2"]
        }"#;
        let chain: Chain = serde_json::from_str(raw).unwrap();
        assert_eq!(chain.status, ChainStatus::Final);
        assert_eq!(chain.metadata.group.as_deref(), Some("income"));
        assert_eq!(chain.metadata.tags, vec!["earnings".to_string()]);
        assert_eq!(chain.ids, vec!["t1".to_string(), "t2".to_string()]);
        assert!(chain.auto_ids.is_empty());
        assert!(!chain.metadata.is_empty());
    }

    #[test]
    fn test_unknown_keys_survive_rewrite() {
        let raw = r#"{"chain_id":"c1","status":"ACTIVE","broker_note":"rolled twice","rating":3,"ids":["t1"]}"#;
        let chain: Chain = serde_json::from_str(raw).unwrap();
        assert_eq!(
            chain.metadata.extra.get("broker_note"),
            Some(&serde_json::json!("rolled twice"))
        );
        assert!(!chain.metadata.is_empty());
        assert!(!chain.metadata.extra.contains_key("ids"));

        let json = serde_json::to_value(&chain).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "chain_id": "c1",
                "status": "ACTIVE",
                "broker_note": "rolled twice",
                "rating": 3,
                "ids": ["t1"],
            })
        );
    }

    #[test]
    fn test_status_defaults_to_active() {
        let chain: Chain = serde_json::from_str(r#"{"chain_id": "c1"}"#).unwrap();
        assert_eq!(chain.status, ChainStatus::Active);
        assert!(chain.metadata.is_empty());
    }

    #[test]
    fn test_fixed_statuses() {
        assert!(ChainStatus::Final.is_fixed());
        assert!(ChainStatus::Ignore.is_fixed());
        assert!(!ChainStatus::Active.is_fixed());
        assert!(!ChainStatus::Closed.is_fixed());
    }

    #[test]
    fn test_database_split_directives() {
        let raw = r#"{
            "chains": [],
            "split_transactions": [
                {"id": "t1", "parts": [{"id": "t1a", "quantity": "4"}, {"id": "t1b", "quantity": "6"}]}
            ]
        }"#;
        let db: ChainDatabase = serde_json::from_str(raw).unwrap();
        assert_eq!(db.split_transactions.len(), 1);
        assert_eq!(db.split_transactions[0].parts[1].quantity, Decimal::from(6));
    }
}
