// axlscan core: EVM command batches
// Status parsing, the signing/execution state machine, and the staleness
// rule that decides which batches still need polling.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::atoms::types::{Batch, BatchStatus, Command};

impl BatchStatus {
    /// Accepts both `SIGNED` and `BATCHED_COMMANDS_STATUS_SIGNED`.
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        let tail = upper.rsplit('_').next().unwrap_or_default();
        match tail {
            "SIGNING" => BatchStatus::Signing,
            "SIGNED" => BatchStatus::Signed,
            "ABORTED" => BatchStatus::Aborted,
            _ => BatchStatus::Unknown,
        }
    }

    fn progress(self) -> u8 {
        match self {
            BatchStatus::Unknown => 0,
            BatchStatus::Signing => 1,
            BatchStatus::Signed => 2,
            BatchStatus::Aborted => 3,
        }
    }
}

/// Derived lifecycle state: `Signing → Signed → Executed | Unexecuted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Signing,
    /// Signed, but no commands decoded yet.
    Signed,
    /// Signed and every command executed on the destination chain.
    Executed,
    /// Signed with at least one command not yet executed.
    Unexecuted,
    Aborted,
    Unknown,
}

pub fn batch_state(batch: &Batch) -> BatchState {
    match batch.status {
        BatchStatus::Signing => BatchState::Signing,
        BatchStatus::Aborted => BatchState::Aborted,
        BatchStatus::Unknown => BatchState::Unknown,
        BatchStatus::Signed if batch.commands.is_empty() => BatchState::Signed,
        BatchStatus::Signed if batch.commands.iter().all(|c| c.executed) => BatchState::Executed,
        BatchStatus::Signed => BatchState::Unexecuted,
    }
}

/// Whether the batch must be fetched again on the next poll cycle.
/// Only executed and aborted batches with decoded commands are final.
pub fn needs_repoll(batch: &Batch) -> bool {
    if batch.commands.is_empty() {
        return true;
    }
    !matches!(batch_state(batch), BatchState::Executed | BatchState::Aborted)
}

pub fn stale_batches<'a>(batches: impl IntoIterator<Item = &'a Batch>) -> Vec<&'a Batch> {
    batches.into_iter().filter(|b| needs_repoll(b)).collect()
}

/// Merge a fresh fetch into the known batch. Execution flags only move from
/// false to true and the status never moves backwards, so a lagging backend
/// node cannot undo progress already observed.
pub fn merge_batch(known: &Batch, fresh: Batch) -> Batch {
    let status = if fresh.status.progress() >= known.status.progress() { fresh.status } else { known.status };

    let mut commands = fresh.commands;
    for cmd in commands.iter_mut() {
        if let Some(prev) = known.commands.iter().find(|c| c.id == cmd.id) {
            cmd.executed |= prev.executed;
            if cmd.transaction_hash.is_none() {
                cmd.transaction_hash = prev.transaction_hash.clone();
            }
        }
    }
    // A fresh response without decoded commands keeps the ones we had.
    if commands.is_empty() {
        commands = known.commands.clone();
    }

    if status != fresh.status {
        debug!("[batches] {} status regressed to {:?}, keeping {:?}", known.batch_id, fresh.status, status);
    }
    Batch { batch_id: known.batch_id.clone(), chain: known.chain.clone(), status, commands }
}

/// Parse a batch document from the LCD or the search index. Commands may be
/// embedded objects or bare `command_ids`.
pub fn batch_from_value(chain: &str, v: &Value) -> Option<Batch> {
    let batch_id = v
        .get("batch_id")
        .or_else(|| v.get("id"))
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())?
        .to_string();

    let status = v.get("status").and_then(|s| s.as_str()).map(BatchStatus::parse).unwrap_or(BatchStatus::Unknown);

    let commands = match v.get("commands").and_then(|c| c.as_array()) {
        Some(list) => list.iter().filter_map(|c| serde_json::from_value::<Command>(c.clone()).ok()).collect(),
        None => v
            .get("command_ids")
            .and_then(|c| c.as_array())
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| id.as_str())
                    .map(|id| Command { id: id.to_string(), ..Default::default() })
                    .collect()
            })
            .unwrap_or_default(),
    };

    let chain = v.get("chain").and_then(|c| c.as_str()).unwrap_or(chain).to_lowercase();
    Some(Batch { batch_id, chain, status, commands })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cmd(id: &str, executed: bool) -> Command {
        Command { id: id.into(), command_type: "approveContractCall".into(), executed, ..Default::default() }
    }

    fn batch(status: BatchStatus, commands: Vec<Command>) -> Batch {
        Batch { batch_id: "b1".into(), chain: "ethereum".into(), status, commands }
    }

    #[test]
    fn status_parsing() {
        assert_eq!(BatchStatus::parse("BATCHED_COMMANDS_STATUS_SIGNING"), BatchStatus::Signing);
        assert_eq!(BatchStatus::parse("signed"), BatchStatus::Signed);
        assert_eq!(BatchStatus::parse("BATCHED_COMMANDS_STATUS_ABORTED"), BatchStatus::Aborted);
        assert_eq!(BatchStatus::parse(""), BatchStatus::Unknown);
    }

    #[test]
    fn staleness_rule() {
        assert!(needs_repoll(&batch(BatchStatus::Signing, vec![cmd("a", false)])));
        assert!(needs_repoll(&batch(BatchStatus::Signed, vec![cmd("a", true), cmd("b", false)])));
        assert!(needs_repoll(&batch(BatchStatus::Signed, vec![])));
        assert!(!needs_repoll(&batch(BatchStatus::Signed, vec![cmd("a", true)])));
        assert!(!needs_repoll(&batch(BatchStatus::Aborted, vec![cmd("a", false)])));
        assert_eq!(batch_state(&batch(BatchStatus::Signed, vec![cmd("a", true)])), BatchState::Executed);
    }

    #[test]
    fn executed_batches_drop_out() {
        let done = batch(BatchStatus::Signed, vec![cmd("a", true)]);
        let pending = batch(BatchStatus::Signing, vec![cmd("a", false)]);
        let stale = stale_batches([&done, &pending]);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].status, BatchStatus::Signing);
    }

    #[test]
    fn merge_is_monotone() {
        let mut known = batch(BatchStatus::Signed, vec![cmd("a", true), cmd("b", false)]);
        known.commands[0].transaction_hash = Some("0xabc".into());
        let fresh = batch(BatchStatus::Signing, vec![cmd("a", false), cmd("b", true)]);
        let merged = merge_batch(&known, fresh);
        assert_eq!(merged.status, BatchStatus::Signed);
        assert!(merged.commands.iter().all(|c| c.executed));
        assert_eq!(merged.commands[0].transaction_hash.as_deref(), Some("0xabc"));
    }

    #[test]
    fn parse_from_lcd_document() {
        let v = json!({
            "id": "7f3a",
            "status": "BATCHED_COMMANDS_STATUS_SIGNED",
            "command_ids": ["c1", "c2"]
        });
        let b = batch_from_value("Ethereum", &v).unwrap();
        assert_eq!(b.chain, "ethereum");
        assert_eq!(b.commands.len(), 2);
        assert!(needs_repoll(&b));
        assert!(batch_from_value("ethereum", &json!({ "status": "SIGNED" })).is_none());
    }

    #[test]
    fn null_command_fields_read_as_unset() {
        let v = json!({
            "batch_id": "b9",
            "status": "BATCHED_COMMANDS_STATUS_SIGNED",
            "commands": [
                { "id": "c1", "type": null, "executed": null, "transactionHash": null },
                { "id": "c2", "type": "mintToken", "executed": true }
            ]
        });
        let b = batch_from_value("ethereum", &v).unwrap();
        assert_eq!(b.commands.len(), 2);
        assert!(!b.commands[0].executed);
        assert_eq!(b.commands[0].command_type, "");
        assert_eq!(batch_state(&b), BatchState::Unexecuted);
    }
}
