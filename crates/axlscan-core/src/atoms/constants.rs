// ── axlscan Atoms: Constants ───────────────────────────────────────────────
// Named defaults for the whole workspace. Runtime values come from
// `ExplorerConfig`; these are the fallbacks it starts from.

// ── Denominations ──────────────────────────────────────────────────────────

/// Decimals assumed for a denom that is missing from the registry.
pub const DEFAULT_DECIMALS: u32 = 6;

/// Native staking / fee denom of the network.
pub const NATIVE_DENOM: &str = "uaxl";

// ── Addresses ──────────────────────────────────────────────────────────────

pub const ACCOUNT_PREFIX: &str = "axelar";
pub const OPERATOR_PREFIX: &str = "axelarvaloper";
pub const CONSENSUS_PREFIX: &str = "axelarvalcons";

// ── Transaction decoding ───────────────────────────────────────────────────

/// Suffix stripped from message type names ("LinkRequest" → "Link").
pub const TX_TYPE_SUFFIX: &str = "Request";

/// Event types that only mirror a `transfer` and would duplicate activities.
pub const IGNORED_ACTIVITY_EVENTS: &[&str] = &["coin_spent", "coin_received", "tx"];

/// Attribute keys that may carry the sender of an event.
pub const SENDER_KEYS: &[&str] = &["sender", "signer", "from", "spender", "from_address"];

/// Attribute keys that may carry a recipient of an event.
pub const RECIPIENT_KEYS: &[&str] = &[
    "recipient",
    "receiver",
    "to",
    "to_address",
    "destination_address",
    "validator",
];

// ── Pagination ─────────────────────────────────────────────────────────────

/// Default `pagination.limit` for LCD list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Safety bound on page requests per "all-X" fetch.
pub const DEFAULT_MAX_PAGES: usize = 1_000;

/// Above this many transactions, an unbounded event search stops paging.
pub const TRANSACTIONS_CAP: usize = 500;

/// Page size used by the incremental transaction view.
pub const TX_PAGE_SIZE: u64 = 25;

// ── Validator metrics ──────────────────────────────────────────────────────

/// Trailing block window for uptime sampling.
pub const NUM_UPTIME_BLOCKS: u64 = 10_000;

/// Trailing block window for heartbeat participation.
pub const NUM_HEARTBEAT_BLOCKS: u64 = 10_000;

/// One heartbeat is expected per this many blocks.
pub const NUM_BLOCKS_PER_HEARTBEAT: u64 = 50;

/// Trailing block window for EVM vote tallies.
pub const NUM_EVM_VOTES_BLOCKS: u64 = 10_000;

/// `maxMissed` used when slashing params are unavailable.
pub const DEFAULT_MAX_MISSED_BLOCKS: u64 = 500;

/// Sentinel for "jailed at least once but never recovered".
pub const NO_RECOVERY_SENTINEL: i64 = -1;

// ── Polling ────────────────────────────────────────────────────────────────

/// Live feeds (latest blocks, latest transactions).
pub const LIVE_POLL_SECS: u64 = 5;

/// Slow aggregates (validator metrics, leaderboard).
pub const SLOW_POLL_SECS: u64 = 300;
