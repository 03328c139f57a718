use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;

use crate::models::hint::{select_next_level, HintAdvance, HintKey, HintLevel};

/// Per-(student, question) record of disclosed hint levels.
///
/// `advance` must pick the next level and append it as one atomic step, so two
/// concurrent requests for the same pair never both see the same "last" level.
#[async_trait]
pub trait HintLedger: Send + Sync {
    async fn advance(&self, key: &HintKey, requested: Option<i64>) -> Result<HintAdvance>;

    /// Withdraws an advance whose hint was never delivered. Only applies while
    /// that advance is still the newest entry. Returns whether it was removed.
    async fn rollback(&self, key: &HintKey, advance: &HintAdvance) -> Result<bool>;

    async fn history(&self, key: &HintKey) -> Result<Vec<HintLevel>>;

    /// Forgets the history of one question. Returns whether anything was stored.
    async fn reset(&self, key: &HintKey) -> Result<bool>;

    /// Hints disclosed so far, per level number.
    async fn level_counts(&self) -> Result<BTreeMap<u8, u64>>;

    fn backend(&self) -> &'static str;
}

fn empty_counts() -> BTreeMap<u8, u64> {
    HintLevel::ALL.iter().map(|level| (level.number(), 0)).collect()
}

#[derive(Default)]
struct LedgerState {
    histories: HashMap<HintKey, Vec<HintLevel>>,
    counts: BTreeMap<u8, u64>,
}

/// Process-local ledger. Histories live as long as the process.
#[derive(Default)]
pub struct InMemoryHintLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryHintLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HintLedger for InMemoryHintLedger {
    async fn advance(&self, key: &HintKey, requested: Option<i64>) -> Result<HintAdvance> {
        let mut state = self.state.lock();
        let history = state.histories.entry(key.clone()).or_default();
        let level = select_next_level(history, requested);
        history.push(level);
        let history_len = history.len();
        *state.counts.entry(level.number()).or_insert(0) += 1;

        Ok(HintAdvance { level, history_len })
    }

    async fn rollback(&self, key: &HintKey, advance: &HintAdvance) -> Result<bool> {
        let mut state = self.state.lock();
        let Some(history) = state.histories.get_mut(key) else {
            return Ok(false);
        };
        if history.len() != advance.history_len || history.last() != Some(&advance.level) {
            return Ok(false);
        }

        history.pop();
        if history.is_empty() {
            state.histories.remove(key);
        }
        if let Some(count) = state.counts.get_mut(&advance.level.number()) {
            *count = count.saturating_sub(1);
        }
        Ok(true)
    }

    async fn history(&self, key: &HintKey) -> Result<Vec<HintLevel>> {
        Ok(self
            .state
            .lock()
            .histories
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn reset(&self, key: &HintKey) -> Result<bool> {
        Ok(self.state.lock().histories.remove(key).is_some())
    }

    async fn level_counts(&self) -> Result<BTreeMap<u8, u64>> {
        let mut counts = empty_counts();
        counts.extend(self.state.lock().counts.iter().map(|(k, v)| (*k, *v)));
        Ok(counts)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

const STATS_KEY: &str = "hint_levels:stats";

// Same window as select_next_level: repeat the last level or take the next one, 1..=4
const ADVANCE_SCRIPT: &str = r#"
    local key = KEYS[1]
    local stats_key = KEYS[2]
    local requested = ARGV[1]
    local ttl = tonumber(ARGV[2])
    local max_level = tonumber(ARGV[3])

    local last = 0
    local raw = redis.call('LINDEX', key, -1)
    if raw then
        last = tonumber(raw)
    end

    local ceiling = math.min(last + 1, max_level)
    local level = ceiling
    if requested ~= '' then
        local floor = math.max(last, 1)
        level = math.max(floor, math.min(tonumber(requested), ceiling))
    end

    local len = redis.call('RPUSH', key, level)
    redis.call('EXPIRE', key, ttl)
    redis.call('HINCRBY', stats_key, level, 1)

    return {level, len}
"#;

const ROLLBACK_SCRIPT: &str = r#"
    local key = KEYS[1]
    local stats_key = KEYS[2]
    local level = ARGV[1]
    local expected_len = tonumber(ARGV[2])

    if redis.call('LLEN', key) ~= expected_len then
        return 0
    end
    if redis.call('LINDEX', key, -1) ~= level then
        return 0
    end

    redis.call('RPOP', key)
    if tonumber(redis.call('HINCRBY', stats_key, level, -1)) < 0 then
        redis.call('HSET', stats_key, level, 0)
    end
    return 1
"#;

/// Redis-backed ledger, shared by all API replicas. Histories expire after `ttl_seconds`.
pub struct RedisHintLedger {
    redis: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisHintLedger {
    pub fn new(redis: ConnectionManager, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    fn history_key(key: &HintKey) -> String {
        format!("hint_levels:{}:{}", key.student_id, key.question_id)
    }
}

#[async_trait]
impl HintLedger for RedisHintLedger {
    async fn advance(&self, key: &HintKey, requested: Option<i64>) -> Result<HintAdvance> {
        let mut conn = self.redis.clone();
        let requested_arg = requested.map(|r| r.to_string()).unwrap_or_default();

        let (level, len): (i64, i64) = redis::Script::new(ADVANCE_SCRIPT)
            .key(Self::history_key(key))
            .key(STATS_KEY)
            .arg(requested_arg)
            .arg(self.ttl_seconds)
            .arg(i64::from(HintLevel::MAX.number()))
            .invoke_async(&mut conn)
            .await
            .context("Failed to execute hint advance Lua script")?;

        Ok(HintAdvance {
            level: HintLevel::clamped(level),
            history_len: len.max(0) as usize,
        })
    }

    async fn rollback(&self, key: &HintKey, advance: &HintAdvance) -> Result<bool> {
        let mut conn = self.redis.clone();

        let removed: i64 = redis::Script::new(ROLLBACK_SCRIPT)
            .key(Self::history_key(key))
            .key(STATS_KEY)
            .arg(advance.level.number().to_string())
            .arg(advance.history_len)
            .invoke_async(&mut conn)
            .await
            .context("Failed to execute hint rollback Lua script")?;

        Ok(removed == 1)
    }

    async fn history(&self, key: &HintKey) -> Result<Vec<HintLevel>> {
        let mut conn = self.redis.clone();

        let raw: Vec<i64> = redis::cmd("LRANGE")
            .arg(Self::history_key(key))
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .context("Failed to read hint history")?;

        Ok(raw.into_iter().map(HintLevel::clamped).collect())
    }

    async fn reset(&self, key: &HintKey) -> Result<bool> {
        let mut conn = self.redis.clone();

        let removed: i64 = redis::cmd("DEL")
            .arg(Self::history_key(key))
            .query_async(&mut conn)
            .await
            .context("Failed to reset hint history")?;

        Ok(removed > 0)
    }

    async fn level_counts(&self) -> Result<BTreeMap<u8, u64>> {
        let mut conn = self.redis.clone();

        let raw: HashMap<String, u64> = redis::cmd("HGETALL")
            .arg(STATS_KEY)
            .query_async(&mut conn)
            .await
            .context("Failed to read hint level counters")?;

        let mut counts = empty_counts();
        for (level, count) in raw {
            if let Ok(level) = level.parse::<u8>() {
                counts.insert(level, count);
            }
        }
        Ok(counts)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
