// ==========================================
// 平衡轮库存系统 - SQL 耗时观测
// ==========================================
// 看板 / 导出以 PerfSpan 包裹，结束时输出语句数、SQL 总耗时与慢 SQL 数
// 统计来自 SQLite profile 回调，只对安装过回调的连接生效
// ==========================================

use rusqlite::Connection;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const ENABLED_ENV: &str = "BALANCIN_PERF_SQL";
const SLOW_MS_ENV: &str = "BALANCIN_SLOW_SQL_MS";
const SQL_LOG_CHARS: usize = 400;

// 0 表示不判定慢 SQL
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

/// 观测开关与慢 SQL 阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlProfileSettings {
    pub enabled: bool,
    pub slow_threshold_ms: u64,
}

impl Default for SqlProfileSettings {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self { enabled: true, slow_threshold_ms: 50 }
        } else {
            Self { enabled: false, slow_threshold_ms: 200 }
        }
    }
}

impl SqlProfileSettings {
    /// 读取 BALANCIN_PERF_SQL / BALANCIN_SLOW_SQL_MS，缺省或无法解析时取默认值
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(ENABLED_ENV).ok().as_deref(),
            std::env::var(SLOW_MS_ENV).ok().as_deref(),
        )
    }

    fn from_vars(enabled: Option<&str>, slow_ms: Option<&str>) -> Self {
        let defaults = Self::default();
        Self {
            enabled: enabled.map(is_flag_on).unwrap_or(defaults.enabled),
            slow_threshold_ms: slow_ms
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.slow_threshold_ms),
        }
    }
}

fn is_flag_on(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// 为连接安装（或移除）profile 回调
pub fn install_sql_profiling(conn: &mut Connection, settings: SqlProfileSettings) {
    if !settings.enabled {
        conn.profile(None);
        return;
    }
    SLOW_SQL_MS.store(settings.slow_threshold_ms, Ordering::Relaxed);
    conn.profile(Some(on_statement_finished));
    tracing::debug!(slow_threshold_ms = settings.slow_threshold_ms, "SQL 耗时观测已开启");
}

/// 观测区间内的 SQL 累计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlTally {
    pub statements: u64,
    pub slow_statements: u64,
    pub sql_time: Duration,
}

impl SqlTally {
    fn absorb(&mut self, inner: SqlTally) {
        self.statements += inner.statements;
        self.slow_statements += inner.slow_statements;
        self.sql_time += inner.sql_time;
    }
}

thread_local! {
    // 当前线程打开的区间；内层结束时并入外层
    static OPEN_SPANS: RefCell<Vec<SqlTally>> = RefCell::new(Vec::new());
}

fn on_statement_finished(sql: &str, elapsed: Duration) {
    let elapsed_ms = elapsed.as_millis() as u64;
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    let slow = threshold > 0 && elapsed_ms >= threshold;
    if slow {
        tracing::warn!(
            target: "slow_sql",
            duration_ms = elapsed_ms,
            sql = %shorten_sql(sql, SQL_LOG_CHARS),
            "慢 SQL"
        );
    }
    OPEN_SPANS.with(|spans| {
        if let Some(current) = spans.borrow_mut().last_mut() {
            current.absorb(SqlTally {
                statements: 1,
                slow_statements: u64::from(slow),
                sql_time: elapsed,
            });
        }
    });
}

/// 压缩空白并按字符截断
fn shorten_sql(sql: &str, max_chars: usize) -> String {
    let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut short: String = collapsed.chars().take(max_chars).collect();
    short.push('…');
    short
}

/// 耗时观测区间，drop 时输出 target = "perf" 的统计日志
///
/// ```ignore
/// let _perf = PerfSpan::enter("dashboard.overhaul");
/// ```
pub struct PerfSpan {
    op: &'static str,
    started: Instant,
}

impl PerfSpan {
    pub fn enter(op: &'static str) -> Self {
        OPEN_SPANS.with(|spans| spans.borrow_mut().push(SqlTally::default()));
        Self {
            op,
            started: Instant::now(),
        }
    }

    /// 最内层区间到目前为止的累计
    pub fn tally(&self) -> SqlTally {
        OPEN_SPANS.with(|spans| spans.borrow().last().copied().unwrap_or_default())
    }
}

impl Drop for PerfSpan {
    fn drop(&mut self) {
        let tally = OPEN_SPANS.with(|spans| {
            let mut spans = spans.borrow_mut();
            let tally = spans.pop().unwrap_or_default();
            if let Some(outer) = spans.last_mut() {
                outer.absorb(tally);
            }
            tally
        });
        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            sql_count = tally.statements,
            sql_ms = tally.sql_time.as_millis() as u64,
            slow_sql_count = tally.slow_statements,
            "完成"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_vars() {
        let on = SqlProfileSettings::from_vars(Some(" ON "), Some("120"));
        assert_eq!(on, SqlProfileSettings { enabled: true, slow_threshold_ms: 120 });

        let off = SqlProfileSettings::from_vars(Some("0"), Some("abc"));
        assert!(!off.enabled);
        assert_eq!(off.slow_threshold_ms, SqlProfileSettings::default().slow_threshold_ms);

        assert_eq!(SqlProfileSettings::from_vars(None, None), SqlProfileSettings::default());
    }

    #[test]
    fn test_shorten_sql() {
        assert_eq!(shorten_sql("SELECT *\n  FROM line", 100), "SELECT * FROM line");
        let short = shorten_sql("SELECT 'Línea' FROM line", 10);
        assert_eq!(short, "SELECT 'Lí…");
    }

    #[test]
    fn test_spans_count_statements_and_nest() {
        let mut conn = Connection::open_in_memory().unwrap();
        install_sql_profiling(
            &mut conn,
            SqlProfileSettings { enabled: true, slow_threshold_ms: 0 },
        );

        let outer = PerfSpan::enter("outer");
        conn.execute("CREATE TABLE t (x INTEGER)", []).unwrap();
        let inner_count = {
            let inner = PerfSpan::enter("inner");
            conn.execute("INSERT INTO t VALUES (1)", []).unwrap();
            let count = inner.tally().statements;
            assert!(count >= 1);
            count
        };
        let total = outer.tally();
        assert!(total.statements > inner_count);
        drop(outer);

        // 无打开区间时不累计
        conn.execute("INSERT INTO t VALUES (2)", []).unwrap();
        assert_eq!(OPEN_SPANS.with(|s| s.borrow().len()), 0);
    }
}
