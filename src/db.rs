// ==========================================
// 平衡轮库存系统 - SQLite 连接与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 + busy_timeout）
// - 幂等建表，记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启（退役时级联删除 OH 与状态历史依赖它）
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化全部表结构（幂等）
///
/// 约束对应:
/// - overhaul_record (component_code, sequence_number) 唯一
/// - component (tower_id, direction) 唯一
/// - spare_part (catalog, item_code) 唯一
/// - tower (line_id, tower_number, section_id) 唯一
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS line (
            line_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS section (
            section_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tower (
            tower_id INTEGER PRIMARY KEY AUTOINCREMENT,
            line_id INTEGER NOT NULL REFERENCES line(line_id) ON DELETE CASCADE,
            section_id INTEGER NOT NULL REFERENCES section(section_id) ON DELETE CASCADE,
            tower_number TEXT NOT NULL,
            asc_type_code TEXT,
            desc_type_code TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (line_id, tower_number, section_id)
        );

        CREATE TABLE IF NOT EXISTS component_type (
            code TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            total_quantity INTEGER NOT NULL DEFAULT 0 CHECK (total_quantity >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS component (
            code TEXT PRIMARY KEY,
            tower_id INTEGER NOT NULL REFERENCES tower(tower_id) ON DELETE CASCADE,
            direction TEXT NOT NULL,
            interval_hours INTEGER NOT NULL CHECK (interval_hours > 0),
            notes TEXT,
            registered_at TEXT NOT NULL,
            UNIQUE (tower_id, direction)
        );

        CREATE TABLE IF NOT EXISTS component_status_history (
            change_id TEXT PRIMARY KEY,
            component_code TEXT NOT NULL REFERENCES component(code) ON DELETE CASCADE,
            previous_state TEXT NOT NULL,
            new_state TEXT NOT NULL,
            action TEXT NOT NULL,
            notes TEXT,
            changed_at TEXT NOT NULL,
            actor TEXT
        );

        CREATE TABLE IF NOT EXISTS overhaul_record (
            record_id TEXT PRIMARY KEY,
            component_code TEXT NOT NULL REFERENCES component(code) ON DELETE CASCADE,
            sequence_number INTEGER NOT NULL CHECK (sequence_number > 0),
            overhaul_date TEXT NOT NULL,
            operating_hours INTEGER CHECK (operating_hours >= 0),
            backlog INTEGER,
            year INTEGER NOT NULL,
            weekday TEXT NOT NULL,
            line_name TEXT NOT NULL,
            tower_number TEXT NOT NULL,
            direction TEXT NOT NULL,
            type_code TEXT,
            interval_hours INTEGER NOT NULL,
            notes TEXT,
            recorded_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (component_code, sequence_number)
        );

        CREATE INDEX IF NOT EXISTS idx_overhaul_line_tower ON overhaul_record(line_name, tower_number);
        CREATE INDEX IF NOT EXISTS idx_overhaul_date ON overhaul_record(overhaul_date);

        CREATE TABLE IF NOT EXISTS spare_part (
            catalog TEXT NOT NULL,
            item_code TEXT NOT NULL,
            description TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            location TEXT,
            notes TEXT,
            received_at TEXT NOT NULL,
            last_movement_at TEXT NOT NULL,
            last_exit_at TEXT,
            PRIMARY KEY (catalog, item_code)
        );

        CREATE TABLE IF NOT EXISTS stock_movement (
            movement_id TEXT PRIMARY KEY,
            catalog TEXT NOT NULL,
            item_code TEXT NOT NULL,
            kind TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            resulting_balance INTEGER NOT NULL CHECK (resulting_balance >= 0),
            notes TEXT,
            actor TEXT,
            moved_at TEXT NOT NULL,
            FOREIGN KEY (catalog, item_code) REFERENCES spare_part(catalog, item_code) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_movement_item ON stock_movement(catalog, item_code);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
