// ==========================================
// 平衡轮库存系统 - OH 记录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 记录只追加；backlog/年份/星期/快照由调用方的构造闭包给出
// ==========================================

use crate::domain::component::ComponentView;
use crate::domain::overhaul::OverhaulRecord;
use crate::domain::types::Direction;
use crate::repository::component_repo::find_view_in;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{format_date, format_timestamp, parse_date, parse_enum, parse_timestamp};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const OVERHAUL_COLUMNS: &str = r#"
    record_id, component_code, sequence_number,
    overhaul_date, operating_hours, backlog, year, weekday,
    line_name, tower_number, direction, type_code, interval_hours,
    notes, recorded_by, created_at
"#;

/// OH 记录计数（看板）
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct OverhaulRecordCounts {
    pub total: i64,
    pub first: i64,  // sequence_number = 1
    pub second: i64, // sequence_number = 2
    pub third: i64,  // sequence_number = 3
}

// ==========================================
// OverhaulRepository - OH 记录仓储
// ==========================================
pub struct OverhaulRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OverhaulRepository {
    /// 创建新的 OverhaulRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条 OH 记录
    ///
    /// 在 IMMEDIATE 事务内: 读取平衡轮当前视图 -> 序号查重 -> `build` 生成记录 -> 写入
    ///
    /// # 返回
    /// - Err(NotFound): 平衡轮不存在
    /// - Err(DuplicateSequence): (平衡轮, 序号) 已存在，既有记录不变
    pub fn append_with<F>(
        &self,
        component_code: &str,
        sequence_number: i64,
        build: F,
    ) -> RepositoryResult<OverhaulRecord>
    where
        F: FnOnce(&ComponentView) -> OverhaulRecord,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let view = find_view_in(&tx, component_code)?
            .ok_or_else(|| RepositoryError::not_found("Component", component_code))?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM overhaul_record WHERE component_code = ?1 AND sequence_number = ?2",
                params![component_code, sequence_number],
                |_| Ok(()),
            )
            .optional()?;
        if exists.is_some() {
            return Err(RepositoryError::DuplicateSequence {
                component_code: component_code.to_string(),
                sequence_number,
            });
        }

        let record = build(&view);
        tx.execute(
            &format!(
                "INSERT INTO overhaul_record ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                OVERHAUL_COLUMNS
            ),
            params![
                record.record_id,
                record.component_code,
                record.sequence_number,
                format_date(&record.overhaul_date),
                record.operating_hours,
                record.backlog,
                record.year,
                record.weekday,
                record.line_name,
                record.tower_number,
                record.direction.to_db_str(),
                record.type_code,
                record.interval_hours,
                record.notes,
                record.recorded_by,
                format_timestamp(&record.created_at),
            ],
        )?;

        tx.commit()?;
        Ok(record)
    }

    /// 序号最大的记录
    pub fn find_latest(&self, component_code: &str) -> RepositoryResult<Option<OverhaulRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM overhaul_record WHERE component_code = ?1 ORDER BY sequence_number DESC LIMIT 1",
            OVERHAUL_COLUMNS
        );
        let record = conn
            .query_row(&sql, params![component_code], map_overhaul)
            .optional()?;
        Ok(record)
    }

    /// 全部记录（序号升序）
    pub fn list_by_component(&self, component_code: &str) -> RepositoryResult<Vec<OverhaulRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM overhaul_record WHERE component_code = ?1 ORDER BY sequence_number ASC",
            OVERHAUL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![component_code], map_overhaul)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 最近 `limit` 条（按序号），结果按序号升序返回
    pub fn list_latest(&self, component_code: &str, limit: usize) -> RepositoryResult<Vec<OverhaulRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM overhaul_record WHERE component_code = ?1 ORDER BY sequence_number DESC LIMIT ?2",
            OVERHAUL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut records = stmt
            .query_map(params![component_code, limit as i64], map_overhaul)?
            .collect::<Result<Vec<_>, _>>()?;
        records.reverse();
        Ok(records)
    }

    pub fn max_sequence(&self, component_code: &str) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        let max = conn.query_row(
            "SELECT MAX(sequence_number) FROM overhaul_record WHERE component_code = ?1",
            params![component_code],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    /// 每个平衡轮序号最大的记录
    pub fn latest_by_component(&self) -> RepositoryResult<HashMap<String, OverhaulRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM overhaul_record o
            WHERE o.sequence_number = (
                SELECT MAX(i.sequence_number) FROM overhaul_record i
                WHERE i.component_code = o.component_code
            )
            "#,
            OVERHAUL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], map_overhaul)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records
            .into_iter()
            .map(|r| (r.component_code.clone(), r))
            .collect())
    }

    /// 每个平衡轮最近 `limit` 条记录（各自按序号升序）
    pub fn recent_by_component(&self, limit: usize) -> RepositoryResult<HashMap<String, Vec<OverhaulRecord>>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM (
                SELECT *, ROW_NUMBER() OVER (
                    PARTITION BY component_code ORDER BY sequence_number DESC
                ) AS rn
                FROM overhaul_record
            )
            WHERE rn <= ?1
            ORDER BY component_code, sequence_number ASC
            "#,
            OVERHAUL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit as i64], map_overhaul)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut grouped: HashMap<String, Vec<OverhaulRecord>> = HashMap::new();
        for record in rows {
            grouped
                .entry(record.component_code.clone())
                .or_default()
                .push(record);
        }
        Ok(grouped)
    }

    pub fn counts(&self) -> RepositoryResult<OverhaulRecordCounts> {
        let conn = self.get_conn()?;
        let counts = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN sequence_number = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN sequence_number = 2 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN sequence_number = 3 THEN 1 ELSE 0 END), 0)
            FROM overhaul_record
            "#,
            [],
            |row| {
                Ok(OverhaulRecordCounts {
                    total: row.get(0)?,
                    first: row.get(1)?,
                    second: row.get(2)?,
                    third: row.get(3)?,
                })
            },
        )?;
        Ok(counts)
    }
}

fn map_overhaul(row: &Row<'_>) -> rusqlite::Result<OverhaulRecord> {
    Ok(OverhaulRecord {
        record_id: row.get(0)?,
        component_code: row.get(1)?,
        sequence_number: row.get(2)?,
        overhaul_date: parse_date(3, &row.get::<_, String>(3)?)?,
        operating_hours: row.get(4)?,
        backlog: row.get(5)?,
        year: row.get(6)?,
        weekday: row.get(7)?,
        line_name: row.get(8)?,
        tower_number: row.get(9)?,
        direction: parse_enum(10, &row.get::<_, String>(10)?, Direction::from_str)?,
        type_code: row.get(11)?,
        interval_hours: row.get(12)?,
        notes: row.get(13)?,
        recorded_by: row.get(14)?,
        created_at: parse_timestamp(15, &row.get::<_, String>(15)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::component::Component;
    use crate::repository::catalog_repo::{CatalogRepository, NewTower};
    use crate::repository::component_repo::ComponentRepository;
    use crate::repository::row_codec::now_timestamp;
    use chrono::{Datelike, NaiveDate};

    fn setup() -> OverhaulRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let catalog = CatalogRepository::from_connection(conn.clone());
        let components = ComponentRepository::from_connection(conn.clone());

        let line = catalog.insert_line("L1", None).unwrap();
        let section = catalog.insert_section("S1").unwrap();
        let tower = catalog
            .insert_tower(&NewTower {
                line_id: line.line_id,
                section_id: section.section_id,
                tower_number: "4".to_string(),
                asc_type_code: Some("16N".to_string()),
                desc_type_code: None,
                notes: None,
            })
            .unwrap();
        components
            .install(
                &Component {
                    code: "BAL-16N-001".to_string(),
                    tower_id: tower.tower_id,
                    direction: Direction::Ascending,
                    interval_hours: 30_000,
                    notes: None,
                    registered_at: now_timestamp(),
                },
                "tester",
            )
            .unwrap();
        OverhaulRepository::from_connection(conn)
    }

    fn build(seq: i64, hours: i64) -> impl FnOnce(&ComponentView) -> OverhaulRecord {
        move |view: &ComponentView| {
            let date = NaiveDate::from_ymd_opt(2024, 1, seq as u32).unwrap();
            OverhaulRecord {
                record_id: uuid::Uuid::new_v4().to_string(),
                component_code: view.component.code.clone(),
                sequence_number: seq,
                overhaul_date: date,
                operating_hours: Some(hours),
                backlog: Some(view.component.interval_hours - hours),
                year: date.year(),
                weekday: date.format("%A").to_string(),
                line_name: view.line_name().to_string(),
                tower_number: view.tower_number().to_string(),
                direction: view.component.direction,
                type_code: view.type_code.clone(),
                interval_hours: view.component.interval_hours,
                notes: None,
                recorded_by: "tester".to_string(),
                created_at: now_timestamp(),
            }
        }
    }

    #[test]
    fn test_duplicate_sequence_leaves_existing_record() {
        let repo = setup();
        repo.append_with("BAL-16N-001", 1, build(1, 28_000)).unwrap();

        let err = repo.append_with("BAL-16N-001", 1, build(1, 10)).unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateSequence { sequence_number: 1, .. }));

        let records = repo.list_by_component("BAL-16N-001").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operating_hours, Some(28_000));
    }

    #[test]
    fn test_unknown_component_is_not_found() {
        let repo = setup();
        let err = repo.append_with("BAL-NONE-001", 1, build(1, 1)).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_latest_is_by_sequence_and_series_is_bounded() {
        let repo = setup();
        // 序号 5 的日期早于序号 2，仍以序号为准
        repo.append_with("BAL-16N-001", 5, build(5, 100)).unwrap();
        for seq in 1..=4 {
            repo.append_with("BAL-16N-001", seq, build(seq, seq * 1_000)).unwrap();
        }

        let latest = repo.find_latest("BAL-16N-001").unwrap().unwrap();
        assert_eq!(latest.sequence_number, 5);
        assert_eq!(repo.max_sequence("BAL-16N-001").unwrap(), Some(5));

        let series: Vec<i64> = repo
            .list_latest("BAL-16N-001", 4)
            .unwrap()
            .iter()
            .map(|r| r.sequence_number)
            .collect();
        assert_eq!(series, vec![2, 3, 4, 5]);

        let grouped = repo.recent_by_component(4).unwrap();
        let seqs: Vec<i64> = grouped["BAL-16N-001"].iter().map(|r| r.sequence_number).collect();
        assert_eq!(seqs, vec![2, 3, 4, 5]);

        let counts = repo.counts().unwrap();
        assert_eq!(counts.total, 5);
        assert_eq!((counts.first, counts.second, counts.third), (1, 1, 1));
        assert_eq!(repo.latest_by_component().unwrap()["BAL-16N-001"].sequence_number, 5);
    }
}
