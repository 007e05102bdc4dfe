// ==========================================
// 平衡轮库存系统 - 备件与库存流水仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 数量更新与流水追加同一 IMMEDIATE 事务，先取写锁再读余额
// 两个备件目录共用同一张表，以 catalog 列区分
// ==========================================

use crate::domain::spare_part::{MovementSummary, SparePart, StockChange, StockFilter, StockMovement};
use crate::domain::types::{MovementKind, SpareCatalog};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{
    format_timestamp, like_pattern, parse_enum, parse_opt_timestamp, parse_timestamp,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};

const PART_COLUMNS: &str = r#"
    catalog, item_code, description, quantity, location, notes,
    received_at, last_movement_at, last_exit_at
"#;

const MOVEMENT_COLUMNS: &str = r#"
    movement_id, catalog, item_code, kind, quantity, resulting_balance, notes, actor, moved_at
"#;

// ==========================================
// SparePartRepository - 备件仓储
// ==========================================
pub struct SparePartRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SparePartRepository {
    /// 创建新的 SparePartRepository 实例
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

    /// 建档: 写入备件 + creation 流水
    ///
    /// # 返回
    /// - Err(DuplicateItem): 同一目录下编码已存在
    pub fn insert_with_creation(&self, change: &StockChange) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let part = &change.part;
        if find_part_in(&tx, part.catalog, &part.item_code)?.is_some() {
            return Err(RepositoryError::DuplicateItem {
                entity: part.catalog.to_string(),
                code: part.item_code.clone(),
            });
        }

        tx.execute(
            &format!(
                "INSERT INTO spare_part ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                PART_COLUMNS
            ),
            params![
                part.catalog.to_db_str(),
                part.item_code,
                part.description,
                part.quantity,
                part.location,
                part.notes,
                format_timestamp(&part.received_at),
                format_timestamp(&part.last_movement_at),
                part.last_exit_at.as_ref().map(format_timestamp),
            ],
        )?;
        insert_movement(&tx, &change.movement)?;

        tx.commit()?;
        Ok(())
    }

    /// 库存变更（入库/出库/调整）
    ///
    /// `plan` 在写锁内拿到最新备件状态，返回变更后的备件与配对流水；
    /// `plan` 返回 Err 时事务回滚，状态不变。
    ///
    /// # 返回
    /// - Err(NotFound): 编码不存在
    /// - Err(..): `plan` 拒绝的规则错误原样上抛
    pub fn apply_movement<F>(
        &self,
        catalog: SpareCatalog,
        item_code: &str,
        plan: F,
    ) -> RepositoryResult<StockChange>
    where
        F: FnOnce(&SparePart) -> RepositoryResult<StockChange>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = find_part_in(&tx, catalog, item_code)?
            .ok_or_else(|| RepositoryError::not_found(catalog.to_db_str(), item_code))?;
        let change = plan(&current)?;

        if change.movement.resulting_balance != change.part.quantity {
            return Err(RepositoryError::ValidationError(format!(
                "流水结存 {} 与备件数量 {} 不一致",
                change.movement.resulting_balance, change.part.quantity
            )));
        }

        tx.execute(
            r#"
            UPDATE spare_part
            SET quantity = ?3, last_movement_at = ?4, last_exit_at = ?5
            WHERE catalog = ?1 AND item_code = ?2
            "#,
            params![
                catalog.to_db_str(),
                item_code,
                change.part.quantity,
                format_timestamp(&change.part.last_movement_at),
                change.part.last_exit_at.as_ref().map(format_timestamp),
            ],
        )?;
        insert_movement(&tx, &change.movement)?;

        tx.commit()?;
        Ok(change)
    }

    pub fn find(&self, catalog: SpareCatalog, item_code: &str) -> RepositoryResult<Option<SparePart>> {
        let conn = self.get_conn()?;
        find_part_in(&conn, catalog, item_code)
    }

    /// 列表 + 模糊搜索 + 库存筛选（编码序）
    pub fn list(
        &self,
        catalog: SpareCatalog,
        query: Option<&str>,
        filter: StockFilter,
        low_threshold: i64,
    ) -> RepositoryResult<Vec<SparePart>> {
        let conn = self.get_conn()?;
        let filter_clause = match filter {
            StockFilter::All => "1 = 1",
            StockFilter::Low => "quantity > 0 AND quantity < ?3",
            StockFilter::Out => "quantity = 0",
        };
        let sql = format!(
            r#"
            SELECT {} FROM spare_part
            WHERE catalog = ?1
              AND (?2 IS NULL
                   OR UPPER(item_code) LIKE ?2 ESCAPE '\'
                   OR UPPER(description) LIKE ?2 ESCAPE '\'
                   OR UPPER(COALESCE(location, '')) LIKE ?2 ESCAPE '\'
                   OR UPPER(COALESCE(notes, '')) LIKE ?2 ESCAPE '\')
              AND ({})
            ORDER BY item_code
            "#,
            PART_COLUMNS, filter_clause
        );
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(like_pattern);

        let mut stmt = conn.prepare(&sql)?;
        let parts = if filter == StockFilter::Low {
            stmt.query_map(params![catalog.to_db_str(), pattern, low_threshold], map_part)?
                .collect::<Result<Vec<_>, _>>()?
        } else {
            stmt.query_map(params![catalog.to_db_str(), pattern], map_part)?
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(parts)
    }

    pub fn count(&self, catalog: SpareCatalog) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM spare_part WHERE catalog = ?1",
            params![catalog.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 单个备件流水（新→旧）
    pub fn movements(
        &self,
        catalog: SpareCatalog,
        item_code: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<StockMovement>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM stock_movement
            WHERE catalog = ?1 AND item_code = ?2
            ORDER BY moved_at DESC, rowid DESC
            LIMIT ?3
            "#,
            MOVEMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let movements = stmt
            .query_map(params![catalog.to_db_str(), item_code, limit as i64], map_movement)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(movements)
    }

    /// 目录近期动态（建档/入库/出库，新→旧）
    pub fn recent_activity(&self, catalog: SpareCatalog, limit: usize) -> RepositoryResult<Vec<MovementSummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT m.catalog, m.item_code, p.description, m.kind, m.quantity,
                   m.resulting_balance, m.actor, m.moved_at
            FROM stock_movement m
            JOIN spare_part p ON p.catalog = m.catalog AND p.item_code = m.item_code
            WHERE m.catalog = ?1 AND m.kind IN ('CREATION', 'ENTRY', 'EXIT')
            ORDER BY m.moved_at DESC, m.rowid DESC
            LIMIT ?2
            "#,
        )?;
        let summaries = stmt
            .query_map(params![catalog.to_db_str(), limit as i64], |row| {
                Ok(MovementSummary {
                    catalog: parse_enum(0, &row.get::<_, String>(0)?, SpareCatalog::from_str)?,
                    item_code: row.get(1)?,
                    description: row.get(2)?,
                    kind: parse_enum(3, &row.get::<_, String>(3)?, MovementKind::from_str)?,
                    quantity: row.get(4)?,
                    resulting_balance: row.get(5)?,
                    actor: row.get(6)?,
                    moved_at: parse_timestamp(7, &row.get::<_, String>(7)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }
}

fn find_part_in(conn: &Connection, catalog: SpareCatalog, item_code: &str) -> RepositoryResult<Option<SparePart>> {
    let sql = format!(
        "SELECT {} FROM spare_part WHERE catalog = ?1 AND item_code = ?2",
        PART_COLUMNS
    );
    let part = conn
        .query_row(&sql, params![catalog.to_db_str(), item_code], map_part)
        .optional()?;
    Ok(part)
}

fn insert_movement(tx: &Transaction<'_>, movement: &StockMovement) -> RepositoryResult<()> {
    tx.execute(
        &format!(
            "INSERT INTO stock_movement ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            MOVEMENT_COLUMNS
        ),
        params![
            movement.movement_id,
            movement.catalog.to_db_str(),
            movement.item_code,
            movement.kind.to_db_str(),
            movement.quantity,
            movement.resulting_balance,
            movement.notes,
            movement.actor,
            format_timestamp(&movement.moved_at),
        ],
    )?;
    Ok(())
}

fn map_part(row: &Row<'_>) -> rusqlite::Result<SparePart> {
    Ok(SparePart {
        catalog: parse_enum(0, &row.get::<_, String>(0)?, SpareCatalog::from_str)?,
        item_code: row.get(1)?,
        description: row.get(2)?,
        quantity: row.get(3)?,
        location: row.get(4)?,
        notes: row.get(5)?,
        received_at: parse_timestamp(6, &row.get::<_, String>(6)?)?,
        last_movement_at: parse_timestamp(7, &row.get::<_, String>(7)?)?,
        last_exit_at: parse_opt_timestamp(8, row.get(8)?)?,
    })
}

fn map_movement(row: &Row<'_>) -> rusqlite::Result<StockMovement> {
    Ok(StockMovement {
        movement_id: row.get(0)?,
        catalog: parse_enum(1, &row.get::<_, String>(1)?, SpareCatalog::from_str)?,
        item_code: row.get(2)?,
        kind: parse_enum(3, &row.get::<_, String>(3)?, MovementKind::from_str)?,
        quantity: row.get(4)?,
        resulting_balance: row.get(5)?,
        notes: row.get(6)?,
        actor: row.get(7)?,
        moved_at: parse_timestamp(8, &row.get::<_, String>(8)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::row_codec::now_timestamp;

    fn setup() -> SparePartRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        SparePartRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn creation(catalog: SpareCatalog, code: &str, quantity: i64) -> StockChange {
        let now = now_timestamp();
        StockChange {
            part: SparePart {
                catalog,
                item_code: code.to_string(),
                description: format!("{} desc", code),
                quantity,
                location: Some("BODEGA 1".to_string()),
                notes: None,
                received_at: now,
                last_movement_at: now,
                last_exit_at: None,
            },
            movement: StockMovement {
                movement_id: uuid::Uuid::new_v4().to_string(),
                catalog,
                item_code: code.to_string(),
                kind: MovementKind::Creation,
                quantity,
                resulting_balance: quantity,
                notes: None,
                actor: Some("tester".to_string()),
                moved_at: now,
            },
        }
    }

    #[test]
    fn test_catalogs_are_keyed_independently() {
        let repo = setup();
        repo.insert_with_creation(&creation(SpareCatalog::ComponentSpares, "POLEA-1", 3))
            .unwrap();
        repo.insert_with_creation(&creation(SpareCatalog::GeneralSpares, "POLEA-1", 0))
            .unwrap();

        let err = repo
            .insert_with_creation(&creation(SpareCatalog::GeneralSpares, "POLEA-1", 1))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateItem { .. }));
        assert_eq!(repo.count(SpareCatalog::ComponentSpares).unwrap(), 1);
        assert_eq!(repo.count(SpareCatalog::GeneralSpares).unwrap(), 1);
    }

    #[test]
    fn test_rejected_plan_rolls_back() {
        let repo = setup();
        repo.insert_with_creation(&creation(SpareCatalog::GeneralSpares, "PERNO", 4))
            .unwrap();

        let err = repo
            .apply_movement(SpareCatalog::GeneralSpares, "PERNO", |part| {
                Err(RepositoryError::InsufficientStock {
                    catalog: part.catalog,
                    item_code: part.item_code.clone(),
                    available: part.quantity,
                    requested: 9,
                })
            })
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InsufficientStock { available: 4, .. }));

        let part = repo.find(SpareCatalog::GeneralSpares, "PERNO").unwrap().unwrap();
        assert_eq!(part.quantity, 4);
        assert_eq!(repo.movements(SpareCatalog::GeneralSpares, "PERNO", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_apply_movement_unknown_item_is_not_found() {
        let repo = setup();
        let err = repo
            .apply_movement(SpareCatalog::GeneralSpares, "NADA", |_| unreachable!())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_list_filters_and_search() {
        let repo = setup();
        repo.insert_with_creation(&creation(SpareCatalog::GeneralSpares, "CABLE-A", 0))
            .unwrap();
        repo.insert_with_creation(&creation(SpareCatalog::GeneralSpares, "CABLE-B", 3))
            .unwrap();
        repo.insert_with_creation(&creation(SpareCatalog::GeneralSpares, "POLEA-C", 12))
            .unwrap();

        let codes = |parts: Vec<SparePart>| parts.into_iter().map(|p| p.item_code).collect::<Vec<_>>();
        let catalog = SpareCatalog::GeneralSpares;
        assert_eq!(codes(repo.list(catalog, None, StockFilter::Out, 5).unwrap()), vec!["CABLE-A"]);
        assert_eq!(codes(repo.list(catalog, None, StockFilter::Low, 5).unwrap()), vec!["CABLE-B"]);
        assert_eq!(
            codes(repo.list(catalog, Some("cable"), StockFilter::All, 5).unwrap()),
            vec!["CABLE-A", "CABLE-B"]
        );
        assert_eq!(repo.list(catalog, Some("%"), StockFilter::All, 5).unwrap().len(), 0);
    }
}
