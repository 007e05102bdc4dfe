// ==========================================
// 平衡轮库存系统 - 已安装平衡轮仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 写操作: BEGIN IMMEDIATE，槽位占用检查与写入、状态审计同一事务
// ==========================================

use crate::domain::catalog::tower_sort_key;
use crate::domain::component::{lifecycle, Component, ComponentView, StatusChangeRecord};
use crate::domain::types::Direction;
use crate::repository::catalog_repo::map_tower_view_at;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{
    format_timestamp, like_pattern, now_timestamp, parse_enum, parse_timestamp,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const COMPONENT_VIEW_SELECT: &str = r#"
    SELECT
        c.code, c.tower_id, c.direction, c.interval_hours, c.notes, c.registered_at,
        t.tower_id, t.line_id, t.section_id, t.tower_number,
        t.asc_type_code, t.desc_type_code, t.notes, t.created_at,
        l.name, s.name
    FROM component c
    JOIN tower t ON t.tower_id = c.tower_id
    JOIN line l ON l.line_id = t.line_id
    JOIN section s ON s.section_id = t.section_id
"#;

/// 平衡轮变更（None 表示不修改）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentChanges {
    pub interval_hours: Option<i64>,
    pub notes: Option<String>,
}

// ==========================================
// ComponentRepository - 平衡轮仓储
// ==========================================
pub struct ComponentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ComponentRepository {
    /// 创建新的 ComponentRepository 实例
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

    /// 安装平衡轮
    ///
    /// # 返回
    /// - Err(NotFound): 塔不存在
    /// - Err(SlotOccupied): 该塔该方向已有平衡轮
    /// - Err(DuplicateItem): 编码已存在
    pub fn install(&self, component: &Component, actor: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        ensure_tower_exists(&tx, component.tower_id)?;
        ensure_slot_free(&tx, component.tower_id, component.direction, None)?;
        if find_component_in(&tx, &component.code)?.is_some() {
            return Err(RepositoryError::DuplicateItem {
                entity: "Component".to_string(),
                code: component.code.clone(),
            });
        }

        tx.execute(
            r#"
            INSERT INTO component (code, tower_id, direction, interval_hours, notes, registered_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                component.code,
                component.tower_id,
                component.direction.to_db_str(),
                component.interval_hours,
                component.notes,
                format_timestamp(&component.registered_at),
            ],
        )?;
        insert_status_change(
            &tx,
            &component.code,
            lifecycle::STATE_NEW,
            lifecycle::STATE_INSTALLED,
            lifecycle::ACTION_INSTALL,
            Some(&format!("T{} {}", component.tower_id, component.direction.short_label())),
            actor,
        )?;

        tx.commit()?;
        Ok(())
    }

    /// 更新周期/备注，追加 ACTUALIZACION 审计
    pub fn update(
        &self,
        code: &str,
        changes: &ComponentChanges,
        actor: &str,
    ) -> RepositoryResult<Component> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut component =
            find_component_in(&tx, code)?.ok_or_else(|| RepositoryError::not_found("Component", code))?;
        if let Some(interval) = changes.interval_hours {
            component.interval_hours = interval;
        }
        if let Some(notes) = &changes.notes {
            component.notes = Some(notes.clone());
        }

        tx.execute(
            "UPDATE component SET interval_hours = ?2, notes = ?3 WHERE code = ?1",
            params![component.code, component.interval_hours, component.notes],
        )?;
        insert_status_change(
            &tx,
            code,
            lifecycle::STATE_INSTALLED,
            lifecycle::STATE_INSTALLED,
            lifecycle::ACTION_UPDATE,
            Some(&format!("interval_hours={}", component.interval_hours)),
            actor,
        )?;

        tx.commit()?;
        Ok(component)
    }

    /// 迁移到其它塔/方向，追加 REUBICACION 审计
    pub fn relocate(
        &self,
        code: &str,
        tower_id: i64,
        direction: Direction,
        actor: &str,
    ) -> RepositoryResult<Component> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut component =
            find_component_in(&tx, code)?.ok_or_else(|| RepositoryError::not_found("Component", code))?;
        ensure_tower_exists(&tx, tower_id)?;
        ensure_slot_free(&tx, tower_id, direction, Some(code))?;

        let note = format!(
            "T{} {} -> T{} {}",
            component.tower_id,
            component.direction.short_label(),
            tower_id,
            direction.short_label()
        );
        tx.execute(
            "UPDATE component SET tower_id = ?2, direction = ?3 WHERE code = ?1",
            params![code, tower_id, direction.to_db_str()],
        )?;
        insert_status_change(
            &tx,
            code,
            lifecycle::STATE_INSTALLED,
            lifecycle::STATE_INSTALLED,
            lifecycle::ACTION_RELOCATE,
            Some(&note),
            actor,
        )?;

        tx.commit()?;
        component.tower_id = tower_id;
        component.direction = direction;
        Ok(component)
    }

    /// 退役（级联删除 OH 与状态历史）
    pub fn delete(&self, code: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM component WHERE code = ?1", params![code])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Component", code));
        }
        Ok(())
    }

    pub fn find(&self, code: &str) -> RepositoryResult<Option<Component>> {
        let conn = self.get_conn()?;
        find_component_in(&conn, code)
    }

    pub fn find_view(&self, code: &str) -> RepositoryResult<Option<ComponentView>> {
        let conn = self.get_conn()?;
        find_view_in(&conn, code)
    }

    /// 列出平衡轮（线路名、塔号自然序、方向）
    pub fn list_views(
        &self,
        direction: Option<Direction>,
        line_id: Option<i64>,
    ) -> RepositoryResult<Vec<ComponentView>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE (?1 IS NULL OR c.direction = ?1) AND (?2 IS NULL OR t.line_id = ?2)",
            COMPONENT_VIEW_SELECT
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut views = stmt
            .query_map(params![direction.map(|d| d.to_db_str()), line_id], map_component_view)?
            .collect::<Result<Vec<_>, _>>()?;
        sort_views(&mut views);
        Ok(views)
    }

    /// 按编码/备注/塔号搜索
    pub fn search(&self, query: &str, limit: usize) -> RepositoryResult<Vec<ComponentView>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            WHERE UPPER(c.code) LIKE ?1 ESCAPE '\'
               OR UPPER(COALESCE(c.notes, '')) LIKE ?1 ESCAPE '\'
               OR UPPER(t.tower_number) LIKE ?1 ESCAPE '\'
            "#,
            COMPONENT_VIEW_SELECT
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut views = stmt
            .query_map(params![like_pattern(query)], map_component_view)?
            .collect::<Result<Vec<_>, _>>()?;
        sort_views(&mut views);
        views.truncate(limit);
        Ok(views)
    }

    /// 以 `prefix` 开头的全部编码（用于推算下一个编码）
    pub fn codes_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT code FROM component WHERE substr(code, 1, length(?1)) = ?1")?;
        let codes = stmt
            .query_map(params![prefix], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(codes)
    }

    /// 状态变更历史（新→旧）
    pub fn status_history(&self, code: &str, limit: usize) -> RepositoryResult<Vec<StatusChangeRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT change_id, component_code, previous_state, new_state, action, notes, changed_at, actor
            FROM component_status_history
            WHERE component_code = ?1
            ORDER BY changed_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;
        let records = stmt
            .query_map(params![code, limit as i64], |row| {
                Ok(StatusChangeRecord {
                    change_id: row.get(0)?,
                    component_code: row.get(1)?,
                    previous_state: row.get(2)?,
                    new_state: row.get(3)?,
                    action: row.get(4)?,
                    notes: row.get(5)?,
                    changed_at: parse_timestamp(6, &row.get::<_, String>(6)?)?,
                    actor: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// (上行数量, 下行数量)
    pub fn count_by_direction(&self) -> RepositoryResult<(i64, i64)> {
        let conn = self.get_conn()?;
        let counts = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN direction = 'ASCENDING' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN direction = 'DESCENDING' THEN 1 ELSE 0 END), 0)
            FROM component
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }
}

/// 线路名、塔号自然序、方向（上行在前）
pub fn sort_views(views: &mut [ComponentView]) {
    views.sort_by(|a, b| {
        (
            a.tower.line_name.as_str(),
            tower_sort_key(&a.tower.tower.tower_number),
            a.component.direction,
            a.component.code.as_str(),
        )
            .cmp(&(
                b.tower.line_name.as_str(),
                tower_sort_key(&b.tower.tower.tower_number),
                b.component.direction,
                b.component.code.as_str(),
            ))
    });
}

fn ensure_tower_exists(conn: &Connection, tower_id: i64) -> RepositoryResult<()> {
    let exists = conn
        .query_row("SELECT 1 FROM tower WHERE tower_id = ?1", params![tower_id], |_| Ok(()))
        .optional()?;
    match exists {
        Some(()) => Ok(()),
        None => Err(RepositoryError::not_found("Tower", tower_id)),
    }
}

/// 槽位占用检查；`except_code` 为迁移中的平衡轮自身
fn ensure_slot_free(
    conn: &Connection,
    tower_id: i64,
    direction: Direction,
    except_code: Option<&str>,
) -> RepositoryResult<()> {
    let occupant: Option<String> = conn
        .query_row(
            r#"
            SELECT code FROM component
            WHERE tower_id = ?1 AND direction = ?2 AND (?3 IS NULL OR code <> ?3)
            "#,
            params![tower_id, direction.to_db_str(), except_code],
            |row| row.get(0),
        )
        .optional()?;
    match occupant {
        Some(occupant) => Err(RepositoryError::SlotOccupied {
            tower_id,
            direction,
            occupant,
        }),
        None => Ok(()),
    }
}

fn insert_status_change(
    tx: &Transaction<'_>,
    code: &str,
    previous_state: &str,
    new_state: &str,
    action: &str,
    notes: Option<&str>,
    actor: &str,
) -> RepositoryResult<()> {
    tx.execute(
        r#"
        INSERT INTO component_status_history (
            change_id, component_code, previous_state, new_state, action, notes, changed_at, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            Uuid::new_v4().to_string(),
            code,
            previous_state,
            new_state,
            action,
            notes,
            format_timestamp(&now_timestamp()),
            actor,
        ],
    )?;
    Ok(())
}

fn find_component_in(conn: &Connection, code: &str) -> RepositoryResult<Option<Component>> {
    let component = conn
        .query_row(
            r#"
            SELECT code, tower_id, direction, interval_hours, notes, registered_at
            FROM component WHERE code = ?1
            "#,
            params![code],
            map_component,
        )
        .optional()?;
    Ok(component)
}

/// 在给定连接/事务内读取平衡轮视图
pub(crate) fn find_view_in(conn: &Connection, code: &str) -> RepositoryResult<Option<ComponentView>> {
    let sql = format!("{} WHERE c.code = ?1", COMPONENT_VIEW_SELECT);
    let view = conn
        .query_row(&sql, params![code], map_component_view)
        .optional()?;
    Ok(view)
}

fn map_component(row: &Row<'_>) -> rusqlite::Result<Component> {
    Ok(Component {
        code: row.get(0)?,
        tower_id: row.get(1)?,
        direction: parse_enum(2, &row.get::<_, String>(2)?, Direction::from_str)?,
        interval_hours: row.get(3)?,
        notes: row.get(4)?,
        registered_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
    })
}

fn map_component_view(row: &Row<'_>) -> rusqlite::Result<ComponentView> {
    let component = map_component(row)?;
    let tower = map_tower_view_at(row, 6)?;
    let type_code = tower
        .tower
        .type_for_slot(component.direction)
        .map(str::to_string);
    Ok(ComponentView {
        component,
        tower,
        type_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::catalog_repo::{CatalogRepository, NewTower};

    fn setup() -> (CatalogRepository, ComponentRepository, i64) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let catalog = CatalogRepository::from_connection(conn.clone());
        let components = ComponentRepository::from_connection(conn);

        let line = catalog.insert_line("L1", None).unwrap();
        let section = catalog.insert_section("S1").unwrap();
        let tower = catalog
            .insert_tower(&NewTower {
                line_id: line.line_id,
                section_id: section.section_id,
                tower_number: "3".to_string(),
                asc_type_code: Some("16N".to_string()),
                desc_type_code: Some("8N".to_string()),
                notes: None,
            })
            .unwrap();
        (catalog, components, tower.tower_id)
    }

    fn component(code: &str, tower_id: i64, direction: Direction) -> Component {
        Component {
            code: code.to_string(),
            tower_id,
            direction,
            interval_hours: 30_000,
            notes: None,
            registered_at: now_timestamp(),
        }
    }

    #[test]
    fn test_install_rejects_occupied_slot() {
        let (_catalog, repo, tower_id) = setup();
        repo.install(&component("BAL-16N-001", tower_id, Direction::Ascending), "tester")
            .unwrap();

        let err = repo
            .install(&component("BAL-16N-002", tower_id, Direction::Ascending), "tester")
            .unwrap_err();
        match err {
            RepositoryError::SlotOccupied { occupant, .. } => assert_eq!(occupant, "BAL-16N-001"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(repo.find("BAL-16N-002").unwrap().is_none());

        repo.install(&component("BAL-8N-001", tower_id, Direction::Descending), "tester")
            .unwrap();
        assert_eq!(repo.count_by_direction().unwrap(), (1, 1));
    }

    #[test]
    fn test_install_writes_status_record_and_derives_type() {
        let (_catalog, repo, tower_id) = setup();
        repo.install(&component("BAL-8N-001", tower_id, Direction::Descending), "tester")
            .unwrap();

        let history = repo.status_history("BAL-8N-001", 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous_state, lifecycle::STATE_NEW);
        assert_eq!(history[0].new_state, lifecycle::STATE_INSTALLED);
        assert_eq!(history[0].action, lifecycle::ACTION_INSTALL);

        let view = repo.find_view("BAL-8N-001").unwrap().unwrap();
        assert_eq!(view.type_code.as_deref(), Some("8N"));
        assert_eq!(view.line_name(), "L1");
    }

    #[test]
    fn test_relocate_into_own_slot_is_allowed_and_audited() {
        let (_catalog, repo, tower_id) = setup();
        repo.install(&component("BAL-16N-001", tower_id, Direction::Ascending), "tester")
            .unwrap();
        let moved = repo
            .relocate("BAL-16N-001", tower_id, Direction::Descending, "tester")
            .unwrap();
        assert_eq!(moved.direction, Direction::Descending);

        let history = repo.status_history("BAL-16N-001", 10).unwrap();
        assert_eq!(history[0].action, lifecycle::ACTION_RELOCATE);
    }

    #[test]
    fn test_delete_unknown_is_not_found() {
        let (_catalog, repo, _tower_id) = setup();
        assert!(matches!(
            repo.delete("BAL-X-001").unwrap_err(),
            RepositoryError::NotFound { .. }
        ));
    }

    #[test]
    fn test_codes_with_prefix_is_literal() {
        let (_catalog, repo, tower_id) = setup();
        repo.install(&component("BAL-16N-001", tower_id, Direction::Ascending), "tester")
            .unwrap();
        repo.install(&component("BAL-16NX001", tower_id, Direction::Descending), "tester")
            .unwrap();
        let codes = repo.codes_with_prefix("BAL-16N-").unwrap();
        assert_eq!(codes, vec!["BAL-16N-001".to_string()]);
    }
}
