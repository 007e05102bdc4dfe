// ==========================================
// 平衡轮库存系统 - 基础目录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: line / section / tower / component_type
// ==========================================

use crate::domain::catalog::{
    tower_sort_key, ComponentType, Line, Section, Tower, TowerView, TypeSummary,
};
use crate::domain::types::ComponentCategory;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{
    format_timestamp, like_pattern, now_timestamp, parse_enum, parse_timestamp,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const TOWER_VIEW_SELECT: &str = r#"
    SELECT
        t.tower_id, t.line_id, t.section_id, t.tower_number,
        t.asc_type_code, t.desc_type_code, t.notes, t.created_at,
        l.name, s.name
    FROM tower t
    JOIN line l ON l.line_id = t.line_id
    JOIN section s ON s.section_id = t.section_id
"#;

/// 塔新增请求
#[derive(Debug, Clone, PartialEq)]
pub struct NewTower {
    pub line_id: i64,
    pub section_id: i64,
    pub tower_number: String,
    pub asc_type_code: Option<String>,
    pub desc_type_code: Option<String>,
    pub notes: Option<String>,
}

/// 塔及其已安装上/下行数量（搜索结果）
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TowerOccupancy {
    pub tower: TowerView,
    pub installed_asc: i64,
    pub installed_desc: i64,
}

// ==========================================
// CatalogRepository - 基础目录仓储
// ==========================================
pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
    /// 创建新的 CatalogRepository 实例
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

    // ==========================================
    // 线路
    // ==========================================

    pub fn insert_line(&self, name: &str, description: Option<&str>) -> RepositoryResult<Line> {
        let conn = self.get_conn()?;
        let created_at = now_timestamp();
        conn.execute(
            "INSERT INTO line (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![name, description, format_timestamp(&created_at)],
        )?;
        Ok(Line {
            line_id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at,
        })
    }

    pub fn find_line(&self, line_id: i64) -> RepositoryResult<Option<Line>> {
        let conn = self.get_conn()?;
        let line = conn
            .query_row(
                "SELECT line_id, name, description, created_at FROM line WHERE line_id = ?1",
                params![line_id],
                map_line,
            )
            .optional()?;
        Ok(line)
    }

    pub fn list_lines(&self) -> RepositoryResult<Vec<Line>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT line_id, name, description, created_at FROM line ORDER BY name, line_id",
        )?;
        let lines = stmt
            .query_map([], map_line)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    // ==========================================
    // 区段
    // ==========================================

    pub fn insert_section(&self, name: &str) -> RepositoryResult<Section> {
        let conn = self.get_conn()?;
        conn.execute("INSERT INTO section (name) VALUES (?1)", params![name])?;
        Ok(Section {
            section_id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    pub fn find_section(&self, section_id: i64) -> RepositoryResult<Option<Section>> {
        let conn = self.get_conn()?;
        let section = conn
            .query_row(
                "SELECT section_id, name FROM section WHERE section_id = ?1",
                params![section_id],
                |row| {
                    Ok(Section {
                        section_id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(section)
    }

    pub fn list_sections(&self) -> RepositoryResult<Vec<Section>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT section_id, name FROM section ORDER BY name, section_id")?;
        let sections = stmt
            .query_map([], |row| {
                Ok(Section {
                    section_id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sections)
    }

    // ==========================================
    // 塔
    // ==========================================

    /// 新增塔
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): (线路, 塔号, 区段) 已存在
    /// - Err(ForeignKeyViolation): 线路或区段不存在
    pub fn insert_tower(&self, tower: &NewTower) -> RepositoryResult<Tower> {
        let conn = self.get_conn()?;
        let created_at = now_timestamp();
        conn.execute(
            r#"
            INSERT INTO tower (
                line_id, section_id, tower_number,
                asc_type_code, desc_type_code, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                tower.line_id,
                tower.section_id,
                tower.tower_number,
                tower.asc_type_code,
                tower.desc_type_code,
                tower.notes,
                format_timestamp(&created_at),
            ],
        )?;
        Ok(Tower {
            tower_id: conn.last_insert_rowid(),
            line_id: tower.line_id,
            section_id: tower.section_id,
            tower_number: tower.tower_number.clone(),
            asc_type_code: tower.asc_type_code.clone(),
            desc_type_code: tower.desc_type_code.clone(),
            notes: tower.notes.clone(),
            created_at,
        })
    }

    pub fn find_tower(&self, tower_id: i64) -> RepositoryResult<Option<TowerView>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE t.tower_id = ?1", TOWER_VIEW_SELECT);
        let tower = conn
            .query_row(&sql, params![tower_id], map_tower_view)
            .optional()?;
        Ok(tower)
    }

    /// 按 (线路, 塔号[, 区段]) 定位塔
    ///
    /// 未指定区段且同号塔分属多个区段时，取 tower_id 最小者
    pub fn resolve_tower(
        &self,
        line_id: i64,
        tower_number: &str,
        section_id: Option<i64>,
    ) -> RepositoryResult<Option<TowerView>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE t.line_id = ?1 AND t.tower_number = ?2 AND (?3 IS NULL OR t.section_id = ?3) \
             ORDER BY t.tower_id LIMIT 1",
            TOWER_VIEW_SELECT
        );
        let tower = conn
            .query_row(&sql, params![line_id, tower_number.trim(), section_id], map_tower_view)
            .optional()?;
        Ok(tower)
    }

    /// 列出塔（按线路名 + 塔号自然序）
    pub fn list_towers(&self, line_id: Option<i64>) -> RepositoryResult<Vec<TowerView>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE (?1 IS NULL OR t.line_id = ?1)", TOWER_VIEW_SELECT);
        let mut stmt = conn.prepare(&sql)?;
        let mut towers = stmt
            .query_map(params![line_id], map_tower_view)?
            .collect::<Result<Vec<_>, _>>()?;
        sort_towers(&mut towers);
        Ok(towers)
    }

    /// 按塔号/线路名/区段名搜索塔，附带已安装数量
    pub fn search_towers(&self, query: &str, limit: usize) -> RepositoryResult<Vec<TowerOccupancy>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                t.tower_id, t.line_id, t.section_id, t.tower_number,
                t.asc_type_code, t.desc_type_code, t.notes, t.created_at,
                l.name, s.name,
                (SELECT COUNT(*) FROM component c WHERE c.tower_id = t.tower_id AND c.direction = 'ASCENDING'),
                (SELECT COUNT(*) FROM component c WHERE c.tower_id = t.tower_id AND c.direction = 'DESCENDING')
            FROM tower t
            JOIN line l ON l.line_id = t.line_id
            JOIN section s ON s.section_id = t.section_id
            WHERE UPPER(t.tower_number) LIKE ?1 ESCAPE '\'
               OR UPPER(l.name) LIKE ?1 ESCAPE '\'
               OR UPPER(s.name) LIKE ?1 ESCAPE '\'
            "#,
        )?;
        let mut towers = stmt
            .query_map(params![like_pattern(query)], |row| {
                Ok(TowerOccupancy {
                    tower: map_tower_view(row)?,
                    installed_asc: row.get(10)?,
                    installed_desc: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        towers.sort_by(|a, b| {
            (a.tower.line_name.as_str(), a.tower.tower.natural_sort_key())
                .cmp(&(b.tower.line_name.as_str(), b.tower.tower.natural_sort_key()))
        });
        towers.truncate(limit);
        Ok(towers)
    }

    pub fn count_lines(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM line", [], |row| row.get(0))?)
    }

    pub fn count_towers(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM tower", [], |row| row.get(0))?)
    }

    // ==========================================
    // 平衡轮型号
    // ==========================================

    /// 新增型号
    ///
    /// # 返回
    /// - Err(DuplicateItem): 型号代码已存在
    pub fn insert_component_type(
        &self,
        code: &str,
        category: ComponentCategory,
        total_quantity: i64,
    ) -> RepositoryResult<ComponentType> {
        let conn = self.get_conn()?;
        let now = now_timestamp();
        conn.execute(
            r#"
            INSERT INTO component_type (code, category, total_quantity, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
            params![code, category.to_db_str(), total_quantity, format_timestamp(&now)],
        )
        .map_err(|e| match RepositoryError::from(e) {
            RepositoryError::UniqueConstraintViolation(_) => RepositoryError::DuplicateItem {
                entity: "ComponentType".to_string(),
                code: code.to_string(),
            },
            other => other,
        })?;
        Ok(ComponentType {
            code: code.to_string(),
            category,
            total_quantity,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn find_component_type(&self, code: &str) -> RepositoryResult<Option<ComponentType>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                r#"
                SELECT code, category, total_quantity, created_at, updated_at
                FROM component_type WHERE code = ?1
                "#,
                params![code],
                map_component_type,
            )
            .optional()?;
        Ok(found)
    }

    /// 列出型号（类别 + 代码序）
    pub fn list_component_types(&self) -> RepositoryResult<Vec<ComponentType>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT code, category, total_quantity, created_at, updated_at
            FROM component_type
            ORDER BY category, code
            "#,
        )?;
        let types = stmt
            .query_map([], map_component_type)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(types)
    }

    pub fn search_component_types(&self, query: &str, limit: usize) -> RepositoryResult<Vec<ComponentType>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT code, category, total_quantity, created_at, updated_at
            FROM component_type
            WHERE UPPER(code) LIKE ?1 ESCAPE '\' OR UPPER(category) LIKE ?1 ESCAPE '\'
            ORDER BY category, code
            LIMIT ?2
            "#,
        )?;
        let types = stmt
            .query_map(params![like_pattern(query), limit as i64], map_component_type)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(types)
    }

    /// 型号目录汇总
    pub fn type_summary(&self) -> RepositoryResult<TypeSummary> {
        let conn = self.get_conn()?;
        let summary = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(total_quantity), 0),
                COALESCE(SUM(CASE WHEN category = 'COMPRESSION' THEN total_quantity ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN category = 'SUPPORT' THEN total_quantity ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN category = 'COMBINED' THEN total_quantity ELSE 0 END), 0)
            FROM component_type
            "#,
            [],
            |row| {
                Ok(TypeSummary {
                    total_types: row.get(0)?,
                    total_quantity: row.get(1)?,
                    compression_quantity: row.get(2)?,
                    support_quantity: row.get(3)?,
                    combined_quantity: row.get(4)?,
                })
            },
        )?;
        Ok(summary)
    }

    /// 槽位型号等于 `type_code` 的已安装平衡轮数量
    pub fn installed_count(&self, type_code: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM component c
            JOIN tower t ON t.tower_id = c.tower_id
            WHERE (c.direction = 'ASCENDING' AND t.asc_type_code = ?1)
               OR (c.direction = 'DESCENDING' AND t.desc_type_code = ?1)
            "#,
            params![type_code],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// 线路名 + 塔号自然序
pub fn sort_towers(towers: &mut [TowerView]) {
    towers.sort_by(|a, b| {
        (a.line_name.as_str(), tower_sort_key(&a.tower.tower_number), a.tower.tower_id).cmp(&(
            b.line_name.as_str(),
            tower_sort_key(&b.tower.tower_number),
            b.tower.tower_id,
        ))
    });
}

fn map_line(row: &Row<'_>) -> rusqlite::Result<Line> {
    Ok(Line {
        line_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_timestamp(3, &row.get::<_, String>(3)?)?,
    })
}

/// 映射 TOWER_VIEW_SELECT 的前 10 列
pub(crate) fn map_tower_view(row: &Row<'_>) -> rusqlite::Result<TowerView> {
    map_tower_view_at(row, 0)
}

/// 从 `offset` 起映射 10 列塔视图（供联表查询复用）
pub(crate) fn map_tower_view_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<TowerView> {
    Ok(TowerView {
        tower: Tower {
            tower_id: row.get(offset)?,
            line_id: row.get(offset + 1)?,
            section_id: row.get(offset + 2)?,
            tower_number: row.get(offset + 3)?,
            asc_type_code: row.get(offset + 4)?,
            desc_type_code: row.get(offset + 5)?,
            notes: row.get(offset + 6)?,
            created_at: parse_timestamp(offset + 7, &row.get::<_, String>(offset + 7)?)?,
        },
        line_name: row.get(offset + 8)?,
        section_name: row.get(offset + 9)?,
    })
}

fn map_component_type(row: &Row<'_>) -> rusqlite::Result<ComponentType> {
    Ok(ComponentType {
        code: row.get(0)?,
        category: parse_enum(1, &row.get::<_, String>(1)?, ComponentCategory::from_str)?,
        total_quantity: row.get(2)?,
        created_at: parse_timestamp(3, &row.get::<_, String>(3)?)?,
        updated_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> CatalogRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        CatalogRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn new_tower(line_id: i64, section_id: i64, number: &str) -> NewTower {
        NewTower {
            line_id,
            section_id,
            tower_number: number.to_string(),
            asc_type_code: Some("16N/4TR-420C".to_string()),
            desc_type_code: Some("14N/4TR-420C".to_string()),
            notes: None,
        }
    }

    #[test]
    fn test_duplicate_tower_in_same_section_rejected() {
        let repo = setup();
        let line = repo.insert_line("L1", None).unwrap();
        let section = repo.insert_section("S1").unwrap();
        repo.insert_tower(&new_tower(line.line_id, section.section_id, "5")).unwrap();

        let err = repo
            .insert_tower(&new_tower(line.line_id, section.section_id, "5"))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

        // 同号不同区段允许
        let other = repo.insert_section("S2").unwrap();
        repo.insert_tower(&new_tower(line.line_id, other.section_id, "5")).unwrap();
    }

    #[test]
    fn test_resolve_tower_with_and_without_section() {
        let repo = setup();
        let line = repo.insert_line("L1", None).unwrap();
        let s1 = repo.insert_section("S1").unwrap();
        let s2 = repo.insert_section("S2").unwrap();
        let t1 = repo.insert_tower(&new_tower(line.line_id, s1.section_id, "7")).unwrap();
        let t2 = repo.insert_tower(&new_tower(line.line_id, s2.section_id, "7")).unwrap();

        let by_section = repo.resolve_tower(line.line_id, "7", Some(s2.section_id)).unwrap().unwrap();
        assert_eq!(by_section.tower.tower_id, t2.tower_id);
        assert_eq!(by_section.section_name, "S2");

        let any = repo.resolve_tower(line.line_id, "7", None).unwrap().unwrap();
        assert_eq!(any.tower.tower_id, t1.tower_id);

        assert!(repo.resolve_tower(line.line_id, "99", None).unwrap().is_none());
    }

    #[test]
    fn test_list_towers_natural_order() {
        let repo = setup();
        let line = repo.insert_line("L1", None).unwrap();
        let section = repo.insert_section("S1").unwrap();
        for number in ["10", "2", "10A", "1"] {
            repo.insert_tower(&new_tower(line.line_id, section.section_id, number)).unwrap();
        }
        let numbers: Vec<String> = repo
            .list_towers(Some(line.line_id))
            .unwrap()
            .into_iter()
            .map(|t| t.tower.tower_number)
            .collect();
        assert_eq!(numbers, vec!["1", "2", "10", "10A"]);
    }

    #[test]
    fn test_component_type_duplicate_and_summary() {
        let repo = setup();
        repo.insert_component_type("16N/4TR-420C", ComponentCategory::Compression, 3)
            .unwrap();
        repo.insert_component_type("8N/4TR-420C", ComponentCategory::Support, 2)
            .unwrap();
        let err = repo
            .insert_component_type("16N/4TR-420C", ComponentCategory::Combined, 1)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateItem { .. }));

        let summary = repo.type_summary().unwrap();
        assert_eq!(summary.total_types, 2);
        assert_eq!(summary.total_quantity, 5);
        assert_eq!(summary.compression_quantity, 3);
        assert_eq!(summary.support_quantity, 2);
        assert_eq!(summary.combined_quantity, 0);
    }
}
