// ==========================================
// 平衡轮库存系统 - 基础目录 API
// ==========================================
// 职责: 线路 / 区段 / 塔 / 型号的登记与查询
// ==========================================

use std::sync::Arc;

use crate::api::error::{optional_text, require_text, ApiError, ApiResult};
use crate::domain::catalog::{ComponentType, Line, Section, Tower, TowerView, TypeSummary};
use crate::domain::types::{ComponentCategory, Direction};
use crate::repository::catalog_repo::{CatalogRepository, NewTower};
use crate::repository::error::RepositoryError;

// ==========================================
// CatalogApi - 基础目录 API
// ==========================================
pub struct CatalogApi {
    catalog_repo: Arc<CatalogRepository>,
}

impl CatalogApi {
    pub fn new(catalog_repo: Arc<CatalogRepository>) -> Self {
        Self { catalog_repo }
    }

    pub fn create_line(&self, name: &str, description: Option<&str>) -> ApiResult<Line> {
        let name = require_text(name, "线路名称")?;
        let description = optional_text(description);
        let line = self.catalog_repo.insert_line(&name, description.as_deref())?;
        tracing::info!(line_id = line.line_id, name = %line.name, "线路已登记");
        Ok(line)
    }

    pub fn create_section(&self, name: &str) -> ApiResult<Section> {
        let name = require_text(name, "区段名称")?;
        let section = self.catalog_repo.insert_section(&name)?;
        tracing::info!(section_id = section.section_id, name = %section.name, "区段已登记");
        Ok(section)
    }

    /// 登记塔
    ///
    /// # 返回
    /// - Err(InvalidInput): 塔号为空，或 (线路, 塔号, 区段) 已存在
    /// - Err(NotFound): 线路或区段不存在
    pub fn create_tower(
        &self,
        line_id: i64,
        section_id: i64,
        tower_number: &str,
        asc_type_code: Option<&str>,
        desc_type_code: Option<&str>,
        notes: Option<&str>,
    ) -> ApiResult<Tower> {
        let tower_number = require_text(tower_number, "塔号")?;
        if self.catalog_repo.find_line(line_id)?.is_none() {
            return Err(ApiError::NotFound(format!("线路(id={})不存在", line_id)));
        }
        if self.catalog_repo.find_section(section_id)?.is_none() {
            return Err(ApiError::NotFound(format!("区段(id={})不存在", section_id)));
        }

        let request = NewTower {
            line_id,
            section_id,
            tower_number: tower_number.clone(),
            asc_type_code: optional_text(asc_type_code),
            desc_type_code: optional_text(desc_type_code),
            notes: optional_text(notes),
        };
        let tower = self.catalog_repo.insert_tower(&request).map_err(|e| match e {
            RepositoryError::UniqueConstraintViolation(_) => ApiError::InvalidInput(format!(
                "塔 {} 已存在于线路 {} 区段 {}",
                tower_number, line_id, section_id
            )),
            other => other.into(),
        })?;
        tracing::info!(tower_id = tower.tower_id, tower_number = %tower.tower_number, "塔已登记");
        Ok(tower)
    }

    /// 登记型号
    ///
    /// # 返回
    /// - Err(DuplicateItem): 型号代码已存在
    /// - Err(InvalidInput): 代码为空或数量为负
    pub fn create_component_type(
        &self,
        code: &str,
        category: ComponentCategory,
        total_quantity: i64,
    ) -> ApiResult<ComponentType> {
        let code = require_text(code, "型号代码")?;
        if total_quantity < 0 {
            return Err(ApiError::InvalidInput(format!("型号数量不能为负: {}", total_quantity)));
        }
        let component_type = self
            .catalog_repo
            .insert_component_type(&code, category, total_quantity)?;
        tracing::info!(code = %component_type.code, category = %category, "型号已登记");
        Ok(component_type)
    }

    pub fn list_lines(&self) -> ApiResult<Vec<Line>> {
        Ok(self.catalog_repo.list_lines()?)
    }

    pub fn list_sections(&self) -> ApiResult<Vec<Section>> {
        Ok(self.catalog_repo.list_sections()?)
    }

    pub fn list_towers(&self, line_id: Option<i64>) -> ApiResult<Vec<TowerView>> {
        Ok(self.catalog_repo.list_towers(line_id)?)
    }

    pub fn list_component_types(&self) -> ApiResult<Vec<ComponentType>> {
        Ok(self.catalog_repo.list_component_types()?)
    }

    pub fn get_component_type(&self, code: &str) -> ApiResult<ComponentType> {
        self.catalog_repo
            .find_component_type(code.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("型号 {} 不存在", code)))
    }

    /// 按 (线路, 塔号[, 区段]) 定位塔
    pub fn resolve_tower(
        &self,
        line_id: i64,
        tower_number: &str,
        section_id: Option<i64>,
    ) -> ApiResult<TowerView> {
        let tower_number = require_text(tower_number, "塔号")?;
        self.catalog_repo
            .resolve_tower(line_id, &tower_number, section_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!("线路 {} 下塔 {} 不存在", line_id, tower_number))
            })
    }

    /// 塔槽位对应的型号代码
    pub fn type_for_slot(&self, tower_id: i64, direction: Direction) -> ApiResult<Option<String>> {
        let tower = self
            .catalog_repo
            .find_tower(tower_id)?
            .ok_or_else(|| ApiError::NotFound(format!("塔(id={})不存在", tower_id)))?;
        Ok(tower.tower.type_for_slot(direction).map(str::to_string))
    }

    pub fn type_summary(&self) -> ApiResult<TypeSummary> {
        Ok(self.catalog_repo.type_summary()?)
    }

    /// 槽位型号为 `type_code` 的已安装数量
    pub fn installed_count(&self, type_code: &str) -> ApiResult<i64> {
        Ok(self.catalog_repo.installed_count(type_code.trim())?)
    }
}
