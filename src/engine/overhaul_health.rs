// ==========================================
// 平衡轮库存系统 - OH backlog 与健康等级引擎
// ==========================================
// 红线: 健康等级只看序号最大的一条 OH 记录
// ==========================================
// backlog = 周期小时 - 运行小时（运行小时缺失则为空）
// 等级:
// - 运行小时 >= 周期（backlog <= 0）      → CRITICAL
// - 0 < backlog < 预警阈值（默认 5000）  → ALERT
// - backlog >= 预警阈值                  → NORMAL
// - 无记录 / 最新记录无运行小时          → NO_DATA
// ==========================================

use crate::domain::component::ComponentView;
use crate::domain::overhaul::{NewOverhaul, OverhaulRecord};
use crate::domain::types::HealthTier;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::instrument;
use uuid::Uuid;

/// 预警阈值默认值（小时）
pub const DEFAULT_ALERT_BACKLOG_HOURS: i64 = 5_000;

/// 分级阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    pub alert_backlog_hours: i64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            alert_backlog_hours: DEFAULT_ALERT_BACKLOG_HOURS,
        }
    }
}

// ==========================================
// OverhaulHealthEngine - backlog / 等级判定
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct OverhaulHealthEngine {
    thresholds: HealthThresholds,
}

impl OverhaulHealthEngine {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> HealthThresholds {
        self.thresholds
    }

    /// backlog = 周期 - 运行小时
    pub fn compute_backlog(interval_hours: i64, operating_hours: Option<i64>) -> Option<i64> {
        operating_hours.map(|hours| interval_hours - hours)
    }

    /// 按 backlog 判定等级
    pub fn classify_backlog(&self, backlog: Option<i64>) -> HealthTier {
        match backlog {
            None => HealthTier::NoData,
            Some(b) if b <= 0 => HealthTier::Critical,
            Some(b) if b < self.thresholds.alert_backlog_hours => HealthTier::Alert,
            Some(_) => HealthTier::Normal,
        }
    }

    /// 按最新 OH 记录判定等级（None = 无记录）
    pub fn classify(&self, latest: Option<&OverhaulRecord>) -> HealthTier {
        self.classify_backlog(latest.and_then(|record| record.backlog))
    }

    /// 由平衡轮当前视图生成 OH 记录（快照此刻的线路/塔/方向/型号/周期）
    #[instrument(skip(self, view, request), fields(code = %view.component.code, seq = request.sequence_number))]
    pub fn build_record(
        &self,
        view: &ComponentView,
        request: &NewOverhaul,
        recorded_by: &str,
        now: NaiveDateTime,
    ) -> OverhaulRecord {
        let interval_hours = view.component.interval_hours;
        OverhaulRecord {
            record_id: Uuid::new_v4().to_string(),
            component_code: view.component.code.clone(),
            sequence_number: request.sequence_number,
            overhaul_date: request.overhaul_date,
            operating_hours: request.operating_hours,
            backlog: Self::compute_backlog(interval_hours, request.operating_hours),
            year: request.overhaul_date.year(),
            weekday: weekday_name(request.overhaul_date),
            line_name: view.line_name().to_string(),
            tower_number: view.tower_number().to_string(),
            direction: view.component.direction,
            type_code: view.type_code.clone(),
            interval_hours,
            notes: request.notes.clone(),
            recorded_by: recorded_by.to_string(),
            created_at: now,
        }
    }
}

/// 星期英文全称（Monday..Sunday）
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{Tower, TowerView};
    use crate::domain::component::Component;
    use crate::domain::types::Direction;

    fn record(seq: i64, hours: Option<i64>) -> OverhaulRecord {
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        OverhaulRecord {
            record_id: format!("r{}", seq),
            component_code: "BAL-16N-001".to_string(),
            sequence_number: seq,
            overhaul_date: date,
            operating_hours: hours,
            backlog: OverhaulHealthEngine::compute_backlog(30_000, hours),
            year: 2024,
            weekday: weekday_name(date),
            line_name: "L1".to_string(),
            tower_number: "4".to_string(),
            direction: Direction::Ascending,
            type_code: None,
            interval_hours: 30_000,
            notes: None,
            recorded_by: "tester".to_string(),
            created_at: date.and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_backlog_defined_iff_hours_defined() {
        assert_eq!(OverhaulHealthEngine::compute_backlog(30_000, Some(28_000)), Some(2_000));
        assert_eq!(OverhaulHealthEngine::compute_backlog(30_000, None), None);
    }

    #[test]
    fn test_classify_boundaries() {
        let engine = OverhaulHealthEngine::default();
        assert_eq!(engine.classify(None), HealthTier::NoData);
        assert_eq!(engine.classify(Some(&record(1, None))), HealthTier::NoData);
        assert_eq!(engine.classify(Some(&record(1, Some(28_000)))), HealthTier::Alert);
        assert_eq!(engine.classify(Some(&record(2, Some(31_000)))), HealthTier::Critical);
        // 运行小时 == 周期 → CRITICAL
        assert_eq!(engine.classify(Some(&record(3, Some(30_000)))), HealthTier::Critical);
        // backlog == 阈值 → NORMAL
        assert_eq!(engine.classify(Some(&record(4, Some(25_000)))), HealthTier::Normal);
        assert_eq!(engine.classify(Some(&record(5, Some(25_001)))), HealthTier::Alert);
    }

    #[test]
    fn test_custom_threshold() {
        let engine = OverhaulHealthEngine::new(HealthThresholds {
            alert_backlog_hours: 1_000,
        });
        assert_eq!(engine.classify_backlog(Some(2_000)), HealthTier::Normal);
        assert_eq!(engine.classify_backlog(Some(999)), HealthTier::Alert);
    }

    #[test]
    fn test_build_record_snapshots_view() {
        let created = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let view = ComponentView {
            component: Component {
                code: "BAL-16N-001".to_string(),
                tower_id: 9,
                direction: Direction::Descending,
                interval_hours: 30_000,
                notes: None,
                registered_at: created,
            },
            tower: TowerView {
                tower: Tower {
                    tower_id: 9,
                    line_id: 1,
                    section_id: 1,
                    tower_number: "12A".to_string(),
                    asc_type_code: None,
                    desc_type_code: Some("16N".to_string()),
                    notes: None,
                    created_at: created,
                },
                line_name: "L2".to_string(),
                section_name: "S1".to_string(),
            },
            type_code: Some("16N".to_string()),
        };
        let request = NewOverhaul {
            sequence_number: 1,
            overhaul_date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            operating_hours: Some(28_000),
            notes: None,
        };

        let record = OverhaulHealthEngine::default().build_record(&view, &request, "tester", created);
        assert_eq!(record.backlog, Some(2_000));
        assert_eq!(record.year, 2024);
        assert_eq!(record.weekday, "Monday");
        assert_eq!(record.line_name, "L2");
        assert_eq!(record.tower_number, "12A");
        assert_eq!(record.type_code.as_deref(), Some("16N"));
        assert_eq!(record.month_year_label(), "May-24");
    }
}
