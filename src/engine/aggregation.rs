// ==========================================
// 平衡轮库存系统 - 健康等级汇总引擎
// ==========================================
// 职责: 按塔 / 线路 / 全局汇总等级计数与百分比，生成图表数组
// 百分比 = 等级数 / 有数据总数 * 100，保留 1 位小数；总数为 0 时全为 0
// ==========================================

use crate::domain::catalog::tower_sort_key;
use crate::domain::component::ComponentView;
use crate::domain::overhaul::OverhaulRecord;
use crate::domain::types::HealthTier;
use serde::Serialize;
use std::collections::BTreeMap;

/// 已评级平衡轮（汇总输入）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedComponent {
    pub view: ComponentView,
    pub latest: Option<OverhaulRecord>,
    pub tier: HealthTier,
}

impl RatedComponent {
    pub fn latest_backlog(&self) -> Option<i64> {
        self.latest.as_ref().and_then(|r| r.backlog)
    }
}

// ==========================================
// TierCounts - 等级计数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub normal: i64,
    pub alert: i64,
    pub critical: i64,
    pub no_data: i64,
}

impl TierCounts {
    pub fn from_tiers<I: IntoIterator<Item = HealthTier>>(tiers: I) -> Self {
        let mut counts = Self::default();
        for tier in tiers {
            counts.record(tier);
        }
        counts
    }

    pub fn record(&mut self, tier: HealthTier) {
        match tier {
            HealthTier::Normal => self.normal += 1,
            HealthTier::Alert => self.alert += 1,
            HealthTier::Critical => self.critical += 1,
            HealthTier::NoData => self.no_data += 1,
        }
    }

    pub fn total(&self) -> i64 {
        self.total_with_data() + self.no_data
    }

    pub fn total_with_data(&self) -> i64 {
        self.normal + self.alert + self.critical
    }

    pub fn percentages(&self) -> TierPercentages {
        let total = self.total_with_data();
        TierPercentages {
            normal: percentage(self.normal, total),
            alert: percentage(self.alert, total),
            critical: percentage(self.critical, total),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TierPercentages {
    pub normal: f64,
    pub alert: f64,
    pub critical: f64,
}

/// count / total * 100，1 位小数
pub fn percentage(count: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

/// 汇总结果（线路以 line_id 区分，名称可能重复）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierAggregate {
    pub line_id: i64,
    pub line_name: String,
    pub tower_number: Option<String>, // 按线路汇总时为 None
    pub counts: TierCounts,
    pub percentages: TierPercentages,
}

impl TierAggregate {
    fn new(line_id: i64, line_name: String, tower_number: Option<String>, counts: TierCounts) -> Self {
        Self {
            line_id,
            line_name,
            tower_number,
            percentages: counts.percentages(),
            counts,
        }
    }
}

/// 按塔汇总（线路名 + 塔号自然序）
pub fn aggregate_by_tower(items: &[RatedComponent]) -> Vec<TierAggregate> {
    let mut groups: BTreeMap<(String, i64, String, i64), (String, TierCounts)> = BTreeMap::new();
    for item in items {
        let key = (
            item.view.line_name().to_string(),
            item.view.line_id(),
            tower_sort_key(item.view.tower_number()),
            item.view.tower.tower.tower_id,
        );
        groups
            .entry(key)
            .or_insert_with(|| (item.view.tower_number().to_string(), TierCounts::default()))
            .1
            .record(item.tier);
    }
    groups
        .into_iter()
        .map(|((line_name, line_id, _, _), (tower_number, counts))| {
            TierAggregate::new(line_id, line_name, Some(tower_number), counts)
        })
        .collect()
}

/// 按线路汇总（线路名序，同名线路按 line_id 分开）
pub fn aggregate_by_line(items: &[RatedComponent]) -> Vec<TierAggregate> {
    let mut groups: BTreeMap<(String, i64), TierCounts> = BTreeMap::new();
    for item in items {
        groups
            .entry((item.view.line_name().to_string(), item.view.line_id()))
            .or_default()
            .record(item.tier);
    }
    groups
        .into_iter()
        .map(|((line_name, line_id), counts)| TierAggregate::new(line_id, line_name, None, counts))
        .collect()
}

/// 全局汇总
pub fn aggregate_global(items: &[RatedComponent]) -> (TierCounts, TierPercentages) {
    let counts = TierCounts::from_tiers(items.iter().map(|i| i.tier));
    (counts, counts.percentages())
}

// ==========================================
// 图表数组
// ==========================================

/// 线路堆叠柱状图（仅含有数据的线路）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineTierChart {
    pub labels: Vec<String>,
    pub normal: Vec<i64>,
    pub alert: Vec<i64>,
    pub critical: Vec<i64>,
}

pub fn line_tier_chart(by_line: &[TierAggregate]) -> LineTierChart {
    let mut chart = LineTierChart::default();
    for aggregate in by_line.iter().filter(|a| a.counts.total_with_data() > 0) {
        chart.labels.push(aggregate.line_name.clone());
        chart.normal.push(aggregate.counts.normal);
        chart.alert.push(aggregate.counts.alert);
        chart.critical.push(aggregate.counts.critical);
    }
    chart
}

/// backlog 柱状图
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacklogChart {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
    pub colors: Vec<String>,
}

/// 取前 `limit` 行；标签 "<线路> T<塔号> ASC|DES"，无数据时值为 0
pub fn backlog_chart(rows: &[RatedComponent], limit: usize) -> BacklogChart {
    let mut chart = BacklogChart::default();
    for row in rows.iter().take(limit) {
        chart.labels.push(format!(
            "{} T{} {}",
            row.view.line_name(),
            row.view.tower_number(),
            row.view.component.direction.short_label()
        ));
        chart.values.push(row.latest_backlog().unwrap_or(0));
        chart.colors.push(row.tier.chart_color().to_string());
    }
    chart
}
