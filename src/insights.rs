//! Chart suggestions and statistical findings for query results.
//!
//! Columns are classified by the values SQLite actually returned: a column is
//! numeric when every non-null value is an integer or a real, and categorical
//! when it holds any text. All-null and blob columns are neither.

use crate::constants::{
    MAX_CHART_SUGGESTIONS, OUTLIER_IQR_FACTOR, PIE_CHART_MAX_CATEGORIES, RANKING_SIZE,
};
use crate::database::metadata::format_thousands;
use crate::database::{QueryResult, SqlValue};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Column name fragments that mark a time axis.
const TEMPORAL_TERMS: &[&str] = &["year", "date", "month", "time"];

/// Kind of chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Bar,
    Pie,
    Line,
    Scatter,
    GroupedBar,
    Histogram,
}

/// A chart that fits the shape of a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSuggestion {
    pub chart_type: ChartType,

    /// Category, time or first numeric axis. For pie charts, the slice names.
    pub x: String,

    /// Value axis. For pie charts, the slice sizes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Grouping column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    pub rationale: String,
}

/// Kind of finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Statistic,
    Outlier,
    Ranking,
    Concentration,
}

/// One finding about a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    pub finding: String,
}

/// Findings for a whole result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub insights: Vec<Insight>,
    pub summary: String,
    pub row_count: usize,
    pub column_count: usize,
}

/// Column indices of a result split by kind, in column order.
struct ColumnKinds {
    numeric: Vec<usize>,
    categorical: Vec<usize>,
}

impl ColumnKinds {
    fn of(result: &QueryResult) -> Self {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for index in 0..result.columns.len() {
            let mut any_value = false;
            let mut all_numbers = true;
            let mut any_text = false;
            for value in result.column_values(index) {
                match value {
                    SqlValue::Null => continue,
                    SqlValue::Integer(_) | SqlValue::Real(_) => {}
                    SqlValue::Text(_) => {
                        any_text = true;
                        all_numbers = false;
                    }
                    SqlValue::Blob(_) => all_numbers = false,
                }
                any_value = true;
            }

            if any_text {
                categorical.push(index);
            } else if any_value && all_numbers {
                numeric.push(index);
            }
        }

        Self {
            numeric,
            categorical,
        }
    }
}

/// Suggest up to five charts that suit the columns of `result`.
///
/// Rules are tried in a fixed order: bar, pie, line, scatter, grouped bar,
/// histogram.
pub fn suggest_charts(result: &QueryResult) -> Vec<ChartSuggestion> {
    if result.rows.is_empty() {
        return Vec::new();
    }

    let kinds = ColumnKinds::of(result);
    let name = |index: usize| result.columns[index].clone();
    let mut suggestions = Vec::new();

    if let (Some(&cat), Some(&num)) = (kinds.categorical.first(), kinds.numeric.first()) {
        let (x, y) = (name(cat), name(num));
        suggestions.push(ChartSuggestion {
            chart_type: ChartType::Bar,
            rationale: format!("Compare {} across different {} values", y, x),
            x: x.clone(),
            y: Some(y.clone()),
            color: None,
        });

        if distinct_count(result, cat) <= PIE_CHART_MAX_CATEGORIES {
            suggestions.push(ChartSuggestion {
                chart_type: ChartType::Pie,
                rationale: format!("Show composition of {} by {}", y, x),
                x,
                y: Some(y),
                color: None,
            });
        }
    }

    let temporal = kinds
        .categorical
        .iter()
        .copied()
        .find(|&index| is_temporal(&result.columns[index]));
    if let (Some(time), Some(&num)) = (temporal, kinds.numeric.first()) {
        let (x, y) = (name(time), name(num));
        suggestions.push(ChartSuggestion {
            chart_type: ChartType::Line,
            rationale: format!("Show trend of {} over {}", y, x),
            x,
            y: Some(y),
            color: None,
        });
    }

    if let [first, second, ..] = kinds.numeric[..] {
        let (x, y) = (name(first), name(second));
        suggestions.push(ChartSuggestion {
            chart_type: ChartType::Scatter,
            rationale: format!("Explore relationship between {} and {}", x, y),
            x,
            y: Some(y),
            color: None,
        });
    }

    if let ([first, second, ..], Some(&num)) = (&kinds.categorical[..], kinds.numeric.first()) {
        let (x, group, y) = (name(*first), name(*second), name(num));
        suggestions.push(ChartSuggestion {
            chart_type: ChartType::GroupedBar,
            rationale: format!("Compare {} across {}, grouped by {}", y, x, group),
            x,
            y: Some(y),
            color: Some(group),
        });
    }

    if let Some(&num) = kinds.numeric.first() {
        let x = name(num);
        suggestions.push(ChartSuggestion {
            chart_type: ChartType::Histogram,
            rationale: format!("Show distribution of {} values", x),
            x,
            y: None,
            color: None,
        });
    }

    suggestions.truncate(MAX_CHART_SUGGESTIONS);
    suggestions
}

/// Derive summary statistics, outliers, rankings and concentration.
pub fn derive_insights(result: &QueryResult) -> Insights {
    if result.rows.is_empty() {
        return Insights {
            insights: Vec::new(),
            summary: "No data to analyze".to_string(),
            row_count: 0,
            column_count: result.columns.len(),
        };
    }

    let kinds = ColumnKinds::of(result);
    let mut insights = Vec::new();

    for &index in &kinds.numeric {
        let column = &result.columns[index];
        let mut values = numbers(result, index);
        values.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let (min, max) = (values[0], values[values.len() - 1]);
        insights.push(Insight {
            kind: InsightKind::Statistic,
            column: Some(column.clone()),
            finding: format!(
                "{}: mean={:.2}, median={:.2}, range=[{:.2}, {:.2}]",
                column,
                mean,
                quantile(&values, 0.5),
                min,
                max
            ),
        });

        let q1 = quantile(&values, 0.25);
        let q3 = quantile(&values, 0.75);
        let fence = OUTLIER_IQR_FACTOR * (q3 - q1);
        let outliers = values
            .iter()
            .filter(|&&v| v < q1 - fence || v > q3 + fence)
            .count();
        if outliers > 0 {
            insights.push(Insight {
                kind: InsightKind::Outlier,
                column: Some(column.clone()),
                finding: format!("{} potential outliers detected in {}", outliers, column),
            });
        }
    }

    if let (Some(&cat), Some(&num)) = (kinds.categorical.first(), kinds.numeric.first()) {
        let num_name = &result.columns[num];
        let mut ranked: Vec<(String, f64)> = result
            .rows
            .iter()
            .filter_map(|row| {
                let value = row.get(num)?.as_f64()?;
                let label = row.get(cat).map(SqlValue::to_display_string)?;
                Some((label, value))
            })
            .collect();

        // Stable sorts keep the first of equal values, as a ranking should.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        insights.push(ranking("Top", num_name, &ranked));
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        insights.push(ranking("Bottom", num_name, &ranked));
    }

    if let Some(&num) = kinds.numeric.first() {
        let mut values = numbers(result, num);
        let total: f64 = values.iter().sum();
        if total > 0.0 {
            values.sort_by(|a, b| b.total_cmp(a));
            let head = (result.row_count() / 5).max(1);
            let top: f64 = values.iter().take(head).sum();
            insights.push(Insight {
                kind: InsightKind::Concentration,
                column: Some(result.columns[num].clone()),
                finding: format!(
                    "Top 20% of entries account for {:.1}% of total {}",
                    top / total * 100.0,
                    result.columns[num]
                ),
            });
        }
    }

    let mut summary = format!(
        "Analyzed {} rows with {} columns.",
        result.row_count(),
        result.columns.len()
    );
    for (label, indices) in [
        ("Numeric", &kinds.numeric),
        ("Categorical", &kinds.categorical),
    ] {
        if !indices.is_empty() {
            let names: Vec<&str> = indices.iter().map(|&i| result.columns[i].as_str()).collect();
            summary.push_str(&format!(" {} columns: {}.", label, names.join(", ")));
        }
    }

    Insights {
        insights,
        summary,
        row_count: result.row_count(),
        column_count: result.columns.len(),
    }
}

fn is_temporal(column: &str) -> bool {
    let lower = column.to_lowercase();
    TEMPORAL_TERMS.iter().any(|term| lower.contains(term))
}

fn distinct_count(result: &QueryResult, index: usize) -> usize {
    result
        .column_values(index)
        .filter(|v| !v.is_null())
        .map(SqlValue::to_display_string)
        .collect::<HashSet<_>>()
        .len()
}

/// Non-null values of a numeric column.
fn numbers(result: &QueryResult, index: usize) -> Vec<f64> {
    result.column_values(index).filter_map(SqlValue::as_f64).collect()
}

/// Linearly interpolated quantile of sorted, non-empty `values`.
fn quantile(values: &[f64], q: f64) -> f64 {
    let position = (values.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    values[lower] + (values[upper] - values[lower]) * fraction
}

fn ranking(direction: &str, column: &str, ranked: &[(String, f64)]) -> Insight {
    let items: Vec<String> = ranked
        .iter()
        .take(RANKING_SIZE)
        .map(|(label, value)| format!("{} ({})", label, format_thousands(value.round() as i64)))
        .collect();
    Insight {
        kind: InsightKind::Ranking,
        column: Some(column.to_string()),
        finding: format!(
            "{} {} by {}: {}",
            direction,
            RANKING_SIZE,
            column,
            items.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ResultRow;

    fn result(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> QueryResult {
        QueryResult {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows.into_iter().map(ResultRow::new).collect(),
            execution_time_ms: 0,
            truncated: false,
        }
    }

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    fn deaths_by_country() -> QueryResult {
        result(
            &["country", "disease", "deaths", "dalys"],
            vec![
                vec![text("Nigeria"), text("Malaria"), SqlValue::Integer(184000), SqlValue::Real(5.1)],
                vec![text("Ghana"), text("Malaria"), SqlValue::Integer(12000), SqlValue::Real(0.4)],
                vec![text("Kenya"), text("Malaria"), SqlValue::Integer(9800), SqlValue::Real(0.3)],
                vec![text("Mali"), text("Malaria"), SqlValue::Integer(11000), SqlValue::Null],
                vec![text("Niger"), text("Malaria"), SqlValue::Integer(10500), SqlValue::Real(0.3)],
            ],
        )
    }

    #[test]
    fn test_chart_rules_in_order() {
        let charts = suggest_charts(&deaths_by_country());
        let types: Vec<ChartType> = charts.iter().map(|c| c.chart_type).collect();
        assert_eq!(
            types,
            vec![
                ChartType::Bar,
                ChartType::Pie,
                ChartType::Scatter,
                ChartType::GroupedBar,
                ChartType::Histogram,
            ]
        );

        assert_eq!(charts[0].x, "country");
        assert_eq!(charts[0].y.as_deref(), Some("deaths"));
        assert_eq!(charts[0].rationale, "Compare deaths across different country values");
        assert_eq!(charts[2].y.as_deref(), Some("dalys"));
        assert_eq!(charts[3].color.as_deref(), Some("disease"));
        assert!(charts[4].y.is_none());
    }

    #[test]
    fn test_line_chart_for_time_axis() {
        let data = result(
            &["month", "cases"],
            vec![
                vec![text("2023-01"), SqlValue::Integer(40)],
                vec![text("2023-02"), SqlValue::Integer(55)],
            ],
        );
        let charts = suggest_charts(&data);
        let line = charts
            .iter()
            .find(|c| c.chart_type == ChartType::Line)
            .unwrap();
        assert_eq!(line.x, "month");
        assert_eq!(line.rationale, "Show trend of cases over month");
    }

    #[test]
    fn test_chart_limits() {
        let rows = (0..12)
            .map(|i| vec![text(&format!("c{}", i)), SqlValue::Integer(i)])
            .collect();
        let charts = suggest_charts(&result(&["country", "cases"], rows));
        assert!(charts.iter().all(|c| c.chart_type != ChartType::Pie));

        assert!(suggest_charts(&QueryResult::empty()).is_empty());

        let only_text = result(&["name"], vec![vec![text("Ghana")]]);
        assert!(suggest_charts(&only_text).is_empty());
    }

    #[test]
    fn test_statistics_and_outliers() {
        let insights = derive_insights(&deaths_by_country());
        let deaths = &insights.insights[0];
        assert_eq!(deaths.kind, InsightKind::Statistic);
        assert_eq!(
            deaths.finding,
            "deaths: mean=45460.00, median=11000.00, range=[9800.00, 184000.00]"
        );

        let outlier = insights
            .insights
            .iter()
            .find(|i| i.kind == InsightKind::Outlier && i.column.as_deref() == Some("deaths"))
            .unwrap();
        assert_eq!(outlier.finding, "1 potential outliers detected in deaths");
    }

    #[test]
    fn test_rankings_and_concentration() {
        let insights = derive_insights(&deaths_by_country());
        let findings: Vec<&str> = insights.insights.iter().map(|i| i.finding.as_str()).collect();

        assert!(findings.contains(
            &"Top 5 by deaths: Nigeria (184,000), Ghana (12,000), Mali (11,000), \
              Niger (10,500), Kenya (9,800)"
        ));
        assert!(findings
            .iter()
            .any(|f| f.starts_with("Bottom 5 by deaths: Kenya (9,800), Niger (10,500)")));
        // One of five rows holds 184000 of 227300.
        assert!(findings.contains(&"Top 20% of entries account for 80.9% of total deaths"));
    }

    #[test]
    fn test_summary() {
        let insights = derive_insights(&deaths_by_country());
        assert_eq!(insights.row_count, 5);
        assert_eq!(insights.column_count, 4);
        assert_eq!(
            insights.summary,
            "Analyzed 5 rows with 4 columns. Numeric columns: deaths, dalys. \
             Categorical columns: country, disease."
        );

        let empty = derive_insights(&QueryResult::empty());
        assert!(empty.insights.is_empty());
        assert_eq!(empty.summary, "No data to analyze");
    }

    #[test]
    fn test_no_concentration_without_positive_total() {
        let data = result(
            &["balance"],
            vec![vec![SqlValue::Integer(-5)], vec![SqlValue::Integer(0)]],
        );
        let insights = derive_insights(&data);
        assert!(insights
            .insights
            .iter()
            .all(|i| i.kind != InsightKind::Concentration));
    }

    #[test]
    fn test_serialized_shape() {
        let charts = suggest_charts(&deaths_by_country());
        let json = serde_json::to_value(&charts[3]).unwrap();
        assert_eq!(json["chart_type"], "grouped_bar");
        assert_eq!(json["color"], "disease");

        let histogram = serde_json::to_value(&charts[4]).unwrap();
        assert!(histogram.get("y").is_none());

        let insights = serde_json::to_value(derive_insights(&deaths_by_country())).unwrap();
        assert_eq!(insights["insights"][0]["type"], "statistic");
    }
}
