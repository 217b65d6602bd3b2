//! ECharts configurations for the dashboard.
//!
//! - **Spending by Category**: doughnut chart of all-time category totals
//! - **Daily Spending**: line chart of the last 30 days
//! - **Monthly Spending**: bar chart of the last six months

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::{Line, Pie, bar},
};
use maud::PreEscaped;
use time::Date;

use crate::{
    dashboard::trends::{day_label, month_label},
    expense::CategoryTotal,
    html::HeadElement,
};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Charts follow the browser's dark mode setting and resize with the window.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    if (!chartDom) {{ return; }}
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

pub(super) fn category_chart(category_totals: &[CategoryTotal]) -> Chart {
    let data: Vec<(f64, String)> = category_totals
        .iter()
        .map(|total| (total.total, total.category.clone()))
        .collect();

    Chart::new()
        .title(Title::new().text("Spending by Category").subtext("All time"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom("1%"))
        .series(
            Pie::new()
                .name("Spent")
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

pub(super) fn daily_trend_chart(daily_totals: &[(Date, f64)]) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) = daily_totals
        .iter()
        .map(|(date, total)| (day_label(*date), *total))
        .unzip();

    Chart::new()
        .title(Title::new().text("Daily Spending").subtext("Last 30 days"))
        .tooltip(currency_tooltip())
        .grid(default_grid())
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Line::new().name("Spent").data(values))
}

pub(super) fn monthly_trend_chart(monthly_totals: &[(Date, f64)]) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) = monthly_totals
        .iter()
        .map(|(month, total)| (month_label(*month), *total))
        .unzip();

    Chart::new()
        .title(Title::new().text("Monthly Spending").subtext("Last six months"))
        .tooltip(currency_tooltip())
        .grid(default_grid())
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(bar::Bar::new().name("Spent").data(values))
}

fn default_grid() -> Grid {
    Grid::new()
        .left("3%")
        .right("4%")
        .bottom("3%")
        .contain_label(true)
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const numberFormatter = new Intl.NumberFormat('en-US', {
              minimumFractionDigits: 2,
              maximumFractionDigits: 2
            });
            return (number) ? 'Rs. ' + numberFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
