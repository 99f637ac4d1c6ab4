use std::fmt::Write;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    StackedBar,
    GroupedBar,
    Line,
    Combo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Bar,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    Count,
    Percent,
    Minutes,
}

impl ValueFormat {
    pub fn format(self, value: f64) -> String {
        if !value.is_finite() {
            return "n/a".to_string();
        }
        match self {
            ValueFormat::Count => format!("{value:.0}"),
            ValueFormat::Percent => format!("{:.2}%", value * 100.0),
            ValueFormat::Minutes => format!("{value:.1}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub mark: Mark,
    pub axis: Axis,
    pub format: ValueFormat,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: &str, mark: Mark, format: ValueFormat, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            mark,
            axis: Axis::Primary,
            format,
            values,
        }
    }

    pub fn on_secondary_axis(mut self) -> Self {
        self.axis = Axis::Secondary;
        self
    }
}

/// A chart ready to hand to a surface: one label per category on the x axis
/// and one value per category in every series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y2_label: Option<String>,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

impl Chart {
    pub fn new(title: &str, kind: ChartKind, x_label: &str, y_label: &str) -> Self {
        Self {
            title: title.to_string(),
            kind,
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            y2_label: None,
            categories: Vec::new(),
            series: Vec::new(),
        }
    }

    pub fn secondary_label(mut self, label: &str) -> Self {
        self.y2_label = Some(label.to_string());
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.categories = categories.into_iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }
}

/// Where charts end up. Implementations own layout and styling.
pub trait ChartSurface {
    fn draw(&mut self, chart: &Chart) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct MarkdownSurface {
    output: String,
}

impl MarkdownSurface {
    pub fn new(title: &str) -> Self {
        let mut output = String::new();
        let _ = writeln!(output, "# {title}");
        Self { output }
    }

    pub fn into_string(self) -> String {
        self.output
    }
}

impl ChartSurface for MarkdownSurface {
    fn draw(&mut self, chart: &Chart) -> anyhow::Result<()> {
        let output = &mut self.output;
        writeln!(output)?;
        writeln!(output, "## {}", chart.title)?;
        match &chart.y2_label {
            Some(y2) => writeln!(
                output,
                "_{} by {}; {} (right axis: {})_",
                chart.y_label, chart.x_label, kind_name(chart.kind), y2
            )?,
            None => writeln!(
                output,
                "_{} by {}; {}_",
                chart.y_label, chart.x_label, kind_name(chart.kind)
            )?,
        }
        writeln!(output)?;

        if chart.categories.is_empty() {
            writeln!(output, "No data for this chart.")?;
            return Ok(());
        }

        write!(output, "| {} |", chart.x_label)?;
        for series in &chart.series {
            write!(output, " {} |", series.name)?;
        }
        writeln!(output)?;
        write!(output, "|---|")?;
        for _ in &chart.series {
            write!(output, "---:|")?;
        }
        writeln!(output)?;

        for (index, category) in chart.categories.iter().enumerate() {
            write!(output, "| {category} |")?;
            for series in &chart.series {
                match series.values.get(index) {
                    Some(value) => write!(output, " {} |", series.format.format(*value))?,
                    None => write!(output, "  |")?,
                }
            }
            writeln!(output)?;
        }
        Ok(())
    }
}

fn kind_name(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::Bar => "bar chart",
        ChartKind::StackedBar => "stacked bar chart",
        ChartKind::GroupedBar => "grouped bar chart",
        ChartKind::Line => "line chart",
        ChartKind::Combo => "bar and line chart",
    }
}

#[derive(Debug, Default)]
pub struct JsonSurface {
    charts: Vec<Chart>,
}

impl JsonSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.charts)?)
    }
}

impl ChartSurface for JsonSurface {
    fn draw(&mut self, chart: &Chart) -> anyhow::Result<()> {
        self.charts.push(chart.clone());
        Ok(())
    }
}
