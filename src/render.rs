//! Plain-text cards for the terminal dashboard.

use std::fmt;

use crate::api::ExportFormat;
use crate::dashboard::{ExportStatus, Filters, ServerStatus};
use crate::format::{count, days, dollars, fixed, percent, text, NA};
use crate::model::{AnalysisSummary, ChangePoint, Event, EventCorrelation, OilPriceSeries};

pub const NO_NEARBY_EVENTS: &str = "No major events detected within 1 year of the change point.";

const MAX_NEARBY_EVENTS: usize = 5;
const MAX_IMPACTS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub heading: Option<String>,
    pub lines: Vec<String>,
}

impl Section {
    pub fn new(heading: &str) -> Self {
        Self {
            heading: Some(heading.to_string()),
            lines: Vec::new(),
        }
    }

    pub fn plain() -> Self {
        Self::default()
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub title: String,
    pub subtitle: Option<String>,
    pub sections: Vec<Section>,
}

impl Card {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            subtitle: None,
            sections: Vec::new(),
        }
    }

    pub fn subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = Some(subtitle.to_string());
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// All body lines, without headings; handy for assertions.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().flat_map(|s| s.lines.iter().map(String::as_str))
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().any(|l| l.contains(needle))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(self.title.chars().count() + 8);
        writeln!(f, "{}", rule)?;
        writeln!(f, "=== {} ===", self.title)?;
        writeln!(f, "{}", rule)?;
        if let Some(sub) = &self.subtitle {
            writeln!(f, "{}", sub)?;
        }
        for section in &self.sections {
            writeln!(f)?;
            if let Some(h) = &section.heading {
                writeln!(f, "[{}]", h)?;
            }
            for line in &section.lines {
                writeln!(f, "  {}", line)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Analysis cards
// =============================================================================

pub fn change_point_card(cp: Option<&ChangePoint>) -> Card {
    let Some(cp) = cp else {
        return Card::new("Change Point Analysis")
            .section(Section::plain().line("Change point data not available"));
    };
    let date = text(cp.changepoint_date.as_deref());
    let shift = match cp.mean_change {
        Some(v) if v > 0.0 => "This represents a shift toward higher volatility in oil returns.",
        _ => "This represents a shift toward lower volatility in oil returns.",
    };

    Card::new("Change Point Analysis")
        .subtitle("Bayesian structural break detection results")
        .section(
            Section::new("Detection Results")
                .line(format!("Change Point Date: {}", date))
                .line(format!(
                    "Credible Interval: {} to {}",
                    text(cp.credible_interval_start.as_deref()),
                    text(cp.credible_interval_end.as_deref())
                ))
                .line(format!("Probability of Increase: {}", percent(cp.prob_increase, 1))),
        )
        .section(
            Section::new("Parameter Changes")
                .line(format!("Mean Before: {}", fixed(cp.mean_before, 6)))
                .line(format!("Mean After: {}", fixed(cp.mean_after, 6)))
                .line(format!("Mean Change: {}", fixed(cp.mean_change, 6))),
        )
        .section(Section::new("Interpretation").line(format!(
            "The Bayesian change point model detected a structural break on {}. {}",
            date, shift
        )))
}

pub fn correlation_insight(corr: Option<&EventCorrelation>) -> String {
    let within = corr
        .and_then(|c| c.event_correlation.as_ref())
        .and_then(|s| s.events_within_1year)
        .unwrap_or(0);
    if within > 0 {
        format!(
            "{} major events occurred within 1 year of the detected change point, suggesting potential causal relationships.",
            within
        )
    } else {
        NO_NEARBY_EVENTS.to_string()
    }
}

fn event_line(e: &Event) -> String {
    format!(
        "{} | {} | {} | {} days from change point",
        e.name.as_deref().unwrap_or("Unknown Event"),
        text(e.date.as_deref()),
        text(e.category.as_deref()),
        days(e.abs_days_to_cp)
    )
}

pub fn event_correlation_card(corr: Option<&EventCorrelation>) -> Card {
    let Some(c) = corr else {
        return Card::new("Event Correlation")
            .section(Section::plain().line("Event correlation data not available"));
    };
    let mut card = Card::new("Event Correlation Analysis")
        .subtitle("Temporal relationship between events and change points");

    if let Some(s) = &c.event_correlation {
        card = card
            .section(
                Section::new("Proximity Statistics")
                    .line(format!("Events within 1 year: {}", s.events_within_1year.unwrap_or(0)))
                    .line(format!("Events within 2 years: {}", s.events_within_2years.unwrap_or(0)))
                    .line(format!("Closest event: {} days", days(s.closest_event_days.filter(|d| *d != 0.0)))),
            )
            .section(
                Section::new("Statistical Summary")
                    .line(format!("Total events analyzed: {}", s.total_events.unwrap_or(0)))
                    .line(format!("Mean distance: {} days", fixed(s.mean_distance_days, 1)))
                    .line(format!("Events in CI: {}", s.events_within_ci.unwrap_or(0))),
            );
    }

    if !c.nearby_events.is_empty() {
        let mut section = Section::new("Closest Events to Change Point");
        for e in c.nearby_events.iter().take(MAX_NEARBY_EVENTS) {
            section = section.line(event_line(e));
        }
        card = card.section(section);
    }

    if !c.event_impacts.is_empty() {
        let mut section = Section::new("Event Impact Analysis");
        for impact in c.event_impacts.iter().take(MAX_IMPACTS) {
            let sign = match impact.price_change_pct {
                Some(v) if v > 0.0 => "+",
                _ => "-",
            };
            section = section.line(format!(
                "{} {}: {}% price change",
                sign,
                impact.event_name.as_deref().unwrap_or("Unknown Event"),
                fixed(impact.price_change_pct, 2)
            ));
        }
        card = card.section(section);
    }

    card.section(Section::new("Correlation Insights").line(correlation_insight(corr)))
}

pub fn key_insights_card(summary: Option<&AnalysisSummary>, corr: Option<&EventCorrelation>) -> Card {
    let mut card = Card::new("Key Insights").subtitle("Main findings from the analysis");
    let insights = summary.map(|s| s.key_insights.as_slice()).unwrap_or(&[]);

    if !insights.is_empty() {
        for (i, insight) in insights.iter().enumerate() {
            card = card.section(Section::new(&format!("Insight {}", i + 1)).line(insight.clone()));
        }
    } else {
        let cp = summary.and_then(|s| s.changepoint.as_ref());
        let detection = match cp {
            Some(cp) => format!(
                "Structural break detected on {} with {} probability of increase.",
                text(cp.changepoint_date.as_deref()),
                percent(cp.prob_increase, 1)
            ),
            None => "Change point analysis provides insights into structural breaks in oil price volatility.".to_string(),
        };
        let correlation = match corr.and_then(|c| c.event_correlation.as_ref()) {
            Some(s) => format!(
                "{} major events occurred within 1 year of the change point.",
                s.events_within_1year.unwrap_or(0)
            ),
            None => "Analysis reveals temporal relationships between geopolitical events and market volatility."
                .to_string(),
        };
        let impact = match cp.and_then(|cp| cp.mean_change).filter(|v| *v != 0.0) {
            Some(v) => format!(
                "Mean volatility {} by {} after the change point.",
                if v > 0.0 { "increased" } else { "decreased" },
                percent(Some(v.abs()), 2)
            ),
            None => "Quantitative analysis of price volatility changes around structural breaks.".to_string(),
        };
        card = card
            .section(Section::new("Change Point Detection").line(detection))
            .section(Section::new("Event Correlation").line(correlation))
            .section(Section::new("Market Impact").line(impact));
    }

    card.section(Section::new("Analysis Summary").line(
        "Brent oil price volatility analysed with Bayesian change point detection; \
         structural breaks are correlated with major geopolitical and economic events.",
    ))
}

pub fn data_summary_card(
    oil: Option<&OilPriceSeries>,
    events: Option<&[Event]>,
    cp: Option<&ChangePoint>,
) -> Card {
    let series = oil.and_then(|o| o.summary.as_ref());
    let event_count = events.map(|e| e.len()).filter(|n| *n > 0);

    let mut card = Card::new("Data Summary")
        .subtitle("Overview of datasets used in the analysis")
        .section(
            Section::new("Price Data Points")
                .line(count(series.and_then(|s| s.count).filter(|n| *n > 0)))
                .line(
                    series
                        .and_then(|s| s.date_range.clone())
                        .unwrap_or_else(|| "Date range not available".to_string()),
                ),
        )
        .section(
            Section::new("Major Events")
                .line(event_count.map(|n| n.to_string()).unwrap_or_else(|| NA.to_string()))
                .line("Geopolitical & Economic"),
        )
        .section(
            Section::new("Change Point")
                .line(if cp.is_some() { "1" } else { "0" })
                .line(
                    cp.and_then(|c| c.changepoint_date.clone())
                        .unwrap_or_else(|| "Not detected".to_string()),
                ),
        );

    if let Some(s) = series {
        card = card.section(
            Section::new("Price Statistics")
                .line(format!("Mean Price: {}", dollars(s.mean)))
                .line(format!("Minimum: {}", dollars(s.min)))
                .line(format!("Maximum: {}", dollars(s.max)))
                .line(format!("Std Dev: {}", fixed(s.std, 2))),
        );
    }
    card
}

pub fn events_card(events: &[Event], filters: &Filters) -> Card {
    let mut section = Section::new(&format!("{} events", events.len()));
    for e in events {
        section = section.line(format!(
            "{} | {} | {}",
            text(e.date.as_deref()),
            e.name.as_deref().unwrap_or("Unknown Event"),
            text(e.category.as_deref())
        ));
    }
    Card::new("Major Events")
        .subtitle(&format!("Active filters: {}", filters.describe_active()))
        .section(section)
}

/// Stand-in for the interactive chart.
pub fn price_chart_card(oil: Option<&OilPriceSeries>, cp: Option<&ChangePoint>) -> Card {
    let mut section = Section::plain();
    if let Some(o) = oil {
        let n = o.summary.as_ref().and_then(|s| s.count).unwrap_or(0);
        section = section.line(format!("Data loaded: {} price points", n));
    }
    if let Some(cp) = cp {
        section = section.line(format!("Change Point: {}", text(cp.changepoint_date.as_deref())));
    }
    Card::new("Brent Oil Price Chart")
        .subtitle("Historical prices with change point and major events")
        .section(section)
}

// =============================================================================
// Chrome: header, filters, export, errors
// =============================================================================

pub fn header_card(status: &ServerStatus, summary: Option<&AnalysisSummary>) -> Card {
    let mut card = Card::new("Brent Oil Analysis")
        .subtitle("Change Point Detection & Event Correlation")
        .section(
            Section::new("Server")
                .line(format!("Server: {}", status.label()))
                .line(format!("Updated: {}", status.last_updated().unwrap_or("Unknown"))),
        );

    if let Some(s) = summary {
        if let Some(cp) = &s.changepoint {
            card = card.section(
                Section::new("Key Metrics")
                    .line(format!("Change Point: {}", text(cp.changepoint_date.as_deref())))
                    .line(format!("Confidence: {}", percent(cp.prob_increase, 1)))
                    .line(format!(
                        "Data Points: {}",
                        count(s.price_summary.as_ref().and_then(|p| p.total_observations))
                    )),
            );
        }
        if let Some(q) = &s.data_quality {
            card = card.section(
                Section::new("Analysis").line(format!("Analysis Date: {}", text(q.analysis_date.as_deref()))),
            );
        }
    }
    card
}

pub fn filter_card(filters: &Filters) -> Card {
    Card::new("Filter Controls")
        .subtitle("Customize the analysis view")
        .section(Section::new("Active Filters").line(filters.describe_active()))
}

pub fn export_card(status: Option<&ExportStatus>) -> Card {
    let mut formats = Section::new("Formats");
    for f in ExportFormat::ALL {
        formats = formats.line(format!("{:<5} {}", f.label(), f.description()));
    }
    let mut card = Card::new("Export Data")
        .subtitle("Download analysis results in various formats")
        .section(formats);
    if let Some(s) = status {
        card = card.section(Section::new("Status").line(s.message()));
    }
    card
}

pub fn error_card(title: &str, message: &str) -> Card {
    Card::new(title).section(
        Section::plain()
            .line(message.to_string())
            .line("Run the command again to retry."),
    )
}

pub fn methodology_card() -> Card {
    Card::new("Analysis Methodology")
        .section(Section::new("1. Change Point Detection").line(
            "Bayesian change point detection with PyMC3 locates structural breaks in the \
             Brent oil price series, estimating the most likely regime change in mean return behavior.",
        ))
        .section(Section::new("2. Event Correlation").line(
            "Major geopolitical and economic events are matched in time against detected change points. \
             Events inside the credible interval and their distance to each break are measured.",
        ))
        .section(Section::new("3. Impact Quantification").line(
            "Price impact of events near a change point is measured over 30-day windows before and after \
             the event, as percentage price change and volatility shift.",
        ))
}

pub fn footer_card(summary: Option<&AnalysisSummary>) -> Card {
    let period = summary.and_then(|s| s.price_summary.as_ref());
    Card::new("Data Sources")
        .section(
            Section::plain()
                .line("Brent Oil Prices: Historical daily closing prices")
                .line("Major Events: Curated geopolitical and economic events (1990-2022)")
                .line(format!(
                    "Analysis Period: {} to {}",
                    text(period.and_then(|p| p.start_date.as_deref())),
                    text(period.and_then(|p| p.end_date.as_deref()))
                )),
        )
        .section(
            Section::new("Technical Details")
                .line("Model: Bayesian Change Point Detection (PyMC3)")
                .line("Sampling: NUTS (No-U-Turn Sampler)")
                .line("Credible Intervals: 95% posterior probability")
                .line("Event Window: +/-30 days for impact analysis"),
        )
}
