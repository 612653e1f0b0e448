//! Human-readable rendering of index results

use crate::ranking::IndexResult;
use crate::types::{Forecast, Timestamp};

/// Title line of every summary
pub const SUMMARY_TITLE: &str = "Daily potential stock analysis";

/// Markup flavour of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStyle {
    Plain,
    /// Telegram `parse_mode=HTML`
    Html,
    /// Discord markdown
    Markdown,
}

impl SummaryStyle {
    fn bold(&self, text: &str) -> String {
        match self {
            SummaryStyle::Plain => text.to_string(),
            SummaryStyle::Html => format!("<b>{}</b>", escape_html(text)),
            SummaryStyle::Markdown => format!("**{}**", text),
        }
    }

    fn text(&self, text: &str) -> String {
        match self {
            SummaryStyle::Html => escape_html(text),
            _ => text.to_string(),
        }
    }
}

/// One ranked line, e.g.
/// `Ticker: T, Potential: 12.34%, Current: 100.00, Predicted: 112.34`
pub fn forecast_line(forecast: &Forecast) -> String {
    format!(
        "Ticker: {}, Potential: {:.2}%, Current: {:.2}, Predicted: {:.2}",
        forecast.ticker,
        forecast.potential * 100.0,
        forecast.current_price,
        forecast.predicted_price
    )
}

pub fn format_timestamp(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Full summary of one index: calculation time, index name, then every
/// label with its ranked lines
pub fn render_summary(index_name: &str, result: &IndexResult, style: SummaryStyle) -> String {
    let mut out = String::new();
    out.push_str(&style.bold(SUMMARY_TITLE));
    out.push('\n');
    out.push_str(&format!(
        "Calculated at: {}\n\nIndex: {}\n",
        style.bold(&format_timestamp(result.computed_at)),
        style.bold(index_name)
    ));

    for (label, forecasts) in &result.strategies {
        out.push('\n');
        out.push_str(&style.bold(&format!("{}:", label)));
        out.push('\n');
        for forecast in forecasts {
            out.push_str(&style.text(&forecast_line(forecast)));
            out.push('\n');
        }
    }
    out
}

/// Subject line of a titled message, `<title> - <index> - <time>`
pub fn render_subject(index_name: &str, computed_at: Timestamp) -> String {
    format!("{} - {} - {}", SUMMARY_TITLE, index_name, format_timestamp(computed_at))
}

pub fn error_subject() -> String {
    format!("{} - Error", SUMMARY_TITLE)
}

/// Run-level failure notice
pub fn render_error(message: &str, style: SummaryStyle) -> String {
    format!("{} {}", style.bold("Error:"), style.text(message))
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Split `text` into chunks of at most `limit` characters, preferring line
/// boundaries
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 || text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{RankingAggregator, StrategyResult};
    use crate::types::StrategyKind;
    use chrono::{TimeZone, Utc};

    fn result() -> IndexResult {
        let forecasts = vec![
            Forecast::new("AAPL", 0.1234, 100.0, 112.34),
            Forecast::new("T", -0.05, 20.0, 19.0),
        ];
        let mut result = IndexResult {
            computed_at: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
            strategies: StrategyResult::new(),
        };
        result.insert(StrategyKind::Recurrent, RankingAggregator::default().rank(&forecasts));
        result
    }

    #[test]
    fn test_forecast_line() {
        assert_eq!(
            forecast_line(&Forecast::new("T", 0.1234, 100.0, 112.34)),
            "Ticker: T, Potential: 12.34%, Current: 100.00, Predicted: 112.34"
        );
    }

    #[test]
    fn test_plain_summary() {
        let text = render_summary("S&P 500", &result(), SummaryStyle::Plain);

        assert!(text.starts_with(SUMMARY_TITLE));
        assert!(text.contains("Calculated at: 2024-05-06 07:08:09"));
        assert!(text.contains("Index: S&P 500"));
        let top = text.find("Recurrent-top:").unwrap();
        let bottom = text.find("Recurrent-bottom:").unwrap();
        assert!(top < bottom);
        assert!(text.contains("Ticker: AAPL, Potential: 12.34%, Current: 100.00, Predicted: 112.34"));
    }

    #[test]
    fn test_html_summary_escapes() {
        let text = render_summary("S&P 500", &result(), SummaryStyle::Html);
        assert!(text.contains("Index: <b>S&amp;P 500</b>"));
        assert!(text.contains("<b>Recurrent-top:</b>"));
    }

    #[test]
    fn test_markdown_summary() {
        let text = render_summary("NASDAQ", &result(), SummaryStyle::Markdown);
        assert!(text.starts_with("**Daily potential stock analysis**"));
        assert!(text.contains("**Recurrent-bottom:**"));
    }

    #[test]
    fn test_subject() {
        assert_eq!(
            render_subject("Dow Jones", result().computed_at),
            "Daily potential stock analysis - Dow Jones - 2024-05-06 07:08:09"
        );
        assert_eq!(error_subject(), "Daily potential stock analysis - Error");
    }

    #[test]
    fn test_split_message() {
        let text = "aaaa\nbbbb\ncccc\n";
        assert_eq!(split_message(text, 100), vec![text.to_string()]);
        assert_eq!(split_message(text, 10), vec!["aaaa\nbbbb\n", "cccc\n"]);

        let long = "x".repeat(25);
        let chunks = split_message(&long, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), long);
    }
}
