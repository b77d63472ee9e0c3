//! Prompt text handed to the narrative generator.
//!
//! Only the content matters here: the generator is opaque and whatever it
//! returns is passed through untouched.

use std::fmt::Write;

use analysis_core::{info_keys, TickerInfo};

use crate::pipeline::EnrichedAnalysis;

/// Token budget for a full narrative
pub const ANALYSIS_MAX_TOKENS: u32 = 1000;
/// Token budget for an answer to a single question
pub const QUESTION_MAX_TOKENS: u32 = 500;
/// Number of most recent bars quoted in the prompt
pub const PROMPT_TAIL_ROWS: usize = 5;

fn fmt_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "n/a".to_string())
}

fn fmt_money(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else {
        format!("${:.2}", value)
    }
}

fn info_number(info: &TickerInfo, key: &str, money: bool) -> String {
    match info.get_f64(key) {
        Some(v) if money => fmt_money(v),
        Some(v) => format!("{:.2}", v),
        None => "N/A".to_string(),
    }
}

fn info_text<'a>(info: &'a TickerInfo, key: &str) -> &'a str {
    info.get_str(key).map(str::trim).filter(|s| !s.is_empty()).unwrap_or("N/A")
}

/// Tail of the frame as a small fixed-width table
fn recent_rows(analysis: &EnrichedAnalysis) -> String {
    let frame = &analysis.frame;
    let names = frame.column_names();
    let mut out = String::new();

    let _ = write!(out, "Date        Open      High      Low       Close");
    for name in &names {
        let _ = write!(out, "  {}", name);
    }
    out.push('\n');

    for i in frame.tail_start(PROMPT_TAIL_ROWS)..frame.len() {
        let bar = &frame.bars()[i];
        let _ = write!(
            out,
            "{}  {:<8.2}  {:<8.2}  {:<8.2}  {:<8.2}",
            bar.date, bar.open, bar.high, bar.low, bar.close
        );
        for name in &names {
            let _ = write!(out, "  {}", fmt_value(frame.value(name, i)));
        }
        out.push('\n');
    }
    out
}

fn summary_lines(analysis: &EnrichedAnalysis) -> String {
    let s = &analysis.summary;
    format!(
        "- Current Price: ${:.2}\n\
         - Period Open: ${:.2}\n\
         - Change: ${:.2} ({})\n\
         - Period High: ${:.2}\n\
         - Period Low: ${:.2}\n\
         - Average Volume: {:.0}\n",
        s.latest_price,
        s.period_open,
        s.change_abs,
        s.change_pct.map(|p| format!("{:.2}%", p)).unwrap_or_else(|| "n/a".to_string()),
        s.high,
        s.low,
        s.avg_volume,
    )
}

/// Prompt asking for a full narrative on the analysed ticker
pub fn analysis_prompt(ticker: &str, analysis: &EnrichedAnalysis, info: &TickerInfo) -> String {
    let name = info.get_str(info_keys::LONG_NAME).unwrap_or(ticker);

    format!(
        "Analyze the following stock data for {name} ({ticker}):\n\n\
         Company Overview:\n{overview}\n\n\
         Recent Price Data:\n{rows}\n\
         Period Statistics:\n{summary}\n\
         Key Statistics:\n\
         - Sector: {sector}\n\
         - Employees: {employees}\n\
         - 52-Week High: {high52}\n\
         - 52-Week Low: {low52}\n\
         - Market Cap: {cap}\n\
         - P/E Ratio: {pe}\n\
         - Dividend Yield: {dy}\n\n\
         Based on this information, provide a comprehensive analysis of the stock's performance, \
         potential risks, and opportunities. Include insights on:\n\
         1. Recent price trends and what they might indicate\n\
         2. Comparison to sector performance\n\
         3. Key financial metrics and their implications\n\
         4. Potential catalysts for future price movements\n\
         5. Overall investment thesis (bullish, bearish, or neutral)\n\n\
         Provide your analysis in a clear, concise manner suitable for investors.\n",
        name = name,
        ticker = ticker,
        overview = info_text(info, info_keys::BUSINESS_SUMMARY),
        sector = info_text(info, info_keys::SECTOR),
        employees = info
            .get_f64(info_keys::TOTAL_EMPLOYEES)
            .map(|n| format!("{:.0}", n))
            .unwrap_or_else(|| "N/A".to_string()),
        rows = recent_rows(analysis),
        summary = summary_lines(analysis),
        high52 = info_number(info, info_keys::FIFTY_TWO_WEEK_HIGH, true),
        low52 = info_number(info, info_keys::FIFTY_TWO_WEEK_LOW, true),
        cap = info_number(info, info_keys::MARKET_CAP, true),
        pe = info_number(info, info_keys::TRAILING_PE, false),
        dy = info_number(info, info_keys::DIVIDEND_YIELD, false),
    )
}

/// Prompt answering a user's question, grounded on the period statistics
pub fn question_prompt(ticker: &str, question: &str, analysis: &EnrichedAnalysis) -> String {
    format!(
        "The user is asking about the stock {ticker}. Here's their question:\n\n\
         {question}\n\n\
         Figures for the selected period:\n{summary}\n\
         Please provide a detailed and informative answer based on these figures and general \
         knowledge about {ticker}. If the question requires specific numerical data that is not \
         listed above, say so and provide general insights instead.\n",
        ticker = ticker,
        question = question.trim(),
        summary = summary_lines(analysis),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineOrchestrator;
    use analysis_core::{Bar, IndicatorConfig, InfoValue};
    use chrono::NaiveDate;

    fn analysis(n: usize) -> EnrichedAnalysis {
        let start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let bars = (0..n)
            .map(|i| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: 20.0 + i as f64,
                high: 21.0 + i as f64,
                low: 19.0 + i as f64,
                close: 20.5 + i as f64,
                volume: 10_000,
            })
            .collect();
        PipelineOrchestrator::new(IndicatorConfig::default()).unwrap().run(bars).unwrap()
    }

    #[test]
    fn test_analysis_prompt_marks_missing_info() {
        let info = TickerInfo::new().with(info_keys::MARKET_CAP, Some(InfoValue::Int(2_500_000_000)));
        let prompt = analysis_prompt("ACME", &analysis(8), &info);

        assert!(prompt.contains("ACME"));
        assert!(prompt.contains("Market Cap: $2.50B"));
        assert!(prompt.contains("P/E Ratio: N/A"));
        assert!(prompt.contains("52-Week High: N/A"));
        assert!(prompt.contains("Current Price: $27.50"));
    }

    #[test]
    fn test_analysis_prompt_quotes_tail_only() {
        let prompt = analysis_prompt("ACME", &analysis(8), &TickerInfo::new());

        assert!(!prompt.contains("2024-06-05"));
        assert!(prompt.contains("2024-06-06"));
        assert!(prompt.contains("2024-06-10"));
        // Short history leaves the 20-day average undefined
        assert!(prompt.contains("n/a"));
    }

    #[test]
    fn test_analysis_prompt_uses_long_name() {
        let info = TickerInfo::new().with(info_keys::LONG_NAME, Some(InfoValue::Text("Acme Corp".into())));
        let prompt = analysis_prompt("ACME", &analysis(3), &info);
        assert!(prompt.starts_with("Analyze the following stock data for Acme Corp (ACME)"));
    }

    #[test]
    fn test_analysis_prompt_company_overview() {
        let info = TickerInfo::new()
            .with(info_keys::BUSINESS_SUMMARY, Some(InfoValue::Text("Acme makes anvils.".into())))
            .with(info_keys::SECTOR, Some(InfoValue::Text("Industrials".into())))
            .with(info_keys::TOTAL_EMPLOYEES, Some(InfoValue::Int(1200)));
        let prompt = analysis_prompt("ACME", &analysis(3), &info);

        assert!(prompt.contains("Company Overview:\nAcme makes anvils.\n"));
        assert!(prompt.contains("Sector: Industrials"));
        assert!(prompt.contains("Employees: 1200"));
    }

    #[test]
    fn test_analysis_prompt_overview_falls_back() {
        let prompt = analysis_prompt("ACME", &analysis(3), &TickerInfo::new());

        assert!(prompt.contains("Company Overview:\nN/A\n"));
        assert!(prompt.contains("Sector: N/A"));
        assert!(prompt.contains("Employees: N/A"));
    }

    #[test]
    fn test_question_prompt() {
        let prompt = question_prompt("ACME", "  Is it volatile?  ", &analysis(3));

        assert!(prompt.contains("Is it volatile?\n"));
        assert!(prompt.contains("Current Price: $22.50"));
    }

    #[test]
    fn test_fmt_money() {
        assert_eq!(fmt_money(3.2e12), "$3.20T");
        assert_eq!(fmt_money(4_500_000.0), "$4.50M");
        assert_eq!(fmt_money(12.0), "$12.00");
    }
}
