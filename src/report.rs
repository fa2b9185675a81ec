use std::collections::BTreeMap;
use std::fmt::Write;
use tubesense_core::{Sentiment, VideoAnalysis};

/// Entries sorted by value, largest first. Ties keep sentiment order.
fn descending(tally: &BTreeMap<Sentiment, u64>) -> Vec<(Sentiment, u64)> {
    let mut entries: Vec<(Sentiment, u64)> = tally.iter().map(|(s, v)| (*s, *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries
}

fn write_tally(out: &mut String, heading: &str, tally: &BTreeMap<Sentiment, u64>) {
    let _ = writeln!(out, "{}:", heading);
    for (sentiment, value) in descending(tally) {
        let _ = writeln!(out, "  {:<12} {}", sentiment.as_str(), value);
    }
}

/// Human-readable report: video header, topic summary, then both tallies.
pub fn render_text_report(analysis: &VideoAnalysis) -> String {
    let mut out = String::new();
    let info = &analysis.video_info;

    let _ = writeln!(out, "{} ({})", info.title, info.channel);
    let _ = writeln!(out, "Comments analyzed: {}", analysis.comments_count);
    out.push('\n');

    let _ = writeln!(out, "{}", analysis.report.analyze_result.trim());
    out.push('\n');

    write_tally(
        &mut out,
        "Comments per sentiment",
        &analysis.report.count_comments_per_sentiment,
    );
    out.push('\n');
    write_tally(&mut out, "Likes per sentiment", &analysis.report.likes_per_category);

    out
}
