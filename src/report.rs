use std::fmt::Write;

use crate::filter::DateRange;
use crate::insights::{Recommendation, SwotAnalysis, SwotItem};
use crate::models::Review;
use crate::stats;

/// Optional LLM sections; the report renders without them.
#[derive(Debug, Clone, Default)]
pub struct ReportInsights {
    pub swot: Option<SwotAnalysis>,
    pub recommendations: Option<Vec<Recommendation>>,
}

pub fn build_report(
    app_name: &str,
    range: DateRange,
    reviews: &[Review],
    insights: &ReportInsights,
) -> String {
    let stats = stats::aggregate(reviews);
    let trend = stats::sentiment_trend(reviews);

    let mut output = String::new();

    let _ = writeln!(output, "# {app_name} Review Insights Report");
    let _ = writeln!(
        output,
        "Generated for {} (review duration: {})",
        range.label(),
        stats.review_duration
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline Numbers");
    let _ = writeln!(output, "- Total reviews: {}", stats.total);
    let _ = writeln!(output, "- Average rating: {} out of 5", stats.average_rating);
    let _ = writeln!(
        output,
        "- Positive sentiment: {} ({}% of total)",
        stats.positive, stats.positive_percent
    );
    let _ = writeln!(
        output,
        "- Negative sentiment: {} ({}% of total)",
        stats.negative, stats.negative_percent
    );
    let _ = writeln!(
        output,
        "- Lowest rated day: {} ({})",
        stats.worst_day.date, stats.worst_day.rating
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Star Ratings");
    for (stars, count) in stats.star_counts.iter().rev() {
        let _ = writeln!(output, "- {stars} star: {count}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Review Category Analysis");

    if stats.themes.is_empty() {
        let _ = writeln!(output, "No reviews recorded for this window.");
    } else {
        let _ = writeln!(output, "| Issue Category | Mentions | Insight |");
        let _ = writeln!(output, "|---|---:|---|");
        for mention in &stats.themes {
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                mention.theme, mention.mentions, mention.insight
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sentiment Trend");

    if trend.is_empty() {
        let _ = writeln!(output, "No dated reviews in this window.");
    } else {
        for day in &trend {
            let _ = writeln!(
                output,
                "- {}: {} positive, {} negative, {} neutral",
                day.day.format("%b %-d"),
                day.positive,
                day.negative,
                day.neutral
            );
        }
    }

    if let Some(swot) = &insights.swot {
        let _ = writeln!(output);
        let _ = writeln!(output, "## SWOT Analysis");
        write_swot_section(
            &mut output,
            "Strengths",
            ("Strength", "Evidence from Reviews"),
            &swot.strengths,
        );
        write_swot_section(
            &mut output,
            "Weaknesses",
            ("Pain Point", "Strategic Risk"),
            &swot.weaknesses,
        );
        write_swot_section(
            &mut output,
            "Opportunities",
            ("Opportunity Area", "Value Creation Potential"),
            &swot.opportunities,
        );
        write_swot_section(
            &mut output,
            "Threats",
            ("Threat Source", "Strategic Consequence"),
            &swot.threats,
        );
    }

    if let Some(recommendations) = &insights.recommendations {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Strategic Recommendations");

        if recommendations.is_empty() {
            let _ = writeln!(output, "No recommendations were returned.");
        }
        for (idx, item) in recommendations.iter().enumerate() {
            let _ = writeln!(output);
            let _ = writeln!(output, "### {}. {}", idx + 1, item.title);
            for action in &item.actions {
                let _ = writeln!(output, "- Action: {action}");
            }
            let _ = writeln!(output, "- Rationale: {}", item.rationale);
        }
    }

    output
}

fn write_swot_section(output: &mut String, title: &str, columns: (&str, &str), items: &[SwotItem]) {
    if items.is_empty() {
        return;
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "### {title}");
    let _ = writeln!(output, "| {} | {} |", columns.0, columns.1);
    let _ = writeln!(output, "|---|---|");
    for item in items {
        let _ = writeln!(
            output,
            "| {} | {} |",
            escape_cell(&item.title),
            escape_cell(&item.description)
        );
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, Sentiment, Theme};

    fn review(id: &str, rating: u8, sentiment: Sentiment, theme: Theme) -> Review {
        Review {
            id: id.to_string(),
            platform: Platform::Ios,
            author: "Anonymous".to_string(),
            rating,
            text: "text".to_string(),
            date: "2024-01-10T00:00:00.000Z".to_string(),
            sentiment,
            theme,
        }
    }

    #[test]
    fn empty_report_uses_placeholders() {
        let report = build_report("Bank App", DateRange::All, &[], &ReportInsights::default());
        assert!(report.contains("Generated for All Time (review duration: N/A)"));
        assert!(report.contains("- Average rating: 0 out of 5"));
        assert!(report.contains("- Lowest rated day: N/A (N/A)"));
        assert!(report.contains("No reviews recorded for this window."));
        assert!(!report.contains("## SWOT Analysis"));
    }

    #[test]
    fn report_lists_themes_swot_and_recommendations() {
        let reviews = vec![
            review("a", 1, Sentiment::Negative, Theme::Login),
            review("b", 5, Sentiment::Positive, Theme::InterfaceUi),
            review("c", 2, Sentiment::Negative, Theme::Login),
        ];
        let insights = ReportInsights {
            swot: Some(SwotAnalysis {
                weaknesses: vec![SwotItem {
                    title: "Login loops".to_string(),
                    description: "Users | churn".to_string(),
                }],
                ..SwotAnalysis::default()
            }),
            recommendations: Some(vec![Recommendation {
                title: "Stabilize sessions".to_string(),
                actions: vec!["Extend token lifetime".to_string()],
                rationale: "Most negative reviews cite logouts".to_string(),
            }]),
        };

        let report = build_report("Bank App", DateRange::Last30Days, &reviews, &insights);
        assert!(report.starts_with("# Bank App Review Insights Report"));
        assert!(report.contains("Generated for Last 30 Days"));
        assert!(report.contains("| Login | 2 |"));
        assert!(report.contains("| Pain Point | Strategic Risk |"));
        assert!(report.contains("| Login loops | Users \\| churn |"));
        assert!(!report.contains("### Strengths"));
        assert!(report.contains("### 1. Stabilize sessions"));
        assert!(report.contains("- Action: Extend token lifetime"));
        assert!(report.contains("- Jan 10: 1 positive, 2 negative, 0 neutral"));
    }
}
