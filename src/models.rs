use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Platform {
    #[serde(rename = "iOS")]
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "iOS",
            Platform::Android => "Android",
        }
    }

    /// Device descriptors mentioning "phone" come from the Android store export.
    pub fn from_device(device: &str) -> Self {
        if device.to_lowercase().contains("phone") {
            Platform::Android
        } else {
            Platform::Ios
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "iOS" => Ok(Platform::Ios),
            "Android" => Ok(Platform::Android),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Sentiment::ALL
            .into_iter()
            .find(|sentiment| sentiment.as_str() == value)
            .ok_or_else(|| format!("unknown sentiment '{value}'"))
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration order doubles as the tie-break order for theme rankings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, ValueEnum,
)]
pub enum Theme {
    Login,
    Privacy,
    Crash,
    #[serde(rename = "UPI")]
    Upi,
    #[serde(rename = "Credit Card")]
    CreditCard,
    Registration,
    #[default]
    General,
    #[serde(rename = "Interface/UI")]
    InterfaceUi,
}

impl Theme {
    pub const ALL: [Theme; 8] = [
        Theme::Login,
        Theme::Privacy,
        Theme::Crash,
        Theme::Upi,
        Theme::CreditCard,
        Theme::Registration,
        Theme::General,
        Theme::InterfaceUi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Login => "Login",
            Theme::Privacy => "Privacy",
            Theme::Crash => "Crash",
            Theme::Upi => "UPI",
            Theme::CreditCard => "Credit Card",
            Theme::Registration => "Registration",
            Theme::General => "General",
            Theme::InterfaceUi => "Interface/UI",
        }
    }

    pub fn insight(&self) -> &'static str {
        match self {
            Theme::InterfaceUi => {
                "Design, layout, and navigation often praised; some users call out inconsistency."
            }
            Theme::Login => "Users report login loops, timeouts, and failed sessions.",
            Theme::Privacy => "Balance shown pre-login flagged as a critical security breach.",
            Theme::Crash => {
                "App freezes and force closes, especially on older Android builds with limited RAM."
            }
            Theme::CreditCard => "Inaccessible or blank card data section.",
            Theme::Registration => "SIM-based OTP or onboarding flow failures.",
            Theme::Upi => "Broken UPI payments; approval flows don't reach the payer.",
            Theme::General => "General feedback, feature requests, or uncategorized issues.",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == value)
            .ok_or_else(|| format!("unknown theme '{value}'"))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub platform: Platform,
    pub author: String,
    pub rating: u8,
    pub text: String,
    /// ISO-8601, `YYYY-MM-DDTHH:MM:SS.sssZ` once normalized.
    pub date: String,
    pub sentiment: Sentiment,
    pub theme: Theme,
}

impl Review {
    /// `None` when the stored date no longer parses; such reviews are left
    /// out of every date-dependent computation.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.date)
            .ok()
            .map(|value| value.with_timezone(&Utc))
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorstDay {
    pub date: String,
    pub rating: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeMention {
    pub theme: Theme,
    pub mentions: usize,
    pub insight: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub total: usize,
    pub average_rating: String,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub positive_percent: u32,
    pub negative_percent: u32,
    pub neutral_percent: u32,
    pub star_counts: BTreeMap<u8, usize>,
    pub worst_day: WorstDay,
    pub themes: Vec<ThemeMention>,
    pub review_duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySentiment {
    pub day: chrono::NaiveDate,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationStatus {
    Loaded,
    Classified,
}

impl ClassificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationStatus::Loaded => "loaded",
            ClassificationStatus::Classified => "classified",
        }
    }
}

impl FromStr for ClassificationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "loaded" => Ok(ClassificationStatus::Loaded),
            "classified" => Ok(ClassificationStatus::Classified),
            other => Err(format!("unknown classification status '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub source_name: String,
    pub loaded_at: DateTime<Utc>,
    pub review_count: i64,
    pub status: ClassificationStatus,
}
