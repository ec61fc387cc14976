//! Keyword heuristics used when the model is unavailable.
//!
//! The table is swappable configuration data, not logic: deployments can
//! extend it per locale or domain without touching the engine.

use serde::{Deserialize, Serialize};

/// One keyword bucket mapped to a person-days figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackEntry {
    /// Case-insensitive substrings matched against name + description.
    pub keywords: Vec<String>,
    pub person_days: f64,
}

/// Keyword-to-effort table with a default for unmatched deliverables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackTable {
    pub entries: Vec<FallbackEntry>,
    pub default_person_days: f64,
}

impl Default for FallbackTable {
    fn default() -> Self {
        let entry = |keywords: &[&str], person_days: f64| FallbackEntry {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            person_days,
        };

        Self {
            entries: vec![
                entry(&["要件", "requirements"], 10.0),
                entry(&["設計", "design"], 15.0),
                entry(&["実装", "開発", "implementation", "development"], 30.0),
                entry(&["テスト", "試験", "testing", "test"], 10.0),
                entry(&["データベース", "db", "database"], 12.0),
                entry(&["api", "バックエンド", "backend"], 20.0),
                entry(&["フロント", "画面", "frontend", "ui"], 18.0),
                entry(&["認証", "auth"], 8.0),
                entry(&["マニュアル", "手順書", "manual", "documentation"], 5.0),
            ],
            default_person_days: 5.0,
        }
    }
}

impl FallbackTable {
    /// Effort for a deliverable the model could not estimate.
    ///
    /// First matching entry wins; order encodes precedence.
    pub fn estimate(&self, name: &str, description: &str) -> f64 {
        let haystack = format!("{} {}", name, description).to_lowercase();
        for entry in &self.entries {
            if entry
                .keywords
                .iter()
                .any(|k| haystack.contains(&k.to_lowercase()))
            {
                return entry.person_days;
            }
        }
        self.default_person_days
    }
}
