//! Rule-based free-text adjustment.
//!
//! All keyword tables are configuration data on [`RuleBook`], so locale or
//! domain extensions swap data instead of editing the algorithm.

use super::format_money;
use crate::estimate::{round1, Estimate};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A target category with the substrings that select it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Qualitative intensity phrases mapped to a scale ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntensityRule {
    pub ratio: f64,
    pub phrases: Vec<String>,
}

/// Bilingual keyword tables driving the rule-based path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBook {
    /// Category keyword map; a mention of any keyword targets the whole
    /// category's keyword set.
    pub categories: Vec<CategoryRule>,

    /// Phrases meaning "apply to everything".
    pub apply_all_phrases: Vec<String>,

    /// Intensity phrase sets, checked in order; first match wins.
    pub intensities: Vec<IntensityRule>,

    /// Phrases requesting full exclusion rather than partial reduction.
    pub exclusion_phrases: Vec<String>,

    /// Reduction verbs that make an explicit "N%" figure count as a
    /// reduction request.
    pub reduction_verbs: Vec<String>,

    /// Ratio applied when a category matched but no intensity was given.
    pub default_reduction_ratio: f64,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RuleBook {
    fn default() -> Self {
        let category = |name: &str, keywords: &[&str]| CategoryRule {
            name: name.to_string(),
            keywords: strings(keywords),
        };
        let intensity = |ratio: f64, phrases: &[&str]| IntensityRule {
            ratio,
            phrases: strings(phrases),
        };

        Self {
            categories: vec![
                category(
                    "admin_ui",
                    &["管理", "管理画面", "admin", "フロント", "ui", "画面", "ダッシュボード", "dashboard", "frontend"],
                ),
                category(
                    "reporting",
                    &["レポート", "帳票", "出力", "印刷", "エクスポート", "report"],
                ),
                category(
                    "api",
                    &["api", "エンドポイント", "rest", "graphql", "バックエンド", "サーバ", "サーバー", "backend", "endpoint"],
                ),
                category(
                    "testing",
                    &["テスト", "試験", "test", "検証", "qa", "品質保証"],
                ),
                category(
                    "auth",
                    &["認証", "ログイン", "login", "auth", "セキュリティ", "セッション", "パスワード", "security"],
                ),
                category(
                    "design",
                    &["デザイン", "design", "ui", "ux", "css", "スタイル", "見た目"],
                ),
                category(
                    "infra",
                    &["インフラ", "デプロイ", "deploy", "環境", "構築", "サーバ", "aws", "クラウド", "infra", "cloud"],
                ),
                category(
                    "docs",
                    &["ドキュメント", "資料", "説明", "マニュアル", "手順書", "readme", "document", "manual"],
                ),
                category(
                    "database",
                    &["データベース", "db", "database", "sql", "rdb", "テーブル", "スキーマ"],
                ),
                category("search", &["検索", "search", "サーチ", "全文検索", "elasticsearch"]),
                category(
                    "notifications",
                    &["通知", "notification", "メール", "mail", "プッシュ", "アラート"],
                ),
                category(
                    "payments",
                    &["決済", "payment", "課金", "支払", "クレジット", "カード"],
                ),
                category("batch", &["バッチ", "batch", "定期処理", "cron", "ジョブ"]),
            ],
            apply_all_phrases: strings(&[
                "全体", "合計", "全部", "すべて", "全て", "トータル", "総額", "総計", "全項目",
                "全成果物", "everything", "overall", "in total", "all items",
            ]),
            intensities: vec![
                intensity(
                    0.7,
                    &["簡便", "簡易", "簡単", "シンプル", "ライト", "軽量", "ミニマム", "最小限", "必要最小", "simple", "minimal", "lightweight"],
                ),
                intensity(
                    0.8,
                    &["安く", "安価", "コストダウン", "費用抑", "コスト削減", "コストカット", "予算削減", "節約", "もう少し安", "少し安", "価格を下げ", "値下げ", "cheaper", "cost down"],
                ),
                intensity(
                    0.6,
                    &["大幅", "かなり", "もっと下げ", "大きく下げ", "大きく削減", "大胆", "思い切", "drastically", "significantly"],
                ),
                intensity(
                    0.9,
                    &["少し下げ", "若干下げ", "ちょっと下げ", "少しだけ", "わずかに", "微調整", "slightly", "a little"],
                ),
                intensity(
                    0.85,
                    &["ある程度", "適度", "程々", "そこそこ", "まあまあ", "moderately", "somewhat"],
                ),
            ],
            exclusion_phrases: strings(&["除外", "外す", "不要", "exclude", "out of scope", "drop "]),
            reduction_verbs: strings(&[
                "下げ", "安く", "削減", "減ら", "縮小", "少なく", "減額", "カット", "ダウン",
                "reduce", "cut", "lower", "decrease", "down",
            ]),
            default_reduction_ratio: 0.85,
        }
    }
}

/// Outcome of the rule-based pass.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub estimates: Vec<Estimate>,
    pub note: String,
    /// Whether any estimate actually changed (delta >= 0.05 person-days).
    pub changed: bool,
}

impl RuleBook {
    /// Explicit percentage figure, honored only next to a reduction verb.
    fn explicit_reduction_ratio(&self, message: &str) -> Option<f64> {
        let re = Regex::new(r"([1-9]\d?)\s*[%％]").expect("valid percent pattern");
        let caps = re.captures(message)?;
        if !self.reduction_verbs.iter().any(|v| message.contains(v)) {
            return None;
        }
        let percent: f64 = caps.get(1)?.as_str().parse().ok()?;
        if percent > 0.0 && percent < 100.0 {
            Some((1.0 - percent / 100.0).max(0.1))
        } else {
            None
        }
    }

    /// Intensity ratio from qualitative phrases, first matching set wins.
    fn intensity_ratio(&self, message: &str) -> Option<f64> {
        self.intensities
            .iter()
            .find(|rule| rule.phrases.iter().any(|p| message.contains(p.as_str())))
            .map(|rule| rule.ratio)
    }

    /// Keywords targeted by the message: every keyword of every mentioned
    /// category.
    fn targets(&self, message: &str) -> Vec<String> {
        let mut targets = Vec::new();
        for category in &self.categories {
            if category
                .keywords
                .iter()
                .any(|k| message.contains(&k.to_lowercase()))
            {
                targets.extend(category.keywords.iter().map(|k| k.to_lowercase()));
            }
        }
        targets
    }

    /// Apply the rule-based transformation to the estimate set.
    ///
    /// With no recognizable target the estimates come back unchanged with a
    /// templated list of example instructions; a matched category with no
    /// stated intensity gets the default reduction, and the reply says so.
    pub fn analyze_and_apply(
        &self,
        estimates: &[Estimate],
        message: &str,
        unit_cost: f64,
    ) -> RuleOutcome {
        let message = message.to_lowercase();

        let apply_to_all = self
            .apply_all_phrases
            .iter()
            .any(|p| message.contains(&p.to_lowercase()));
        let targets = self.targets(&message);
        let ratio = self
            .explicit_reduction_ratio(&message)
            .or_else(|| self.intensity_ratio(&message));
        let full_remove = self
            .exclusion_phrases
            .iter()
            .any(|p| message.contains(&p.to_lowercase()));

        tracing::debug!(
            apply_to_all,
            targets = targets.len(),
            ratio,
            full_remove,
            "Rule-based analysis"
        );

        let mut changed: Vec<ChangeRecord> = Vec::new();
        let mut out: Vec<Estimate> = Vec::with_capacity(estimates.len());

        for e in estimates {
            let name = e.deliverable_name.to_lowercase();
            let matched =
                apply_to_all || (!targets.is_empty() && targets.iter().any(|t| name.contains(t)));

            let mut item = e.clone();
            if matched {
                if full_remove {
                    item.person_days = 0.0;
                    item.amount = 0.0;
                    changed.push(ChangeRecord::of(e, &item));
                } else if let Some(ratio) = ratio {
                    let new_pd = round1(e.person_days * ratio);
                    if (new_pd - e.person_days).abs() >= 0.05 {
                        item.person_days = new_pd;
                        item.amount = new_pd * unit_cost;
                        changed.push(ChangeRecord::of(e, &item));
                    }
                }
            }
            out.push(item);
        }

        if changed.is_empty() && targets.is_empty() && !apply_to_all {
            // Unknown target: never guess silently.
            return RuleOutcome {
                estimates: estimates.to_vec(),
                note: self.example_instructions(),
                changed: false,
            };
        }

        if changed.is_empty() && ratio.is_none() && !full_remove {
            // Target found but intensity is ambiguous: apply the default and
            // say so explicitly.
            let ratio = self.default_reduction_ratio;
            for item in out.iter_mut() {
                let name = item.deliverable_name.to_lowercase();
                if apply_to_all || targets.iter().any(|t| name.contains(t)) {
                    let before = item.clone();
                    let new_pd = round1(item.person_days * ratio);
                    if (new_pd - item.person_days).abs() >= 0.05 {
                        item.person_days = new_pd;
                        item.amount = new_pd * unit_cost;
                        changed.push(ChangeRecord::of(&before, item));
                    }
                }
            }
            let mut lines = vec![format!(
                "Matched items reduced by the default {:.0}% (no intensity was specified):",
                (1.0 - ratio) * 100.0
            )];
            lines.extend(changed.iter().map(ChangeRecord::line));
            return RuleOutcome {
                changed: !changed.is_empty(),
                estimates: out,
                note: lines.join("\n"),
            };
        }

        let mut lines = vec!["Adjusted:".to_string()];
        lines.extend(changed.iter().map(ChangeRecord::line));
        RuleOutcome {
            changed: !changed.is_empty(),
            estimates: out,
            note: lines.join("\n"),
        }
    }

    fn example_instructions(&self) -> String {
        [
            "The request didn't identify a target, so the estimates were left unchanged.",
            "Please state the target and the adjustment, for example:",
            "- Reduce the admin UI by 20%",
            "- Make the admin UI a simplified version (30% cheaper)",
            "- Exclude the auth feature this time",
            "- Reduce the report output by 25%",
            "- Reduce everything by 5%",
            "- Fit the total within 1,200,000",
            "- Change the unit cost to 40,000 per person-day",
        ]
        .join("\n")
    }
}

/// Before/after record for the reply.
#[derive(Debug, Clone)]
struct ChangeRecord {
    name: String,
    before_days: f64,
    after_days: f64,
    before_amount: f64,
    after_amount: f64,
}

impl ChangeRecord {
    fn of(before: &Estimate, after: &Estimate) -> Self {
        Self {
            name: before.deliverable_name.clone(),
            before_days: before.person_days,
            after_days: after.person_days,
            before_amount: before.amount,
            after_amount: after.amount,
        }
    }

    fn line(&self) -> String {
        format!(
            "- {}: {:.1} person-days / {} -> {:.1} person-days / {}",
            self.name,
            self.before_days,
            format_money(self.before_amount),
            self.after_days,
            format_money(self.after_amount),
        )
    }
}
