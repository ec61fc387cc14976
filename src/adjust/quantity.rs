//! Detection of quantified adjustment requests ("30万円安く").
//!
//! A detected target routes the turn into proposal generation instead of the
//! rule-based path.

use regex::Regex;

/// Direction of a quantified adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Reduce,
    Increase,
}

/// Normalized quantified request: absolute magnitude in yen plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustmentTarget {
    pub amount: i64,
    pub direction: Direction,
}

/// Pattern library for amount+direction expressions.
///
/// Handles "X万円" / "X万" / "X0000円" magnitudes, qualifier prefixes
/// (あと, さらに, もっと, もう少し) and suffixes (ほど, ぐらい, くらい),
/// and the common reduce/increase verb sets.
pub struct QuantityDetector {
    reduce: Vec<Regex>,
    increase: Vec<Regex>,
}

impl Default for QuantityDetector {
    fn default() -> Self {
        Self::new()
    }
}

const PREFIX: &str = r"(?:あと|さらに|もっと|もう少し)?[\s　]*";
const SUFFIX: &str = r"(?:ほど|ぐらい|くらい)?";
const REDUCE_VERBS: &str = r"(?:安く|削減|減らし|下げ|カット|ダウン|マイナス)";
const INCREASE_VERBS: &str = r"(?:アップ|増やし|追加|上げ|プラス)";

impl QuantityDetector {
    pub fn new() -> Self {
        let compile = |verbs: &str| -> Vec<Regex> {
            vec![
                // "30万円安く" / "30万下げる"
                Regex::new(&format!(r"{PREFIX}(\d+)[\s　]*万円?{SUFFIX}{verbs}"))
                    .expect("valid quantity pattern"),
                // "300000円安く"
                Regex::new(&format!(r"{PREFIX}(\d+)0{{4}}[\s　]*円{SUFFIX}{verbs}"))
                    .expect("valid quantity pattern"),
            ]
        };

        Self {
            reduce: compile(REDUCE_VERBS),
            increase: compile(INCREASE_VERBS),
        }
    }

    /// Scan a message for a quantified adjustment request.
    ///
    /// Reduce patterns are checked before increase patterns. The captured
    /// figure counts 万円 (10,000-yen units) in both notations.
    pub fn detect(&self, message: &str) -> Option<AdjustmentTarget> {
        let message = message.to_lowercase();

        for (patterns, direction) in [
            (&self.reduce, Direction::Reduce),
            (&self.increase, Direction::Increase),
        ] {
            for pattern in patterns {
                if let Some(caps) = pattern.captures(&message) {
                    let units: i64 = caps.get(1)?.as_str().parse().ok()?;
                    let amount = units * 10_000;
                    tracing::debug!(amount, ?direction, "Quantified adjustment detected");
                    return Some(AdjustmentTarget { amount, direction });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(message: &str) -> Option<AdjustmentTarget> {
        QuantityDetector::new().detect(message)
    }

    #[test]
    fn test_man_yen_reduce() {
        let target = detect("30万円安くしてください").unwrap();
        assert_eq!(target.amount, 300_000);
        assert_eq!(target.direction, Direction::Reduce);
    }

    #[test]
    fn test_man_without_yen() {
        let target = detect("50万削減したい").unwrap();
        assert_eq!(target.amount, 500_000);
        assert_eq!(target.direction, Direction::Reduce);
    }

    #[test]
    fn test_plain_yen_notation() {
        let target = detect("300000円下げてほしい").unwrap();
        assert_eq!(target.amount, 300_000);
        assert_eq!(target.direction, Direction::Reduce);
    }

    #[test]
    fn test_increase() {
        let target = detect("100万円アップでお願いします").unwrap();
        assert_eq!(target.amount, 1_000_000);
        assert_eq!(target.direction, Direction::Increase);
    }

    #[test]
    fn test_qualifier_prefix_and_suffix() {
        let target = detect("あと30万円ほど安くできますか").unwrap();
        assert_eq!(target.amount, 300_000);
        assert_eq!(target.direction, Direction::Reduce);

        let target = detect("さらに20万くらい削減して").unwrap();
        assert_eq!(target.amount, 200_000);
    }

    #[test]
    fn test_no_quantity_returns_none() {
        assert!(detect("管理画面を簡単にしてください").is_none());
        assert!(detect("もう少し安くして").is_none());
        assert!(detect("").is_none());
    }

    #[test]
    fn test_amount_without_direction_returns_none() {
        assert!(detect("予算は30万円です").is_none());
    }
}
