//! Table-backed evaluation. Ranking tables are CSV files with columns
//! `Hand,Rank,OrderedRank` where `Hand` is a comma-joined card list; one
//! file per evaluation type, generated offline and loaded on first use.
//! Comparison tables map a smaller evaluation's (rank, ordered_rank) onto a
//! larger one's for cross-size showdowns.

use super::types::{EvalError, EvaluationType, Evaluator, HandRanking};
use crate::cards::card::{cards_from_str, Card};
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, BufReader};
use std::path::Path;

fn normalize(cards: &[Card]) -> Vec<Card> {
    let mut v = cards.to_vec();
    v.sort_unstable();
    v
}

pub struct TableEvaluator {
    eval_type: EvaluationType,
    hand_size: usize,
    by_hand: HashMap<Vec<Card>, (u32, u32)>,
    by_rank: BTreeMap<(u32, u32), Vec<Card>>,
}

impl TableEvaluator {
    pub fn from_path(eval_type: EvaluationType, path: &Path) -> Result<Self, EvalError> {
        let f = std::fs::File::open(path)
            .map_err(|e| EvalError::TableLoad(eval_type, e.to_string()))?;
        Self::from_reader(eval_type, BufReader::new(f))
    }

    pub fn from_reader(
        eval_type: EvaluationType,
        reader: impl BufRead,
    ) -> Result<Self, EvalError> {
        let mut by_hand = HashMap::new();
        let mut by_rank = BTreeMap::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| EvalError::TableLoad(eval_type, e.to_string()))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if lineno == 0 && line.starts_with("Hand") {
                continue;
            }
            // The hand itself is comma-joined, so rank and ordered rank are
            // the last two fields.
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < 3 {
                return Err(EvalError::BadTableRow(line.to_string()));
            }
            let (card_fields, nums) = fields.split_at(fields.len() - 2);
            let rank: u32 = nums[0]
                .trim()
                .parse()
                .map_err(|_| EvalError::BadTableRow(line.to_string()))?;
            let ordered: u32 = nums[1]
                .trim()
                .parse()
                .map_err(|_| EvalError::BadTableRow(line.to_string()))?;
            let cards = cards_from_str(&card_fields.join(""))
                .map_err(|e| EvalError::BadTableRow(format!("{}: {}", line, e)))?;
            let key = normalize(&cards);
            by_rank.entry((rank, ordered)).or_insert_with(|| key.clone());
            by_hand.insert(key, (rank, ordered));
        }
        if by_hand.is_empty() {
            return Err(EvalError::TableLoad(eval_type, "empty table".to_string()));
        }
        let hand_size = by_hand.keys().next().map(|k| k.len()).unwrap_or(5);
        Ok(TableEvaluator {
            eval_type,
            hand_size,
            by_hand,
            by_rank,
        })
    }

    pub fn eval_type(&self) -> EvaluationType {
        self.eval_type
    }
}

impl Evaluator for TableEvaluator {
    fn evaluate(&self, cards: &[Card]) -> Option<HandRanking> {
        let (rank, ordered) = *self.by_hand.get(&normalize(cards))?;
        let shown: Vec<String> = self.sort_cards(cards).iter().map(|c| c.to_string()).collect();
        Some(HandRanking::new(rank, ordered, shown.join(" ")))
    }

    fn hand_size(&self) -> usize {
        self.hand_size
    }

    fn sample_hand(&self, rank: u32, ordered_rank: u32) -> Option<Vec<Card>> {
        self.by_rank.get(&(rank, ordered_rank)).cloned()
    }
}

/// One row of a comparison table: the smaller hand's ranking and its
/// equivalent position in the larger hand's ranking space. The larger
/// ordered rank is fractional so a two-card hand can slot between two
/// five-card rows.
pub struct ComparisonTable {
    rows: HashMap<(u32, u32), (u32, f64)>,
}

impl ComparisonTable {
    pub fn from_path(path: &Path) -> Result<Self, EvalError> {
        let f = std::fs::File::open(path)
            .map_err(|_| EvalError::ComparisonTableMissing(path.display().to_string()))?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self, EvalError> {
        let mut rows = HashMap::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| EvalError::BadTableRow(e.to_string()))?;
            let line = line.trim();
            if line.is_empty() || (lineno == 0 && line.chars().next().is_some_and(|c| c.is_alphabetic())) {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
            if fields.len() != 4 {
                return Err(EvalError::BadTableRow(line.to_string()));
            }
            let small_rank: u32 = fields[0]
                .parse()
                .map_err(|_| EvalError::BadTableRow(line.to_string()))?;
            let small_ordered: u32 = fields[1]
                .parse()
                .map_err(|_| EvalError::BadTableRow(line.to_string()))?;
            let large_rank: u32 = fields[2]
                .parse()
                .map_err(|_| EvalError::BadTableRow(line.to_string()))?;
            let large_ordered: f64 = fields[3]
                .parse()
                .map_err(|_| EvalError::BadTableRow(line.to_string()))?;
            rows.insert((small_rank, small_ordered), (large_rank, large_ordered));
        }
        Ok(ComparisonTable { rows })
    }

    /// Map a smaller hand's ranking into the larger ranking space.
    pub fn equivalent(&self, rank: u32, ordered_rank: u32) -> Option<(u32, f64)> {
        self.rows.get(&(rank, ordered_rank)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ONE_CARD_TABLE: &str = "\
Hand,Rank,OrderedRank
As,1,1
Ks,1,2
Qs,1,3
Js,1,4
";

    const TWO_CARD_TABLE: &str = "\
Hand,Rank,OrderedRank
As,Ad,1,1
As,Ks,2,1
Ks,Qd,2,2
";

    #[test]
    fn lookup_is_order_insensitive() {
        let t =
            TableEvaluator::from_reader(EvaluationType::TwoCardHigh, Cursor::new(TWO_CARD_TABLE))
                .unwrap();
        let ak = cards_from_str("KsAs").unwrap();
        let r = t.evaluate(&ak).unwrap();
        assert_eq!((r.rank, r.ordered_rank), (2, 1));
        assert_eq!(t.hand_size(), 2);
    }

    #[test]
    fn unknown_hand_is_none() {
        let t =
            TableEvaluator::from_reader(EvaluationType::TwoCardHigh, Cursor::new(TWO_CARD_TABLE))
                .unwrap();
        assert!(t.evaluate(&cards_from_str("2s3d").unwrap()).is_none());
    }

    #[test]
    fn sample_hand_inverts_evaluate() {
        // The ranking-table inverse law: every (rank, ordered) row's sample
        // evaluates back to itself.
        let t =
            TableEvaluator::from_reader(EvaluationType::OneCardHighAh, Cursor::new(ONE_CARD_TABLE))
                .unwrap();
        for (rank, ordered) in [(1u32, 1u32), (1, 2), (1, 3), (1, 4)] {
            let sample = t.sample_hand(rank, ordered).unwrap();
            let r = t.evaluate(&sample).unwrap();
            assert_eq!((r.rank, r.ordered_rank), (rank, ordered));
        }
        assert!(t.sample_hand(9, 9).is_none());
    }

    #[test]
    fn empty_table_is_an_error() {
        assert!(
            TableEvaluator::from_reader(EvaluationType::High, Cursor::new("Hand,Rank,OrderedRank"))
                .is_err()
        );
    }

    #[test]
    fn comparison_lookup() {
        let csv = "\
two_card_rank,two_card_ordered_rank,five_card_rank,five_card_ordered_rank
1,1,2,1.5
2,1,9,12
";
        let t = ComparisonTable::from_reader(Cursor::new(csv)).unwrap();
        assert_eq!(t.equivalent(1, 1), Some((2, 1.5)));
        assert_eq!(t.equivalent(2, 1), Some((9, 12.0)));
        assert_eq!(t.equivalent(3, 1), None);
    }
}
