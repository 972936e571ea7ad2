//! Engine-scoped evaluator registry. A `Game` owns one (or shares one via
//! `Arc`); tests inject stubs through `register`. Lookup order: explicit
//! registration, then a ranking table from the data directory, then the
//! computed backend.

use super::ranks;
use super::tables::{ComparisonTable, TableEvaluator};
use super::types::{EvalError, EvaluationType, Evaluator, HandRanking};
use crate::cards::Card;
use log::{debug, warn};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct EvaluatorRegistry {
    data_dir: Option<PathBuf>,
    evaluators: Mutex<HashMap<EvaluationType, Arc<dyn Evaluator>>>,
    comparisons: Mutex<HashMap<(EvaluationType, EvaluationType), Arc<ComparisonTable>>>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that prefers CSV tables under `dir` (with the
    /// `hand_rankings/` and `hand_comparisons/` layout) over computed
    /// backends.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        EvaluatorRegistry {
            data_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    /// Install (or override) the backend for a type. Tests use this to
    /// inject stubs.
    pub fn register(&self, eval_type: EvaluationType, evaluator: Arc<dyn Evaluator>) {
        self.evaluators
            .lock()
            .unwrap()
            .insert(eval_type, evaluator);
    }

    pub fn get(&self, eval_type: EvaluationType) -> Result<Arc<dyn Evaluator>, EvalError> {
        let mut cache = self.evaluators.lock().unwrap();
        if let Some(e) = cache.get(&eval_type) {
            return Ok(Arc::clone(e));
        }
        if let Some(dir) = &self.data_dir {
            let path = dir
                .join("hand_rankings")
                .join(format!("{}.csv", eval_type.as_str()));
            if path.exists() {
                debug!("loading ranking table for {} from {:?}", eval_type, path);
                let table = TableEvaluator::from_path(eval_type, &path)?;
                let arc: Arc<dyn Evaluator> = Arc::new(table);
                cache.insert(eval_type, Arc::clone(&arc));
                return Ok(arc);
            }
        }
        match ranks::builtin(eval_type) {
            Some(e) => {
                cache.insert(eval_type, Arc::clone(&e));
                Ok(e)
            }
            None => Err(EvalError::NoBackend(eval_type)),
        }
    }

    /// Fails fast if the type cannot be served; used at game construction.
    pub fn ensure(&self, eval_type: EvaluationType) -> Result<(), EvalError> {
        self.get(eval_type).map(|_| ())
    }

    pub fn evaluate(
        &self,
        cards: &[Card],
        eval_type: EvaluationType,
    ) -> Result<Option<HandRanking>, EvalError> {
        Ok(self.get(eval_type)?.evaluate(cards))
    }

    /// Does a ranking meet a `[rank, ordered_rank]` qualifier (8-or-better
    /// style)? Lower is better, so the hand must not exceed either bound.
    pub fn meets_qualifier(ranking: &HandRanking, qualifier: &[u32]) -> bool {
        let (rank, ordered) = match qualifier {
            [r] => (*r, None),
            [r, o, ..] => (*r, Some(*o)),
            [] => return true,
        };
        if ranking.rank > rank {
            return false;
        }
        if ranking.rank == rank {
            if let Some(o) = ordered {
                if ranking.ordered_rank > o {
                    return false;
                }
            }
        }
        true
    }

    /// Compare two hands under one evaluation. Greater means `hand1` is the
    /// better hand. Unrankable hands lose to rankable ones.
    pub fn compare(
        &self,
        hand1: &[Card],
        hand2: &[Card],
        eval_type: EvaluationType,
    ) -> Result<Ordering, EvalError> {
        let e = self.get(eval_type)?;
        Ok(match (e.evaluate(hand1), e.evaluate(hand2)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            // Rankings are lower-is-better, so flip for winner-is-greater.
            (Some(a), Some(b)) => b.cmp(&a),
        })
    }

    fn comparison_table(
        &self,
        smaller: EvaluationType,
        larger: EvaluationType,
    ) -> Option<Arc<ComparisonTable>> {
        let mut cache = self.comparisons.lock().unwrap();
        if let Some(t) = cache.get(&(smaller, larger)) {
            return Some(Arc::clone(t));
        }
        let dir = self.data_dir.as_ref()?;
        let path = dir
            .join("hand_comparisons")
            .join(format!("{}_{}_comparison.csv", smaller.as_str(), larger.as_str()));
        let table = ComparisonTable::from_path(&path).ok()?;
        let arc = Arc::new(table);
        cache.insert((smaller, larger), Arc::clone(&arc));
        Some(arc)
    }

    #[cfg(test)]
    pub(crate) fn register_comparison(
        &self,
        smaller: EvaluationType,
        larger: EvaluationType,
        table: ComparisonTable,
    ) {
        self.comparisons
            .lock()
            .unwrap()
            .insert((smaller, larger), Arc::new(table));
    }

    /// Compare hands of different sizes via a comparison table mapping the
    /// smaller evaluation into the larger one. Greater means the larger
    /// hand (`large_hand`) wins.
    pub fn compare_with_offset(
        &self,
        large_hand: &[Card],
        small_hand: &[Card],
        large_type: EvaluationType,
        small_type: EvaluationType,
    ) -> Result<Ordering, EvalError> {
        let large = self.get(large_type)?.evaluate(large_hand);
        let small = self.get(small_type)?.evaluate(small_hand);
        let (large, small) = match (large, small) {
            (None, None) => return Ok(Ordering::Equal),
            (Some(_), None) => return Ok(Ordering::Greater),
            (None, Some(_)) => return Ok(Ordering::Less),
            (Some(l), Some(s)) => (l, s),
        };
        let Some(table) = self.comparison_table(small_type, large_type) else {
            warn!(
                "comparison table {} vs {} not found; assuming the larger hand wins",
                small_type, large_type
            );
            return Ok(Ordering::Greater);
        };
        let Some((mapped_rank, mapped_ordered)) = table.equivalent(small.rank, small.ordered_rank)
        else {
            warn!(
                "no equivalent for {} rank {} ordered {}; assuming the smaller hand wins",
                small_type, small.rank, small.ordered_rank
            );
            return Ok(Ordering::Less);
        };
        Ok(if large.rank != mapped_rank {
            // Lower rank is the better hand.
            mapped_rank.cmp(&large.rank)
        } else {
            let large_ordered = large.ordered_rank as f64;
            if large_ordered < mapped_ordered {
                Ordering::Greater
            } else if large_ordered > mapped_ordered {
                Ordering::Less
            } else {
                Ordering::Equal
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::card::cards_from_str;
    use std::io::Cursor;

    #[test]
    fn builtin_resolution_and_caching() {
        let reg = EvaluatorRegistry::new();
        assert!(reg.ensure(EvaluationType::High).is_ok());
        assert!(reg.ensure(EvaluationType::High).is_ok());
        assert!(matches!(
            reg.ensure(EvaluationType::QuickQuads),
            Err(EvalError::NoBackend(_))
        ));
    }

    #[test]
    fn stub_injection_wins() {
        struct Stub;
        impl Evaluator for Stub {
            fn evaluate(&self, _: &[Card]) -> Option<HandRanking> {
                Some(HandRanking::new(42, 0, "stub"))
            }
            fn hand_size(&self) -> usize {
                5
            }
        }
        let reg = EvaluatorRegistry::new();
        reg.register(EvaluationType::High, Arc::new(Stub));
        let r = reg
            .evaluate(&cards_from_str("2c3c4c5c7d").unwrap(), EvaluationType::High)
            .unwrap()
            .unwrap();
        assert_eq!(r.rank, 42);
    }

    #[test]
    fn compare_direction() {
        let reg = EvaluatorRegistry::new();
        let better = cards_from_str("AcAdKh4s3d").unwrap();
        let worse = cards_from_str("AcKdQhJs7d").unwrap();
        assert_eq!(
            reg.compare(&better, &worse, EvaluationType::High).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            reg.compare(&worse, &better, EvaluationType::High).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn qualifier_checks() {
        let good = HandRanking::new(1, 10, "");
        let edge = HandRanking::new(2, 5, "");
        let bad = HandRanking::new(2, 6, "");
        assert!(EvaluatorRegistry::meets_qualifier(&good, &[2, 5]));
        assert!(EvaluatorRegistry::meets_qualifier(&edge, &[2, 5]));
        assert!(!EvaluatorRegistry::meets_qualifier(&bad, &[2, 5]));
        assert!(!EvaluatorRegistry::meets_qualifier(&bad, &[1]));
        assert!(EvaluatorRegistry::meets_qualifier(&bad, &[]));
    }

    #[test]
    fn offset_comparison_uses_table() {
        let reg = EvaluatorRegistry::new();
        // Map the two-card pair-of-aces onto five-card rank space so it
        // slots just above a pair of aces there.
        let pair_aces_2 = cards_from_str("AsAd").unwrap();
        let r2 = reg
            .evaluate(&pair_aces_2, EvaluationType::TwoCardHigh)
            .unwrap()
            .unwrap();
        let csv = format!(
            "small_rank,small_ordered,large_rank,large_ordered\n{},{},8,1.5\n",
            r2.rank, r2.ordered_rank
        );
        reg.register_comparison(
            EvaluationType::TwoCardHigh,
            EvaluationType::High,
            ComparisonTable::from_reader(Cursor::new(csv)).unwrap(),
        );
        // A five-card boat (rank 3) beats the mapped two-card hand.
        let boat = cards_from_str("AcAdAhKcKd").unwrap();
        assert_eq!(
            reg.compare_with_offset(
                &boat,
                &pair_aces_2,
                EvaluationType::High,
                EvaluationType::TwoCardHigh,
            )
            .unwrap(),
            Ordering::Greater
        );
        // A five-card king-high (rank 9) loses to it.
        let king_high = cards_from_str("Kc8d6h4s3d").unwrap();
        assert_eq!(
            reg.compare_with_offset(
                &king_high,
                &pair_aces_2,
                EvaluationType::High,
                EvaluationType::TwoCardHigh,
            )
            .unwrap(),
            Ordering::Less
        );
    }
}
