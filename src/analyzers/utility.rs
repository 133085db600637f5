/// Dense rank of each value, highest value first: equal values share a rank
/// and the next distinct value takes the following rank with no gaps.
pub fn dense_rank_desc(values: &[u64]) -> Vec<usize> {
    let mut distinct: Vec<u64> = values.to_vec();
    distinct.sort_unstable_by(|a, b| b.cmp(a));
    distinct.dedup();

    values
        .iter()
        .map(|v| distinct.iter().position(|d| d == v).map_or(0, |i| i + 1))
        .collect()
}

/// Percentage change from `previous` to `current`. `None` when `previous` is zero.
pub fn pct_change(previous: u64, current: u64) -> Option<f64> {
    if previous == 0 {
        None
    } else {
        Some((current as f64 - previous as f64) / previous as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_rank_shares_ties() {
        assert_eq!(dense_rank_desc(&[3, 10, 10, 2, 3]), vec![2, 1, 1, 3, 2]);
    }

    #[test]
    fn test_dense_rank_empty() {
        assert!(dense_rank_desc(&[]).is_empty());
    }

    #[test]
    fn test_pct_change() {
        assert_eq!(pct_change(200, 400), Some(100.0));
        assert_eq!(pct_change(400, 300), Some(-25.0));
        assert_eq!(pct_change(50, 50), Some(0.0));
    }

    #[test]
    fn test_pct_change_zero_baseline_is_none() {
        assert_eq!(pct_change(0, 12), None);
    }
}
