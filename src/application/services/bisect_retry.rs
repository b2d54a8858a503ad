//! Bisect retry (§4.4, §5)
//!
//! Batch-failure isolation by recursive halving, ported from the
//! `_start_and_stop_instances` retry loop in `instance_scheduler.py`: on a
//! batch-level error, split the batch in half and retry each half; a
//! single-element failure is reported as a per-resource error and the
//! remainder continues. Layered above ordinary RPC retry (§5) — by the
//! time a call reaches here, transient errors have already been exhausted
//! and what remains is either success or a terminal per-id failure.

use std::future::Future;

use crate::application::ports::PerIdResult;
use crate::domain::error::SchedulerError;

/// `op` is a batch operation that may fail wholesale (`Err`) even though
/// some ids in the batch would have succeeded individually; bisection
/// isolates the poisoned ids from the rest.
pub async fn bisect_retry<F, Fut>(ids: &[String], op: &F) -> Vec<PerIdResult>
where
    F: Fn(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<PerIdResult>, SchedulerError>>,
{
    if ids.is_empty() {
        return Vec::new();
    }
    match op(ids.to_vec()).await {
        Ok(results) => results,
        Err(err) => {
            if ids.len() == 1 {
                vec![PerIdResult::failed(ids[0].clone(), err.to_string())]
            } else {
                let mid = ids.len() / 2;
                let (left, right) = ids.split_at(mid);
                let mut left_results = Box::pin(bisect_retry(left, op)).await;
                let right_results = Box::pin(bisect_retry(right, op)).await;
                left_results.extend(right_results);
                left_results
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn isolates_poisoned_ids_from_a_batch() {
        let ids: Vec<String> = (0..8).map(|i| format!("i-{i}")).collect();
        let poison: Vec<String> = vec!["i-2".to_string(), "i-5".to_string(), "i-7".to_string()];
        let call_count = Arc::new(AtomicUsize::new(0));

        let op = {
            let poison = poison.clone();
            let call_count = call_count.clone();
            move |batch: Vec<String>| {
                let poison = poison.clone();
                let call_count = call_count.clone();
                async move {
                    call_count.fetch_add(1, Ordering::SeqCst);
                    if batch.iter().any(|id| poison.contains(id)) {
                        Err(SchedulerError::BatchPartialFailure {
                            failed_ids: poison.clone(),
                        })
                    } else {
                        Ok(batch.into_iter().map(PerIdResult::ok).collect())
                    }
                }
            }
        };

        let results = bisect_retry(&ids, &op).await;
        assert_eq!(results.len(), 8);
        for result in &results {
            if poison.contains(&result.resource_id) {
                assert!(!result.is_ok());
            } else {
                assert!(result.is_ok());
            }
        }
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let op = |batch: Vec<String>| async move { Ok(batch.into_iter().map(PerIdResult::ok).collect()) };
        let results = bisect_retry(&[], &op).await;
        assert!(results.is_empty());
    }

    proptest::proptest! {
        /// Property 7: for any batch with an arbitrary poison subset, every
        /// poisoned id ends up failed, every clean id ends up succeeded, and
        /// the number of batch calls stays within the `ceil(log2 n)*k + 1`
        /// bound the recursive-halving isolation implies.
        #[test]
        fn isolates_any_poison_subset_within_call_bound(
            n in 1usize..=32,
            seed in proptest::collection::vec(proptest::bool::ANY, 32),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let ids: Vec<String> = (0..n).map(|i| format!("i-{i}")).collect();
                let poison: std::collections::BTreeSet<String> = ids
                    .iter()
                    .zip(seed.iter())
                    .filter(|(_, is_poison)| **is_poison)
                    .map(|(id, _)| id.clone())
                    .collect();
                let call_count = Arc::new(AtomicUsize::new(0));

                let op = {
                    let poison = poison.clone();
                    let call_count = call_count.clone();
                    move |batch: Vec<String>| {
                        let poison = poison.clone();
                        let call_count = call_count.clone();
                        async move {
                            call_count.fetch_add(1, Ordering::SeqCst);
                            let failing: Vec<String> = batch.iter().filter(|id| poison.contains(*id)).cloned().collect();
                            if failing.is_empty() {
                                Ok(batch.into_iter().map(PerIdResult::ok).collect())
                            } else {
                                Err(SchedulerError::BatchPartialFailure { failed_ids: failing })
                            }
                        }
                    }
                };

                let results = bisect_retry(&ids, &op).await;
                proptest::prop_assert_eq!(results.len(), n);
                for r in &results {
                    proptest::prop_assert_eq!(!r.is_ok(), poison.contains(&r.resource_id));
                }

                if !poison.is_empty() {
                    // Every poisoned id's root-to-leaf path touches at most
                    // `depth` internal (length > 1) nodes, each of which
                    // issues exactly 2 child calls on top of its own; the
                    // union of those ancestors across all k poisoned ids is
                    // at most k * depth, so total calls <= 1 + 2 * k * depth.
                    let depth = (n as f64).log2().ceil() as usize;
                    let bound = 1 + 2 * poison.len() * depth;
                    proptest::prop_assert!(
                        call_count.load(Ordering::SeqCst) <= bound,
                        "call count {} exceeded bound {} for n={} k={}",
                        call_count.load(Ordering::SeqCst),
                        bound,
                        n,
                        poison.len()
                    );
                }
                Ok(())
            })?;
        }
    }
}
