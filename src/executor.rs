use futures::stream::StreamExt;
use std::future::Future;

/// An isolated worker failure, tagged with the index of the input that
/// produced it.
#[derive(Debug)]
pub struct ExecutorError {
    pub index: usize,
    pub message: String,
}

/// Result of a bounded run. `results` is positionally aligned with the
/// input list; `None` marks an isolated failure.
#[derive(Debug)]
pub struct ExecutorOutcome<T> {
    pub results: Vec<Option<T>>,
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<ExecutorError>,
}

/// Run `worker` over `items` with at most `limit` concurrently active
/// tasks, preserving input order in the output regardless of completion
/// order. A failing worker never cancels its siblings; the run always
/// drains to completion. `on_progress` is invoked with
/// `(completed, total)` after every completion.
pub async fn run_bounded<I, T, F, Fut>(
    items: Vec<I>,
    limit: usize,
    worker: F,
    mut on_progress: impl FnMut(usize, usize),
) -> ExecutorOutcome<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let total = items.len();
    let mut results: Vec<Option<T>> = Vec::with_capacity(total);
    results.resize_with(total, || None);
    let mut errors = Vec::new();

    let worker = &worker;
    let mut stream = futures::stream::iter(items.into_iter().enumerate().map(
        |(index, item)| async move { (index, worker(item).await) },
    ))
    .buffer_unordered(limit.max(1));

    let mut completed = 0usize;
    while let Some((index, result)) = stream.next().await {
        match result {
            Ok(value) => results[index] = Some(value),
            Err(e) => errors.push(ExecutorError {
                index,
                message: format!("{e:#}"),
            }),
        }
        completed += 1;
        on_progress(completed, total);
    }

    let success_count = results.iter().filter(|r| r.is_some()).count();
    ExecutorOutcome {
        success_count,
        error_count: total - success_count,
        results,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_preserves_input_order() {
        // Later items finish first; output must still follow input order.
        let outcome = run_bounded(
            vec![30u64, 20, 10, 0],
            4,
            |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(delay * 2)
            },
            |_, _| {},
        )
        .await;

        assert_eq!(
            outcome.results,
            vec![Some(60), Some(40), Some(20), Some(0)]
        );
        assert_eq!(outcome.success_count, 4);
        assert_eq!(outcome.error_count, 0);
    }

    #[tokio::test]
    async fn test_isolates_failures() {
        let outcome = run_bounded(
            vec![1u32, 2, 3, 4],
            2,
            |n| async move {
                if n % 2 == 0 {
                    anyhow::bail!("even input {n}");
                }
                Ok(n)
            },
            |_, _| {},
        )
        .await;

        assert_eq!(outcome.results, vec![Some(1), None, Some(3), None]);
        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.error_count, 2);
        let mut failed: Vec<usize> = outcome.errors.iter().map(|e| e.index).collect();
        failed.sort_unstable();
        assert_eq!(failed, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_respects_concurrency_limit() {
        let active = std::sync::Arc::new(AtomicUsize::new(0));
        let peak = std::sync::Arc::new(AtomicUsize::new(0));

        let outcome = run_bounded(
            (0..12).collect::<Vec<u32>>(),
            3,
            |n| {
                let active = active.clone();
                let peak = peak.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(n)
                }
            },
            |_, _| {},
        )
        .await;

        assert_eq!(outcome.success_count, 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_progress_reports_every_completion() {
        let mut seen = Vec::new();
        run_bounded(
            vec![1u32, 2, 3],
            2,
            |n| async move { Ok(n) },
            |done, total| seen.push((done, total)),
        )
        .await;
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let outcome =
            run_bounded(Vec::<u32>::new(), 5, |n| async move { Ok(n) }, |_, _| {}).await;
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.success_count, 0);
        assert_eq!(outcome.error_count, 0);
    }
}
