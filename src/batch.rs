use std::{collections::HashMap, future::Future};

use futures::future::join_all;
use tracing::info;

use crate::types::ItemStatus;

/// Runs `f` over `items` in contiguous windows of at most `concurrency`
/// items. A window is awaited in full before the next one starts, and the
/// returned results keep input order.
///
/// Each item is logged as `[num/total] (pct%) {verb}: {name}` when its
/// window is launched.
pub async fn process_in_batches<'a, T, R, N, F, Fut>(
    items: &'a [T],
    concurrency: usize,
    verb: &str,
    name_of: N,
    mut f: F,
) -> Vec<R>
where
    N: Fn(&T) -> String,
    F: FnMut(&'a T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    let mut results = Vec::with_capacity(total);

    for (window, chunk) in items.chunks(concurrency.max(1)).enumerate() {
        let offset = window * concurrency.max(1);
        let futures = chunk.iter().enumerate().map(|(i, item)| {
            let num = offset + i + 1;
            let name = name_of(item);
            info!(
                num,
                total,
                "[{}/{}] ({}%) {}: {}",
                num,
                total,
                percent(num, total),
                verb,
                name
            );
            f(item)
        });
        // Collect eagerly so every future is created before any is polled.
        let futures: Vec<Fut> = futures.collect();
        results.extend(join_all(futures).await);
    }

    results
}

fn percent(num: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    ((num as f64 / total as f64) * 100.0).round() as usize
}

/// Tally of per-item outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    counts: HashMap<ItemStatus, usize>,
}

impl StatusCounts {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ItemStatus>,
    {
        let mut counts = StatusCounts::default();
        for status in statuses {
            counts.record(status);
        }
        counts
    }

    pub fn record(&mut self, status: ItemStatus) {
        *self.counts.entry(status).or_insert(0) += 1;
    }

    pub fn get(&self, status: ItemStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn has_errors(&self) -> bool {
        self.get(ItemStatus::Error) > 0
    }
}
