use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use log::info;

/// ユーザーごとの処理をまとめて実行する単位。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    pub size: usize,
    /// バッチの間に待つ時間。APIのレート制限に合わせる。
    pub delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            size: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// `items`を`options.size`件ずつ並行に処理し、入力と同じ順序で結果を返す。
pub async fn run_in_batches<'a, T, R, F, Fut>(
    items: &'a [T],
    options: &BatchOptions,
    task: F,
) -> Vec<R>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = R>,
{
    let size = options.size.max(1);
    let batch_count = (items.len() + size - 1) / size;
    let mut results = Vec::with_capacity(items.len());

    for (index, batch) in items.chunks(size).enumerate() {
        info!("Processing batch {} of {}", index + 1, batch_count);
        results.extend(join_all(batch.iter().map(&task)).await);

        if index + 1 < batch_count && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }

    results
}
