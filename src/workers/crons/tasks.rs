/// Runs each task in order against `$ctx`, logging its outcome and duration.
/// A failing task does not prevent the following ones from running.
#[macro_export]
macro_rules! cron_tasks {
    ($ctx:expr, $($t:path),* $(,)?) => {
        $({
            const TASK: &str = const_str::convert_ascii_case!(snake, stringify!($t));
            let started = std::time::Instant::now();
            tracing::info!(task = TASK, "Cron task started");
            match ($t)($ctx).await {
                Ok(result) => tracing::info!(
                    task = TASK,
                    elapsed = ?started.elapsed(),
                    result = ?result,
                    "Cron task completed"
                ),
                Err(e) => tracing::error!(task = TASK, code = e.code(), "Cron task failed"),
            }
        })*
    };
}
