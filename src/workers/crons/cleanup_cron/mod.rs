pub mod tasks;

use crate::common::init;
use crate::cron_tasks;
use crate::settings::AppSettings;
use tasks::cleanup_sessions::cleanup_sessions;

/// One pass of housekeeping, meant to be scheduled externally.
pub async fn serve(settings: &AppSettings) -> anyhow::Result<()> {
    let state = init::initialize_state(settings).await?;
    cron_tasks! {
        &state,
        cleanup_sessions,
    }
    Ok(())
}
