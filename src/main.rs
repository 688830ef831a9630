use chat_service::api;
use chat_service::common::init;
use chat_service::settings::AppSettings;
use chat_service::workers::crons;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = AppSettings::load_from_env()?;
    init::initialize_logging(&settings);
    match settings.app_component.as_str() {
        "api" => api::serve(&settings).await,
        "cleanup-cron" => crons::cleanup_cron::serve(&settings).await,
        component => Err(anyhow::anyhow!("Unknown app component: {component}")),
    }
}
