use anyhow::Context;
use gravisim::{app, headless, AppConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("invalid GRAVISIM_* environment")?;

    match config.headless_steps {
        Some(steps) => {
            log::info!(
                "Running {steps} headless steps with {} particles",
                config.simulation.particle_count
            );
            headless::run(&config, steps).context("headless run failed")?;
        }
        None => app::run(config).context("visualizer failed")?,
    }
    Ok(())
}
