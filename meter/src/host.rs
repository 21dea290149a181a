use std::time::{Duration, Instant};

use tracing::info;

use energymon_common::{upload::payload_json, MeterAction, MeterConfig, MeterEngine, SensorSample};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = MeterConfig::default();
    info!("effective config: {}", serde_json::to_string(&config)?);

    let mut engine = MeterEngine::new(config.clone());
    let started = Instant::now();
    let mut iteration: u64 = 0;

    info!("meter simulation started");

    loop {
        iteration = iteration.wrapping_add(1);

        // Hardware integration point:
        // replace the simulated values with the PZEM-004T driver on the ESP
        // target.
        engine.update_sample(simulated_sample(iteration));

        let now_ms = started.elapsed().as_millis() as u64;
        for action in engine.tick(now_ms) {
            match action {
                MeterAction::Render(view) => {
                    let unit = view.unit.map(|unit| format!(" {unit}")).unwrap_or_default();
                    info!("[display] {} {}{unit}", view.labels.join(" "), view.value);
                }
                MeterAction::Upload(reading) => {
                    // Network integration point: on the ESP target this body
                    // goes out as an HTTP POST with the X-API-Key header.
                    info!("[upload] {}", payload_json(&reading));
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(config.idle_delay_ms)).await;
    }
}

fn simulated_sample(iteration: u64) -> SensorSample {
    let wobble = (iteration % 20) as f32;

    // Every 40th iteration drops the current reading so the invalid-sentinel
    // coercion is visible in the output.
    let current = if iteration % 40 == 0 {
        None
    } else {
        Some(1.1 + wobble * 0.01)
    };

    SensorSample {
        voltage: Some(229.0 + wobble * 0.2),
        current,
        power: Some(252.0 + wobble * 2.0),
        energy: Some(iteration as f32 * 0.0001),
        frequency: Some(50.0),
        power_factor: Some(0.95),
    }
}
