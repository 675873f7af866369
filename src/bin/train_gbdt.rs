use std::time::Instant;

use heart_risk::config::BoostedConfig;
use heart_risk::memory::resident_memory;
use heart_risk::pipelines::boosted;
use heart_risk::{init_logging, PipelineError};

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    init_logging();
    let start_time = Instant::now();
    let start_memory = resident_memory();

    let config = BoostedConfig::default();
    let outcome = boosted::run(&config).await?;

    let end_memory = resident_memory();
    let duration = start_time.elapsed();

    println!(
        "Training accuracy: {:.4}, test accuracy: {:.4}",
        outcome.train.accuracy, outcome.test.accuracy
    );
    println!("Time elapsed: {:?}", duration);
    println!("Memory used: {} bytes", end_memory.saturating_sub(start_memory));

    Ok(())
}
