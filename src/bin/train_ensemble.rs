use std::time::Instant;

use heart_risk::config::EnsembleConfig;
use heart_risk::memory::resident_memory;
use heart_risk::pipelines::ensemble;
use heart_risk::{init_logging, PipelineError};

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    init_logging();
    let start_time = Instant::now();
    let start_memory = resident_memory();

    let outcome = ensemble::run(&EnsembleConfig::default()).await?;

    let end_memory = resident_memory();
    let duration = start_time.elapsed();

    println!("Model written to {}", outcome.model_path.display());
    println!("Time elapsed: {:?}", duration);
    println!("Memory used: {} bytes", end_memory.saturating_sub(start_memory));

    Ok(())
}
