//! Composes the run: workload resolution, function registration, phase
//! fan-out.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::time::Instant;

use crate::client::LeafClient;
use crate::collector::Collector;
use crate::config::{Config, PhaseType, Workload};
use crate::executor::{ConstantExecutor, RampingExecutor};
use crate::generator::WorkloadGenerator;
use crate::payload::DataProvider;

/// Owns every component of a run: the resolved workload, the Leaf client,
/// one payload provider per image and the collector.
#[derive(Debug)]
pub struct Controller {
    max_duration: Duration,
    workload: Workload,
    client: LeafClient,
    collector: Arc<Collector>,
    providers: HashMap<String, Arc<DataProvider>>,
}

impl Controller {
    /// Prepares a run from a validated config.
    ///
    /// Resolves the workload (generating it if asked to), registers every
    /// distinct image with the Leaf, stamps the returned function ids into
    /// the phases and builds the payload providers. Any failure here is
    /// fatal.
    pub async fn new(config: Config) -> Result<Self> {
        let mut workload = if config.generate_workload {
            WorkloadGenerator::new(
                config.seed,
                config.max_duration,
                &config.leaf_address,
                config.timeout,
                config.patterns.clone(),
            )
            .generate()
        } else {
            config
                .workload
                .clone()
                .context("generate_workload is off and no explicit workload is configured")?
        };
        tracing::debug!(?workload, "resolved workload");

        let client = LeafClient::connect(&config.leaf_address, Duration::from_secs(config.timeout))?;

        let image_tags: BTreeSet<String> = workload
            .phases
            .iter()
            .map(|phase| phase.image_tag.clone())
            .collect();

        let mut providers = HashMap::new();
        for image_tag in &image_tags {
            let function_id = client
                .create_function(image_tag, &config.function)
                .await
                .with_context(|| format!("failed to create function for {image_tag}"))?;
            tracing::info!(%image_tag, %function_id, "registered function");

            for phase in workload
                .phases
                .iter_mut()
                .filter(|phase| phase.image_tag == *image_tag)
            {
                phase.function_id = function_id.clone();
            }

            let provider = DataProvider::for_image_tag(image_tag, config.seed).await?;
            providers.insert(image_tag.clone(), Arc::new(provider));
        }

        let collector = Arc::new(Collector::new(&config.output_file)?);

        Ok(Self {
            max_duration: config.max_duration,
            workload,
            client,
            collector,
            providers,
        })
    }

    /// Executes the workload.
    ///
    /// Spawns one task per phase; each waits out its start offset, then
    /// drives its executor until the phase ends or the run-wide deadline
    /// fires. Once every phase task is done the collector is flushed and
    /// closed.
    pub async fn run(self) -> Result<()> {
        let flusher = {
            let collector = Arc::clone(&self.collector);
            tokio::spawn(async move { collector.run_flusher().await })
        };

        let start = Instant::now();
        let deadline = start + self.max_duration;
        tracing::info!(
            max_duration = ?self.max_duration,
            phases = self.workload.phases.len(),
            "starting workload"
        );

        let mut tasks = Vec::new();
        for phase in self.workload.phases.iter().cloned() {
            let provider = self
                .providers
                .get(&phase.image_tag)
                .map(Arc::clone)
                .context("phase references an image without a provider")?;
            let client = self.client.clone();
            let collector = Arc::clone(&self.collector);

            tasks.push(tokio::spawn(async move {
                tokio::time::sleep_until(start + phase.start_time).await;
                tracing::info!(
                    name = phase.name.as_deref().unwrap_or_default(),
                    phase_type = ?phase.phase_type,
                    image_tag = %phase.image_tag,
                    start_rps = phase.start_rps,
                    end_rps = phase.end_rps,
                    step = phase.step,
                    duration = ?phase.duration,
                    "starting phase"
                );

                match phase.phase_type {
                    PhaseType::Constant => {
                        ConstantExecutor::new(client, collector, provider)
                            .execute(deadline, &phase)
                            .await
                    }
                    PhaseType::Variable => {
                        RampingExecutor::new(client, collector, provider)
                            .execute(deadline, &phase)
                            .await
                    }
                }
            }));
        }

        for task in join_all(tasks).await {
            task.context("phase task panicked")?;
        }

        flusher.abort();
        self.collector.close();
        tracing::info!(elapsed = ?start.elapsed(), "workload completed");

        Ok(())
    }
}
