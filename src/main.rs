#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use crate::configuration::{Configuration, ObservabilityConfig};
use argh::FromArgs;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

mod cleanup;
mod command;
mod configuration;
mod oci;
mod registry_client;
mod storage;

fn set_tracing(
    config: Option<&ObservabilityConfig>,
) -> Result<Option<SdkTracerProvider>, configuration::Error> {
    if let Some(ObservabilityConfig {
        tracing: Some(tracing_config),
    }) = config
    {
        let resource = Resource::builder()
            .with_service_name(env!("CARGO_PKG_NAME"))
            .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
            .build();
        let otlp_exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&tracing_config.endpoint)
            .with_timeout(std::time::Duration::from_secs(10))
            .build()?;

        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(otlp_exporter)
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(resource)
            .with_sampler(Sampler::TraceIdRatioBased(tracing_config.sampling_rate))
            .build();

        let tracer = tracer_provider.tracer(env!("CARGO_PKG_NAME"));
        let _ = global::set_tracer_provider(tracer_provider.clone());
        let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);

        let _ = tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().json())
            .with(telemetry)
            .try_init();

        Ok(Some(tracer_provider))
    } else {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().json())
            .try_init();

        Ok(None)
    }
}

#[derive(FromArgs, PartialEq, Debug)]
/// Deletes manifests no longer reachable from any tag of a docker registry
struct Arguments {
    #[argh(option, short = 'c', default = "String::from(\"config.toml\")")]
    /// the path to the configuration file, defaults to `config.toml`
    config: String,

    #[argh(switch, short = 'd')]
    /// only report what would be deleted, no changes will be made
    dry_run: bool,

    #[argh(option, short = 'r')]
    /// only clean manifests of this repository
    repository: Option<String>,
}

fn main() -> Result<(), command::Error> {
    let cli_args: Arguments = argh::from_env();

    let config = Configuration::load(&cli_args.config)?;

    let options = command::cleanup::Options {
        dry_run: cli_args.dry_run,
        repository: cli_args.repository,
    };

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?
        .block_on(run_command(&config, &options))
}

async fn run_command(
    config: &Configuration,
    options: &command::cleanup::Options,
) -> Result<(), command::Error> {
    let tracer_provider = set_tracing(config.observability.as_ref())?;

    let result = command::cleanup::Command::new(config, options).run().await;

    if let Some(tracer_provider) = tracer_provider {
        let _ = tracer_provider.shutdown();
    }

    result
}
