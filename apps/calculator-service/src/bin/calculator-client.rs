//! Calculator Client Binary
//!
//! Exercises every calculator RPC against a running server and logs the
//! results.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin calculator-client -- [sum|deadline|square|factorize|average|find-max|all]
//! ```
//!
//! # Environment Variables
//!
//! - `CALCULATOR_ENDPOINT`: Server URI (default: <http://127.0.0.1:50069>)
//! - `CALCULATOR_REQUEST_PACING_MS`: Delay between streamed requests (default: 1000)
//! - `CALCULATOR_CALL_TIMEOUT_MS`: Timeout for `SumWithDeadline` (default: 4000)
//! - `RUST_LOG`: Log level (default: info)

use anyhow::{Context, bail};
use calculator_service::infrastructure::telemetry::{self, TelemetryConfig};
use calculator_service::{CalculatorClient, ClientSettings, Pacing};

const SAMPLE_VALUES: [i32; 5] = [5, 10, 6, 7, 9];

/// Which calls to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Demo {
    Sum,
    Deadline,
    Square,
    Factorize,
    Average,
    FindMax,
    All,
}

impl Demo {
    fn parse(arg: Option<&str>) -> anyhow::Result<Self> {
        Ok(match arg.unwrap_or("all") {
            "sum" => Self::Sum,
            "deadline" => Self::Deadline,
            "square" => Self::Square,
            "factorize" => Self::Factorize,
            "average" => Self::Average,
            "find-max" | "max" => Self::FindMax,
            "all" => Self::All,
            other => bail!(
                "unknown call {other:?}; expected sum, deadline, square, factorize, average, find-max or all"
            ),
        })
    }

    fn includes(self, other: Self) -> bool {
        self == Self::All || self == other
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let _telemetry_guard = telemetry::init_with_config(
        TelemetryConfig::from_env().with_default_service_name("calculator-client"),
    );

    let arg = std::env::args().nth(1);
    let demo = Demo::parse(arg.as_deref())?;
    let settings = ClientSettings::from_env().context("loading client settings")?;
    let pacing = Pacing::every(settings.request_pacing);

    let mut client = CalculatorClient::connect(settings.endpoint.clone())
        .await
        .with_context(|| format!("connecting to {}", settings.endpoint))?;

    if demo.includes(Demo::Sum) {
        let result = client.sum(4, 6).await.context("Sum")?;
        tracing::info!(a = 4, b = 6, result, "Sum");
    }

    if demo.includes(Demo::Factorize) {
        let count = client
            .factorize_with(120, |factor| tracing::info!(factor, "Factor received"))
            .await
            .context("Factorize")?;
        tracing::info!(number = 120, count, "Factorize finished");
    }

    if demo.includes(Demo::Average) {
        let values = SAMPLE_VALUES.iter().map(|&v| v as f32).collect();
        let result = client.average(values, pacing).await.context("Average")?;
        tracing::info!(result, "Average");
    }

    if demo.includes(Demo::FindMax) {
        let exchange = client
            .find_max(SAMPLE_VALUES.to_vec(), pacing, |response| {
                tracing::info!(response, "FindMax response");
            })
            .await
            .context("FindMax")?;
        tracing::info!(
            sent = exchange.sent,
            received = exchange.responses.len(),
            "FindMax finished"
        );
    }

    if demo.includes(Demo::Square) {
        match client.square_root(-234).await {
            Ok(result) => tracing::info!(num = -234, result, "Square"),
            Err(err) => tracing::warn!(
                num = -234,
                kind = err.kind().as_str(),
                error = %err,
                "Square rejected"
            ),
        }
    }

    if demo.includes(Demo::Deadline) {
        let timeout = settings.call_timeout;
        match client.sum_with_deadline(3, 7, timeout).await {
            Ok(result) => tracing::info!(
                timeout_ms = timeout.as_millis(),
                result,
                "SumWithDeadline"
            ),
            Err(err) => tracing::warn!(
                timeout_ms = timeout.as_millis(),
                kind = err.kind().as_str(),
                error = %err,
                "SumWithDeadline failed"
            ),
        }
    }

    Ok(())
}
