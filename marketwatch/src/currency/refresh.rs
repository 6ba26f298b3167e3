use super::{CurrencyConverter, DEFAULT_LOCAL_CURRENCY, RateResponse};
use crate::error::RateError;
use async_trait::async_trait;
use chrono::Utc;
use smol_str::SmolStr;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default exchange rate endpoint.
pub const DEFAULT_RATE_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";

/// Default refresh cadence (5 minutes).
pub const DEFAULT_RATE_REFRESH: Duration = Duration::from_secs(5 * 60);

/// Source of the USD to local-currency rate.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rate(&self) -> Result<f64, RateError>;
}

/// [`RateProvider`] backed by a JSON exchange rate REST endpoint.
#[derive(Debug, Clone)]
pub struct HttpRateProvider {
    client: reqwest::Client,
    url: String,
    currency: SmolStr,
}

impl HttpRateProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            currency: SmolStr::new_static(DEFAULT_LOCAL_CURRENCY),
        }
    }

    /// Set the currency code read from the response `rates` map.
    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = SmolStr::new(currency);
        self
    }
}

impl Default for HttpRateProvider {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_URL)
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_rate(&self) -> Result<f64, RateError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;

        let payload = response.json::<RateResponse>().await?;
        payload.rate_for(&self.currency)
    }
}

/// Fetch once and swap the result into `converter`. On failure the previous
/// rate stays in place.
pub async fn refresh_once<P>(provider: &P, converter: &CurrencyConverter) -> Result<f64, RateError>
where
    P: RateProvider + ?Sized,
{
    let rate = provider.fetch_rate().await?;
    converter.update(rate, Utc::now())?;
    Ok(rate)
}

/// Spawn the periodic rate refresh. The first fetch happens immediately.
///
/// A zero `period` is replaced by [`DEFAULT_RATE_REFRESH`]. The task stops once
/// `shutdown` is set to `true` or its sender is dropped.
pub fn spawn_rate_refresh<P>(
    provider: P,
    converter: Arc<CurrencyConverter>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()>
where
    P: RateProvider + 'static,
{
    let period = if period.is_zero() {
        warn!(
            default_secs = DEFAULT_RATE_REFRESH.as_secs(),
            "rate refresh period must be positive, using default"
        );
        DEFAULT_RATE_REFRESH
    } else {
        period
    };

    tokio::spawn(async move {
        info!(period_secs = period.as_secs(), "starting currency rate refresh");

        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match refresh_once(&provider, &converter).await {
                        Ok(rate) => debug!(rate, "currency rate updated"),
                        Err(error) => warn!(
                            %error,
                            rate = converter.rate(),
                            "currency rate refresh failed, keeping previous rate"
                        ),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("stopping currency rate refresh");
                        break;
                    }
                }
            }
        }
    })
}
