//! Order size resolution

use rust_decimal::Decimal;
use tracing::debug;

use crate::common::errors::{BridgeError, Result};
use crate::common::traits::ExchangeClient;
use crate::common::types::{AlertConfig, IncomingAlert};

/// Computes trade size from a configuration and live account state
///
/// A positive fixed `quantity` wins. Otherwise `quantity_percentage` of the
/// free quote-currency balance is converted at the alert price, or at the
/// ticker's last price when the alert carries none. Nothing is cached: the
/// percentage path reads balance (and maybe ticker) on every alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantityResolver;

impl QuantityResolver {
    pub fn new() -> Self {
        Self
    }

    pub async fn resolve(
        &self,
        config: &AlertConfig,
        alert: &IncomingAlert,
        client: &dyn ExchangeClient,
    ) -> Result<Decimal> {
        if let Some(quantity) = config.quantity.filter(|q| *q > Decimal::ZERO) {
            return Ok(quantity);
        }

        let percentage = config
            .quantity_percentage
            .ok_or(BridgeError::QuantityUndetermined)?;
        let quote = config.quote_currency()?;

        let balances = client.fetch_balance().await?;
        let available = balances
            .get(quote)
            .map(|entry| entry.free)
            .ok_or_else(|| BridgeError::BalanceNotFound(quote.to_string()))?;

        let price = match alert.usable_price() {
            Some(price) => price,
            None => client
                .fetch_ticker(&config.symbol)
                .await?
                .last
                .filter(|p| *p > Decimal::ZERO)
                .ok_or(BridgeError::QuantityUndetermined)?,
        };

        let quantity = available
            .checked_mul(percentage)
            .map(|notional| notional / Decimal::ONE_HUNDRED)
            .and_then(|notional| notional.checked_div(price))
            .ok_or(BridgeError::QuantityUndetermined)?;
        debug!(
            "Sized {}% of {} {} at {} -> {}",
            percentage, available, quote, price, quantity
        );

        if quantity > Decimal::ZERO {
            Ok(quantity)
        } else {
            Err(BridgeError::QuantityUndetermined)
        }
    }
}
