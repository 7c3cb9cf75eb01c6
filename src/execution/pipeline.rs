//! Alert-to-order pipeline

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::dispatcher::OrderDispatcher;
use super::gateway::ExchangeGateway;
use super::quantity::QuantityResolver;
use crate::common::errors::{BridgeError, PipelineError, Result};
use crate::common::traits::{ConfigStore, HistoryStore};
use crate::common::types::{AlertConfig, HistoryRecord, IncomingAlert, OrderReceipt, OrderResult};

/// Orchestrates one alert from config lookup to history write
///
/// Steps run strictly in sequence: config lookup, client acquisition,
/// quantity resolution, dispatch. The first failing step ends the run with a
/// failed [`OrderResult`]. Success and failure are both written to history.
/// No deduplication: identical alerts place identical orders.
pub struct AlertPipeline {
    configs: Arc<dyn ConfigStore>,
    gateway: Arc<ExchangeGateway>,
    history: Arc<dyn HistoryStore>,
    resolver: QuantityResolver,
    dispatcher: OrderDispatcher,
}

/// What a successful run produced
struct Execution {
    config: AlertConfig,
    quantity: Decimal,
    receipt: OrderReceipt,
}

impl AlertPipeline {
    pub fn new(
        configs: Arc<dyn ConfigStore>,
        gateway: Arc<ExchangeGateway>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            configs,
            gateway,
            history,
            resolver: QuantityResolver::new(),
            dispatcher: OrderDispatcher::new(),
        }
    }

    pub fn gateway(&self) -> &Arc<ExchangeGateway> {
        &self.gateway
    }

    /// Process an alert and record its outcome
    ///
    /// Step failures come back as `Ok` with `success == false`. `Err` means
    /// the outcome could not be written to history; it still carries the
    /// result, and for a successful run the order is live on the exchange.
    #[instrument(skip(self, alert), fields(user_id = %alert.user_id, config_name = %alert.config_name))]
    pub async fn process(&self, alert: &IncomingAlert) -> std::result::Result<OrderResult, PipelineError> {
        if alert.message.is_some() || alert.additional_parameters.is_some() {
            debug!(
                message = ?alert.message,
                additional_parameters = ?alert.additional_parameters,
                "Alert payload extras"
            );
        }

        let (result, record) = match self.execute(alert).await {
            Ok(execution) => {
                let result = OrderResult::executed(&execution.receipt);
                let record =
                    HistoryRecord::executed(alert, &execution.config, execution.quantity, &result);
                info!(
                    "Executed {} for {}: order id {:?}",
                    execution.config.name, alert.user_id, result.order_id
                );
                (result, record)
            }
            Err(err) => {
                warn!("Alert {} failed: {}", alert.config_name, err);
                let result = OrderResult::failed(&err);
                let record = HistoryRecord::failed(alert, &result);
                (result, record)
            }
        };

        self.record(alert, record, result).await
    }

    async fn execute(&self, alert: &IncomingAlert) -> Result<Execution> {
        let config = self
            .configs
            .get(&alert.user_id, &alert.config_name)
            .await?
            .ok_or_else(|| BridgeError::ConfigNotFound(alert.config_name.clone()))?;

        let client = self.gateway.get_client(&alert.user_id, config.exchange).await?;

        let quantity = self
            .resolver
            .resolve(&config, alert, client.as_ref())
            .await?;

        let receipt = self
            .dispatcher
            .dispatch(
                client.as_ref(),
                &config.symbol,
                config.order_type,
                config.position_side.side(),
                quantity,
                alert.usable_price(),
                config.price,
            )
            .await?;

        Ok(Execution {
            config,
            quantity,
            receipt,
        })
    }

    async fn record(
        &self,
        alert: &IncomingAlert,
        record: HistoryRecord,
        result: OrderResult,
    ) -> std::result::Result<OrderResult, PipelineError> {
        let source = match self.history.append(&alert.user_id, &record).await {
            Ok(true) => return Ok(result),
            Ok(false) => BridgeError::Persistence("history store did not accept the record".to_string()),
            Err(err) => err,
        };

        error!(
            success = result.success,
            order_id = ?result.order_id,
            record_id = %record.id,
            "Outcome of {} for {} was not recorded: {}",
            alert.config_name,
            alert.user_id,
            source
        );
        Err(PipelineError::HistoryNotRecorded {
            config_name: alert.config_name.clone(),
            result,
            source,
        })
    }
}
