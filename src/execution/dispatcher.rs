//! Mapping of alert order types onto exchange order requests

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, instrument};

use crate::common::errors::{BridgeError, Result};
use crate::common::traits::ExchangeClient;
use crate::common::types::{OrderKind, OrderReceipt, OrderRequest, OrderType, Side};

/// How one order type is sent to the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRule {
    pub kind: OrderKind,
    pub requires_price: bool,
    /// Whether the resolved price is also sent as `stopPrice`
    pub stop_price: bool,
}

/// Dispatch table
///
/// | order_type  | kind   | price | stopPrice |
/// |-------------|--------|-------|-----------|
/// | market      | market | no    | no        |
/// | limit       | limit  | yes   | no        |
/// | stop_loss   | stop   | yes   | yes       |
/// | take_profit | stop   | yes   | yes       |
pub fn dispatch_rule(order_type: OrderType) -> DispatchRule {
    match order_type {
        OrderType::Market => DispatchRule {
            kind: OrderKind::Market,
            requires_price: false,
            stop_price: false,
        },
        OrderType::Limit => DispatchRule {
            kind: OrderKind::Limit,
            requires_price: true,
            stop_price: false,
        },
        OrderType::StopLoss | OrderType::TakeProfit => DispatchRule {
            kind: OrderKind::Stop,
            requires_price: true,
            stop_price: true,
        },
    }
}

/// Builds and places exchange orders
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderDispatcher;

impl OrderDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Build the exchange request for an order
    ///
    /// Price precedence: alert price, then config price. A non-positive
    /// price counts as absent.
    pub fn build_request(
        &self,
        symbol: &str,
        order_type: OrderType,
        side: Side,
        quantity: Decimal,
        alert_price: Option<Decimal>,
        config_price: Option<Decimal>,
    ) -> Result<OrderRequest> {
        let rule = dispatch_rule(order_type);
        let mut params = HashMap::new();

        let price = if rule.requires_price {
            let positive = |p: &Decimal| *p > Decimal::ZERO;
            let price = alert_price
                .filter(positive)
                .or(config_price.filter(positive))
                .ok_or(BridgeError::MissingPrice(order_type))?;
            if rule.stop_price {
                params.insert("stopPrice".to_string(), price.normalize().to_string());
            }
            Some(price)
        } else {
            None
        };

        Ok(OrderRequest {
            symbol: symbol.to_string(),
            kind: rule.kind,
            side,
            amount: quantity,
            price,
            params,
        })
    }

    /// Build the request and place it on the exchange
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, client))]
    pub async fn dispatch(
        &self,
        client: &dyn ExchangeClient,
        symbol: &str,
        order_type: OrderType,
        side: Side,
        quantity: Decimal,
        alert_price: Option<Decimal>,
        config_price: Option<Decimal>,
    ) -> Result<OrderReceipt> {
        let request =
            self.build_request(symbol, order_type, side, quantity, alert_price, config_price)?;

        let receipt = client.create_order(&request).await.map_err(|e| match e {
            BridgeError::ExchangeRejected(_) => e,
            other => BridgeError::ExchangeRejected(other.to_string()),
        })?;

        info!(
            "Placed {} {} {} {} on {} (order id {:?})",
            order_type,
            side,
            quantity,
            symbol,
            client.exchange(),
            receipt.id
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::MockExchangeClient;
    use crate::common::types::ExchangeId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_never_needs_price() {
        let request = OrderDispatcher::new()
            .build_request("BTC/USDT", OrderType::Market, Side::Buy, dec!(0.01), None, None)
            .unwrap();
        assert_eq!(request.kind, OrderKind::Market);
        assert_eq!(request.price, None);
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_market_ignores_supplied_price() {
        let request = OrderDispatcher::new()
            .build_request(
                "BTC/USDT",
                OrderType::Market,
                Side::Sell,
                dec!(1),
                Some(dec!(100)),
                Some(dec!(90)),
            )
            .unwrap();
        assert_eq!(request.price, None);
    }

    #[test]
    fn test_price_bearing_types_require_price() {
        for order_type in [OrderType::Limit, OrderType::StopLoss, OrderType::TakeProfit] {
            let err = OrderDispatcher::new()
                .build_request("BTC/USDT", order_type, Side::Buy, dec!(1), None, None)
                .unwrap_err();
            assert!(matches!(err, BridgeError::MissingPrice(t) if t == order_type));
        }
    }

    #[test]
    fn test_alert_price_takes_precedence() {
        let request = OrderDispatcher::new()
            .build_request(
                "BTC/USDT",
                OrderType::Limit,
                Side::Buy,
                dec!(1),
                Some(dec!(101)),
                Some(dec!(99)),
            )
            .unwrap();
        assert_eq!(request.kind, OrderKind::Limit);
        assert_eq!(request.price, Some(dec!(101)));
        assert!(request.params.is_empty());

        let request = OrderDispatcher::new()
            .build_request("BTC/USDT", OrderType::Limit, Side::Buy, dec!(1), None, Some(dec!(99)))
            .unwrap();
        assert_eq!(request.price, Some(dec!(99)));
    }

    #[test]
    fn test_non_positive_price_is_missing() {
        let dispatcher = OrderDispatcher::new();
        for (alert, config) in [
            (Some(dec!(0)), Some(dec!(0))),
            (None, Some(dec!(0))),
            (None, Some(dec!(-5))),
            (Some(dec!(-1)), None),
        ] {
            let err = dispatcher
                .build_request("BTC/USDT", OrderType::Limit, Side::Buy, dec!(1), alert, config)
                .unwrap_err();
            assert!(matches!(err, BridgeError::MissingPrice(OrderType::Limit)));
        }

        let request = dispatcher
            .build_request("BTC/USDT", OrderType::Limit, Side::Buy, dec!(1), Some(dec!(0)), Some(dec!(99)))
            .unwrap();
        assert_eq!(request.price, Some(dec!(99)));
    }

    #[test]
    fn test_stop_types_send_stop_price() {
        for order_type in [OrderType::StopLoss, OrderType::TakeProfit] {
            let request = OrderDispatcher::new()
                .build_request("ETH/USDT", order_type, Side::Sell, dec!(2), None, Some(dec!(1800.50)))
                .unwrap();
            assert_eq!(request.kind, OrderKind::Stop);
            assert_eq!(request.price, Some(dec!(1800.50)));
            assert_eq!(request.params.get("stopPrice").map(String::as_str), Some("1800.5"));
        }
    }

    #[tokio::test]
    async fn test_dispatch_places_order() {
        let mut client = MockExchangeClient::new();
        client.expect_exchange().return_const(ExchangeId::Binance);
        client
            .expect_create_order()
            .withf(|req| {
                req.symbol == "BTC/USDT"
                    && req.kind == OrderKind::Market
                    && req.side == Side::Buy
                    && req.amount == dec!(0.01)
            })
            .times(1)
            .returning(|_| {
                Ok(OrderReceipt {
                    id: Some("42".to_string()),
                    raw: serde_json::json!({"orderId": 42}),
                })
            });

        let receipt = OrderDispatcher::new()
            .dispatch(&client, "BTC/USDT", OrderType::Market, Side::Buy, dec!(0.01), None, None)
            .await
            .unwrap();
        assert_eq!(receipt.id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_dispatch_wraps_transport_errors() {
        let mut client = MockExchangeClient::new();
        client
            .expect_create_order()
            .returning(|_| Err(BridgeError::Internal("connection reset".to_string())));

        let err = OrderDispatcher::new()
            .dispatch(&client, "BTC/USDT", OrderType::Market, Side::Buy, dec!(1), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ExchangeRejected(msg) if msg.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_missing_price_never_reaches_exchange() {
        let mut client = MockExchangeClient::new();
        client.expect_create_order().never();

        let err = OrderDispatcher::new()
            .dispatch(&client, "BTC/USDT", OrderType::StopLoss, Side::Sell, dec!(1), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingPrice(OrderType::StopLoss)));
    }
}
