//! Alert execution: exchange clients, sizing, dispatch and the pipeline

pub mod connector;
pub mod dispatcher;
pub mod gateway;
pub mod pipeline;
pub mod quantity;

pub use connector::RestConnector;
pub use dispatcher::{dispatch_rule, DispatchRule, OrderDispatcher};
pub use gateway::ExchangeGateway;
pub use pipeline::AlertPipeline;
pub use quantity::QuantityResolver;
