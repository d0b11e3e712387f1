use arc_swap::ArcSwap;
use marketfeed_core::{
    AtrData, FeatureNames, IndicatorSnapshot, OhlcvBar, PerformanceData, PositionData, Prediction,
    TargetValue, Topic, TradingRules,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::application::{ClientConfig, Command, ConnectionManager, FeedState, FeedView};
use crate::domain::{Availability, ConnectionState, ConnectionStatus, FeedNotice, FeedTransport};
use crate::error::ClientError;

/// Consumer-facing market data client
///
/// Cheap to query from any thread: readers copy out of shared state and
/// never wait on the connection. Commands are queued to the controller task
/// and return immediately.
pub struct MarketDataClient {
    commands: mpsc::UnboundedSender<Command>,
    view: FeedView,
    status: Arc<ArcSwap<ConnectionStatus>>,
    notices: broadcast::Sender<FeedNotice>,
    task: Option<JoinHandle<()>>,
}

impl MarketDataClient {
    /// Start the controller task on the current tokio runtime
    pub fn spawn<T: FeedTransport>(config: ClientConfig, transport: T) -> Self {
        let (manager, handles) = ConnectionManager::new(config, transport);
        let task = tokio::spawn(manager.run());
        MarketDataClient {
            commands: handles.commands,
            view: handles.view,
            status: handles.status,
            notices: handles.notices,
            task: Some(task),
        }
    }

    fn command(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::ChannelClosed)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Open the connection; no-op while open or connecting
    pub fn connect(&self) -> Result<(), ClientError> {
        self.command(Command::Connect)
    }

    /// Close the connection and suppress reconnects until `connect()`
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.command(Command::Disconnect)
    }

    pub fn subscribe(&self, topics: &[Topic]) -> Result<(), ClientError> {
        self.command(Command::Subscribe(topics.to_vec()))
    }

    pub fn unsubscribe(&self, topics: &[Topic]) -> Result<(), ClientError> {
        self.command(Command::Unsubscribe(topics.to_vec()))
    }

    /// Ask for a fresh snapshot; an empty slice means every subscribed topic
    pub fn request_resync(&self, topics: &[Topic]) -> Result<(), ClientError> {
        self.command(Command::Resync(topics.to_vec()))
    }

    /// Stop the controller and wait for it to release the connection
    pub async fn shutdown(mut self) -> Result<(), ClientError> {
        // The controller may already be gone
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            task.await.map_err(|e| ClientError::Task(e.to_string()))?;
        }
        Ok(())
    }

    // ========================================================================
    // Connection
    // ========================================================================

    pub fn status(&self) -> ConnectionStatus {
        self.status.load().as_ref().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.status.load().state
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_open()
    }

    /// Most recent error; cleared by the next successful frame
    pub fn last_error(&self) -> Option<String> {
        self.status.load().last_error.clone()
    }

    pub fn snapshot_received(&self) -> bool {
        self.status.load().snapshot_received
    }

    pub fn availability(&self) -> Availability {
        let status = self.status.load();
        Availability::derive(
            status.state,
            self.view.has_cached_data(),
            status.last_error.is_some(),
        )
    }

    /// Subscribe to change notices. Slow receivers may observe `Lagged`.
    pub fn notices(&self) -> broadcast::Receiver<FeedNotice> {
        self.notices.subscribe()
    }

    // ========================================================================
    // Data
    // ========================================================================

    pub fn view(&self) -> FeedView {
        self.view.clone()
    }

    pub fn indicators(&self) -> Vec<IndicatorSnapshot> {
        self.view.indicators()
    }

    pub fn latest_indicator(&self) -> Option<IndicatorSnapshot> {
        self.view.latest_indicator()
    }

    pub fn ohlcv(&self) -> Vec<OhlcvBar> {
        self.view.ohlcv()
    }

    pub fn latest_ohlcv(&self) -> Option<OhlcvBar> {
        self.view.latest_ohlcv()
    }

    pub fn minute_bars(&self) -> Vec<OhlcvBar> {
        self.view.minute_bars()
    }

    pub fn predictions(&self) -> Vec<Prediction> {
        self.view.predictions()
    }

    pub fn targets(&self) -> Vec<TargetValue> {
        self.view.targets()
    }

    pub fn target(&self, model_id: &str, ts: i64) -> Option<f64> {
        self.view.target(model_id, ts)
    }

    pub fn atr(&self) -> Option<AtrData> {
        self.view.atr()
    }

    pub fn position(&self) -> Option<PositionData> {
        self.view.position()
    }

    pub fn performance(&self) -> Option<PerformanceData> {
        self.view.performance()
    }

    pub fn client_id(&self) -> Option<String> {
        self.view.client_id()
    }

    pub fn trading_rules(&self) -> Option<TradingRules> {
        self.view.trading_rules()
    }

    /// Topics the server has confirmed
    pub fn acknowledged_topics(&self) -> Vec<Topic> {
        self.view.acknowledged_topics()
    }

    pub fn feature_names(&self) -> FeatureNames {
        self.view.feature_names()
    }

    pub fn indicator_value(&self, name: &str) -> Option<f64> {
        self.view.indicator_value(name)
    }

    pub fn indicator_series(&self, name: &str) -> Vec<(i64, f64)> {
        self.view.indicator_series(name)
    }

    pub fn state(&self) -> FeedState {
        self.view.snapshot()
    }
}
