//! ARR board: per-product and total projections rendered once per clock tick.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use arrboard_server::infrastructure::dto::realtime::event;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    domain::{
        AppSignal, ConfigGateway, FlipCell, FlipDisplay, MilestoneTracker, ProductMetric,
        Timestamp, format_currency, project, project_total,
    },
    error::GatewayError,
    infrastructure::realtime::ChannelHandle,
};

use super::{
    clock_store::{ClockStore, ClockSubscription},
    signal_bus::SignalBus,
};

/// Label of the total line
pub const TOTAL_LABEL: &str = "Total";

/// One counter line of the board
#[derive(Debug, Clone, PartialEq)]
pub struct BoardLine {
    pub label: String,
    /// `None` until the product's figures are loaded
    pub value: Option<f64>,
    pub cells: Vec<FlipCell>,
    pub month_delta: Option<f64>,
}

impl BoardLine {
    pub fn text(&self) -> String {
        self.cells.iter().map(|cell| cell.ch).collect()
    }
}

/// Everything drawn for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct BoardFrame {
    pub now: Timestamp,
    pub products: Vec<BoardLine>,
    pub total: BoardLine,
}

#[derive(Default)]
struct BoardState {
    metrics: BTreeMap<String, ProductMetric>,
    displays: BTreeMap<String, FlipDisplay>,
    total_display: FlipDisplay,
    milestones: MilestoneTracker,
}

impl BoardState {
    /// Project every product at `now`; flips mark only what changed since the last render
    fn render(&mut self, now: Timestamp) -> (BoardFrame, Option<u64>) {
        let mut products = Vec::with_capacity(self.metrics.len());
        for (product, metric) in &self.metrics {
            let display = self.displays.entry(product.clone()).or_default();
            let value = project(metric, now);
            products.push(line(product, value, Some(metric.month_delta), display));
        }

        let total = project_total(&self.metrics, now);
        let milestone = total.and_then(|total| self.milestones.observe(total));
        let total = line(TOTAL_LABEL, total, None, &mut self.total_display);

        (
            BoardFrame {
                now,
                products,
                total,
            },
            milestone,
        )
    }
}

fn line(
    label: &str,
    value: Option<f64>,
    month_delta: Option<f64>,
    display: &mut FlipDisplay,
) -> BoardLine {
    display.finish_all();
    let cells = match value {
        Some(value) => display.update(&format_currency(value)).to_vec(),
        None => Vec::new(),
    };
    BoardLine {
        label: label.to_string(),
        value,
        cells,
        month_delta,
    }
}

struct BoardShared {
    state: Mutex<BoardState>,
    signals: SignalBus,
    frame: watch::Sender<Option<BoardFrame>>,
}

impl BoardShared {
    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self, now: Timestamp) -> BoardFrame {
        let (frame, milestone) = self.state().render(now);
        if let Some(milestone) = milestone {
            tracing::info!("ARR milestone reached: {}", milestone);
            self.signals.emit(AppSignal::MilestoneReached(milestone));
        }
        self.frame.send_replace(Some(frame.clone()));
        frame
    }
}

pub struct ArrBoard {
    gateway: Arc<dyn ConfigGateway>,
    clock: ClockStore,
    config_refresh: Duration,
    shared: Arc<BoardShared>,
    subscription: Mutex<Option<ClockSubscription>>,
    refresh: Mutex<Option<JoinHandle<()>>>,
    channel: Mutex<Option<ChannelHandle>>,
}

impl ArrBoard {
    pub fn new(
        gateway: Arc<dyn ConfigGateway>,
        clock: ClockStore,
        signals: SignalBus,
        config_refresh: Duration,
    ) -> Arc<Self> {
        let (frame, _) = watch::channel(None);
        Arc::new(Self {
            gateway,
            clock,
            config_refresh,
            shared: Arc::new(BoardShared {
                state: Mutex::new(BoardState::default()),
                signals,
                frame,
            }),
            subscription: Mutex::new(None),
            refresh: Mutex::new(None),
            channel: Mutex::new(None),
        })
    }

    /// Fetch product figures and redraw; returns the number of products
    pub async fn load(&self) -> Result<usize, GatewayError> {
        let metrics = self.gateway.fetch_config().await?;
        let count = metrics.len();
        {
            let mut state = self.shared.state();
            state.displays.retain(|product, _| metrics.contains_key(product));
            state.metrics = metrics;
        }
        self.shared.tick(self.clock.current_time());
        tracing::debug!("Loaded figures for {} product(s)", count);
        Ok(count)
    }

    /// Render at `now` without waiting for a tick
    pub fn render(&self, now: Timestamp) -> BoardFrame {
        self.shared.tick(now)
    }

    /// Subscribe to the clock and refetch figures periodically
    pub fn start(self: &Arc<Self>) {
        let mut subscription = self.subscription();
        if subscription.is_none() {
            let shared = self.shared.clone();
            *subscription = Some(self.clock.subscribe(move |now| {
                shared.tick(now);
            }));
        }
        drop(subscription);

        let mut refresh = self.refresh();
        if refresh.is_none() {
            *refresh = Some(tokio::spawn(refresh_loop(
                Arc::downgrade(self),
                self.config_refresh,
            )));
        }
    }

    pub fn stop(&self) {
        self.subscription().take();
        if let Some(task) = self.refresh().take() {
            task.abort();
        }
        self.channel().take();
    }

    /// Refetch figures on `config_changed`
    pub fn bind(self: &Arc<Self>, handle: ChannelHandle) {
        let board = Arc::downgrade(self);
        handle.on(event::CONFIG_CHANGED, move |_| {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                return;
            };
            let board = board.clone();
            runtime.spawn(async move {
                if let Some(board) = board.upgrade()
                    && let Err(e) = board.load().await
                {
                    tracing::warn!("Failed to reload config: {}", e);
                }
            });
        });
        *self.channel() = Some(handle);
    }

    /// Latest rendered frame
    pub fn frames(&self) -> watch::Receiver<Option<BoardFrame>> {
        self.shared.frame.subscribe()
    }

    pub fn latest(&self) -> Option<BoardFrame> {
        self.shared.frame.borrow().clone()
    }

    fn subscription(&self) -> MutexGuard<'_, Option<ClockSubscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn channel(&self) -> MutexGuard<'_, Option<ChannelHandle>> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ArrBoard {
    fn drop(&mut self) {
        if let Some(task) = self
            .refresh
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

async fn refresh_loop(board: Weak<ArrBoard>, period: Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let Some(board) = board.upgrade() else {
            break;
        };
        if let Err(e) = board.load().await {
            tracing::warn!("Config refresh failed: {}", e);
        }
    }
}
