//! Live price of the sign being edited.
//!
//! The reconciler owns a background task that keeps the latest inputs
//! (pricing config, canvas, toolbar, customer, accessories) and publishes a
//! fresh [`PriceQuote`] whenever they settle:
//!
//! - canvas mutations wait for a quiet period (2 s by default); every new
//!   mutation restarts the timer
//! - loading a canvas, a new config or a material change recompute at once
//!   and cancel any pending debounce
//!
//! Dropping the [`PriceReconciler`] stops the task.

use std::time::Duration;

use signcraft_core::canvas::CanvasSnapshot;
use signcraft_core::pricing::{
    AccessoryLine, CustomerContext, PriceQuote, PricingConfig, PricingError, SignGeometry,
    SignLine, quote,
};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::session::ToolbarState;

/// Default quiet period after a canvas mutation.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

/// Something that may change the price.
#[derive(Debug, Clone)]
pub enum CanvasEvent {
    /// An object was added, modified or removed.
    Mutated(CanvasSnapshot),
    /// A canvas was opened.
    Loaded(CanvasSnapshot),
    /// New rate table from the server.
    ConfigChanged(PricingConfig),
    /// Thickness, tape, border or copies changed.
    MaterialChanged(ToolbarState),
    CustomerChanged(CustomerContext),
    AccessoriesChanged(Vec<AccessoryLine>),
}

/// Latest published price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceState {
    /// Not enough inputs yet (no config or no canvas).
    Pending,
    Ready(PriceQuote),
    Failed(PricingError),
}

impl PriceState {
    #[must_use]
    pub const fn quote(&self) -> Option<&PriceQuote> {
        match self {
            Self::Ready(quote) => Some(quote),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("price reconciler has stopped")]
    Closed,
}

/// Everything the price depends on.
#[derive(Debug, Clone)]
pub struct PricingInputs {
    pub config: Option<PricingConfig>,
    pub canvas: Option<CanvasSnapshot>,
    pub toolbar: ToolbarState,
    pub customer: CustomerContext,
    pub accessories: Vec<AccessoryLine>,
}

impl PricingInputs {
    #[must_use]
    pub fn new(customer: CustomerContext) -> Self {
        Self {
            config: None,
            canvas: None,
            toolbar: ToolbarState::default(),
            customer,
            accessories: Vec::new(),
        }
    }

    /// Price the current canvas.
    #[must_use]
    pub fn evaluate(&self) -> PriceState {
        let (Some(config), Some(canvas)) = (&self.config, &self.canvas) else {
            return PriceState::Pending;
        };
        let result = SignGeometry::from_canvas(canvas, self.toolbar.thickness_mm, self.toolbar.tape)
            .and_then(|mut geometry| {
                geometry.border |= self.toolbar.border;
                let line = SignLine {
                    geometry,
                    copies: self.toolbar.copies,
                };
                quote(&[line], &self.accessories, config, &self.customer)
            });
        match result {
            Ok(quote) => PriceState::Ready(quote),
            Err(e) => PriceState::Failed(e),
        }
    }
}

/// Handle to the background pricing task.
#[derive(Debug)]
pub struct PriceReconciler {
    events: mpsc::UnboundedSender<CanvasEvent>,
    prices: watch::Receiver<PriceState>,
    task: JoinHandle<()>,
}

impl PriceReconciler {
    /// Start the task. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn spawn(inputs: PricingInputs, debounce: Duration) -> Self {
        let initial = inputs.evaluate();
        let (events, rx) = mpsc::unbounded_channel();
        let (tx, prices) = watch::channel(initial);
        let task = tokio::spawn(run(inputs, debounce, rx, tx));
        Self {
            events,
            prices,
            task,
        }
    }

    /// Feed an event to the task.
    ///
    /// # Errors
    ///
    /// Returns `ReconcilerError::Closed` if the task is gone.
    pub fn notify(&self, event: CanvasEvent) -> Result<(), ReconcilerError> {
        self.events.send(event).map_err(|_| ReconcilerError::Closed)
    }

    /// Receiver for price updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PriceState> {
        self.prices.clone()
    }

    /// Most recently published price.
    #[must_use]
    pub fn current(&self) -> PriceState {
        self.prices.borrow().clone()
    }
}

impl Drop for PriceReconciler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut inputs: PricingInputs,
    debounce: Duration,
    mut events: mpsc::UnboundedReceiver<CanvasEvent>,
    prices: watch::Sender<PriceState>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let timer = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if let CanvasEvent::Mutated(canvas) = event {
                    inputs.canvas = Some(canvas);
                    deadline = Some(Instant::now() + debounce);
                    continue;
                }
                apply(&mut inputs, event);
                deadline = None;
            }
            () = timer => {
                deadline = None;
            }
        }

        let state = inputs.evaluate();
        if let PriceState::Failed(e) = &state {
            tracing::debug!(error = %e, "Price recomputation failed");
        }
        prices.send_replace(state);
    }

    tracing::debug!("Price reconciler stopped");
}

fn apply(inputs: &mut PricingInputs, event: CanvasEvent) {
    match event {
        CanvasEvent::Mutated(canvas) | CanvasEvent::Loaded(canvas) => inputs.canvas = Some(canvas),
        CanvasEvent::ConfigChanged(config) => inputs.config = Some(config),
        CanvasEvent::MaterialChanged(toolbar) => inputs.toolbar = toolbar,
        CanvasEvent::CustomerChanged(customer) => inputs.customer = customer,
        CanvasEvent::AccessoriesChanged(accessories) => inputs.accessories = accessories,
    }
}
