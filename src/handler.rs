//! Request handlers and the dispatch step.

use tracing::{debug, warn};

use crate::core::{Context, Outcome, Result};
use crate::emit::{Emission, Emitter, Transport};

/// Application code answering one request.
///
/// Any `Fn(&mut Context) -> Outcome` is a handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: &mut Context) -> Outcome;
}

impl<F> Handler for F
where
    F: Fn(&mut Context) -> Outcome + Send + Sync + 'static,
{
    #[inline]
    fn call(&self, ctx: &mut Context) -> Outcome {
        self(ctx)
    }
}

/// Result of dispatching one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatched {
    /// Whether the handler stopped early through a terminate call.
    pub halted: bool,
    /// The emission, unless the handler already sent the response itself.
    pub emission: Option<Emission>,
}

/// Run `handler` and emit its response exactly once.
///
/// A halted handler is emitted like a completed one; nothing after the
/// terminate call ran.
pub fn dispatch<H: Handler + ?Sized>(
    handler: &H,
    ctx: &mut Context,
    emitter: &Emitter,
    transport: &mut dyn Transport,
) -> Result<Dispatched> {
    let halted = match handler.call(ctx) {
        Ok(()) => false,
        Err(halt) => {
            debug!(request_id = %ctx.request_id, status = halt.status(), "Handler halted");
            true
        }
    };

    if let Some(res) = ctx.peek_response() {
        for warning in res.warnings() {
            warn!(request_id = %ctx.request_id, "{}", warning);
        }
    }

    let emission = ctx.send(emitter, transport)?;
    Ok(Dispatched { halted, emission })
}
