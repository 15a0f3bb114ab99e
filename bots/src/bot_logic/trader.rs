use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use lib_stream::core::WsMsg;
use lib_stream::strategy::{execute_decision, OrderExecutor, StrategyContext};

/// Callback for the `allMids` subscription: evaluate, trade, then commit the decision.
pub fn all_mids_handler(
    ctx: Arc<Mutex<StrategyContext>>,
    executor: Arc<dyn OrderExecutor>,
) -> impl Fn(&WsMsg) -> anyhow::Result<()> + Send + Sync + 'static {
    move |msg: &WsMsg| {
        let mut ctx = ctx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(decision) = ctx.handle_all_mids(msg, Instant::now()) {
            // A failed order leaves the context as it was.
            execute_decision(executor.as_ref(), ctx.params(), &decision)?;
            ctx.commit(&decision);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_stream::strategy::{OrderError, OrderStatus, PaperExecutor, StrategyParams};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Paper executor whose orders fail while `down` is set.
    #[derive(Default)]
    struct FlakyExecutor {
        down: AtomicBool,
        paper: PaperExecutor,
    }

    impl OrderExecutor for FlakyExecutor {
        fn place_market_order(
            &self,
            coin: &str,
            is_buy: bool,
            size: f64,
        ) -> Result<Vec<OrderStatus>, OrderError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(OrderError::Transport("venue unreachable".into()));
            }
            self.paper.place_market_order(coin, is_buy, size)
        }

        fn observe_price(&self, coin: &str, price: f64) {
            self.paper.observe_price(coin, price);
        }
    }

    fn fast_ctx() -> Arc<Mutex<StrategyContext>> {
        let params = StrategyParams { eval_interval: Duration::ZERO, ..Default::default() };
        Arc::new(Mutex::new(StrategyContext::new(params)))
    }

    fn mids(px: &str) -> WsMsg {
        WsMsg::parse(&format!(r#"{{"channel":"allMids","data":{{"mids":{{"HYPE":"{px}"}}}}}}"#)).unwrap()
    }

    #[test]
    fn spike_and_exit_reach_the_executor() {
        let ctx = fast_ctx();
        let paper = Arc::new(PaperExecutor::new());
        let handler = all_mids_handler(Arc::clone(&ctx), paper.clone());

        for px in ["100", "97", "98.5"] {
            handler(&mids(px)).unwrap();
        }

        let orders = paper.orders();
        assert_eq!(orders.len(), 2);
        assert!(orders[0].is_buy);
        assert_eq!(orders[0].price, Some(97.0));
        assert!(!orders[1].is_buy);
        assert!(ctx.lock().unwrap().position().is_none());
    }

    #[test]
    fn failed_entry_order_opens_nothing() {
        let ctx = fast_ctx();
        let executor = Arc::new(FlakyExecutor::default());
        executor.down.store(true, Ordering::SeqCst);
        let handler = all_mids_handler(Arc::clone(&ctx), executor.clone());

        handler(&mids("100")).unwrap();
        assert!(handler(&mids("97")).is_err());
        assert!(ctx.lock().unwrap().position().is_none());
        assert!(executor.paper.orders().is_empty());
    }

    #[test]
    fn failed_exit_order_keeps_the_position() {
        let ctx = fast_ctx();
        let executor = Arc::new(FlakyExecutor::default());
        let handler = all_mids_handler(Arc::clone(&ctx), executor.clone());

        handler(&mids("100")).unwrap();
        handler(&mids("97")).unwrap();
        assert_eq!(ctx.lock().unwrap().position().map(|p| p.entry_price), Some(97.0));

        executor.down.store(true, Ordering::SeqCst);
        assert!(handler(&mids("98.5")).is_err());
        assert!(ctx.lock().unwrap().position().is_some());

        // The exit is retried on the next evaluation once the venue is back.
        executor.down.store(false, Ordering::SeqCst);
        handler(&mids("98.5")).unwrap();
        assert!(ctx.lock().unwrap().position().is_none());
        assert_eq!(executor.paper.orders().len(), 2);
    }
}
