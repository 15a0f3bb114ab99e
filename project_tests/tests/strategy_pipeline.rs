use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lib_stream::core::{StreamClient, StreamConfig, Subscription};
use lib_stream::strategy::{execute_decision, OrderExecutor, PaperExecutor, StrategyContext, StrategyParams};
use project_tests::MockConnector;
use tokio::sync::mpsc;

fn all_mids(px: f64) -> String {
    format!(r#"{{"channel":"allMids","data":{{"mids":{{"HYPE":"{px}","BTC":"60000"}}}}}}"#)
}

#[tokio::test(start_paused = true)]
async fn all_mids_feed_drives_paper_orders() {
    let (connector, mut hub) = MockConnector::new();
    let client = StreamClient::with_connector(StreamConfig::default(), connector);

    let params = StrategyParams { eval_interval: Duration::ZERO, size: 2.0, ..Default::default() };
    let ctx = Arc::new(Mutex::new(StrategyContext::new(params)));
    let paper = Arc::new(PaperExecutor::new());
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    {
        let ctx = Arc::clone(&ctx);
        let executor: Arc<dyn OrderExecutor> = paper.clone();
        client.subscribe(Subscription::AllMids, move |msg| {
            let mut ctx = ctx.lock().unwrap();
            if let Some(decision) = ctx.handle_all_mids(msg, Instant::now()) {
                execute_decision(executor.as_ref(), ctx.params(), &decision)?;
                ctx.commit(&decision);
            }
            let _ = done_tx.send(());
            Ok(())
        });
    }

    let _supervisor = client.spawn().unwrap();
    let mut session = hub.next_session().await;
    session.next_sent().await;

    // Spike down opens a long, the rebound takes profit.
    for px in [100.0, 97.0, 98.5] {
        session.push(all_mids(px));
    }
    for _ in 0..3 {
        tokio::time::timeout(Duration::from_secs(1), done_rx.recv()).await.unwrap();
    }

    let orders = paper.orders();
    assert_eq!(orders.len(), 2);
    assert!(orders[0].is_buy);
    assert_eq!(orders[0].size, 2.0);
    assert!(!orders[1].is_buy);
    assert_eq!(orders[1].price, Some(98.5));
    assert!(ctx.lock().unwrap().position().is_none());
    client.shutdown();
}
