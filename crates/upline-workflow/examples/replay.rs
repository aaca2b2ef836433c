// Replay a captured job log through the pipeline and workflow.
//
// Reads one raw frame per line from stdin and prints what the operator
// would have seen. Useful for debugging noise rules against real logs:
//
//   cargo run --example replay < job-feed.log

use std::io::BufRead;
use std::sync::Arc;

use upline_contracts::RawFrame;
use upline_pipeline::PipelineConfig;
use upline_workflow::{MemorySink, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let sink = Arc::new(MemorySink::new());
    let mut session = Session::new(PipelineConfig::default(), sink.clone());

    for line in std::io::stdin().lock().lines() {
        session.handle(RawFrame::Text(line?)).await;
    }

    for record in sink.visible().await {
        println!("[{}] {} {}", record.timestamp, record.kind, record.message);
    }
    Ok(())
}
