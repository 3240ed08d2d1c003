//! Streams a scripted conversation through the full client stack.
//!
//! Uses the mock transport so it runs offline; swap in `HttpTransport` and
//! an endpoint URL to talk to a real server.

use std::io::Write;
use std::sync::Arc;

use overture::client::mock::sse_body;
use overture::prelude::*;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let body = sse_body(&[
        ("response.output_text.delta", r#"{"delta":"The capital "}"#),
        ("response.output_text.delta", r#"{"delta":"of France "}"#),
        ("response.output_text.delta", r#"{"delta":"is Paris."}"#),
        (
            "response.completed",
            r#"{"response":{"id":"resp_demo","output":[{"type":"message","content":[{"type":"output_text","text":"The capital of France is Paris."}]}],"usage":{"input_tokens":9,"output_tokens":8,"total_tokens":17}}}"#,
        ),
    ]);
    let transport = Arc::new(MockTransport::new().stream(body));
    let fetcher = ChatFetcher::new(transport, Arc::new(ResponsesSerializer::new()));

    let opts = FetchOptions::new(
        "model-x",
        vec![ChatMessage::user("What is the capital of France?")],
    )
    .on_delta(Arc::new(|accumulated, _, _| {
        print!("\r{accumulated}");
        let _ = std::io::stdout().flush();
    }));

    let response = fetcher.fetch_one(opts, &CancellationToken::new()).await;
    println!();

    match response {
        ChatResponse::Success { usage, .. } => {
            if let Some(usage) = usage {
                println!("({} tokens total)", usage.total_tokens);
            }
        }
        other => anyhow::bail!("fetch failed: {other:?}"),
    }
    Ok(())
}
