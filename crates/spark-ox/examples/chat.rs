use futures_util::StreamExt;
use spark_ox::{ChatRequest, Spark};
use std::io::Write;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let spark = Spark::load_from_env()?;
    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Introduce yourself in one sentence.".to_string());

    let request = ChatRequest::builder()
        .system("You are a concise assistant.")
        .user(prompt)
        .build();

    println!("Streaming from {} ({})", spark.base_url(), spark.domain());
    let mut stream = spark.stream(&request);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for choice in chunk.choices {
            print!("{}", choice.delta.content);
        }
        std::io::stdout().flush()?;
    }
    println!();

    let completion = spark.send(&request).await?;
    println!("Aggregated: {}", completion.content());
    if let Some(usage) = completion.usage {
        println!(
            "Tokens: {} prompt, {} completion, {} total",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }

    Ok(())
}
