#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(clippy::pedantic, clippy::unwrap_used)]

//! Spark chat API client for Rust
//!
//! Spark serves chat completions over a signed WebSocket. This crate signs the
//! connection URL, encodes requests into Spark's frame format, decodes the
//! streamed answer and re-exposes it in OpenAI's shapes:
//! - an aggregated `chat.completion` object ([`Spark::send`])
//! - typed `chat.completion.chunk` deltas ([`Spark::stream`])
//! - ready-to-forward server-sent event lines ([`Spark::stream_sse`])
//!
//! # Example
//!
//! ```rust,no_run
//! use spark_ox::{ChatRequest, Model, Spark};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let spark = Spark::new("app-id", "api-key", "api-secret", Model::Max);
//!
//!     let request = ChatRequest::builder()
//!         .user("Hello, world!")
//!         .build();
//!
//!     let completion = spark.send(&request).await?;
//!     println!("{}", completion.content());
//!
//!     Ok(())
//! }
//! ```

pub mod accumulator;
pub mod auth;
pub mod client;
pub mod error;
pub mod frame;
pub mod message;
pub mod model;
pub mod request;
pub mod response;
pub mod session;
pub mod tool;
pub mod usage;

// Re-export main types
pub use accumulator::Accumulator;
pub use auth::SignedEndpoint;
pub use client::Spark;
pub use error::SparkRequestError;
pub use frame::{Status, StreamFrame};
pub use message::{Message, Role};
pub use model::Model;
pub use request::ChatRequest;
pub use response::{ChatCompletion, ChatCompletionChunk, DONE_EVENT};
pub use session::SparkSession;
pub use tool::Function;
pub use usage::Usage;
