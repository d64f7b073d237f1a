//! Task executors: fan batches out, gather every output, in order.
//!
//! The executor is an explicitly constructed, injected collaborator chosen
//! by configuration at startup. Both implementations share one contract:
//! `run_batches` returns outputs in batch order only after **all** batches
//! have resolved, and any batch failure fails the whole call — partial
//! result sets are structurally impossible downstream.

use crate::config::ExecutorConfig;
use crate::dispatch::WorkerBatch;
use crate::errors::ResponderError;
use doc_store::SearchResult;
use futures::stream::{self, StreamExt};
use machine_reader::{OverlapBounds, SpanLogits};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use std::{future::Future, pin::Pin};
use tracing::{debug, info, trace};

/// Per-chunk model outputs for one batch, in the batch's chunk order.
pub type BatchOutput = Vec<(SpanLogits, OverlapBounds)>;

/// One unit of inference work: a question applied to a batch of chunks.
pub trait InferenceWorker: Send + Sync {
    /// Runs the model once per chunk, returning results in input order.
    fn infer<'a>(
        &'a self,
        question: &'a str,
        batch: &'a [SearchResult],
    ) -> Pin<Box<dyn Future<Output = Result<BatchOutput, ResponderError>> + Send + 'a>>;
}

/// Fan-out/fan-in boundary for one request's worker batches.
pub trait TaskExecutor: Send + Sync {
    /// Runs every batch and gathers all outputs in batch order.
    fn run_batches<'a>(
        &'a self,
        question: &'a str,
        batches: &'a [WorkerBatch],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BatchOutput>, ResponderError>> + Send + 'a>>;
}

/// Executes every batch immediately on the caller, strictly sequentially.
/// Used when distributed execution is disabled.
pub struct InlineExecutor {
    worker: Arc<dyn InferenceWorker>,
}

impl InlineExecutor {
    pub fn new(worker: Arc<dyn InferenceWorker>) -> Self {
        Self { worker }
    }
}

impl TaskExecutor for InlineExecutor {
    fn run_batches<'a>(
        &'a self,
        question: &'a str,
        batches: &'a [WorkerBatch],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BatchOutput>, ResponderError>> + Send + 'a>> {
        Box::pin(async move {
            trace!("executor::inline batches={}", batches.len());
            let mut outputs = Vec::with_capacity(batches.len());
            for batch in batches {
                outputs.push(self.worker.infer(question, batch).await?);
            }
            Ok(outputs)
        })
    }
}

/// Wire request for one batch of inference work.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InferenceCall {
    pub question: String,
    pub chunks: Vec<SearchResult>,
}

/// Wire reply: one logits/overlap pair per chunk, in call order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InferenceReply {
    pub results: Vec<(SpanLogits, OverlapBounds)>,
}

/// Transport that carries one [`InferenceCall`] to a worker and back.
pub trait WorkDispatch: Send + Sync {
    fn dispatch<'a>(
        &'a self,
        call: InferenceCall,
    ) -> Pin<Box<dyn Future<Output = Result<InferenceReply, ResponderError>> + Send + 'a>>;
}

/// Dispatches batches to a remote worker pool, bounding in-flight calls by
/// the configured worker count. Outputs are re-assembled in batch order.
pub struct ClusterExecutor {
    dispatch: Arc<dyn WorkDispatch>,
    in_flight: usize,
}

impl ClusterExecutor {
    pub fn new(dispatch: Arc<dyn WorkDispatch>, in_flight: usize) -> Self {
        Self {
            dispatch,
            in_flight: in_flight.max(1),
        }
    }
}

impl TaskExecutor for ClusterExecutor {
    fn run_batches<'a>(
        &'a self,
        question: &'a str,
        batches: &'a [WorkerBatch],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BatchOutput>, ResponderError>> + Send + 'a>> {
        Box::pin(async move {
            trace!(
                "executor::cluster batches={} in_flight={}",
                batches.len(),
                self.in_flight
            );
            // Each in-flight future owns its call outright; nothing borrowed
            // crosses the stream adapter.
            let calls: Vec<(usize, usize, InferenceCall)> = batches
                .iter()
                .enumerate()
                .map(|(i, batch)| {
                    let call = InferenceCall {
                        question: question.to_string(),
                        chunks: batch.clone(),
                    };
                    (i, batch.len(), call)
                })
                .collect();

            let results: Vec<(usize, BatchOutput)> = stream::iter(calls)
                .map(|(i, expected, call)| {
                    let dispatch = self.dispatch.clone();
                    async move {
                        let reply = dispatch.dispatch(call).await?;
                        if reply.results.len() != expected {
                            return Err(ResponderError::Internal(format!(
                                "batch {i}: {} chunk results for {expected} chunks",
                                reply.results.len()
                            )));
                        }
                        Ok::<(usize, BatchOutput), ResponderError>((i, reply.results))
                    }
                })
                .buffer_unordered(self.in_flight)
                .collect::<Vec<_>>()
                .await
                .into_iter()
                .collect::<Result<Vec<_>, ResponderError>>()?;

            let mut outputs: Vec<Option<BatchOutput>> = vec![None; batches.len()];
            for (i, output) in results {
                outputs[i] = Some(output);
            }
            outputs
                .into_iter()
                .enumerate()
                .map(|(i, output)| {
                    output.ok_or_else(|| {
                        ResponderError::Internal(format!("batch {i} produced no output"))
                    })
                })
                .collect()
        })
    }
}

/// HTTP/JSON transport posting work items to the scheduler endpoint.
pub struct HttpDispatch {
    client: reqwest::Client,
    url: String,
}

impl HttpDispatch {
    /// Builds the client for `http://{scheduler_addr}/infer`.
    ///
    /// `scheduler_addr` is `host:port`; a scheme may be supplied explicitly.
    pub fn new(scheduler_addr: &str, timeout_secs: u64) -> Result<Self, ResponderError> {
        let addr = scheduler_addr.trim();
        if addr.is_empty() {
            return Err(ResponderError::InvalidConfig(
                "scheduler address is empty".to_string(),
            ));
        }
        let base = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.trim_end_matches('/').to_string()
        } else {
            format!("http://{addr}")
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        info!("executor::http_dispatch scheduler={base}");
        Ok(Self {
            client,
            url: format!("{base}/infer"),
        })
    }
}

impl WorkDispatch for HttpDispatch {
    fn dispatch<'a>(
        &'a self,
        call: InferenceCall,
    ) -> Pin<Box<dyn Future<Output = Result<InferenceReply, ResponderError>> + Send + 'a>> {
        Box::pin(async move {
            debug!("POST {} chunks={}", self.url, call.chunks.len());
            let resp = self.client.post(&self.url).json(&call).send().await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let url = self.url.clone();
                let text = resp.text().await.unwrap_or_default();
                let snippet = text.chars().take(240).collect::<String>();
                return Err(ResponderError::Scheduler {
                    status,
                    url,
                    snippet,
                });
            }

            let reply: InferenceReply = resp.json().await?;
            Ok(reply)
        })
    }
}

/// In-process transport running the worker directly. Lets the cluster
/// executor be exercised without a network and doubles as the template for
/// a worker-pool server handler.
pub struct LoopbackDispatch {
    worker: Arc<dyn InferenceWorker>,
}

impl LoopbackDispatch {
    pub fn new(worker: Arc<dyn InferenceWorker>) -> Self {
        Self { worker }
    }
}

impl WorkDispatch for LoopbackDispatch {
    fn dispatch<'a>(
        &'a self,
        call: InferenceCall,
    ) -> Pin<Box<dyn Future<Output = Result<InferenceReply, ResponderError>> + Send + 'a>> {
        Box::pin(async move {
            let results = self.worker.infer(&call.question, &call.chunks).await?;
            Ok(InferenceReply { results })
        })
    }
}

/// Builds the executor selected by `config`: inline when distributed mode
/// is off, cluster dispatch to the configured scheduler when it is on.
pub fn executor_from_config(
    config: &ExecutorConfig,
    worker: Arc<dyn InferenceWorker>,
) -> Result<Arc<dyn TaskExecutor>, ResponderError> {
    if config.distributed {
        let dispatch = HttpDispatch::new(&config.scheduler_addr, config.dispatch_timeout_secs)?;
        info!("executor::from_config mode=distributed");
        Ok(Arc::new(ClusterExecutor::new(
            Arc::new(dispatch),
            config.workers_per_request,
        )))
    } else {
        info!("executor::from_config mode=inline");
        Ok(Arc::new(InlineExecutor::new(worker)))
    }
}
