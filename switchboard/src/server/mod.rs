//! Server assembly: wires the registry, queue, handler, and HTTP surface.

pub mod auth;
mod handler;
mod message_handler;
mod queue;
mod registry;
mod response;
mod routes;

pub use handler::{EchoTaskHandler, FnTaskHandler, TaskHandler};
pub use message_handler::MessageHandler;
pub use queue::{CleanupWorker, QueuedTask, TaskProcessor, TaskQueue};
pub use registry::TaskRegistry;
pub use response::ResponseSender;
pub use routes::{ServerState, QUEUE_FULL_MESSAGE};

use std::sync::{Arc, RwLock};

use a2a_types::AgentCard;
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, error, info, warn};

use crate::agent::{ChatAgent, TaskResultProcessor};
use crate::config::Config;
use crate::errors::{Result, ServerError};
use crate::observability::Metrics;
use crate::providers::ChatClient;
use crate::server::auth::{AuthExtractor, BearerAuthExtractor};
use crate::tools::Toolbox;

/// Agent card identity fields, mutable at runtime.
#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
}

/// The A2A server: a JSON-RPC endpoint backed by a task registry, a bounded
/// dispatch queue, and a pluggable task handler.
pub struct A2AServer {
    config: Config,
    agent_info: Arc<RwLock<AgentInfo>>,
    registry: Arc<TaskRegistry>,
    message_handler: Arc<MessageHandler>,
    handler: Arc<dyn TaskHandler>,
    queue: TaskQueue,
    queue_rx: Option<mpsc::Receiver<QueuedTask>>,
    auth_extractor: Option<Arc<dyn AuthExtractor>>,
    metrics: Option<Arc<Metrics>>,
    cancel: CancellationToken,
}

impl A2AServer {
    /// Starts building a server from a configuration.
    pub fn builder(config: Config) -> A2AServerBuilder {
        A2AServerBuilder::new(config)
    }

    /// The agent's capabilities and metadata, assembled at call time.
    pub fn agent_card(&self) -> AgentCard {
        self.server_state().agent_card()
    }

    pub fn set_agent_name(&self, name: impl Into<String>) {
        self.write_info(|info| info.name = name.into());
    }

    pub fn set_agent_description(&self, description: impl Into<String>) {
        self.write_info(|info| info.description = description.into());
    }

    pub fn set_agent_url(&self, url: impl Into<String>) {
        self.write_info(|info| info.url = url.into());
    }

    pub fn set_agent_version(&self, version: impl Into<String>) {
        self.write_info(|info| info.version = version.into());
    }

    fn write_info(&self, mutate: impl FnOnce(&mut AgentInfo)) {
        let mut info = self
            .agent_info
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        mutate(&mut info);
    }

    /// Replaces the task handler. Takes effect for workers spawned after the
    /// call.
    pub fn set_task_handler(&mut self, handler: Arc<dyn TaskHandler>) {
        self.handler = handler;
    }

    /// The configured task handler.
    pub fn task_handler(&self) -> Arc<dyn TaskHandler> {
        Arc::clone(&self.handler)
    }

    /// The shared task registry.
    pub fn registry(&self) -> Arc<TaskRegistry> {
        Arc::clone(&self.registry)
    }

    /// Token cancelled by [`stop`](Self::stop); background workers and the
    /// listener observe it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests a graceful shutdown: the listener stops accepting, the
    /// processor exits its dispatch loop, and in-flight handlers observe the
    /// cancellation.
    pub fn stop(&self) {
        info!("stopping A2A server");
        self.cancel.cancel();
    }

    fn server_state(&self) -> ServerState {
        ServerState {
            registry: Arc::clone(&self.registry),
            message_handler: Arc::clone(&self.message_handler),
            queue: self.queue.clone(),
            agent_info: Arc::clone(&self.agent_info),
            capabilities: self.config.capabilities.clone(),
            metrics: self.metrics.clone(),
        }
    }

    /// Builds the HTTP router with all A2A endpoints.
    pub fn router(&self) -> Router {
        let state = self.server_state();

        let mut rpc = Router::new()
            .route("/a2a", post(routes::handle_rpc))
            .with_state(state.clone());

        if let Some(extractor) = &self.auth_extractor {
            let extractor = Arc::clone(extractor);
            rpc = rpc.layer(middleware::from_fn(move |req: Request, next: Next| {
                let extractor = extractor.clone();
                async move {
                    let (mut parts, body) = req.into_parts();
                    match extractor.extract(&mut parts).await {
                        Ok(auth) => {
                            parts.extensions.insert(auth);
                            next.run(Request::from_parts(parts, body)).await
                        }
                        Err(err) => err.into_response(),
                    }
                }
            }));
        }

        Router::new()
            .route("/health", get(routes::handle_health))
            .route("/.well-known/agent.json", get(routes::handle_agent_card))
            .with_state(state)
            .merge(rpc)
            .layer(TimeoutLayer::new(self.config.server.request_timeout()))
            .layer(CorsLayer::permissive())
    }

    /// Spawns the task processor and the cleanup worker. Called by
    /// [`serve_on`](Self::serve_on); separate entry point for embedders that
    /// mount [`router`](Self::router) into their own listener.
    pub fn start_workers(&mut self) -> Result<()> {
        let rx = self.queue_rx.take().ok_or_else(|| ServerError::Internal {
            component: "server".to_string(),
            reason: "workers already started".to_string(),
        })?;

        let processor = TaskProcessor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.handler),
            rx,
            self.cancel.clone(),
            self.metrics.clone(),
        );
        tokio::spawn(processor.run());

        let cleanup = CleanupWorker::new(
            Arc::clone(&self.registry),
            self.config.queue.cleanup_interval(),
            self.cancel.clone(),
        );
        tokio::spawn(cleanup.run());

        Ok(())
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_address()).await?;
        self.serve_on(listener).await
    }

    /// Serves on an already bound listener until shutdown.
    pub async fn serve_on(mut self, listener: tokio::net::TcpListener) -> Result<()> {
        if self.config.tls.enable {
            warn!("tls material configured but termination is delegated upstream, serving plain http");
        }

        self.start_workers()?;
        self.spawn_metrics_server();

        let addr = listener.local_addr()?;
        info!(addr = %addr, agent = %self.agent_card().name, "starting A2A server");

        let router = self.router();
        let cancel = self.cancel.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("A2A server stopped");
        Ok(())
    }

    fn spawn_metrics_server(&self) {
        let Some(metrics) = self.metrics.clone() else {
            return;
        };
        let addr = self.config.metrics_address();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(&addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    error!(addr = %addr, error = %err, "failed to bind metrics listener");
                    return;
                }
            };

            info!(addr = %addr, "starting metrics server");
            let router = Router::new()
                .route("/metrics", get(handle_metrics))
                .with_state(metrics);
            if let Err(err) = axum::serve(listener, router)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
            {
                error!(error = %err, "metrics server failed");
            }
        });
    }
}

async fn handle_metrics(State(metrics): State<Arc<Metrics>>) -> String {
    metrics.export()
}

/// Builder assembling an [`A2AServer`] from its collaborators.
pub struct A2AServerBuilder {
    config: Config,
    handler: Option<Arc<dyn TaskHandler>>,
    chat_client: Option<Arc<dyn ChatClient>>,
    toolbox: Option<Toolbox>,
    auth_extractor: Option<Arc<dyn AuthExtractor>>,
    result_processor: Option<Arc<dyn TaskResultProcessor>>,
}

impl A2AServerBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            handler: None,
            chat_client: None,
            toolbox: None,
            auth_extractor: None,
            result_processor: None,
        }
    }

    /// Uses a custom task handler instead of the default echo handler.
    /// Ignored when a chat client is configured: the agent loop takes
    /// precedence.
    pub fn with_task_handler(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Drives tasks through the agent loop against this provider client.
    pub fn with_chat_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.chat_client = Some(client);
        self
    }

    /// Tools exposed to the agent loop.
    pub fn with_toolbox(mut self, toolbox: Toolbox) -> Self {
        self.toolbox = Some(toolbox);
        self
    }

    /// Custom authentication extractor for the RPC endpoint. Only consulted
    /// when `auth.enable` is set.
    pub fn with_auth_extractor(mut self, extractor: Arc<dyn AuthExtractor>) -> Self {
        self.auth_extractor = Some(extractor);
        self
    }

    /// Hook deciding whether a tool result completes a task early.
    pub fn with_result_processor(mut self, processor: Arc<dyn TaskResultProcessor>) -> Self {
        self.result_processor = Some(processor);
        self
    }

    pub fn build(self) -> Result<A2AServer> {
        let config = self.config;
        if config.debug {
            debug!("debug mode enabled");
        }

        let registry = Arc::new(TaskRegistry::new());
        let (queue, queue_rx) = TaskQueue::new(config.queue.max_size);
        let metrics = if config.telemetry.enable {
            Some(Arc::new(Metrics::new()?))
        } else {
            None
        };

        let handler: Arc<dyn TaskHandler> = match self.chat_client {
            Some(client) => {
                info!(model = %client.model_name(), "processing tasks with the agent loop");
                let toolbox = Arc::new(self.toolbox.unwrap_or_default());
                let mut agent = ChatAgent::new(client, toolbox, Arc::clone(&registry))
                    .with_config(&config.agent);
                if let Some(processor) = self.result_processor {
                    agent = agent.with_result_processor(processor);
                }
                if let Some(metrics) = &metrics {
                    agent = agent.with_metrics(Arc::clone(metrics));
                }
                Arc::new(agent)
            }
            None => self.handler.unwrap_or_else(|| Arc::new(EchoTaskHandler)),
        };

        let auth_extractor = if config.auth.enable {
            Some(self.auth_extractor.unwrap_or_else(|| {
                Arc::new(BearerAuthExtractor::new(&config.auth)) as Arc<dyn AuthExtractor>
            }))
        } else {
            warn!("authentication is disabled");
            None
        };

        let agent_info = AgentInfo {
            name: config.agent_name.clone(),
            description: config.agent_description.clone(),
            url: config.agent_url.clone(),
            version: config.agent_version.clone(),
        };

        Ok(A2AServer {
            message_handler: Arc::new(MessageHandler::new(Arc::clone(&registry))),
            agent_info: Arc::new(RwLock::new(agent_info)),
            registry,
            handler,
            queue,
            queue_rx: Some(queue_rx),
            auth_extractor,
            metrics,
            cancel: CancellationToken::new(),
            config,
        })
    }
}
