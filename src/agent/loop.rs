//! Agent loop implementation.
//!
//! The core turn engine: consumes inbound messages from the bus, calls
//! the LLM provider, executes tool calls up to the iteration cap, and
//! publishes the final reply. One turn runs at a time; the loop holds a
//! single turn lock so session and memory writes never interleave.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::bus::{InboundMessage, MessageBus, OutboundMessage};
use crate::config::Config;
use crate::error::Result;
use crate::memory::MemoryStore;
use crate::providers::{ChatOptions, LLMProvider};
use crate::session::{Session, SessionManager, SessionMessage};
use crate::tools::{MessageTool, ShellTool, SpawnTool, Tool, ToolContext, ToolRegistry};

use super::context::ContextBuilder;
use super::directives::{extract_memory_block, normalize_memory_lines, strip_memory_block};

/// Inbound metadata key an adapter sets when its channel can render a
/// typing indicator.
pub const METADATA_SUPPORTS_TYPING: &str = "supports_typing";

/// Reset command prefix. `/new` alone clears the session; `/new <text>`
/// clears it and processes `<text>` as the first message.
const RESET_PREFIX: &str = "/new";

/// Acknowledgment for a bare `/new`, sent without a model call.
const RESET_ACK: &str = "New session created. Send your next message to begin.";

/// Fallback reply when a channel turn ends with no model text.
const EMPTY_REPLY_FALLBACK: &str = "I've completed processing but have no response to give.";

/// Fallback for system-triggered and direct turns.
const BACKGROUND_FALLBACK: &str = "Background task completed.";

/// Origin channel assumed for system messages whose chat_id carries no
/// `origin_channel:` prefix.
const DEFAULT_ORIGIN_CHANNEL: &str = "cli";

/// The main agent loop that processes messages and coordinates with the
/// LLM provider.
///
/// Responsibilities:
/// - consuming inbound messages from the bus
/// - building conversation context with session history and memory
/// - driving the model/tool iteration loop
/// - publishing replies back to the bus
pub struct AgentLoop {
    /// Agent configuration
    config: Config,
    /// Message bus for input/output
    bus: Arc<MessageBus>,
    /// The LLM provider
    provider: Arc<dyn LLMProvider>,
    /// Session manager for conversation state
    sessions: SessionManager,
    /// Daily/long-term memory store under the workspace
    memory: MemoryStore,
    /// Context builder for constructing provider messages
    context: ContextBuilder,
    /// Registered tools
    tools: Arc<RwLock<ToolRegistry>>,
    /// Serializes turns; session and memory writes assume it is held
    turn_lock: Mutex<()>,
    /// Whether the loop is currently running
    running: AtomicBool,
    /// Shutdown signal sender
    shutdown_tx: watch::Sender<bool>,
}

impl AgentLoop {
    /// Create a new agent loop with the default tool set (shell, spawn,
    /// message, registered in the workspace).
    ///
    /// Creates the workspace and memory directories if missing.
    pub fn new(
        config: Config,
        bus: Arc<MessageBus>,
        provider: Arc<dyn LLMProvider>,
        sessions: SessionManager,
    ) -> Result<Self> {
        let workspace = config.workspace_path();
        std::fs::create_dir_all(&workspace)?;
        let memory = MemoryStore::new(&workspace)?;
        let context = ContextBuilder::new(workspace.clone(), memory.clone());

        let mut tools = ToolRegistry::new();
        tools.register(Box::new(ShellTool::new(workspace.clone())));
        tools.register(Box::new(SpawnTool::new(workspace)));
        tools.register(Box::new(MessageTool::new(bus.clone())));

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            bus,
            provider,
            sessions,
            memory,
            context,
            tools: Arc::new(RwLock::new(tools)),
            turn_lock: Mutex::new(()),
            running: AtomicBool::new(false),
            shutdown_tx,
        })
    }

    /// Replace the context builder (custom skills summary, test fixtures).
    pub fn with_context_builder(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    /// Register an additional tool.
    pub async fn register_tool(&self, tool: Box<dyn Tool>) {
        let mut tools = self.tools.write().await;
        tools.register(tool);
    }

    /// Number of registered tools.
    pub async fn tool_count(&self) -> usize {
        self.tools.read().await.len()
    }

    /// Whether a tool with the given name is registered.
    pub async fn has_tool(&self, name: &str) -> bool {
        self.tools.read().await.has(name)
    }

    /// Whether the loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get a reference to the session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Get a reference to the message bus.
    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Run the loop until [`stop`](Self::stop) is called or the inbound
    /// channel closes.
    ///
    /// Messages on the `"system"` channel take the synthetic-origin
    /// path; everything else is a normal channel turn. Any error that
    /// escapes a turn is converted here into an apology reply so the
    /// loop itself never dies to a bad turn.
    pub async fn run(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Agent loop already running");
            return;
        }
        info!("Starting agent loop");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let _ = *shutdown_rx.borrow_and_update();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Received shutdown signal");
                        break;
                    }
                }
                msg = self.bus.consume_inbound() => {
                    let Some(msg) = msg else {
                        info!("Inbound channel closed");
                        break;
                    };
                    self.handle_inbound(msg).await;
                }
            }

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Agent loop stopped");
    }

    /// Signal the loop to stop after the current turn.
    pub fn stop(&self) {
        info!("Stopping agent loop");
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);
    }

    /// Process one inbound message and publish whatever it produces.
    async fn handle_inbound(&self, msg: InboundMessage) {
        let request_id = uuid::Uuid::new_v4();
        info!(
            request_id = %request_id,
            channel = %msg.channel,
            chat_id = %msg.chat_id,
            content_len = msg.content.len(),
            "Processing message"
        );
        let start = std::time::Instant::now();

        let result = if msg.channel == "system" {
            self.process_system_message(&msg).await
        } else {
            self.process_message(&msg).await
        };

        let outbound = match result {
            Ok(outbound) => outbound,
            Err(e) => {
                error!(error = %e, channel = %msg.channel, "Turn failed");
                Some(OutboundMessage::new(
                    &msg.channel,
                    &msg.chat_id,
                    &format!("Sorry, I encountered an error: {}", e),
                ))
            }
        };

        info!(
            request_id = %request_id,
            latency_ms = start.elapsed().as_millis() as u64,
            replied = outbound.is_some(),
            "Turn completed"
        );

        if let Some(outbound) = outbound {
            if let Err(e) = self.bus.publish_outbound(outbound).await {
                error!(error = %e, "Failed to publish outbound message");
            }
        }
    }

    /// Process a normal channel message.
    ///
    /// Returns `None` when the model already delivered its reply via
    /// the `message` tool.
    pub async fn process_message(&self, msg: &InboundMessage) -> Result<Option<OutboundMessage>> {
        let _guard = self.turn_lock.lock().await;

        if msg
            .metadata
            .get(METADATA_SUPPORTS_TYPING)
            .is_some_and(|v| v == "true")
        {
            let typing = OutboundMessage::typing(&msg.channel, &msg.chat_id);
            self.bus.publish_outbound(typing).await.ok();
        }

        let session_key = msg.session_key();
        let mut content = msg.content.clone();
        if let Some(rest) = content.strip_prefix(RESET_PREFIX) {
            self.sessions.delete(&session_key).await?;
            content = rest.trim_start().to_string();
            if content.is_empty() {
                return Ok(Some(OutboundMessage::new(
                    &msg.channel,
                    &msg.chat_id,
                    RESET_ACK,
                )));
            }
        }

        let mut session = self.sessions.get_or_create(&session_key).await?;
        let history = session.history(self.config.agent.history_limit);
        let messages = self.context.build_messages(history, &content, &msg.media);
        let ctx = ToolContext::new()
            .with_channel(&msg.channel, &msg.chat_id)
            .with_session_key(&session_key);

        let (final_content, message_sent) =
            self.run_iterations(&mut session, messages, &ctx).await?;
        let final_content = if final_content.is_empty() {
            EMPTY_REPLY_FALLBACK.to_string()
        } else {
            final_content
        };

        let final_content = self
            .finish_turn(&mut session, &session_key, &content, final_content)
            .await?;

        if message_sent {
            Ok(None)
        } else {
            Ok(Some(OutboundMessage::new(
                &msg.channel,
                &msg.chat_id,
                &final_content,
            )))
        }
    }

    /// Process a system-channel message (cron fires, external triggers).
    ///
    /// The origin is encoded in `chat_id` as `origin_channel:origin_chat_id`;
    /// without a `:` the whole chat_id is taken as the chat within the
    /// default "cli" channel. The turn runs against the origin's session
    /// so the user sees its effects in context.
    pub async fn process_system_message(
        &self,
        msg: &InboundMessage,
    ) -> Result<Option<OutboundMessage>> {
        let _guard = self.turn_lock.lock().await;

        let (origin_channel, origin_chat_id) = match msg.chat_id.split_once(':') {
            Some((channel, chat_id)) => (channel.to_string(), chat_id.to_string()),
            None => (DEFAULT_ORIGIN_CHANNEL.to_string(), msg.chat_id.clone()),
        };
        let session_key = format!("{}:{}", origin_channel, origin_chat_id);
        debug!(session_key = %session_key, "Decoded system message origin");

        let mut session = self.sessions.get_or_create(&session_key).await?;
        let history = session.history(self.config.agent.history_limit);
        let messages = self.context.build_messages(history, &msg.content, &[]);
        let ctx = ToolContext::new()
            .with_channel(&origin_channel, &origin_chat_id)
            .with_session_key(&session_key);

        let (final_content, message_sent) =
            self.run_iterations(&mut session, messages, &ctx).await?;
        let final_content = if final_content.is_empty() {
            BACKGROUND_FALLBACK.to_string()
        } else {
            final_content
        };

        let user_entry = format!("[System] {}", msg.content);
        let final_content = self
            .finish_turn(&mut session, &session_key, &user_entry, final_content)
            .await?;

        if message_sent {
            Ok(None)
        } else {
            Ok(Some(OutboundMessage::new(
                &origin_channel,
                &origin_chat_id,
                &final_content,
            )))
        }
    }

    /// Drive a turn without bus I/O and return the final reply text.
    ///
    /// Used by embedders that want the engine inline (REPLs, tests,
    /// background jobs).
    pub async fn process_direct(&self, content: &str, session_key: &str) -> Result<String> {
        let _guard = self.turn_lock.lock().await;

        let mut session = self.sessions.get_or_create(session_key).await?;
        let history = session.history(self.config.agent.history_limit);
        let messages = self.context.build_messages(history, content, &[]);
        let ctx = ToolContext::new().with_session_key(session_key);

        let (final_content, _) = self.run_iterations(&mut session, messages, &ctx).await?;
        let final_content = if final_content.is_empty() {
            BACKGROUND_FALLBACK.to_string()
        } else {
            final_content
        };

        self.finish_turn(&mut session, session_key, content, final_content)
            .await
    }

    /// The model/tool iteration loop shared by every turn flavor.
    ///
    /// Alternates provider calls and tool executions until the model
    /// answers without tool calls or the iteration cap is reached.
    /// Assistant and tool messages are appended to both the outgoing
    /// message list and the session as they happen. Returns the final
    /// text (empty if the cap cut the turn short) and whether the
    /// `message` tool fired.
    async fn run_iterations(
        &self,
        session: &mut Session,
        mut messages: Vec<SessionMessage>,
        ctx: &ToolContext,
    ) -> Result<(String, bool)> {
        let model = if self.config.agent.model.is_empty() {
            self.provider.default_model().to_string()
        } else {
            self.config.agent.model.clone()
        };
        let options = ChatOptions::new()
            .with_max_tokens(self.config.agent.max_tokens)
            .with_temperature(self.config.agent.temperature);

        let mut final_content = String::new();
        let mut message_sent = false;
        let max_iterations = self.config.agent.max_iterations;

        for iteration in 1..=max_iterations {
            let definitions = {
                let tools = self.tools.read().await;
                tools.definitions()
            };

            let response = self
                .provider
                .chat(&messages, &definitions, &model, options.clone())
                .await?;

            if !response.has_tool_calls() {
                final_content = response.content;
                break;
            }

            debug!(
                iteration,
                max_iterations,
                calls = response.tool_calls.len(),
                "Executing tool batch"
            );

            let assistant =
                SessionMessage::assistant_with_tools(&response.content, response.tool_calls.clone());
            messages.push(assistant.clone());
            session.add_message(assistant);

            for call in &response.tool_calls {
                if call.name == "message" {
                    message_sent = true;
                }
                let result = {
                    let tools = self.tools.read().await;
                    tools.execute(&call.name, &call.arguments, ctx).await
                };
                messages.push(SessionMessage::tool_result(&call.id, &call.name, &result));
                session.add_tool_message(&call.id, &call.name, &result);
            }
        }

        Ok((final_content, message_sent))
    }

    /// Shared turn epilogue: pull memory directives out of the reply,
    /// record the user/assistant exchange, save the session, and append
    /// extracted memory lines. Returns the cleaned reply.
    async fn finish_turn(
        &self,
        session: &mut Session,
        session_key: &str,
        user_entry: &str,
        final_content: String,
    ) -> Result<String> {
        let memory_block = extract_memory_block(&final_content);
        let final_content = strip_memory_block(&final_content);

        session.add_message(SessionMessage::user(user_entry));
        session.add_message(SessionMessage::assistant(&final_content));
        self.sessions.save(session).await?;

        self.append_memory_entry(session_key, &memory_block)?;
        Ok(final_content)
    }

    /// Append normalized memory lines tagged with their session of origin.
    fn append_memory_entry(&self, session_key: &str, memory_block: &str) -> Result<()> {
        if memory_block.is_empty() {
            return Ok(());
        }
        let lines = normalize_memory_lines(memory_block);
        if lines.is_empty() {
            return Ok(());
        }
        let entry: String = lines
            .iter()
            .map(|line| format!("- [{}] {}\n", session_key, line))
            .collect();
        info!(session_key = %session_key, lines = lines.len(), "Recording memory entry");
        self.memory.append_today(&entry)
    }
}
