use thiserror::Error;

/// Error taxonomy for the bot fleet orchestrator.
///
/// Variants are grouped by how the caller is expected to react, not by
/// subsystem — see the handling table on each variant.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Missing config file, malformed JSON, or a DB that failed to open.
    /// Fatal to the affected subsystem; the tick loop still runs for
    /// whatever did initialise.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    /// UDP query timeout or LLM HTTP 5xx — reported, retried next cycle,
    /// no state mutation.
    #[error("transient I/O error: {0}")]
    TransientIo(String),

    /// Banned / invalid password / server full / attempt failed / lost.
    /// Causes the bot to reset to Disconnected.
    #[error("protocol fault: {0}")]
    ProtocolFault(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("action {action} is on cooldown")]
    Cooldown { action: String },

    #[error("invalid arguments: {0}")]
    BadArgs(String),

    #[error("bot not found: {0}")]
    BotNotFound(String),

    #[error("pickup too far: {distance:.2}m (max {max:.2}m)")]
    PickupTooFar { distance: f32, max: f32 },

    #[error("no active dialog")]
    NoActiveDialog,

    #[error("llm provider error: {0}")]
    LlmProvider(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FleetError {
    /// Short error code, used both in HTTP envelopes and in tool-result
    /// `{error:...}` payloads.
    pub fn code(&self) -> &'static str {
        match self {
            FleetError::Config(_) => "CONFIG_ERROR",
            FleetError::Database(_) => "DATABASE_ERROR",
            FleetError::TransientIo(_) => "TRANSIENT_IO",
            FleetError::ProtocolFault(_) => "PROTOCOL_FAULT",
            FleetError::Transport(_) => "TRANSPORT_ERROR",
            FleetError::UnknownTool(_) => "UNKNOWN_TOOL",
            FleetError::Cooldown { .. } => "COOLDOWN",
            FleetError::BadArgs(_) => "BAD_ARGS",
            FleetError::BotNotFound(_) => "BOT_NOT_FOUND",
            FleetError::PickupTooFar { .. } => "PICKUP_TOO_FAR",
            FleetError::NoActiveDialog => "NO_ACTIVE_DIALOG",
            FleetError::LlmProvider(_) => "LLM_PROVIDER_ERROR",
            FleetError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            FleetError::Serialization(_) => "SERIALIZATION_ERROR",
            FleetError::Io(_) => "IO_ERROR",
            FleetError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error belongs to the "tool invocation error" class that
    /// the dispatcher surfaces to the LLM as `{error:...}` rather than
    /// logging as a failure.
    pub fn is_tool_error(&self) -> bool {
        matches!(
            self,
            FleetError::UnknownTool(_)
                | FleetError::Cooldown { .. }
                | FleetError::BadArgs(_)
                | FleetError::BotNotFound(_)
                | FleetError::PickupTooFar { .. }
                | FleetError::NoActiveDialog
        )
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
