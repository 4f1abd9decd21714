//! Advisory prompt construction via `minijinja`.
//!
//! The system instruction is fixed: it constrains the model to a short,
//! structured first-aid message with a mandated opening and disclaimer.
//! Only the user context is templated (coordinates and an optional
//! free-text situation note).

use lifesync_types::Coordinate;
use minijinja::Environment;
use serde::Serialize;

use crate::error::AdvisorError;

/// Fixed system instruction constraining the advisory output.
pub const SYSTEM_INSTRUCTION: &str = "You are a first-aid assistant. Provide 4 short, \
    life-saving bullet points for a medical emergency. Start with 'Help is on the way.' \
    End with 'Disclaimer: Not a substitute for professional help.'";

/// User-context template rendered per SOS trigger.
const CONTEXT_TEMPLATE: &str = "General medical emergency\
{% if location %} at {{ location.lat }}, {{ location.lng }}{% else %} at my location{% endif %}.\
{% if details %} Situation: {{ details }}{% endif %}";

/// Context for one advisory request. Ephemeral: scoped to a single SOS
/// trigger, never persisted, and unrelated to the incident record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdviceContext {
    /// Location fix, if one was already available at trigger time.
    pub location: Option<Coordinate>,
    /// Optional free-text note from the reporter.
    pub details: Option<String>,
}

/// The complete rendered prompt ready to send to a backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// Fixed system instruction.
    pub system: String,
    /// Rendered user context.
    pub user: String,
}

/// Renders the advisory prompt for a trigger context.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Create the engine with the built-in context template.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Template`] if the built-in template fails
    /// to compile.
    pub fn new() -> Result<Self, AdvisorError> {
        let mut env = Environment::new();
        env.add_template("context", CONTEXT_TEMPLATE)
            .map_err(|e| AdvisorError::Template(format!("failed to add context template: {e}")))?;
        Ok(Self { env })
    }

    /// Render the full prompt for one advisory request.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Template`] if rendering fails.
    pub fn render(&self, context: &AdviceContext) -> Result<RenderedPrompt, AdvisorError> {
        let user = self
            .env
            .get_template("context")
            .map_err(|e| AdvisorError::Template(format!("missing context template: {e}")))?
            .render(context)
            .map_err(|e| AdvisorError::Template(format!("context render failed: {e}")))?;

        Ok(RenderedPrompt {
            system: SYSTEM_INSTRUCTION.to_owned(),
            user,
        })
    }
}
