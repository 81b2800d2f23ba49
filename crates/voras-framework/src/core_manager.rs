//! Built-in statements
//!
//! | Keyword      | Statement                            |
//! |--------------|--------------------------------------|
//! | Then, And    | `Write to log "<text>"`              |
//! | Given, And   | `<var> is test property <name>`      |
//! | Then, And    | `<var> is "<text>"`                  |
//!
//! Test properties are read from the CPS `test` namespace.

use std::sync::Arc;
use tracing::info;
use voras_cps::ConfigurationPropertyService;
use voras_gherkin::{GherkinManager, PatternError, StatementRegistry, StepContext, StepError, StepKeyword};

/// Manager name used in diagnostics
pub const CORE_MANAGER: &str = "core";

/// CPS namespace holding test properties
pub const TEST_NAMESPACE: &str = "test";

/// Manager providing logging, test properties and assertions
#[derive(Debug, Clone)]
pub struct CoreManager {
    properties: Arc<ConfigurationPropertyService>,
}

impl CoreManager {
    /// Create over the `test` namespace view
    #[must_use]
    pub fn new(properties: ConfigurationPropertyService) -> Self {
        Self {
            properties: Arc::new(properties),
        }
    }
}

impl GherkinManager for CoreManager {
    fn name(&self) -> &str {
        CORE_MANAGER
    }

    fn register_statements(&self, registry: &mut StatementRegistry) -> Result<(), PatternError> {
        registry.register_all(
            CORE_MANAGER,
            &[StepKeyword::Then, StepKeyword::And],
            r#"Write to log "(.*)""#,
            Arc::new(|ctx: &mut StepContext<'_>| -> Result<(), StepError> {
                let message = ctx.capture(0)?;
                info!(line = ctx.step.line, message, "feature log");
                Ok(())
            }),
        )?;

        let properties = Arc::clone(&self.properties);
        registry.register_all(
            CORE_MANAGER,
            &[StepKeyword::Given, StepKeyword::And],
            r"(\w+) is test property ([\w.\-]+)",
            Arc::new(move |ctx: &mut StepContext<'_>| -> Result<(), StepError> {
                let variable = ctx.capture(0)?.to_string();
                let name = ctx.capture(1)?.to_string();
                let value = properties
                    .get_property_by_name(&name)
                    .map_err(|e| StepError::manager(e.to_string()))?
                    .ok_or_else(|| StepError::failed(format!("test property '{name}' is not set")))?;
                ctx.variables.set(variable, value);
                Ok(())
            }),
        )?;

        registry.register_all(
            CORE_MANAGER,
            &[StepKeyword::Then, StepKeyword::And],
            r#"(\w+) is "(.*)""#,
            Arc::new(|ctx: &mut StepContext<'_>| -> Result<(), StepError> {
                let variable = ctx.capture(0)?;
                let expected = ctx.capture(1)?;
                match ctx.variables.get(variable) {
                    Some(actual) if actual == expected => Ok(()),
                    Some(actual) => Err(StepError::failed(format!(
                        "{variable} is '{actual}', expected '{expected}'"
                    ))),
                    None => Err(StepError::failed(format!("variable '{variable}' is not set"))),
                }
            }),
        )
    }
}
