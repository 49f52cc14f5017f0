//! Tera-backed template compiler.

use ::tera::{Context as TeraContext, Tera};

use super::{Compiler, Executable, RenderContext};
use crate::core::{DispatchError, SourceIdentity};

/// Compiles each source into its own [`Tera`] instance.
///
/// Autoescaping follows the identity's extension (`.html`, `.htm`, `.xml`),
/// so the same rules apply whether a page is reached directly or through an
/// alias.
#[derive(Debug, Clone, Default)]
pub struct TeraCompiler;

impl TeraCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Compiler for TeraCompiler {
    fn compile(
        &self,
        identity: &SourceIdentity,
        source: &str,
    ) -> Result<Box<dyn Executable>, DispatchError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html", ".htm", ".xml"]);
        tera.add_raw_template(identity.as_str(), source).map_err(|e| DispatchError::Compile {
            identity: identity.to_string(),
            reason: format_tera_error(&e),
        })?;

        tracing::debug!(target: "compiler", "Compiled {} ({} bytes)", identity, source.len());

        Ok(Box::new(TeraTemplate {
            name: identity.to_string(),
            tera,
        }))
    }
}

struct TeraTemplate {
    name: String,
    tera: Tera,
}

impl Executable for TeraTemplate {
    fn execute(&self, context: &RenderContext) -> Result<String, DispatchError> {
        let tera_context = TeraContext::from_serialize(context).map_err(|e| DispatchError::Execution {
            identity: self.name.clone(),
            reason: format_tera_error(&e),
        })?;

        self.tera.render(&self.name, &tera_context).map_err(|e| DispatchError::Execution {
            identity: self.name.clone(),
            reason: format_tera_error(&e),
        })
    }
}

/// Flatten a Tera error and its causes into one line.
fn format_tera_error(error: &::tera::Error) -> String {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current: Option<&dyn Error> = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }
    messages.join(": ")
}
