//! Error kinds for the module manager core (spec §7).
//!
//! Every variant here corresponds to one "Kind" from the specification.
//! `source()` chains are preserved end to end so a host can print the full
//! causal chain on a fatal error.

use crate::id::ModuleId;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed requirement {input:?} at position {pos}: {message}")]
    BadRequirementSyntax {
        input: String,
        pos: usize,
        message: String,
    },

    #[error("no candidate satisfies requirement {requirement}")]
    NoCandidate { requirement: String },

    #[error("requirement {requirement} matched {count} candidates, expected exactly one")]
    NotUnique { requirement: String, count: usize },

    #[error("could not resolve dependency {requirement} of {module}")]
    UnresolvableDependency {
        module: ModuleId,
        requirement: String,
        #[source]
        cause: Option<Box<Error>>,
    },

    #[error("artifact {name} is unreadable")]
    ArtifactUnreadable {
        name: String,
        #[source]
        cause: BoxError,
    },

    #[error("activation of {module} failed")]
    ActivationFailed {
        module: ModuleId,
        #[source]
        cause: BoxError,
    },

    #[error("deactivation of {module} failed")]
    DeactivationFailed {
        module: ModuleId,
        #[source]
        cause: BoxError,
    },

    #[error("no entry point {procedure:?} in {class:?}")]
    NoEntryPoint {
        class: Option<String>,
        procedure: String,
    },

    #[error("entry point invocation failed")]
    InvocationFailed {
        #[source]
        cause: BoxError,
    },
}

impl Error {
    /// Wrap an invocation failure, unwrapping one level if `cause` is itself
    /// an `InvocationFailed` (spec §4.G).
    pub fn invocation_failed(cause: BoxError) -> Self {
        let cause = match cause.downcast::<Error>() {
            Ok(boxed) => match *boxed {
                Error::InvocationFailed { cause } => cause,
                other => Box::new(other) as BoxError,
            },
            Err(cause) => cause,
        };
        Error::InvocationFailed { cause }
    }

    /// Render the one-line summary followed by the indented causal chain,
    /// as required by spec §7's "User-visible behavior".
    pub fn render_chain(&self) -> String {
        let mut out = format!("{self}");
        let mut indent = 1;
        let mut src: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(self);
        while let Some(cause) = src {
            out.push('\n');
            out.push_str(&"  ".repeat(indent));
            out.push_str(&cause.to_string());
            src = cause.source();
            indent += 1;
        }
        out
    }
}
