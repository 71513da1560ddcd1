use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Diagnostic severity. Semantic errors drop the affected construct but
/// never abort the compile; warnings are purely informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A single reported problem, with an optional source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: Option<usize>,
    pub col: Option<usize>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match (self.line, self.col) {
            (Some(line), Some(col)) => write!(f, "{}[{}:{}]: {}", label, line, col, self.message),
            (Some(line), None) => write!(f, "{}[{}]: {}", label, line, self.message),
            _ => write!(f, "{}: {}", label, self.message),
        }
    }
}

/// Collecting sink for semantic errors and warnings.
///
/// Whether any reported error aborts the whole compile is the driver's
/// policy; the evaluator only reports and keeps going.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn semantic_error(&mut self, message: impl Into<String>) {
        self.semantic_error_at(message, None, None);
    }

    pub fn semantic_error_at(
        &mut self,
        message: impl Into<String>,
        line: Option<usize>,
        col: Option<usize>,
    ) {
        let message = message.into();
        warn!(line, col, "semantic error: {}", message);
        self.errors += 1;
        self.items.push(Diagnostic {
            severity: Severity::Error,
            message,
            line,
            col,
        });
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warning_at(message, None, None);
    }

    pub fn warning_at(
        &mut self,
        message: impl Into<String>,
        line: Option<usize>,
        col: Option<usize>,
    ) {
        let message = message.into();
        debug!(line, col, "warning: {}", message);
        self.warnings += 1;
        self.items.push(Diagnostic {
            severity: Severity::Warning,
            message,
            line,
            col,
        });
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }

    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }
}
