// ABOUTME: Non-fatal problems seen while an upload runs.
// ABOUTME: A leftover disk or a fallback endpoint is worth telling the user about but never fails the upload.

/// Warnings gathered by one upload, in the order they happened.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Log the warning and keep it for the progress handle.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// The disk of a failed upload could not be removed and may still exist.
    pub fn rollback_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RollbackFailed,
            message: message.into(),
        }
    }

    /// The image went to a later candidate endpoint, usually the proxy.
    pub fn endpoint_fallback(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::EndpointFallback,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    RollbackFailed,
    EndpointFallback,
}
