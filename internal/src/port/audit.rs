use crate::domain::audit::AuditEntry;

/// Best-effort trail of attempted actions. Implementations must not block the caller.
#[cfg_attr(test, mockall::automock)]
pub trait AuditDrivenPort: Send + Sync {
    fn record(&self, entry: AuditEntry);
}
