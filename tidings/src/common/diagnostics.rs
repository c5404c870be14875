/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::fmt;

use tokio::sync::broadcast;
use tracing::{error, warn};

use crate::common::TidingsError;

/// How serious a reported failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Non-fatal; the operation became a no-op or a single frame was dropped.
    Warning,
    /// A failure that affected a connection or a write.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single asynchronous failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the failure is.
    pub severity: Severity,
    /// What went wrong.
    pub error: TidingsError,
}

impl Diagnostic {
    /// Returns `true` for warnings.
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.error)
    }
}

/// The stream of warnings and errors raised by background work.
///
/// Reporting never blocks and never fails, even when nobody is listening. Slow
/// listeners lose the oldest reports, as with any `tokio::sync::broadcast` channel.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    sender: broadcast::Sender<Diagnostic>,
}

impl Diagnostics {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns a receiver for every report made from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Diagnostic> {
        self.sender.subscribe()
    }

    pub(crate) fn warn(&self, error: TidingsError) {
        warn!(%error);
        self.report(Severity::Warning, error);
    }

    pub(crate) fn error(&self, error: TidingsError) {
        error!(%error);
        self.report(Severity::Error, error);
    }

    fn report(&self, severity: Severity, error: TidingsError) {
        // no receivers is fine
        let _ = self.sender.send(Diagnostic { severity, error });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_reach_subscribers() {
        let diagnostics = Diagnostics::new(8);
        let mut rx = diagnostics.subscribe();
        diagnostics.warn(TidingsError::DuplicateHandler);
        diagnostics.error(TidingsError::WriteTimeout);

        let first = rx.recv().await.unwrap();
        assert!(first.is_warning());
        assert_eq!(first.error, TidingsError::DuplicateHandler);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.severity, Severity::Error);
    }

    #[test]
    fn reporting_without_listeners_is_silent() {
        let diagnostics = Diagnostics::new(1);
        diagnostics.warn(TidingsError::NoDelegates);
    }
}
