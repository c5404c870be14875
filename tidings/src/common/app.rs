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

use tracing::trace;

use crate::common::{HubRegistry, TidingsConfig, TidingsResult};

/// Entry point for creating a [`HubRegistry`].
///
/// # Example
///
/// ```rust,ignore
/// use tidings::prelude::*;
///
/// #[tokio::main]
/// async fn main() {
///     let registry = TidingsApp::launch();
///     let lobby = registry.new_hub("lobby").unwrap_or_else(|e| e.into_existing());
///     // hand accepted connections to `lobby.new_client(..)`
/// }
/// ```
#[derive(Default, Debug, Clone)]
pub struct TidingsApp;

impl TidingsApp {
    /// Loads the configuration from XDG-compliant locations and creates a registry with it.
    ///
    /// A missing or broken configuration file falls back to the defaults; see
    /// [`TidingsConfig::load`].
    #[must_use]
    pub fn launch() -> HubRegistry {
        trace!("Starting Tidings");
        let config = TidingsConfig::load();
        trace!("Configuration loaded: {:?}", config);
        HubRegistry::from_config(config)
    }

    /// Creates a registry with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Whatever [`TidingsConfig::validate`] reports.
    pub fn with_config(config: TidingsConfig) -> TidingsResult<HubRegistry> {
        config.validate()?;
        Ok(HubRegistry::from_config(config))
    }
}
