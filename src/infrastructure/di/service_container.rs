//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::TpaService;
use crate::config::Settings;
use crate::infrastructure::chart::SvgChartRenderer;
use crate::infrastructure::http::HttpStandCatalog;
use crate::infrastructure::traits::{ChartRenderer, FileSystem, RealFileSystem, StandCatalog};
use crate::infrastructure::InfraResult;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Stand lookup and persistence
    pub catalog: Arc<dyn StandCatalog>,

    /// Diagnostic chart renderer
    pub renderer: Arc<dyn ChartRenderer>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let catalog = HttpStandCatalog::new(&settings)?;
        Ok(Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(catalog),
            Arc::new(SvgChartRenderer),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        catalog: Arc<dyn StandCatalog>,
        renderer: Arc<dyn ChartRenderer>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            catalog,
            renderer,
        }
    }

    /// TPA estimation service over this container's dependencies.
    pub fn tpa_service(&self) -> TpaService {
        TpaService::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.catalog),
            Arc::clone(&self.renderer),
            Arc::clone(&self.settings),
        )
    }
}
