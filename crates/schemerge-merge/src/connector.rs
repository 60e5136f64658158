use async_trait::async_trait;

use schemerge_core::Result;
use schemerge_introspect::{Catalog, CatalogOptions, PostgresCatalog};

use crate::config::Endpoint;

/// Opens catalogs for the pipeline.
///
/// Each returned catalog is owned by the phase that opened it and closed at
/// the end of that phase.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        options: CatalogOptions,
    ) -> Result<Box<dyn Catalog>>;
}

/// Connector producing [`PostgresCatalog`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        options: CatalogOptions,
    ) -> Result<Box<dyn Catalog>> {
        let catalog = PostgresCatalog::connect(&endpoint.url, options).await?;
        Ok(Box::new(catalog))
    }
}
