//! Building an [`AssetCatalog`] from exchange metadata.

use crate::client::InfoClient;
use crate::error::InfoResult;
use crate::perpetuals::PerpMeta;
use crate::spot::SpotMeta;
use hlx_core::AssetCatalog;
use tracing::info;

/// Merge perp and spot metadata into one catalog.
pub fn build_catalog(perps: &PerpMeta, spot: &SpotMeta) -> AssetCatalog {
    let mut catalog = AssetCatalog::new();
    perps.extend_catalog(&mut catalog);
    spot.extend_catalog(&mut catalog);
    catalog
}

impl InfoClient {
    /// Fetch `meta` and `spotMeta` and build a fresh catalog.
    ///
    /// The result is not stored; wrap it in an `Arc` and hand it to the
    /// gateways to reuse it.
    pub async fn asset_catalog(&self) -> InfoResult<AssetCatalog> {
        let perps = self.perpetuals().fetch_meta().await?;
        let spot = self.spot().fetch_meta().await?;
        let catalog = build_catalog(&perps, &spot);
        info!(
            perps = perps.universe.len(),
            spot_pairs = spot.markets.len(),
            markets = catalog.len(),
            "Asset catalog built"
        );
        Ok(catalog)
    }
}
