//! Detection feed acquisition.
//!
//! A [`DataSource`] yields batches of raw rows for the normalizer,
//! either from the live FIRMS country API or from a saved CSV extract
//! on disk. Fixtures are opt-in: nothing falls back to a file when the
//! network is down.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::client::{FETCH_ATTEMPTS, FirmsClient, FirmsProduct};
use crate::errors::FiresiftError;
use crate::models::{RawRow, read_rows};

/// One product's worth of raw rows, ready for normalization.
#[derive(Debug)]
pub struct SourceBatch {
    /// Product the rows came from. Fixture files are read as MODIS.
    pub product: FirmsProduct,
    /// Raw CSV rows. Empty when the feed had no detections.
    pub rows: Vec<RawRow>,
}

/// Where raw detection rows come from.
pub enum DataSource {
    /// Fetch each product from the FIRMS country API in order.
    Live {
        client: FirmsClient,
        products: Vec<FirmsProduct>,
        country: String,
        days: u32,
    },
    /// Read a saved country CSV extract (MODIS column layout).
    Fixture(PathBuf),
}

impl DataSource {
    /// Live source over the given products.
    #[must_use]
    pub fn live(
        client: FirmsClient,
        products: Vec<FirmsProduct>,
        country: impl Into<String>,
        days: u32,
    ) -> Self {
        Self::Live {
            client,
            products,
            country: country.into(),
            days,
        }
    }

    /// Offline source reading from `path`.
    #[must_use]
    pub fn fixture(path: impl Into<PathBuf>) -> Self {
        Self::Fixture(path.into())
    }

    /// Short description for log lines.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Live { products, days, .. } => {
                format!("live FIRMS feed ({} products, {days} days)", products.len())
            }
            Self::Fixture(path) => format!("fixture {}", path.display()),
        }
    }

    /// Acquire raw rows from every configured product.
    ///
    /// Live acquisition tolerates per-product failures as long as at
    /// least one product yields rows; batches that fetched cleanly but
    /// contained no detections are kept for reporting.
    ///
    /// # Errors
    ///
    /// Returns [`FiresiftError::NoDataAvailable`] when no live product
    /// yields a single row, or the underlying read error for fixtures.
    pub fn acquire(&self) -> Result<Vec<SourceBatch>, FiresiftError> {
        debug!(source = %self.describe(), "acquiring detection rows");
        match self {
            Self::Live {
                client,
                products,
                country,
                days,
            } => fetch_live(client, products, country, *days),
            Self::Fixture(path) => read_fixture(path),
        }
    }
}

fn fetch_live(
    client: &FirmsClient,
    products: &[FirmsProduct],
    country: &str,
    days: u32,
) -> Result<Vec<SourceBatch>, FiresiftError> {
    let mut batches = Vec::with_capacity(products.len());
    let mut total_rows = 0usize;

    for product in products {
        match client.fetch_product(*product, country, days) {
            Ok(rows) => {
                info!(
                    product = product.as_str(),
                    rows = rows.len(),
                    "source fetched"
                );
                total_rows += rows.len();
                batches.push(SourceBatch {
                    product: *product,
                    rows,
                });
            }
            Err(e) => {
                warn!(product = product.as_str(), error = %e, "source failed, continuing");
            }
        }
    }

    if total_rows == 0 {
        let attempts =
            u32::try_from(products.len()).unwrap_or(u32::MAX).saturating_mul(FETCH_ATTEMPTS);
        return Err(FiresiftError::NoDataAvailable { attempts });
    }

    Ok(batches)
}

fn read_fixture(path: &Path) -> Result<Vec<SourceBatch>, FiresiftError> {
    let file = File::open(path)?;
    let rows = read_rows(file)?;
    info!(path = %path.display(), rows = rows.len(), "fixture loaded");

    Ok(vec![SourceBatch {
        product: FirmsProduct::ModisNrt,
        rows,
    }])
}
