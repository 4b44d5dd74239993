//! Chunked fetching of many raffles.

use super::{FetchContext, RaffleDetailFetcher};
use crate::types::RaffleRecord;
use alloy::primitives::Address;
use futures_util::future::join_all;
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// Pause between two raffles of a chunk under progressive loading.
pub const PROGRESSIVE_ITEM_DELAY: Duration = Duration::from_millis(100);

/// Fetches many raffles in chunks, pacing requests to the session's profile.
#[derive(Debug, Clone, Copy)]
pub struct BatchOrchestrator<'a> {
    ctx: &'a FetchContext,
}

impl<'a> BatchOrchestrator<'a> {
    /// Creates an orchestrator for the session.
    pub fn new(ctx: &'a FetchContext) -> Self {
        Self { ctx }
    }

    /// Fetches every address, in chunks of the profile's concurrency.
    ///
    /// Under progressive loading the raffles of a chunk are fetched one after another and
    /// `on_progress` is called after each one; otherwise a chunk is fetched concurrently and
    /// `on_progress` is called once the whole chunk resolved. Chunks are separated by the
    /// profile's batch delay.
    ///
    /// Raffles that cannot be assembled are left out. Records keep the order of `addresses`.
    #[instrument(skip_all, fields(chain_id = self.ctx.chain_id, total = addresses.len()))]
    pub async fn fetch_all(
        &self,
        addresses: &[Address],
        mut on_progress: impl FnMut(usize, usize),
    ) -> Vec<RaffleRecord> {
        let profile = self.ctx.profile();
        let fetcher = RaffleDetailFetcher::new(self.ctx);
        let total = addresses.len();
        let chunk_size = profile.concurrency.max(1);
        let chunks = total.div_ceil(chunk_size);

        let mut records = Vec::with_capacity(total);
        let mut done = 0;

        for (index, chunk) in addresses.chunks(chunk_size).enumerate() {
            trace!(chunk = index, size = chunk.len(), "Fetching chunk");

            if profile.progressive_loading {
                for (position, address) in chunk.iter().enumerate() {
                    if position > 0 {
                        tokio::time::sleep(PROGRESSIVE_ITEM_DELAY).await;
                    }
                    records.extend(fetcher.fetch(*address).await);
                    done += 1;
                    on_progress(done, total);
                }
            } else {
                let fetched = join_all(chunk.iter().map(|address| fetcher.fetch(*address))).await;
                records.extend(fetched.into_iter().flatten());
                done += chunk.len();
                on_progress(done, total);
            }

            if index + 1 < chunks {
                tokio::time::sleep(profile.batch_delay).await;
            }
        }

        debug!(fetched = records.len(), dropped = total - records.len(), "Fetched raffles");
        records
    }
}
