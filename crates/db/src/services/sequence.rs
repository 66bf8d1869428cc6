//! Sequence allocator.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use bookwell_core::numbering::{NumberFormat, NumberingScheme, Series};
use bookwell_core::{BooksError, TenantContext};

use crate::store::SequenceRepository;

const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Runs `op` again while it fails with `SequenceContention`, at most
/// `retries` extra times, backing off linearly.
pub(crate) async fn retry_contended<T, F, Fut>(retries: u32, mut op: F) -> Result<T, BooksError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BooksError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(BooksError::SequenceContention { series }) if attempt < retries => {
                attempt += 1;
                warn!(%series, attempt, "sequence contended, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            other => return other,
        }
    }
}

/// Issues gap-tolerant, never-reused numbers per tenant and series.
pub struct SequenceAllocator<S> {
    store: Arc<S>,
    scheme: NumberingScheme,
    retries: u32,
}

impl<S: SequenceRepository> SequenceAllocator<S> {
    /// Creates an allocator over `store`.
    pub fn new(store: Arc<S>, scheme: NumberingScheme, retries: u32) -> Self {
        Self {
            store,
            scheme,
            retries,
        }
    }

    /// The configured formats.
    pub fn scheme(&self) -> &NumberingScheme {
        &self.scheme
    }

    /// Increments the tenant's `series` counter and renders the new value
    /// with `format`.
    ///
    /// # Errors
    ///
    /// Returns `SequenceContention` once the retries are spent. Nothing is
    /// issued in that case.
    pub async fn next(
        &self,
        ctx: &TenantContext,
        series: Series,
        format: &NumberFormat,
    ) -> Result<String, BooksError> {
        let value = retry_contended(self.retries, || self.store.next_value(ctx, series))
            .await
            .inspect_err(|err| super::report("sequence.next", ctx, err))?;
        let number = format.render(value);
        debug!(tenant_id = %ctx.tenant_id(), %series, %number, "number issued");
        Ok(number)
    }

    /// [`next`](Self::next) with the series' configured format.
    pub async fn next_number(&self, ctx: &TenantContext, series: Series) -> Result<String, BooksError> {
        self.next(ctx, series, self.scheme.format_for(series)).await
    }

    /// The last value issued for `series`, 0 if none.
    pub async fn current(&self, ctx: &TenantContext, series: Series) -> Result<u64, BooksError> {
        self.store.current_value(ctx, series).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_contended(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(BooksError::SequenceContention {
                    series: "invoice".into(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(BooksError::SequenceContention { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_success_or_other_errors() {
        let calls = AtomicU32::new(0);
        let result = retry_contended(5, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(BooksError::SequenceContention {
                        series: "receipt".into(),
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);

        let result: Result<(), _> =
            retry_contended(5, || async { Err(BooksError::ConcurrentModification) }).await;
        assert!(matches!(result, Err(BooksError::ConcurrentModification)));
    }
}
