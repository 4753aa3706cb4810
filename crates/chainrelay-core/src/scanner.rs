//! Range scanner: walks `[checkpoint + 1, head]` in bounded sub-ranges.
//!
//! Two budgets apply at once: no query spans more than `max_range` blocks and
//! no execution issues more than `max_queries` queries. Queries run strictly
//! one after another; the first failure aborts the scan.

use crate::chain::ChainQuery;
use crate::error::RelayError;
use crate::event::{EventKind, RawEvent};
use crate::range::{BlockRange, Cursor};

/// Events gathered by a completed scan.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Raw events in the order the chain returned them.
    pub events: Vec<RawEvent>,
    /// Highest range end queried successfully (the checkpoint on entry if
    /// nothing was queried).
    pub reached_block: u64,
    /// Ranges queried, in order.
    pub ranges: Vec<BlockRange>,
}

impl ScanResult {
    /// Number of chain queries issued.
    pub fn queries(&self) -> usize {
        self.ranges.len()
    }
}

/// A scan aborted by a failed chain query.
///
/// Carries what had been gathered before the failure; none of it may be
/// committed.
#[derive(Debug)]
pub struct ScanError {
    pub error: RelayError,
    /// The range whose query failed.
    pub failed_range: BlockRange,
    /// Ranges that succeeded before the failure.
    pub completed: Vec<BlockRange>,
    /// Events fetched before the failure.
    pub partial_events: usize,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "query for blocks {} failed: {}", self.failed_range, self.error)
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Scans a contract's events under a per-query span and per-execution
/// query budget.
#[derive(Debug, Clone, Copy)]
pub struct RangeScanner {
    max_range: u64,
    max_queries: u32,
}

impl RangeScanner {
    pub fn new(max_range: u64, max_queries: u32) -> Self {
        Self {
            max_range,
            max_queries,
        }
    }

    pub fn max_range(&self) -> u64 {
        self.max_range
    }

    pub fn max_queries(&self) -> u32 {
        self.max_queries
    }

    /// Fetch all Locker events after `checkpoint` up to at most `head`.
    ///
    /// Stops when the cursor reaches `head` or the query budget runs out;
    /// the remaining backlog is left for the next execution.
    pub async fn scan<C: ChainQuery + ?Sized>(
        &self,
        chain: &C,
        contract: &str,
        checkpoint: u64,
        head: u64,
    ) -> Result<ScanResult, ScanError> {
        let mut cursor = Cursor::new(checkpoint);
        let mut requests = 0u32;
        let mut result = ScanResult {
            reached_block: checkpoint,
            ..Default::default()
        };

        while requests < self.max_queries {
            let Some(range) = cursor.next_range(head, self.max_range) else {
                break;
            };
            requests += 1;

            tracing::info!(
                from = range.from,
                to = range.to,
                request = requests,
                budget = self.max_queries,
                "Fetching log events"
            );

            match chain
                .query_events(contract, &EventKind::ALL, range.from, range.to)
                .await
            {
                Ok(events) => {
                    tracing::debug!(from = range.from, to = range.to, events = events.len(), "Range fetched");
                    result.events.extend(events);
                    result.ranges.push(range);
                    cursor.advance(&range);
                    result.reached_block = cursor.block_number;
                }
                Err(error) => {
                    tracing::warn!(
                        from = range.from,
                        to = range.to,
                        error = %error,
                        discarded = result.events.len(),
                        "Range query failed, aborting scan"
                    );
                    return Err(ScanError {
                        error,
                        failed_range: range,
                        completed: result.ranges,
                        partial_events: result.events.len(),
                    });
                }
            }
        }

        if !cursor.reached(head) {
            tracing::info!(
                reached = result.reached_block,
                head,
                remaining = head - result.reached_block,
                "Query budget exhausted, backlog left for next execution"
            );
        }

        Ok(result)
    }
}
