use crate::{
    error::DataError,
    model::record::{AggTradeRecord, KlineRecord, TradeRecord},
};
use chrono::{DateTime, TimeDelta, Utc};
use derive_more::Constructor;
use fnv::FnvHashSet;
use std::{future::Future, hash::Hash};
use tracing::debug;

/// Maximum number of records a single Binance REST page may return.
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Closed time range `[start, end]`.
///
/// Invariant: `start <= end`. A reversed range is not an error; every
/// collector simply yields an empty result for it.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Constructor)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Whether `time` lies within the range, bounds included.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Record kinds the forward time-cursor walk can collect.
pub trait SeriesRecord {
    /// Identity used for deduplication at page seams.
    type Id: Eq + Hash + Copy;

    fn identity(&self) -> Self::Id;

    /// Timestamp the cursor advances past once a page has been consumed:
    /// close time for klines, trade time for aggregate trades.
    fn cursor_time(&self) -> DateTime<Utc>;
}

impl SeriesRecord for KlineRecord {
    type Id = DateTime<Utc>;

    fn identity(&self) -> Self::Id {
        self.exchange_time
    }

    fn cursor_time(&self) -> DateTime<Utc> {
        self.close_time
    }
}

impl SeriesRecord for AggTradeRecord {
    type Id = u64;

    fn identity(&self) -> u64 {
        self.agg_trade_id
    }

    fn cursor_time(&self) -> DateTime<Utc> {
        self.trade_time
    }
}

/// Collect a complete series over `range` by repeatedly calling a single-page
/// fetch primitive, advancing a time cursor forward until the range is
/// exhausted.
///
/// `fetch_page` receives the current cursor and fetches one page covering
/// `[cursor, range.end]` with at most [`MAX_PAGE_LIMIT`] records. An empty
/// page signals the range is exhausted (not an error). The cursor advances to
/// one millisecond past the last record of each page; the final result is
/// deduplicated by identity (keep-first, pages are chronological) so a
/// boundary record served twice appears once.
///
/// Any transport failure aborts the whole collection. Retries belong to the
/// page fetch itself, never to this loop.
pub async fn collect_forward<R, F, Fut>(range: TimeRange, mut fetch_page: F) -> Result<Vec<R>, DataError>
where
    R: SeriesRecord,
    F: FnMut(DateTime<Utc>) -> Fut,
    Fut: Future<Output = Result<Vec<R>, DataError>>,
{
    let mut collected: Vec<R> = Vec::new();
    let mut cursor = range.start;

    while cursor < range.end {
        let page = fetch_page(cursor).await?;

        // Empty page: range exhausted.
        let Some(last_stamp) = page.last().map(R::cursor_time) else {
            break;
        };

        debug!(page_size = page.len(), cursor = %cursor, "collected page");
        collected.extend(page);

        if last_stamp >= range.end {
            break;
        }

        // One millisecond past the last record; any boundary re-fetch is
        // removed by the dedupe below.
        cursor = last_stamp + TimeDelta::milliseconds(1);
    }

    dedupe_keep_first(&mut collected);
    Ok(collected)
}

/// Collect historical trades over `range` by walking the trade-id space
/// backward from the most recent page.
///
/// `fetch_page` receives `None` for the initial most-recent page, then
/// `Some(id)` for each page ending at that trade id. Pages are filtered to
/// the range; the walk stops when a page contributes nothing, when a page
/// reaches back past `range.start`, or when the id space is exhausted.
///
/// Output is deduplicated by trade id (keep-first) and sorted ascending by
/// id, so callers observe chronological order despite the backward
/// collection.
pub async fn collect_backward<F, Fut>(
    range: TimeRange,
    mut fetch_page: F,
) -> Result<Vec<TradeRecord>, DataError>
where
    F: FnMut(Option<u64>) -> Fut,
    Fut: Future<Output = Result<Vec<TradeRecord>, DataError>>,
{
    let page = fetch_page(None).await?;

    let mut collected: Vec<TradeRecord> =
        page.iter().filter(|trade| range.contains(trade.time)).copied().collect();

    // No overlap between the most recent page and the range: nothing newer
    // will ever match, and this endpoint cannot seek by time.
    if collected.is_empty() {
        return Ok(Vec::new());
    }

    let mut cursor = match page_floor(&page) {
        Some((min_id, _)) => min_id.saturating_sub(1),
        None => 0,
    };

    while cursor > 0 {
        let page = fetch_page(Some(cursor)).await?;

        let in_range: Vec<TradeRecord> =
            page.iter().filter(|trade| range.contains(trade.time)).copied().collect();

        // Either we walked past the start of the range or hit a gap.
        if in_range.is_empty() {
            break;
        }

        debug!(page_size = in_range.len(), cursor, "collected backward page");
        collected.extend(in_range);

        let Some((min_id, min_time)) = page_floor(&page) else {
            break;
        };

        // The page reaches back past the range start; older pages cannot
        // contribute anything further.
        if min_time < range.start {
            break;
        }

        cursor = min_id.saturating_sub(1);
    }

    dedupe_trades_keep_first(&mut collected);
    collected.sort_by_key(|trade| trade.id);
    Ok(collected)
}

/// Oldest id and timestamp in an unfiltered page, if non-empty.
fn page_floor(page: &[TradeRecord]) -> Option<(u64, DateTime<Utc>)> {
    let min_id = page.iter().map(|trade| trade.id).min()?;
    let min_time = page.iter().map(|trade| trade.time).min()?;
    Some((min_id, min_time))
}

fn dedupe_keep_first<R: SeriesRecord>(records: &mut Vec<R>) {
    let mut seen = FnvHashSet::default();
    records.retain(|record| seen.insert(record.identity()));
}

fn dedupe_trades_keep_first(trades: &mut Vec<TradeRecord>) {
    let mut seen = FnvHashSet::default();
    trades.retain(|trade| seen.insert(trade.id));
}
