// Concurrent fetch of independent upstream requests with all-or-nothing results.

use crate::error::{ScrapError, ScrapResult};
use crate::fetch::{FetchRequest, Fetcher};
use bytes::Bytes;
use futures::future::join_all;
use std::sync::Arc;
use tracing::error;

/// Runs every request on its own worker task and waits for all of them.
///
/// Payloads come back in request order. If any request failed, the failure of the lowest
/// request index is returned and the other payloads are dropped; every task still runs to
/// completion first.
pub async fn fan_out(
    fetcher: &Arc<dyn Fetcher>,
    requests: Vec<FetchRequest>,
) -> ScrapResult<Vec<Bytes>> {
    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let fetcher = Arc::clone(fetcher);
            tokio::spawn(async move { fetcher.fetch(&request).await })
        })
        .collect();

    let results: Vec<ScrapResult<Bytes>> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap_or_else(|join_err| Err(ScrapError::from(join_err))))
        .collect();

    let mut payloads = Vec::with_capacity(results.len());
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(body) => payloads.push(body),
            Err(err) => {
                error!("fan-out task {index} failed: {err}");
                return Err(err);
            }
        }
    }

    Ok(payloads)
}

/// Fan-out for exactly two requests, returned as a pair.
pub async fn fan_out_pair(
    fetcher: &Arc<dyn Fetcher>,
    first: FetchRequest,
    second: FetchRequest,
) -> ScrapResult<(Bytes, Bytes)> {
    let mut payloads = fan_out(fetcher, vec![first, second]).await?.into_iter();
    match (payloads.next(), payloads.next()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ScrapError::Internal("fan-out returned too few payloads".to_string())),
    }
}

/// Fan-out for exactly three requests, returned as a triple.
pub async fn fan_out_triple(
    fetcher: &Arc<dyn Fetcher>,
    first: FetchRequest,
    second: FetchRequest,
    third: FetchRequest,
) -> ScrapResult<(Bytes, Bytes, Bytes)> {
    let mut payloads = fan_out(fetcher, vec![first, second, third]).await?.into_iter();
    match (payloads.next(), payloads.next(), payloads.next()) {
        (Some(a), Some(b), Some(c)) => Ok((a, b, c)),
        _ => Err(ScrapError::Internal("fan-out returned too few payloads".to_string())),
    }
}
