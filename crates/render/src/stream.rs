use crate::{convert::ConverterRegistry, error::RenderError, renderer::Renderer};
use connectors::cursor::RowCursor;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub columns: usize,
    pub rows: u64,
}

/// Streams every row of `cursor` through `renderer` in cursor order.
///
/// The cursor is closed before returning, whatever the outcome. Rows are
/// written as they are read: when a run fails part way, whatever the renderer
/// already wrote stays in the sink and a document format may be left without
/// its closing framing.
///
/// Cancellation is checked each time the cursor is advanced. A cancelled run
/// aborts the cursor instead of closing it, so the rows left are not drained.
pub async fn run<C>(
    cursor: &mut C,
    renderer: &mut dyn Renderer,
    converters: &ConverterRegistry,
    cancel: &CancellationToken,
) -> Result<RunSummary, RenderError>
where
    C: RowCursor + ?Sized,
{
    let started = Instant::now();
    let outcome = stream_rows(cursor, renderer, converters, cancel).await;
    let closed = match outcome {
        Err(RenderError::Cancelled) => cursor.abort().await,
        _ => cursor.close().await,
    };

    match (outcome, closed) {
        (Ok(summary), Ok(())) => {
            info!(
                rows = summary.rows,
                columns = summary.columns,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Result set rendered"
            );
            Ok(summary)
        }
        (Ok(_), Err(e)) => {
            error!(kind = "cursor", "Failed to close cursor: {}", e);
            Err(e.into())
        }
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!("Failed to close cursor after error: {}", close_err);
            }
            if matches!(e, RenderError::Cancelled) {
                warn!("Rendering cancelled");
            } else {
                error!(kind = e.kind(), "Rendering failed: {}", e);
            }
            Err(e)
        }
    }
}

async fn stream_rows<C>(
    cursor: &mut C,
    renderer: &mut dyn Renderer,
    converters: &ConverterRegistry,
    cancel: &CancellationToken,
) -> Result<RunSummary, RenderError>
where
    C: RowCursor + ?Sized,
{
    if !advance(cursor, cancel).await? {
        debug!("Empty result set");
        renderer.write_header(None)?;
        renderer.write_footer()?;
        return Ok(RunSummary::default());
    }

    let columns = cursor.columns()?;
    for (idx, column) in columns.iter().enumerate() {
        debug!(
            idx,
            name = %column.name,
            database_type = %column.type_label(),
            semantic_type = %column.semantic_type,
            scan_type = %column.scan_type,
            "Column"
        );
    }

    let plan = converters.plan(&columns);
    let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    renderer.write_header(Some(&names))?;

    let mut rows = 0u64;
    loop {
        let row = cursor
            .scan(plan.targets())
            .and_then(|scanned| plan.normalize_row(scanned))
            .map_err(|source| RenderError::Scan {
                row: rows + 1,
                source,
            })?;
        renderer.write_row(&row)?;
        rows += 1;

        if !advance(cursor, cancel).await? {
            break;
        }
    }

    renderer.write_footer()?;
    Ok(RunSummary {
        columns: columns.len(),
        rows,
    })
}

async fn advance<C>(cursor: &mut C, cancel: &CancellationToken) -> Result<bool, RenderError>
where
    C: RowCursor + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(RenderError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RenderError::Cancelled),
        advanced = cursor.advance() => Ok(advanced?),
    }
}
