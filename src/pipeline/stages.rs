//! Parse-stage submission shared by both job kinds.

use log::warn;
use std::sync::Arc;

use super::job::{JobContext, JobCore};
use crate::ParseSource;
use crate::document::Document;
use crate::error::TaskError;
use crate::pool::{Task, TaskOutcome};

/// Submit one parse task for `source`. Its slot must already be reserved on `core`; the task
/// settles it with a document or a failure.
pub(crate) fn submit_parse(core: &Arc<JobCore>, ctx: &JobContext, source: ParseSource) {
    let rank = source.rank;
    let language = core.language();
    let parsers = Arc::clone(&ctx.parsers);
    let keywords = Arc::clone(&ctx.keywords);
    let keyword_set = Arc::clone(&ctx.keyword_set);

    let body = move || -> Result<Arc<Document>, TaskError> {
        let parser = parsers.get(language)?;
        let mut document = parser.parse(&source)?;
        document
            .mark_parsed()
            .map_err(|e| TaskError::Failed(e.to_string()))?;
        if !keyword_set.is_empty() {
            let hits = keywords.search(&document, &keyword_set);
            document.set_keyword_hits(hits);
        }
        Ok(Arc::new(document))
    };

    let job = Arc::clone(core);
    let on_complete = move |outcome: TaskOutcome<Arc<Document>>| match outcome {
        TaskOutcome::Completed(document) => job.parse_complete(document),
        TaskOutcome::Failed(e) => {
            warn!("job #{}: parse of #{rank} failed: {e}", job.id());
            job.settle_failed();
        }
        TaskOutcome::Discarded => {}
    };

    let task = Task::new(format!("parse #{rank}"), body, on_complete)
        .with_cancel_flag(core.cancel_flag());
    if let Err(e) = ctx.pools.parse.submit(task) {
        warn!("job #{}: could not submit parse of #{rank}: {e}", core.id());
        core.settle_failed();
    }
}
