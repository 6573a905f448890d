//! Parse a caller-supplied batch of sources; no search or crawl.

use std::sync::{Arc, Mutex, PoisonError};

use super::events::{JobEvent, JobState};
use super::job::{Job, JobContext, JobCore};
use super::stages::submit_parse;
use crate::ParseSource;

pub struct CustomParseJob {
    core: Arc<JobCore>,
    ctx: JobContext,
    sources: Mutex<Vec<ParseSource>>,
}

impl CustomParseJob {
    pub fn new(core: Arc<JobCore>, ctx: JobContext, sources: Vec<ParseSource>) -> Self {
        Self {
            core,
            ctx,
            sources: Mutex::new(sources),
        }
    }
}

impl Job for CustomParseJob {
    fn core(&self) -> &Arc<JobCore> {
        &self.core
    }

    fn start(self: Arc<Self>) {
        let sources =
            std::mem::take(&mut *self.sources.lock().unwrap_or_else(PoisonError::into_inner));
        let infos = sources.iter().map(ParseSource::info).collect();
        if !self.core.emit_live(JobEvent::JobBegin { sources: infos })
            || !self.core.enter(JobState::Parsing)
            || !self.core.add_pending(sources.len())
        {
            return;
        }
        for source in sources {
            submit_parse(&self.core, &self.ctx, source);
        }
        self.core.finish_fan_out();
    }
}
