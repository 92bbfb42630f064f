//! Pagers over the list operations.
//!
//! Each fetcher owns a clone of the service and the caller's options and
//! reissues the list call with the cursor taken from the previous page.

use async_trait::async_trait;
use scc_core::{CallContext, Error, Page, PageFetcher, Pager};
use tracing::debug;

use crate::ResultsService;
use crate::models::{Evaluation, Report, Resource};
use crate::options::{ListReportEvaluationsOptions, ListReportResourcesOptions, ListReportsOptions};

/// Walks every report matched by a [`ListReportsOptions`].
pub type ReportsPager = Pager<ReportsFetcher>;
/// Walks every evaluation matched by a [`ListReportEvaluationsOptions`].
pub type ReportEvaluationsPager = Pager<ReportEvaluationsFetcher>;
/// Walks every resource matched by a [`ListReportResourcesOptions`].
pub type ReportResourcesPager = Pager<ReportResourcesFetcher>;

fn reject_start(start: Option<&String>) -> Result<(), Error> {
    if start.is_some() {
        return Err(Error::validation(
            "the 'start' field must not be set when creating a pager",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ReportsFetcher {
    service: ResultsService,
    options: ListReportsOptions,
}

#[async_trait]
impl PageFetcher for ReportsFetcher {
    type Item = Report;

    async fn fetch(
        &mut self,
        ctx: &CallContext,
        start: Option<&str>,
    ) -> Result<Page<Report>, Error> {
        let mut options = self.options.clone();
        options.start = start.map(str::to_owned);
        let response = self.service.list_reports_with_context(ctx, &options).await?;
        debug!(status = response.status_code, "fetched reports page");
        Ok(Page::from_result(response.result))
    }
}

#[derive(Debug, Clone)]
pub struct ReportEvaluationsFetcher {
    service: ResultsService,
    options: ListReportEvaluationsOptions,
}

#[async_trait]
impl PageFetcher for ReportEvaluationsFetcher {
    type Item = Evaluation;

    async fn fetch(
        &mut self,
        ctx: &CallContext,
        start: Option<&str>,
    ) -> Result<Page<Evaluation>, Error> {
        let mut options = self.options.clone();
        options.start = start.map(str::to_owned);
        let response = self
            .service
            .list_report_evaluations_with_context(ctx, &options)
            .await?;
        debug!(report_id = %options.report_id, "fetched evaluations page");
        Ok(Page::from_result(response.result))
    }
}

#[derive(Debug, Clone)]
pub struct ReportResourcesFetcher {
    service: ResultsService,
    options: ListReportResourcesOptions,
}

#[async_trait]
impl PageFetcher for ReportResourcesFetcher {
    type Item = Resource;

    async fn fetch(
        &mut self,
        ctx: &CallContext,
        start: Option<&str>,
    ) -> Result<Page<Resource>, Error> {
        let mut options = self.options.clone();
        options.start = start.map(str::to_owned);
        let response = self
            .service
            .list_report_resources_with_context(ctx, &options)
            .await?;
        debug!(report_id = %options.report_id, "fetched resources page");
        Ok(Page::from_result(response.result))
    }
}

impl ResultsService {
    /// A pager over [`ResultsService::list_reports`].
    ///
    /// The options are validated here. `start` must be unset; the pager
    /// manages the cursor itself.
    pub fn new_reports_pager(&self, options: ListReportsOptions) -> Result<ReportsPager, Error> {
        options.validate()?;
        reject_start(options.start.as_ref())?;
        Ok(Pager::new(ReportsFetcher {
            service: self.clone(),
            options,
        }))
    }

    /// A pager over [`ResultsService::list_report_evaluations`].
    pub fn new_report_evaluations_pager(
        &self,
        options: ListReportEvaluationsOptions,
    ) -> Result<ReportEvaluationsPager, Error> {
        options.validate()?;
        reject_start(options.start.as_ref())?;
        Ok(Pager::new(ReportEvaluationsFetcher {
            service: self.clone(),
            options,
        }))
    }

    /// A pager over [`ResultsService::list_report_resources`].
    pub fn new_report_resources_pager(
        &self,
        options: ListReportResourcesOptions,
    ) -> Result<ReportResourcesPager, Error> {
        options.validate()?;
        reject_start(options.start.as_ref())?;
        Ok(Pager::new(ReportResourcesFetcher {
            service: self.clone(),
            options,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scc_core::NoAuthAuthenticator;

    use super::*;
    use crate::ResultsServiceOptions;

    fn service() -> ResultsService {
        ResultsService::new(ResultsServiceOptions::new(Arc::new(NoAuthAuthenticator))).unwrap()
    }

    #[test]
    fn preset_start_is_rejected() {
        let options = ListReportsOptions {
            start: Some("abc".to_owned()),
            ..ListReportsOptions::new("inst")
        };
        let err = service().new_reports_pager(options).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn missing_report_id_is_rejected_up_front() {
        let err = service()
            .new_report_resources_pager(ListReportResourcesOptions::new("inst", ""))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn new_pager_has_next() {
        let pager = service()
            .new_report_evaluations_pager(ListReportEvaluationsOptions::new("inst", "rep"))
            .unwrap();
        assert!(pager.has_next());
        assert_eq!(pager.pages_fetched(), 0);
    }
}
