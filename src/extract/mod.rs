//! Page extractors, one per stage.
//!
//! An extractor is a pure function from a fetched document to records and
//! follow-up work. It never performs I/O and never fails: a page without the
//! expected structure yields an empty result carrying an
//! [`ExtractionWarning`].

mod competition;
mod fixture;
pub(crate) mod html;
mod match_report;
mod score_table;
mod season;

pub use fixture::fixture_link_for;

use crate::errors::ExtractionWarning;
use crate::pipeline::{CompetitionRef, StageId, WorkUnit};
use crate::storage::Record;
use url::Url;

/// What an extractor knows about the document it is reading.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    pub unit: &'a WorkUnit,
    /// Base for resolving site-relative links.
    pub base_url: &'a Url,
}

impl<'a> ExtractContext<'a> {
    pub fn new(unit: &'a WorkUnit, base_url: &'a Url) -> Self {
        Self { unit, base_url }
    }

    pub fn url(&self) -> &str {
        self.unit.signature.as_str()
    }

    pub fn competition(&self) -> Option<&'a CompetitionRef> {
        self.unit.parent.competition()
    }

    pub fn season(&self) -> Option<&'a str> {
        self.unit.parent.season()
    }

    fn warning(&self, message: impl Into<String>) -> ExtractionWarning {
        ExtractionWarning::new(self.unit.stage, self.url(), message)
    }

    /// Absolute form of a site-relative link; unparseable links are kept as-is.
    fn absolute(&self, link: &str) -> String {
        self.base_url
            .join(link)
            .map(String::from)
            .unwrap_or_else(|_| link.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub records: Vec<Record>,
    /// Units for a downstream stage discovered in this document.
    pub follow_ups: Vec<WorkUnit>,
    pub warnings: Vec<ExtractionWarning>,
}

impl ExtractionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Nothing extracted, with the reason.
    pub fn warning(warning: ExtractionWarning) -> Self {
        Self {
            warnings: vec![warning],
            ..Self::default()
        }
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }
}

/// The closed set of page types the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extractor {
    CompetitionIndex,
    SeasonHistory,
    ScoreTable,
    Fixtures,
    MatchReport,
}

impl Extractor {
    pub fn for_stage(stage: StageId) -> Self {
        match stage {
            StageId::Competition => Self::CompetitionIndex,
            StageId::Season => Self::SeasonHistory,
            StageId::ScoreTable => Self::ScoreTable,
            StageId::Fixture => Self::Fixtures,
            StageId::Match => Self::MatchReport,
        }
    }

    pub fn stage(&self) -> StageId {
        match self {
            Self::CompetitionIndex => StageId::Competition,
            Self::SeasonHistory => StageId::Season,
            Self::ScoreTable => StageId::ScoreTable,
            Self::Fixtures => StageId::Fixture,
            Self::MatchReport => StageId::Match,
        }
    }

    /// Stages this extractor may emit follow-up units for.
    pub fn follow_up_stages(&self) -> &'static [StageId] {
        match self {
            Self::Fixtures => &[StageId::Match],
            _ => &[],
        }
    }

    pub fn extract(&self, body: &str, ctx: &ExtractContext<'_>) -> ExtractionResult {
        let document = scraper::Html::parse_document(body);
        match self {
            Self::CompetitionIndex => competition::extract(&document, ctx),
            Self::SeasonHistory => season::extract(&document, ctx),
            Self::ScoreTable => score_table::extract(&document, ctx),
            Self::Fixtures => fixture::extract(&document, ctx),
            Self::MatchReport => match_report::extract(&document, ctx),
        }
    }
}
