//! Drives one translation run over an open document.

use crate::error::Result;
use crate::filter::{Decision, FragmentFilter, SkipReason};
use crate::session::Document;
use crate::translate::Translator;
use crate::types::{DocumentFormat, Fragment, DEFAULT_SOURCE_LANGUAGE};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// What happened during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub format: DocumentFormat,

    /// Number of fragments sent to the translator and written back.
    pub translated: usize,

    /// Skipped fragments by reason.
    pub skipped: BTreeMap<SkipReason, usize>,

    /// Where the translated document was written, once saved.
    pub output: Option<PathBuf>,
}

impl RunReport {
    pub fn new(format: DocumentFormat) -> Self {
        Self {
            format,
            translated: 0,
            skipped: BTreeMap::new(),
            output: None,
        }
    }

    /// Total number of skipped fragments.
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }
}

/// Translates every eligible fragment of a document into one language.
pub struct TranslationJob<'a> {
    translator: &'a dyn Translator,
    filter: &'a FragmentFilter,
    target: String,
    source: String,
}

impl<'a> TranslationJob<'a> {
    /// Create a job translating from the default source language into `target`.
    pub fn new(
        translator: &'a dyn Translator,
        filter: &'a FragmentFilter,
        target: impl Into<String>,
    ) -> Self {
        Self {
            translator,
            filter,
            target: target.into(),
            source: DEFAULT_SOURCE_LANGUAGE.to_string(),
        }
    }

    /// Set the source language.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Walk the document once, translating and writing back fragment by
    /// fragment. The first translation failure aborts the walk.
    pub fn run<D: Document>(&self, document: &mut D) -> Result<RunReport> {
        let mut report = RunReport::new(document.format());

        document.for_each_fragment(&mut |fragment: &mut Fragment| {
            match self.filter.decide(fragment) {
                Decision::Skip(reason) => {
                    log::debug!("skipping {} ({:?})", fragment.location, reason);
                    report.record_skip(reason);
                }
                Decision::Translate(text) => {
                    let translated = self.translator.translate(&text, &self.target, &self.source)?;
                    log::info!("{}: {:?} -> {:?}", fragment.location, text, translated);
                    fragment.replacement = Some(translated);
                    report.translated += 1;
                }
            }
            Ok(())
        })?;

        Ok(report)
    }
}
