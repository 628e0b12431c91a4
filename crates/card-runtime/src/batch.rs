//! Preview and batch jobs

use crate::types::*;
use card_compose::{
    Composer, DataRecord, DatasetProvider, PreparedTemplate, RenderedCard, Template,
};
use card_impose::{
    BatchStatistics, CmykConverter, ColorSpaceReport, LayoutPlan, PageOptions, blank_document,
    calculate_statistics, document_to_bytes, impose_cards,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Everything a job needs: the renderer, the dataset source and the
/// CMYK converter (whose capability probe is cached across jobs)
pub struct CardRuntime {
    composer: Arc<Composer>,
    datasets: Arc<dyn DatasetProvider>,
    converter: Arc<CmykConverter>,
}

impl CardRuntime {
    pub fn new(
        composer: Composer,
        datasets: Arc<dyn DatasetProvider>,
        converter: CmykConverter,
    ) -> Self {
        Self {
            composer: Arc::new(composer),
            datasets,
            converter: Arc::new(converter),
        }
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn converter(&self) -> &CmykConverter {
        &self.converter
    }

    /// Render one record at the template's natural size
    pub async fn preview(&self, template: &Template, record: &DataRecord) -> Result<RenderedCard> {
        let card = self.composer.render_template(template, record).await?;
        log::debug!(
            "Rendered preview of {} at {}x{}",
            template.id,
            card.width,
            card.height
        );
        Ok(card)
    }

    /// Preview a dataset row; rows past the end render with empty values
    pub async fn preview_row(
        &self,
        template: &Template,
        dataset_id: &str,
        row: usize,
    ) -> Result<RenderedCard> {
        let dataset = self.datasets.load(dataset_id).await?;
        let record = match dataset.records.get(row) {
            Some(record) => record.clone(),
            None => {
                log::warn!(
                    "Dataset {} has {} rows, previewing row {} with empty values",
                    dataset_id,
                    dataset.len(),
                    row
                );
                DataRecord::new()
            }
        };
        self.preview(template, &record).await
    }

    /// Render every row of a dataset and impose the cards onto pages
    pub async fn run_batch(
        &self,
        template: &Template,
        dataset_id: &str,
        options: &BatchOptions,
        updates: &mpsc::UnboundedSender<JobUpdate>,
        cancel: &CancellationToken,
    ) -> Result<BatchOutput> {
        let dataset = self.datasets.load(dataset_id).await?;
        let missing = template.missing_columns(&dataset.headers);
        if !missing.is_empty() {
            log::warn!(
                "Dataset {} lacks mapped columns {:?}; those fields render empty",
                dataset_id,
                missing
            );
        }
        self.render_batch(template, dataset.records, options, updates, cancel)
            .await
    }

    /// Batch job over records already in hand
    ///
    /// Records render concurrently but land on pages in their original
    /// order. No records gives a single blank page and zero-page statistics. A cancelled job returns [`JobError::Cancelled`] and no
    /// document. A failed CMYK conversion falls back to the RGB document.
    pub async fn render_batch(
        &self,
        template: &Template,
        records: Vec<DataRecord>,
        options: &BatchOptions,
        updates: &mpsc::UnboundedSender<JobUpdate>,
        cancel: &CancellationToken,
    ) -> Result<BatchOutput> {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        options.layout.validate()?;

        let prepared = self.composer.prepare(template).await?;
        let (width, height) = prepared.size();
        let plan = options.layout.plan(width as f32 / height as f32);
        if plan.is_degenerate() {
            return Err(JobError::LayoutDegenerate(format!(
                "{}x{}px cards do not fit a {}x{}pt page with {}pt margins",
                width, height, plan.page_width, plan.page_height, plan.margin
            )));
        }
        log::info!(
            "Batch {}: {} records, {}x{}pt cards, {} per page",
            template.id,
            records.len(),
            plan.card_width,
            plan.card_height,
            plan.cards_per_page
        );

        let cards = self
            .render_cards(prepared, records, options.workers, updates, cancel)
            .await?;
        let card_count = cards.len();

        let _ = updates.send(JobUpdate::Progress {
            operation: "Imposing cards".to_string(),
            current: 0,
            total: 1,
        });
        let page_options = PageOptions {
            print_marks: options.color_mode == ColorMode::Cmyk,
        };
        let (mut doc, stats) = if cards.is_empty() {
            log::warn!("Batch {} has no records; writing a blank page", template.id);
            (blank_document(&plan), empty_statistics(&plan))
        } else {
            let stats = calculate_statistics(&plan, card_count)?;
            (impose_cards(plan, cards, page_options).await?, stats)
        };
        let rgb = tokio::task::spawn_blocking(move || document_to_bytes(&mut doc)).await??;

        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let mut output = BatchOutput {
            document: rgb,
            color_mode: ColorMode::Rgb,
            fully_converted: false,
            conversion_error: None,
            validation: ColorSpaceReport::default(),
            plan,
            stats,
        };

        if options.color_mode == ColorMode::Cmyk {
            self.convert(&mut output, updates, cancel).await?;
        }

        let _ = updates.send(JobUpdate::Complete {
            pages: output.stats.pages,
            color_mode: output.color_mode,
            fully_converted: output.fully_converted,
        });
        Ok(output)
    }

    async fn render_cards(
        &self,
        prepared: PreparedTemplate,
        records: Vec<DataRecord>,
        workers: usize,
        updates: &mpsc::UnboundedSender<JobUpdate>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<u8>>> {
        let total = records.len();
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut tasks = JoinSet::new();

        for (index, record) in records.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let composer = Arc::clone(&self.composer);
            let prepared = prepared.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, Err(JobError::Cancelled));
                };
                if cancel.is_cancelled() {
                    return (index, Err(JobError::Cancelled));
                }
                let card = composer
                    .render_record(&prepared, &record)
                    .await
                    .map_err(JobError::from);
                (index, card)
            });
        }

        let _ = updates.send(JobUpdate::Progress {
            operation: "Rendering cards".to_string(),
            current: 0,
            total,
        });

        // Completion order is arbitrary; the map restores row order
        let mut rendered = BTreeMap::new();
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    log::info!("Batch cancelled after {} of {} cards", rendered.len(), total);
                    return Err(JobError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };
            let (index, card) = joined?;
            rendered.insert(index, card?.png);
            let _ = updates.send(JobUpdate::Progress {
                operation: "Rendering cards".to_string(),
                current: rendered.len(),
                total,
            });
        }

        Ok(rendered.into_values().collect())
    }

    async fn convert(
        &self,
        output: &mut BatchOutput,
        updates: &mpsc::UnboundedSender<JobUpdate>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !self.converter.is_available().await {
            let reason = format!(
                "CMYK converter {} is not available",
                self.converter.options().binary
            );
            log::info!("{}; delivering RGB", reason);
            let _ = updates.send(JobUpdate::ConversionFallback { reason });
            return Ok(());
        }

        let _ = updates.send(JobUpdate::Progress {
            operation: "Converting to CMYK".to_string(),
            current: 0,
            total: 1,
        });

        // Dropping the conversion future kills the converter and removes
        // its scratch files
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            result = self.converter.convert(output.document.clone()) => result,
        };

        match result {
            Ok(converted) => {
                output.document = converted.buffer;
                output.color_mode = ColorMode::Cmyk;
                output.fully_converted = converted.fully_converted;
                output.validation = converted.validation;
            }
            Err(e) => {
                log::warn!("CMYK conversion failed, delivering RGB: {}", e);
                output.conversion_error = Some(e.to_string());
                let _ = updates.send(JobUpdate::ConversionFallback {
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Statistics for a batch that imposed nothing
fn empty_statistics(plan: &LayoutPlan) -> BatchStatistics {
    BatchStatistics {
        cards: 0,
        pages: 0,
        cards_per_page: plan.cards_per_page,
        empty_cells_last_page: 0,
    }
}

/// Plan for cards of the template's recorded size, without loading its image
pub fn plan_for_template(template: &Template, options: &BatchOptions) -> LayoutPlan {
    options.layout.plan(template.aspect_ratio())
}
