use async_trait::async_trait;
use card_compose::{
    BaseImageRef, ComposeError, ComposeOptions, Composer, CsvDirectory, Field, FieldKind,
    FieldStyle, FontBook, ImageMeta, ImageSources, MemoryStore, NoFetch, ObjectStore, StoreError,
};
use card_impose::{CmykConverter, PaperSize, probe_converter, validate};
use card_runtime::*;
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::{Document, ObjectId};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn png(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    RgbaImage::from_pixel(width, height, color)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn field(id: &str, kind: FieldKind) -> Field {
    Field {
        id: id.into(),
        kind,
        x: 0.0,
        y: 0.0,
        width: 160.0,
        height: 100.0,
        z_index: 0,
        style: FieldStyle::default(),
    }
}

/// 160x100 card whose photo field covers the whole card
fn photo_template() -> Template {
    Template {
        id: "photo-card".into(),
        base_image: BaseImageRef {
            bucket: "templates".into(),
            id: "card-base".into(),
        },
        image_meta: ImageMeta {
            width: 160,
            height: 100,
        },
        fields: vec![field("photo", FieldKind::Image), field("name", FieldKind::Text)],
        mapping: [("photo", "Photo"), ("name", "Name")]
            .into_iter()
            .map(|(f, c)| (f.to_string(), c.to_string()))
            .collect(),
    }
}

/// Record `i` shows a photo with red channel `i * 10`
fn seeded_store(count: usize) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.insert(
        "templates",
        "card-base",
        png(160, 100, Rgba([255, 255, 255, 255])),
    );
    for i in 0..count {
        store.insert(
            "photos",
            &format!("p{}", i),
            png(2, 2, Rgba([(i * 10) as u8, 0, 0, 255])),
        );
    }
    Arc::new(store)
}

fn records(count: usize) -> Vec<DataRecord> {
    (0..count)
        .map(|i| {
            [
                ("Name", format!("Guest {}", i)),
                ("Photo", format!("/files/photos/p{}", i)),
            ]
            .into_iter()
            .collect()
        })
        .collect()
}

fn runtime_with(store: Arc<dyn ObjectStore>, dataset_dir: &Path, binary: &str) -> CardRuntime {
    let sources = ImageSources::new(store, Arc::new(NoFetch));
    let composer = Composer::new(
        sources,
        Arc::new(FontBook::empty()),
        ComposeOptions::default(),
    );
    let converter = CmykConverter::new(CmykOptions {
        binary: binary.to_string(),
        timeout_secs: 30,
        ..CmykOptions::default()
    });
    CardRuntime::new(
        composer,
        Arc::new(CsvDirectory::new(dataset_dir)),
        converter,
    )
}

fn runtime(store: Arc<MemoryStore>) -> CardRuntime {
    runtime_with(store, Path::new("no-such-datasets"), "cardt-missing-gs")
}

fn options(workers: usize, color_mode: ColorMode) -> BatchOptions {
    BatchOptions {
        workers,
        color_mode,
        ..BatchOptions::default()
    }
}

fn card_red(doc: &Document, page_id: ObjectId, index: usize) -> Option<u8> {
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let id = xobjects
        .get(format!("Card{}", index).as_bytes())
        .ok()?
        .as_reference()
        .unwrap();
    let stream = doc.get_object(id).unwrap().as_stream().unwrap();
    let pixels = stream.decompressed_content().unwrap();
    Some(pixels[0])
}

fn assert_near(actual: Option<u8>, expected: usize) {
    let actual = actual.expect("card missing from page") as i32;
    assert!(
        (actual - expected as i32).abs() <= 2,
        "expected red {} got {}",
        expected,
        actual
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_pages_keep_row_order() {
    let runtime = runtime(seeded_store(13));
    let (tx, _rx) = mpsc::unbounded_channel();

    let output = runtime
        .render_batch(
            &photo_template(),
            records(13),
            &options(4, ColorMode::Rgb),
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(output.plan.cards_per_page, 12);
    assert_eq!(output.stats.pages, 2);
    assert_eq!(output.stats.empty_cells_last_page, 11);
    assert_eq!(output.color_mode, ColorMode::Rgb);
    assert!(!output.fully_converted);

    let doc = Document::load_mem(&output.document).unwrap();
    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    assert_eq!(pages.len(), 2);
    for i in 0..12 {
        assert_near(card_red(&doc, pages[0], i), i * 10);
    }
    assert_near(card_red(&doc, pages[1], 12), 120);
    assert_eq!(card_red(&doc, pages[1], 0), None);
}

#[tokio::test]
async fn test_single_worker_matches_pool() {
    let runtime = runtime(seeded_store(5));
    let (tx, _rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let serial = runtime
        .render_batch(&photo_template(), records(5), &options(1, ColorMode::Rgb), &tx, &cancel)
        .await
        .unwrap();
    let pooled = runtime
        .render_batch(&photo_template(), records(5), &options(8, ColorMode::Rgb), &tx, &cancel)
        .await
        .unwrap();
    assert_eq!(serial.document, pooled.document);
}

#[tokio::test]
async fn test_progress_updates() {
    let runtime = runtime(seeded_store(5));
    let (tx, mut rx) = mpsc::unbounded_channel();

    runtime
        .render_batch(
            &photo_template(),
            records(5),
            &options(2, ColorMode::Rgb),
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    drop(tx);

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }

    let rendering: Vec<(usize, usize)> = updates
        .iter()
        .filter_map(|u| match u {
            JobUpdate::Progress {
                operation,
                current,
                total,
            } if operation == "Rendering cards" => Some((*current, *total)),
            _ => None,
        })
        .collect();
    assert_eq!(rendering.first(), Some(&(0, 5)));
    assert_eq!(rendering.last(), Some(&(5, 5)));
    assert_eq!(
        updates.last(),
        Some(&JobUpdate::Complete {
            pages: 1,
            color_mode: ColorMode::Rgb,
            fully_converted: false,
        })
    );
}

#[tokio::test]
async fn test_cancelled_job_returns_no_document() {
    let runtime = runtime(seeded_store(3));
    let (tx, _rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = runtime
        .render_batch(&photo_template(), records(3), &BatchOptions::default(), &tx, &cancel)
        .await;
    assert!(matches!(result, Err(JobError::Cancelled)));
}

/// Serves the base image but never answers photo reads
struct StallingStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl ObjectStore for StallingStore {
    async fn read_by_id(
        &self,
        bucket: &str,
        id: &str,
    ) -> std::result::Result<Vec<u8>, StoreError> {
        if bucket == "photos" {
            std::future::pending::<()>().await;
        }
        self.inner.read_by_id(bucket, id).await
    }

    async fn write_buffer(
        &self,
        bucket: &str,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> std::result::Result<String, StoreError> {
        self.inner
            .write_buffer(bucket, bytes, filename, content_type)
            .await
    }
}

#[tokio::test]
async fn test_cancel_while_rendering() {
    let store = Arc::new(StallingStore {
        inner: seeded_store(4),
    });
    let runtime = runtime_with(store, Path::new("no-such-datasets"), "cardt-missing-gs");
    let (tx, _rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        runtime.render_batch(&photo_template(), records(4), &options(2, ColorMode::Rgb), &tx, &cancel),
    )
    .await
    .expect("cancellation did not stop the job");
    assert!(matches!(result, Err(JobError::Cancelled)));
}

#[tokio::test]
async fn test_cmyk_without_converter_delivers_rgb() {
    let runtime = runtime(seeded_store(2));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let output = runtime
        .render_batch(
            &photo_template(),
            records(2),
            &options(2, ColorMode::Cmyk),
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    drop(tx);

    assert_eq!(output.color_mode, ColorMode::Rgb);
    assert!(!output.fully_converted);
    assert!(output.conversion_error.is_none());

    let mut fell_back = false;
    while let Some(update) = rx.recv().await {
        fell_back |= matches!(update, JobUpdate::ConversionFallback { .. });
    }
    assert!(fell_back);

    // Print marks are requested in CMYK mode even when the pages stay RGB
    let report = validate(&output.document).unwrap();
    assert!(report.has_rgb);
    assert!(report.is_cmyk);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_conversion_falls_back_to_rgb() {
    // `sleep` passes the probe but rejects Ghostscript arguments
    if !probe_converter("sleep").await {
        return;
    }
    let runtime = runtime_with(seeded_store(1), Path::new("no-such-datasets"), "sleep");
    let (tx, _rx) = mpsc::unbounded_channel();

    let output = runtime
        .render_batch(
            &photo_template(),
            records(1),
            &options(1, ColorMode::Cmyk),
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(output.color_mode, ColorMode::Rgb);
    assert!(output.conversion_error.is_some());
    assert!(Document::load_mem(&output.document).is_ok());
}

#[tokio::test]
async fn test_empty_dataset_gives_blank_page() {
    let runtime = runtime(seeded_store(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let output = runtime
        .render_batch(
            &photo_template(),
            Vec::new(),
            &options(2, ColorMode::Rgb),
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    drop(tx);

    assert_eq!(output.stats.cards, 0);
    assert_eq!(output.stats.pages, 0);
    assert_eq!(output.stats.cards_per_page, output.plan.cards_per_page);

    let doc = Document::load_mem(&output.document).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    let mut completed = false;
    while let Some(update) = rx.recv().await {
        if let JobUpdate::Complete { pages, .. } = update {
            assert_eq!(pages, 0);
            completed = true;
        }
    }
    assert!(completed);
}

#[tokio::test]
async fn test_degenerate_layout_is_terminal() {
    let runtime = runtime(seeded_store(1));
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut batch = options(1, ColorMode::Rgb);
    batch.layout.paper = PaperSize::Custom {
        width_mm: 50.0,
        height_mm: 50.0,
    };

    let result = runtime
        .render_batch(&photo_template(), records(1), &batch, &tx, &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(JobError::LayoutDegenerate(_))));
}

#[tokio::test]
async fn test_missing_base_image_is_terminal() {
    let runtime = runtime(Arc::new(MemoryStore::new()));
    let (tx, _rx) = mpsc::unbounded_channel();

    let result = runtime
        .render_batch(
            &photo_template(),
            records(1),
            &BatchOptions::default(),
            &tx,
            &CancellationToken::new(),
        )
        .await;
    assert!(matches!(
        result,
        Err(JobError::Compose(ComposeError::TemplateNotFound(_)))
    ));
}

#[tokio::test]
async fn test_run_batch_from_csv_dataset() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("guests.csv"),
        "Name,Photo\nAda,/files/photos/p0\nGrace,/files/photos/p1\n",
    )
    .unwrap();
    let runtime = runtime_with(seeded_store(2), dir.path(), "cardt-missing-gs");
    let (tx, _rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let output = runtime
        .run_batch(&photo_template(), "guests", &options(2, ColorMode::Rgb), &tx, &cancel)
        .await
        .unwrap();
    assert_eq!(output.stats.cards, 2);
    assert_eq!(output.stats.pages, 1);

    let missing = runtime
        .run_batch(&photo_template(), "absent", &options(2, ColorMode::Rgb), &tx, &cancel)
        .await;
    assert!(matches!(
        missing,
        Err(JobError::Compose(ComposeError::DatasetNotFound(_)))
    ));
}

#[tokio::test]
async fn test_preview_and_delivery() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("guests.csv"), "Name,Photo\nAda,/files/photos/p1\n").unwrap();
    let store = seeded_store(2);
    let runtime = runtime_with(store.clone(), dir.path(), "cardt-missing-gs");

    let card = runtime
        .preview_row(&photo_template(), "guests", 0)
        .await
        .unwrap();
    assert_eq!((card.width, card.height), (160, 100));

    // Rows past the end still render
    let blank = runtime
        .preview_row(&photo_template(), "guests", 7)
        .await
        .unwrap();
    assert_eq!((blank.width, blank.height), (160, 100));

    let id = deliver_preview(store.as_ref(), "previews", "ada.png", &card)
        .await
        .unwrap();
    assert_eq!(store.read_by_id("previews", &id).await.unwrap(), card.png);
    assert_eq!(
        store.metadata("previews", &id),
        Some(("ada.png".to_string(), PNG_CONTENT_TYPE.to_string()))
    );

    let (tx, _rx) = mpsc::unbounded_channel();
    let output = runtime
        .render_batch(
            &photo_template(),
            records(2),
            &options(2, ColorMode::Rgb),
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let id = deliver_batch(store.as_ref(), "batches", "guests.pdf", &output)
        .await
        .unwrap();
    assert_eq!(store.read_by_id("batches", &id).await.unwrap(), output.document);
    assert_eq!(
        store.metadata("batches", &id).map(|(_, content_type)| content_type),
        Some(PDF_CONTENT_TYPE.to_string())
    );
}

#[test]
fn test_plan_for_template_uses_recorded_size() {
    let plan = plan_for_template(&photo_template(), &BatchOptions::default());
    assert_eq!(plan.cards_per_page, 12);
}
