//! Integration tests for both pipelines, run entirely against in-memory
//! fakes — no poppler, no browser, no S3. The adapter traits are the seams
//! the fakes plug into, exactly as a deployment would plug in the real ones.

use async_trait::async_trait;
use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use receipt_pipeline::rasterize::convert::PageConverter;
use receipt_pipeline::{
    ChargedCompany, Company, DocumentRasterizer, ErrorKind, HtmlRenderer, ObjectStorage,
    PageImage, PipelineError, PopplerConverter, RasterizerConfig, Receipt, ReceiptStore,
    ReportComposer, RepresentedPerson, User,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────

/// Wire tracing output into the test harness (`RUST_LOG` controls level).
fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a minimal valid PDF with `n` empty pages.
fn pdf_with_pages(n: usize) -> Vec<u8> {
    use lopdf::{dictionary, Document, Object};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..n)
        .map(|_| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => n as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("in-memory save");
    buf
}

/// Solid-gray PNG whose brightness encodes the page number, so output order
/// can be asserted after resize and JPEG re-encode.
fn page_png(page: u32) -> Vec<u8> {
    let shade = (page * 20).min(255) as u8;
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 80, Rgb([shade, shade, shade])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Read back the page number encoded by [`page_png`], tolerating JPEG loss.
fn decoded_page(jpeg: &[u8]) -> u32 {
    let img = image::load_from_memory(jpeg).unwrap().to_rgb8();
    let shade = img.get_pixel(img.width() / 2, img.height() / 2)[0] as u32;
    (shade + 10) / 20
}

/// Converter fake that writes unpadded page files straight into the workdir.
struct FakeConverter {
    filenames: Vec<String>,
}

impl FakeConverter {
    fn pages(n: u32) -> Self {
        Self {
            // Deliberately not in page order; directory listing order is
            // arbitrary anyway.
            filenames: (1..=n).rev().map(|i| format!("page-{i}.png")).collect(),
        }
    }

    fn named(filenames: &[&str]) -> Self {
        Self {
            filenames: filenames.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl PageConverter for FakeConverter {
    async fn convert_pages(
        &self,
        _document: &Path,
        out_dir: &Path,
        _dpi: u32,
    ) -> Result<(), PipelineError> {
        for name in &self.filenames {
            let page = name
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse()
                .unwrap_or(1);
            std::fs::write(out_dir.join(name), page_png(page)).unwrap();
        }
        Ok(())
    }
}

/// Storage fake that records every store call.
#[derive(Default)]
struct MemoryStorage {
    batches: Mutex<Vec<usize>>,
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn store_pages(
        &self,
        pages: &[Vec<u8>],
        _content_type: &str,
    ) -> Result<Vec<String>, PipelineError> {
        self.batches.lock().unwrap().push(pages.len());
        Ok((0..pages.len())
            .map(|i| format!("https://store.example/obj-{i}"))
            .collect())
    }
}

impl MemoryStorage {
    fn upload_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

fn rasterizer(
    converter: impl PageConverter + 'static,
    config: RasterizerConfig,
) -> (DocumentRasterizer, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::default());
    let r = DocumentRasterizer::new(Arc::new(converter), storage.clone(), config);
    (r, storage)
}

/// Config whose temp dirs land in `root`, so cleanup can be asserted.
fn config_in(root: &Path) -> RasterizerConfig {
    RasterizerConfig::builder().workdir_root(root).build().unwrap()
}

fn assert_no_leftover_dirs(root: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(root).unwrap().collect();
    assert!(
        leftovers.is_empty(),
        "temp dirs left behind: {leftovers:?}"
    );
}

// ── Ingest pipeline ──────────────────────────────────────────────────────

#[tokio::test]
async fn rasterize_preserves_page_count_and_order() {
    init_logging();
    let root = tempfile::tempdir().unwrap();
    let (r, _) = rasterizer(FakeConverter::pages(4), config_in(root.path()));

    let pages = r.rasterize(pdf_with_pages(4)).await.unwrap();
    assert_eq!(pages.len(), 4);
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(decoded_page(page), i as u32 + 1, "element {i}");
        let img = image::load_from_memory(page).unwrap();
        assert_eq!(img.height(), 1122);
    }
    assert_no_leftover_dirs(root.path());
}

#[tokio::test]
async fn ten_pages_sort_numerically_not_lexically() {
    // page-10 must not land before page-2.
    let root = tempfile::tempdir().unwrap();
    let (r, _) = rasterizer(FakeConverter::pages(10), config_in(root.path()));

    let pages = r.rasterize(pdf_with_pages(10)).await.unwrap();
    let order: Vec<u32> = pages.iter().map(|p| decoded_page(p)).collect();
    assert_eq!(order, (1..=10).collect::<Vec<u32>>());
}

#[tokio::test]
async fn oversized_document_fails_validation_and_uploads_nothing() {
    let root = tempfile::tempdir().unwrap();
    let (r, storage) = rasterizer(FakeConverter::pages(1), config_in(root.path()));

    let err = r.ingest(vec![0u8; 60 * 1024 * 1024]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(storage.upload_count(), 0);
    assert_no_leftover_dirs(root.path());
}

#[tokio::test]
async fn over_long_document_fails_validation() {
    let root = tempfile::tempdir().unwrap();
    let (r, storage) = rasterizer(FakeConverter::pages(1), config_in(root.path()));

    let err = r.ingest(pdf_with_pages(200)).await.unwrap_err();
    assert!(matches!(err, PipelineError::DocumentTooLong { pages: 200, .. }));
    assert_eq!(storage.upload_count(), 0);
    assert_no_leftover_dirs(root.path());
}

#[tokio::test]
async fn zero_output_pages_is_a_render_error() {
    let root = tempfile::tempdir().unwrap();
    let (r, storage) = rasterizer(FakeConverter::named(&[]), config_in(root.path()));

    let err = r.ingest(pdf_with_pages(1)).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoPagesProduced));
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(storage.upload_count(), 0);
    assert_no_leftover_dirs(root.path());
}

#[tokio::test]
async fn page_file_without_digits_fails_fast() {
    let root = tempfile::tempdir().unwrap();
    let (r, storage) = rasterizer(
        FakeConverter::named(&["page-one.png"]),
        config_in(root.path()),
    );

    let err = r.ingest(pdf_with_pages(1)).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnnumberedPageFile { .. }));
    assert_eq!(storage.upload_count(), 0);
    assert_no_leftover_dirs(root.path());
}

#[tokio::test]
async fn corrupt_page_image_aborts_the_batch() {
    struct CorruptPageConverter;

    #[async_trait]
    impl PageConverter for CorruptPageConverter {
        async fn convert_pages(
            &self,
            _document: &Path,
            out_dir: &Path,
            _dpi: u32,
        ) -> Result<(), PipelineError> {
            std::fs::write(out_dir.join("page-1.png"), page_png(1)).unwrap();
            std::fs::write(out_dir.join("page-2.png"), b"broken").unwrap();
            Ok(())
        }
    }

    let root = tempfile::tempdir().unwrap();
    let (r, storage) = rasterizer(CorruptPageConverter, config_in(root.path()));

    let err = r.ingest(pdf_with_pages(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Processing);
    assert_eq!(storage.upload_count(), 0);
    assert_no_leftover_dirs(root.path());
}

#[cfg(unix)]
#[tokio::test]
async fn hung_converter_times_out_and_cleans_up() {
    use std::os::unix::fs::PermissionsExt;

    init_logging();

    // A converter that never finishes within the 1-second bound.
    let bin_dir = tempfile::tempdir().unwrap();
    let script = bin_dir.path().join("slow-converter");
    std::fs::write(&script, "#!/bin/sh\nexec sleep 5\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let root = tempfile::tempdir().unwrap();
    let config = RasterizerConfig::builder()
        .workdir_root(root.path())
        .converter_path(&script)
        .converter_timeout_secs(1)
        .build()
        .unwrap();
    let (r, storage) = rasterizer(PopplerConverter::new(&config), config);

    let err = r.ingest(pdf_with_pages(1)).await.unwrap_err();
    assert!(matches!(err, PipelineError::ConverterTimeout { secs: 1 }));
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(storage.upload_count(), 0);
    assert_no_leftover_dirs(root.path());
}

#[tokio::test]
async fn ingest_returns_one_uri_per_page_in_order() {
    let root = tempfile::tempdir().unwrap();
    let (r, storage) = rasterizer(FakeConverter::pages(3), config_in(root.path()));

    let urls = r.ingest(pdf_with_pages(3)).await.unwrap();
    assert_eq!(urls.len(), 3);
    assert_eq!(storage.upload_count(), 1);
    assert_eq!(urls[0], "https://store.example/obj-0");
    assert_eq!(urls[2], "https://store.example/obj-2");
}

// ── Report pipeline ──────────────────────────────────────────────────────

struct MemoryStore {
    receipts: HashMap<i64, Receipt>,
    users: HashMap<i64, User>,
    companies: HashMap<i64, Company>,
    represented: Vec<RepresentedPerson>,
    charged: Vec<ChargedCompany>,
    images: Vec<PageImage>,
    notes: HashMap<i64, String>,
    batched_lookups: AtomicUsize,
}

impl MemoryStore {
    fn with_receipt(receipt: Receipt) -> Self {
        let mut users = HashMap::new();
        users.insert(
            3,
            User {
                user_id: 3,
                first_name: "Anna".into(),
                email: "anna@example.se".into(),
                company_id: 1,
            },
        );
        let mut companies = HashMap::new();
        companies.insert(
            1,
            Company {
                company_id: 1,
                company_name: "Nord AB".into(),
            },
        );
        companies.insert(
            2,
            Company {
                company_id: 2,
                company_name: "Syd AB".into(),
            },
        );
        let mut receipts = HashMap::new();
        receipts.insert(receipt.receipt_id, receipt);
        Self {
            receipts,
            users,
            companies,
            represented: Vec::new(),
            charged: Vec::new(),
            images: Vec::new(),
            notes: HashMap::new(),
            batched_lookups: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ReceiptStore for MemoryStore {
    async fn receipt_by_id(&self, receipt_id: i64) -> Result<Option<Receipt>, PipelineError> {
        Ok(self.receipts.get(&receipt_id).cloned())
    }

    async fn user_by_id(&self, user_id: i64) -> Result<Option<User>, PipelineError> {
        Ok(self.users.get(&user_id).cloned())
    }

    async fn company_by_id(&self, company_id: i64) -> Result<Option<Company>, PipelineError> {
        Ok(self.companies.get(&company_id).cloned())
    }

    async fn companies_by_ids(&self, company_ids: &[i64]) -> Result<Vec<Company>, PipelineError> {
        self.batched_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(company_ids
            .iter()
            .filter_map(|id| self.companies.get(id).cloned())
            .collect())
    }

    async fn represented_for_receipt(
        &self,
        receipt_id: i64,
    ) -> Result<Vec<RepresentedPerson>, PipelineError> {
        Ok(self
            .represented
            .iter()
            .filter(|r| r.receipt_id == receipt_id)
            .cloned()
            .collect())
    }

    async fn charged_for_receipt(
        &self,
        receipt_id: i64,
    ) -> Result<Vec<ChargedCompany>, PipelineError> {
        Ok(self
            .charged
            .iter()
            .filter(|c| c.receipt_id == receipt_id)
            .cloned()
            .collect())
    }

    async fn images_for_receipt(&self, receipt_id: i64) -> Result<Vec<PageImage>, PipelineError> {
        Ok(self
            .images
            .iter()
            .filter(|i| i.receipt_id == receipt_id)
            .cloned()
            .collect())
    }

    async fn note_for_receipt(&self, receipt_id: i64) -> Result<Option<String>, PipelineError> {
        Ok(self.notes.get(&receipt_id).cloned())
    }
}

/// Renderer fake that counts invocations.
#[derive(Default)]
struct CountingRenderer {
    calls: AtomicUsize,
}

#[async_trait]
impl HtmlRenderer for CountingRenderer {
    async fn render_pdf(&self, _html: &str) -> Result<Vec<u8>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(b"%PDF-1.7 fake".to_vec())
    }
}

fn receipt() -> Receipt {
    Receipt {
        receipt_id: 9,
        creation_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
        receipt_date: NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
        user_id: 3,
        company_card: false,
        net: 400.0,
        tax: -25.0,
        description: "Retur".into(),
    }
}

fn composer(store: MemoryStore) -> (ReportComposer, Arc<CountingRenderer>) {
    let renderer = Arc::new(CountingRenderer::default());
    let c = ReportComposer::new(Arc::new(store), renderer.clone());
    (c, renderer)
}

#[tokio::test]
async fn missing_receipt_is_not_found_and_renderer_never_runs() {
    let (c, renderer) = composer(MemoryStore::with_receipt(receipt()));

    let err = c.compose(999).await.unwrap_err();
    assert!(matches!(err, PipelineError::ReceiptNotFound { receipt_id: 999 }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn compose_produces_pdf_and_total_includes_negative_tax() {
    let (c, renderer) = composer(MemoryStore::with_receipt(receipt()));

    let doc = c.compose(9).await.unwrap();
    assert!(!doc.pdf.is_empty());
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    // net 400.00, tax -25.00 → total 375.00
    assert!(doc.html.contains("<td>375.00</td>"), "{}", doc.html);
    assert!(doc.html.contains("Eget Utlägg"));
}

#[tokio::test]
async fn note_column_present_in_header_and_row_only_when_note_exists() {
    let mut store = MemoryStore::with_receipt(receipt());
    store.notes.insert(9, "Utlandsresa".into());
    let (c, _) = composer(store);
    let html = c.compose(9).await.unwrap().html;
    assert!(html.contains("<th>Övrigt</th>"));
    assert!(html.contains("<td>Utlandsresa</td>"));

    let (c, _) = composer(MemoryStore::with_receipt(receipt()));
    let html = c.compose(9).await.unwrap().html;
    assert!(!html.contains("Övrigt"));
}

#[tokio::test]
async fn charged_companies_resolve_in_one_batched_lookup() {
    let mut store = MemoryStore::with_receipt(receipt());
    store.charged = vec![
        ChargedCompany {
            receipt_id: 9,
            company_id: 1,
        },
        ChargedCompany {
            receipt_id: 9,
            company_id: 2,
        },
    ];
    let store = Arc::new(store);
    let renderer = Arc::new(CountingRenderer::default());
    let c = ReportComposer::new(store.clone(), renderer);

    let html = c.compose(9).await.unwrap().html;
    assert!(html.contains("Nord AB, Syd AB"));
    assert_eq!(store.batched_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn no_charges_means_no_company_lookup_at_all() {
    let store = Arc::new(MemoryStore::with_receipt(receipt()));
    let renderer = Arc::new(CountingRenderer::default());
    let c = ReportComposer::new(store.clone(), renderer);

    c.compose(9).await.unwrap();
    assert_eq!(store.batched_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn images_render_in_page_number_order_regardless_of_row_order() {
    let mut store = MemoryStore::with_receipt(receipt());
    store.images = vec![
        PageImage {
            receipt_id: 9,
            link: "https://img.example/p2".into(),
            page_number: 2,
        },
        PageImage {
            receipt_id: 9,
            link: "https://img.example/p1".into(),
            page_number: 1,
        },
    ];
    let (c, _) = composer(store);

    let html = c.compose(9).await.unwrap().html;
    let p1 = html.find("https://img.example/p1").unwrap();
    let p2 = html.find("https://img.example/p2").unwrap();
    assert!(p1 < p2);
}
