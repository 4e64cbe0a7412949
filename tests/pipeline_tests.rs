use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stylematch::color::Rgb;
use stylematch::config::Config;
use stylematch::data_models::{
    AnalysisResult, DominantColor, Label, RawSearchItem, RawVisionOutput,
};
use stylematch::error::{AppError, ServiceError};
use stylematch::pipeline::{Pipeline, PipelineStage, ResultOrigin};
use stylematch::rng::RandomSource;
use stylematch::search::SearchService;
use stylematch::vision::VisionService;

mod test_helpers {
    use super::*;

    pub fn test_config() -> Config {
        Config {
            random_source: RandomSource::Seeded(42),
            retry_backoff: Duration::from_millis(1),
            max_retries: 2,
            ..Config::default()
        }
    }

    pub fn vision_output(labels: &[&str], colors: &[(u8, u8, u8)]) -> RawVisionOutput {
        RawVisionOutput {
            labels: labels
                .iter()
                .map(|l| Label {
                    description: l.to_string(),
                    confidence: 0.9,
                })
                .collect(),
            colors: colors
                .iter()
                .enumerate()
                .map(|(i, &(r, g, b))| DominantColor {
                    rgb: Rgb::new(r, g, b),
                    score: 1.0 - i as f32 * 0.1,
                    pixel_fraction: 0.2,
                })
                .collect(),
            web_entities: vec![],
        }
    }

    pub fn search_item(title: &str, host: &str) -> RawSearchItem {
        RawSearchItem {
            title: Some(title.to_string()),
            link: Some(format!("https://{host}/p/1")),
            display_link: Some(host.to_string()),
            ..Default::default()
        }
    }

    pub fn unavailable() -> ServiceError {
        ServiceError::UnexpectedStatus {
            status: StatusCode::SERVICE_UNAVAILABLE,
            text: "backend error".to_string(),
        }
    }

    pub struct StaticVision(pub RawVisionOutput);

    #[async_trait]
    impl VisionService for StaticVision {
        async fn analyze(&self, _image: &[u8]) -> Result<RawVisionOutput, AppError> {
            Ok(self.0.clone())
        }
    }

    pub struct FailingVision;

    #[async_trait]
    impl VisionService for FailingVision {
        async fn analyze(&self, _image: &[u8]) -> Result<RawVisionOutput, AppError> {
            Err(AppError::VisionUnavailable(ServiceError::NotConfigured))
        }
    }

    /// Fails `failures` times with a transient error, then returns `items`.
    pub struct ScriptedSearch {
        pub items: Vec<RawSearchItem>,
        pub failures: u32,
        pub calls: AtomicU32,
        pub queries: Mutex<Vec<String>>,
    }

    impl ScriptedSearch {
        pub fn ok(items: Vec<RawSearchItem>) -> Self {
            Self::flaky(items, 0)
        }

        pub fn flaky(items: Vec<RawSearchItem>, failures: u32) -> Self {
            Self {
                items,
                failures,
                calls: AtomicU32::new(0),
                queries: Mutex::new(vec![]),
            }
        }

        pub fn down() -> Self {
            Self::flaky(vec![], u32::MAX)
        }
    }

    #[async_trait]
    impl SearchService for ScriptedSearch {
        async fn search(&self, query: &str, _count: usize) -> Result<Vec<RawSearchItem>, AppError> {
            self.queries.lock().unwrap().push(query.to_string());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(AppError::SearchUnavailable(unavailable()));
            }
            Ok(self.items.clone())
        }
    }

    pub fn assert_well_formed_products(result: &AnalysisResult) {
        for product in &result.products {
            assert!(!product.id.is_empty());
            assert!(product.price >= 0.0, "negative price {}", product.price);
            assert!(!product.currency.is_empty());
            assert!(!product.image_url.is_empty());
            assert!((0.0..=1.0).contains(&product.similarity));
        }
        assert!(
            result
                .products
                .windows(2)
                .all(|w| w[0].similarity >= w[1].similarity)
        );
        let mut ids: Vec<&str> = result.products.iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), result.products.len());
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_live_analysis_end_to_end() {
    let vision = StaticVision(vision_output(
        &["red dress", "floral pattern", "elegant"],
        &[(220, 20, 30), (250, 250, 250)],
    ));
    let search = Arc::new(ScriptedSearch::ok(vec![
        search_item("Zara - Robe fleurie rouge", "www.zara.com"),
        search_item("Mango | Robe midi 49,99 €", "shop.mango.com"),
        search_item("Robe", "www.asos.com"),
    ]));
    let pipeline = Pipeline::new(Arc::new(vision), search.clone(), &test_config());

    let analysis = pipeline.analyze(b"jpeg bytes").await;
    assert_eq!(analysis.origin, ResultOrigin::Live);

    let attributes = &analysis.result.attributes;
    assert_eq!(attributes.category, "robe");
    assert_eq!(attributes.pattern, "fleuri");
    assert_eq!(attributes.style, "élégant");
    assert_eq!(attributes.color_name, "rouge");
    assert_eq!(attributes.colors.len(), 2);

    assert_eq!(
        search.queries.lock().unwrap().as_slice(),
        ["rouge robe fleuri élégant acheter vêtement"]
    );
    assert_eq!(analysis.query.as_deref(), Some("rouge robe fleuri élégant acheter vêtement"));

    let products = &analysis.result.products;
    assert_eq!(products.len(), 3);
    assert!(products[0].similarity > products[1].similarity);
    assert!(products[1].similarity > products[2].similarity);
    assert!(products.iter().all(|p| (0.35..=0.95).contains(&p.similarity)));

    assert_eq!(products[0].brand, "Zara");
    assert_eq!(products[0].name, "Robe fleurie rouge");
    assert_eq!(products[0].source, "Zara");
    assert_eq!(products[1].brand, "Mango");
    assert_eq!(products[1].price, 49.99);
    assert_eq!(products[1].currency, "€");
    assert_eq!(products[2].brand, "Marque inconnue");
    assert_eq!(products[2].product_url, "https://www.asos.com/p/1");
    assert_well_formed_products(&analysis.result);
}

#[tokio::test]
async fn test_no_labels_no_colors_uses_defaults() {
    let pipeline = Pipeline::new(
        Arc::new(StaticVision(RawVisionOutput::default())),
        Arc::new(ScriptedSearch::ok(vec![search_item("Basic tee", "example.com")])),
        &test_config(),
    );

    let result = pipeline.analyze_image(b"jpeg").await;
    assert_eq!(result.attributes.category, "vêtement");
    assert_eq!(result.attributes.pattern, "uni");
    assert_eq!(result.attributes.style, "décontracté");
    assert_eq!(result.attributes.color_name, "noir");
    assert_eq!(result.attributes.color_hex, "#000000");
}

#[tokio::test]
async fn test_search_failure_falls_back() {
    let search = Arc::new(ScriptedSearch::down());
    let pipeline = Pipeline::new(
        Arc::new(StaticVision(vision_output(&["jeans"], &[(0, 0, 200)]))),
        search.clone(),
        &test_config(),
    );

    let analysis = pipeline.analyze(b"jpeg").await;
    match &analysis.origin {
        ResultOrigin::Fallback { failed_at, reason } => {
            assert_eq!(*failed_at, PipelineStage::Searching);
            assert!(reason.contains("Search service unavailable"));
        }
        other => panic!("expected fallback, got {other:?}"),
    }
    assert!(analysis.query.is_none());
    assert!(!analysis.result.products.is_empty());
    assert_well_formed_products(&analysis.result);

    // first attempt plus two retries
    assert_eq!(search.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_vision_failure_skips_search() {
    let search = Arc::new(ScriptedSearch::ok(vec![search_item("x", "example.com")]));
    let pipeline = Pipeline::new(Arc::new(FailingVision), search.clone(), &test_config());

    let analysis = pipeline.analyze(b"jpeg").await;
    assert!(matches!(
        analysis.origin,
        ResultOrigin::Fallback {
            failed_at: PipelineStage::Classifying,
            ..
        }
    ));
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    assert_eq!(analysis.result.products.len(), 8);
    assert_well_formed_products(&analysis.result);
}

#[tokio::test]
async fn test_transient_search_failure_is_retried() {
    let search = Arc::new(ScriptedSearch::flaky(
        vec![search_item("Uniqlo - Pull col rond", "www.uniqlo.com")],
        1,
    ));
    let pipeline = Pipeline::new(
        Arc::new(StaticVision(vision_output(&["sweater"], &[(128, 128, 128)]))),
        search.clone(),
        &test_config(),
    );

    let analysis = pipeline.analyze(b"jpeg").await;
    assert_eq!(analysis.origin, ResultOrigin::Live);
    assert_eq!(search.calls.load(Ordering::SeqCst), 2);
    assert_eq!(analysis.result.attributes.category, "pull");
    assert_eq!(analysis.result.products[0].brand, "Uniqlo");
}

#[tokio::test]
async fn test_empty_search_is_a_live_result() {
    let pipeline = Pipeline::new(
        Arc::new(StaticVision(vision_output(&["skirt"], &[]))),
        Arc::new(ScriptedSearch::ok(vec![])),
        &test_config(),
    );

    let analysis = pipeline.analyze(b"jpeg").await;
    assert_eq!(analysis.origin, ResultOrigin::Live);
    assert_eq!(analysis.result.attributes.category, "jupe");
    assert!(analysis.result.products.is_empty());
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible() {
    let build = || {
        Pipeline::new(
            Arc::new(FailingVision),
            Arc::new(ScriptedSearch::down()),
            &test_config(),
        )
    };

    let first = build().analyze_image(b"jpeg").await;
    let second = build().analyze_image(b"jpeg").await;
    assert_eq!(first, second);

    let live = || {
        Pipeline::new(
            Arc::new(StaticVision(vision_output(&["coat"], &[(90, 40, 30)]))),
            Arc::new(ScriptedSearch::ok(vec![search_item("Manteau", "example.com")])),
            &test_config(),
        )
    };
    assert_eq!(live().analyze_image(b"a").await, live().analyze_image(b"a").await);
}
