use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use reqwest::Client;

use crate::classifier::classify;
use crate::config::Config;
use crate::data_models::AnalysisResult;
use crate::error::AppError;
use crate::fallback::FallbackGenerator;
use crate::normalizer::{ResultNormalizer, SimilarityPolicy};
use crate::query::{Locale, build_query};
use crate::retry::RetryPolicy;
use crate::rng::RandomSource;
use crate::search::{GoogleSearchClient, SearchService};
use crate::vision::{GoogleVisionClient, VisionService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Classifying,
    QueryBuilt,
    Searching,
    Normalizing,
    FallbackGenerating,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Classifying => "classifying",
            PipelineStage::QueryBuilt => "query_built",
            PipelineStage::Searching => "searching",
            PipelineStage::Normalizing => "normalizing",
            PipelineStage::FallbackGenerating => "fallback_generating",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Whether a result came from the external services or from the fallback generator.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultOrigin {
    Live,
    Fallback {
        failed_at: PipelineStage,
        reason: String,
    },
}

impl ResultOrigin {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ResultOrigin::Fallback { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultOrigin::Live => "live",
            ResultOrigin::Fallback { .. } => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub origin: ResultOrigin,
    /// The search query, when the pipeline got far enough to build one.
    pub query: Option<String>,
}

/// Image in, attributes and similar products out.
///
/// Runs vision + classification, builds the query, searches and normalizes. Any failure of the
/// vision or search service is answered with a fully synthetic result instead, so callers always
/// get either an entirely real or an entirely generated [`AnalysisResult`].
pub struct Pipeline {
    vision: Arc<dyn VisionService>,
    search: Arc<dyn SearchService>,
    normalizer: ResultNormalizer,
    fallback: FallbackGenerator,
    retry: RetryPolicy,
    locale: Locale,
    result_count: usize,
    random_source: RandomSource,
}

impl Pipeline {
    pub fn new(
        vision: Arc<dyn VisionService>,
        search: Arc<dyn SearchService>,
        config: &Config,
    ) -> Self {
        let similarity = SimilarityPolicy::default();
        Self {
            vision,
            search,
            normalizer: ResultNormalizer::new(similarity),
            fallback: FallbackGenerator::new(similarity),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: config.retry_backoff,
            },
            locale: config.locale,
            result_count: config.search_result_count,
            random_source: config.random_source,
        }
    }

    /// Wires the Google clients up behind one HTTP client carrying the configured timeouts.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.http_timeout.min(std::time::Duration::from_secs(5)))
            .timeout(config.http_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        if config.vision_api_key.is_none() {
            tracing::warn!("GOOGLE_VISION_API_KEY is not set; analyses will use fallback data");
        }
        if config.search_api_key.is_none() || config.search_engine_id.is_none() {
            tracing::warn!("Custom Search is not configured; analyses will use fallback data");
        }

        let vision = Arc::new(GoogleVisionClient::new(http_client.clone(), config));
        let search = Arc::new(GoogleSearchClient::new(http_client, config));
        Ok(Self::new(vision, search, config))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_similarity(mut self, similarity: SimilarityPolicy) -> Self {
        self.normalizer = ResultNormalizer::new(similarity);
        self.fallback = FallbackGenerator::new(similarity);
        self
    }

    /// Never fails; [`Pipeline::analyze`] also reports where the result came from.
    pub async fn analyze_image(&self, image: &[u8]) -> AnalysisResult {
        self.analyze(image).await.result
    }

    pub async fn analyze(&self, image: &[u8]) -> Analysis {
        let mut rng = self.random_source.rng();
        let mut stage = PipelineStage::Idle;

        match self.run(image, &mut stage, &mut rng).await {
            Ok((result, query)) => {
                advance(&mut stage, PipelineStage::Done);
                tracing::info!(
                    products = result.products.len(),
                    category = %result.attributes.category,
                    "analysis complete"
                );
                Analysis {
                    result,
                    origin: ResultOrigin::Live,
                    query: Some(query),
                }
            }
            Err(error) => {
                let failed_at = stage;
                tracing::warn!(
                    stage = %failed_at,
                    error = %error,
                    "external service failed; serving fallback result"
                );
                advance(&mut stage, PipelineStage::FallbackGenerating);
                let result = self.fallback.generate(&mut rng);
                advance(&mut stage, PipelineStage::Done);
                Analysis {
                    result,
                    origin: ResultOrigin::Fallback {
                        failed_at,
                        reason: error.to_string(),
                    },
                    query: None,
                }
            }
        }
    }

    async fn run(
        &self,
        image: &[u8],
        stage: &mut PipelineStage,
        rng: &mut StdRng,
    ) -> Result<(AnalysisResult, String), AppError> {
        advance(stage, PipelineStage::Classifying);
        let vision = self
            .retry
            .run("vision", || self.vision.analyze(image))
            .await?;
        let attributes = classify(&vision);

        let query = build_query(&attributes, self.locale);
        advance(stage, PipelineStage::QueryBuilt);
        tracing::debug!(query = %query, "built search query");

        advance(stage, PipelineStage::Searching);
        let items = self
            .retry
            .run("search", || self.search.search(&query, self.result_count))
            .await?;

        advance(stage, PipelineStage::Normalizing);
        let products = self.normalizer.normalize(&items, &attributes, rng);

        Ok((
            AnalysisResult {
                attributes,
                products,
            },
            query,
        ))
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    tracing::debug!(from = %stage, to = %next, "pipeline stage");
    *stage = next;
}
