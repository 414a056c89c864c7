//! Query orchestration.
//!
//! One inbound query runs as a single sequential flow against one corpus
//! snapshot and one deadline:
//! 1. Embed the normalized question (mandatory, fails closed)
//! 2. Retrieve candidates and apply the lexical gate
//! 3. Optionally rewrite the query and retry when retrieval came back empty
//! 4. Intent adjustments, strong boost, exact-year preference
//! 5. Optional LLM rerank
//! 6. Confidence gate
//! 7. Optional LLM rewrite of a direct answer
//!
//! Every optional step fails open; only the embedding step can fail a request.

use crate::answer::{
    build_snippet, could_not_open_message, format_answer, no_results_tip, refine_message,
    ChoiceOption, CHOICES_MESSAGE,
};
use crate::augment::{Augmenter, GenerationOutcome};
use crate::corpus::{CorpusSnapshot, CorpusSource, CorpusStore};
use crate::deadline::{
    BudgetReport, BudgetScheduler, Clock, Deadline, Stage, StageDecision, StageOutcome,
    SystemClock,
};
use crate::embeddings::EmbeddingProvider;
use crate::gate::{ConfidenceGate, GateDecision};
use crate::intent::{prefer_exact_year, IntentRanker};
use crate::rag::types::{
    AskResponse, HealthReport, InboundQuery, LlmMeta, Outcome, Reply, ResolvedQuery,
    ResponseMeta, SuggestedAction,
};
use crate::retrieval::{lexical_gate, search_candidates, RetrievalParams};
use crate::summary::{enforce_summary_lines, summarize_locally};
use crate::text::normalize;
use crate::types::{CorpusStats, Document, Hit, RankingDebug, TimelineEntry};
use curator_core::{AppConfig, AppError, AppResult};
use curator_llm::LlmClient;
use curator_prompt::PromptLibrary;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

const HEALTH_PROBE_TEXT: &str = "probe";
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_millis(600);
const RANKING_DEBUG_LEN: usize = 5;

/// Per-request facts collected on the way to the outcome.
#[derive(Debug, Default)]
struct Trace {
    intent: Option<String>,
    rewritten_query: Option<String>,
    llm: LlmMeta,
    ranking: Vec<RankingDebug>,
    actions: Vec<SuggestedAction>,
}

/// The query-handling core. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct QueryEngine {
    config: Arc<AppConfig>,
    corpus: Arc<CorpusStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    augmenter: Augmenter,
    ranker: IntentRanker,
    gate: ConfidenceGate,
    retrieval: RetrievalParams,
    clock: Arc<dyn Clock>,
    /// Hard ceilings per external call, applied on top of the scheduler
    embed_ceiling: Duration,
    llm_ceiling: Duration,
}

impl QueryEngine {
    /// `llm` is ignored unless `llm.enabled` is set in `config`.
    pub fn new(
        config: AppConfig,
        corpus: Arc<CorpusStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Option<Arc<dyn LlmClient>>,
        prompts: PromptLibrary,
    ) -> Self {
        let llm = llm.filter(|_| config.llm.enabled);
        let augmenter = Augmenter::new(
            llm,
            Arc::new(prompts),
            config.search.snippet_chars,
            config.perf.rerank_max_candidates,
        );

        Self {
            ranker: IntentRanker::from_config(&config),
            gate: ConfidenceGate::new(&config.search, &config.disambiguation, &config.domain),
            retrieval: RetrievalParams::from(&config.search),
            embed_ceiling: Duration::from_millis(config.embed.timeout_ms),
            llm_ceiling: Duration::from_millis(config.llm.timeout_ms),
            config: Arc::new(config),
            corpus,
            embedder,
            augmenter,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock deadlines are measured with.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn corpus(&self) -> &Arc<CorpusStore> {
        &self.corpus
    }

    /// Answer one inbound query.
    pub async fn handle(&self, query: &InboundQuery) -> AppResult<AskResponse> {
        self.execute(query).await.0
    }

    /// Answer one inbound query as a transport-neutral reply. Never fails.
    pub async fn respond(&self, query: &InboundQuery) -> Reply {
        let (result, budget) = self.execute(query).await;

        let error = match result {
            Ok(response) => match serde_json::to_value(&response) {
                Ok(body) => return Reply { status: 200, body },
                Err(e) => AppError::from(e),
            },
            Err(e) => e,
        };

        match &error {
            AppError::InvalidRequest(_) => tracing::info!("Rejected query: {}", error),
            AppError::DependencyOffline(_) => tracing::warn!("Query failed: {}", error),
            _ => tracing::error!("Internal error while answering query: {}", error),
        }

        Reply {
            status: error.status_code(),
            body: serde_json::json!({
                "error": error.kind(),
                "message": error.public_message(),
                "meta": { "budget": budget },
            }),
        }
    }

    async fn execute(&self, query: &InboundQuery) -> (AppResult<AskResponse>, BudgetReport) {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("query", request_id = %request_id);

        let deadline = Deadline::start(
            Arc::clone(&self.clock),
            Duration::from_millis(self.config.perf.ask_budget_ms),
        );
        let mut sched = BudgetScheduler::new(deadline, &self.config.perf);

        let result = self
            .run(query, request_id, &mut sched)
            .instrument(span)
            .await;
        (result, sched.report())
    }

    async fn run(
        &self,
        query: &InboundQuery,
        request_id: String,
        sched: &mut BudgetScheduler,
    ) -> AppResult<AskResponse> {
        let resolved = query.resolve()?;
        // One snapshot for the whole request
        let snapshot = self.corpus.snapshot();

        tracing::info!(
            "Query received (generation {}): {:?}",
            snapshot.generation(),
            resolved.question
        );

        let mut trace = Trace {
            llm: LlmMeta {
                enabled: self.augmenter.is_enabled(),
                url: self.augmenter.endpoint().map(str::to_string),
                ..Default::default()
            },
            ..Default::default()
        };

        let (question, outcome) = match resolved.force_id {
            Some(id) => self.open(&resolved, id, &snapshot, sched, &mut trace).await,
            None => {
                let outcome = self.search(&resolved.question, &snapshot, sched, &mut trace).await?;
                (resolved.question.clone(), outcome)
            }
        };

        let budget = sched.report();
        tracing::info!(
            "Query answered: {} in {}ms ({}ms left)",
            outcome.kind(),
            budget.spent_ms,
            budget.left_ms
        );

        Ok(AskResponse {
            question,
            outcome,
            meta: ResponseMeta {
                request_id,
                generation: snapshot.generation(),
                budget,
                stages: sched.ledger().to_vec(),
                fired: sched.fired(),
                intent: trace.intent,
                rewritten_query: trace.rewritten_query,
                llm: trace.llm,
                ranking: trace.ranking,
                actions: trace.actions,
            },
        })
    }

    /// Run an embedding stage. `Ok(None)` only when the scheduler skipped it.
    async fn embed_stage(
        &self,
        text: &str,
        stage: Stage,
        sched: &mut BudgetScheduler,
    ) -> AppResult<Option<Vec<f32>>> {
        let timeout = match sched.plan(stage) {
            StageDecision::Attempt { timeout } => timeout.min(self.embed_ceiling),
            StageDecision::Skip { .. } => return Ok(None),
        };

        let result = match tokio::time::timeout(timeout, self.embedder.embed(text, timeout)).await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::DependencyOffline("embed timeout".to_string())),
        };

        match result {
            Ok(vector) => {
                sched.complete(stage, StageOutcome::Used, None);
                Ok(Some(vector))
            }
            Err(e) => {
                sched.complete(stage, StageOutcome::Failed, Some(e.to_string()));
                Err(e)
            }
        }
    }

    fn retrieve(&self, snapshot: &CorpusSnapshot, query: &str, vector: &[f32]) -> Vec<Hit> {
        lexical_gate(query, search_candidates(snapshot, query, vector, &self.retrieval))
    }

    fn wants_query_rewrite(&self, hits: &[Hit]) -> bool {
        if !self.augmenter.is_enabled() || !self.config.search.llm_query_expand {
            return false;
        }
        match hits.first() {
            None => true,
            Some(top) => {
                self.config.search.llm_query_rewrite_on_low_conf
                    && top.score < self.config.search.min_best_score
            }
        }
    }

    /// Rewrite the query and retry retrieval; keep the retry only if it improves things.
    async fn retry_with_rewrite(
        &self,
        question: &str,
        hits: Vec<Hit>,
        snapshot: &CorpusSnapshot,
        sched: &mut BudgetScheduler,
        trace: &mut Trace,
    ) -> Vec<Hit> {
        let timeout = match sched.plan(Stage::QueryRewrite) {
            StageDecision::Attempt { timeout } => timeout.min(self.llm_ceiling),
            StageDecision::Skip { .. } => return hits,
        };

        let rewrite = self.augmenter.rewrite_query(question, timeout).await;
        let rewritten = match (rewrite.used, rewrite.text) {
            (true, Some(text)) => text,
            _ => {
                let outcome = if rewrite.error.as_deref() == Some("unchanged")
                    || rewrite.error.as_deref() == Some("empty")
                {
                    StageOutcome::NotUsed
                } else {
                    StageOutcome::Failed
                };
                sched.complete(Stage::QueryRewrite, outcome, rewrite.error);
                return hits;
            }
        };
        sched.complete(Stage::QueryRewrite, StageOutcome::NotUsed, Some(rewritten.clone()));

        let vector = match self
            .embed_stage(&normalize(&rewritten), Stage::RetryEmbed, sched)
            .await
        {
            Ok(Some(vector)) => vector,
            Ok(None) => return hits,
            Err(e) => {
                tracing::warn!("Retry embedding failed, keeping original results: {}", e);
                return hits;
            }
        };

        let retried = self.retrieve(snapshot, &rewritten, &vector);
        let improved = match (hits.first(), retried.first()) {
            (None, Some(_)) => true,
            (Some(old), Some(new)) => new.score > old.score,
            _ => false,
        };

        if improved {
            tracing::info!("Adopted rewritten query {:?}", rewritten);
            sched.revise(Stage::QueryRewrite, StageOutcome::Used, None);
            trace.rewritten_query = Some(rewritten);
            retried
        } else {
            tracing::debug!("Rewritten query {:?} did not improve results", rewritten);
            sched.revise(
                Stage::RetryEmbed,
                StageOutcome::NotUsed,
                Some("no improvement".to_string()),
            );
            hits
        }
    }

    fn wants_rerank(&self, hits: &[Hit]) -> bool {
        let search = &self.config.search;
        if !self.augmenter.is_enabled() || !search.rerank_with_llm {
            return false;
        }
        let head = &hits[..hits.len().min(search.rerank_top_k)];
        head.len() >= 2 && head.iter().any(|h| h.doc.article_len() >= search.rerank_min_chars)
    }

    async fn rerank(
        &self,
        question: &str,
        mut hits: Vec<Hit>,
        sched: &mut BudgetScheduler,
    ) -> Vec<Hit> {
        let timeout = match sched.plan(Stage::Rerank) {
            StageDecision::Attempt { timeout } => timeout.min(self.llm_ceiling),
            StageDecision::Skip { .. } => return hits,
        };

        let rest = hits.split_off(hits.len().min(self.config.search.rerank_top_k));
        let reranked = self.augmenter.rerank(question, hits, timeout).await;

        let outcome = if reranked.used {
            StageOutcome::Used
        } else {
            StageOutcome::Failed
        };
        sched.complete(Stage::Rerank, outcome, None);

        let mut ordered = reranked.hits;
        ordered.extend(rest);
        ordered
    }

    async fn search(
        &self,
        question: &str,
        snapshot: &CorpusSnapshot,
        sched: &mut BudgetScheduler,
        trace: &mut Trace,
    ) -> AppResult<Outcome> {
        let vector = self
            .embed_stage(&normalize(question), Stage::Embed, sched)
            .await?
            .ok_or_else(|| AppError::Internal("embedding stage was skipped".to_string()))?;

        let mut hits = self.retrieve(snapshot, question, &vector);

        if self.wants_query_rewrite(&hits) {
            hits = self
                .retry_with_rewrite(question, hits, snapshot, sched, trace)
                .await;
        }

        let intent = self.ranker.detect(question);
        self.ranker.apply_adjustments(&mut hits, intent.as_ref());
        self.ranker.strong_boost(question, &mut hits);
        let mut hits = prefer_exact_year(question, hits);

        if self.wants_rerank(&hits) {
            hits = self.rerank(question, hits, sched).await;
        }

        trace.intent = intent.as_ref().map(|i| i.name.clone());
        trace.ranking = hits.iter().take(RANKING_DEBUG_LEN).map(RankingDebug::from).collect();

        let decision = self.gate.decide(question, &hits);
        tracing::debug!("Gate decision: {} over {} candidates", decision.name(), hits.len());

        let outcome = match decision {
            GateDecision::NoResults => Outcome::NoResultsTip {
                message: no_results_tip(question, &self.config.search.default_context),
            },
            GateDecision::Refine => Outcome::RefinePrompt {
                message: refine_message(&self.config.domain.refine_message, question),
            },
            GateDecision::Choices(options) => Outcome::MultiChoice {
                message: CHOICES_MESSAGE.to_string(),
                options: options
                    .iter()
                    .map(|h| ChoiceOption::from_document(&h.doc))
                    .collect(),
            },
            GateDecision::Direct(hit) => {
                let mode = intent
                    .as_ref()
                    .map(|i| i.prompt_mode.clone())
                    .unwrap_or_else(|| "natural".to_string());
                let answer = self
                    .direct_answer(&hit.doc, question, &mode, hit.score, sched, trace)
                    .await;

                if self.augmenter.is_enabled()
                    && hit.doc.article_len() >= self.config.llm.summarize_min_chars
                {
                    trace.actions.push(SuggestedAction::summarize(hit.id()));
                }

                Outcome::DirectAnswer {
                    answer,
                    document_id: hit.id(),
                }
            }
        };

        Ok(outcome)
    }

    /// Deterministic answer, rewritten by the generation backend when allowed.
    async fn direct_answer(
        &self,
        doc: &Document,
        question: &str,
        mode: &str,
        top_score: f32,
        sched: &mut BudgetScheduler,
        trace: &mut Trace,
    ) -> String {
        let answer = format_answer(doc, question, self.config.search.snippet_chars);
        trace.llm.prompt_mode = Some(mode.to_string());

        let eligible = self.augmenter.is_enabled()
            && doc.article_len() >= self.config.llm.summarize_min_chars
            && top_score >= self.config.llm.min_score_to_use;
        if !eligible {
            return answer;
        }

        let timeout = match sched.plan(Stage::AnswerRewrite) {
            StageDecision::Attempt { timeout } => timeout.min(self.llm_ceiling),
            StageDecision::Skip { .. } => return answer,
        };

        let generated = self.augmenter.rewrite_answer(doc, question, mode, timeout).await;
        let rewritten = self.record_generation(Stage::AnswerRewrite, &generated, sched, trace);
        match rewritten {
            Some(text) => format!("{}{}", text.trim(), self.config.llm.mark),
            None => answer,
        }
    }

    fn record_generation(
        &self,
        stage: Stage,
        generated: &GenerationOutcome,
        sched: &mut BudgetScheduler,
        trace: &mut Trace,
    ) -> Option<String> {
        trace.llm.used = generated.used;
        trace.llm.elapsed_ms = generated.elapsed_ms;
        trace.llm.error = generated.error.clone();
        trace.llm.prompt_chars = generated.prompt_chars;

        let text = generated
            .text
            .clone()
            .filter(|t| generated.used && !t.trim().is_empty());
        let outcome = if text.is_some() {
            StageOutcome::Used
        } else {
            StageOutcome::Failed
        };
        sched.complete(stage, outcome, generated.error.clone());
        text
    }

    /// Open a document by id, optionally summarizing it.
    async fn open(
        &self,
        resolved: &ResolvedQuery,
        id: i64,
        snapshot: &CorpusSnapshot,
        sched: &mut BudgetScheduler,
        trace: &mut Trace,
    ) -> (String, Outcome) {
        let Some(doc) = snapshot.get(id) else {
            tracing::info!("Document #{} not found", id);
            let question = if resolved.question.is_empty() {
                format!("Open document #{}", id)
            } else {
                resolved.question.clone()
            };
            return (
                question,
                Outcome::NoResultsTip {
                    message: could_not_open_message(id),
                },
            );
        };

        if resolved.action.as_deref() == Some("summarize") {
            let question = if resolved.question.is_empty() {
                format!("Summary: {}", doc.title)
            } else {
                resolved.question.clone()
            };
            let answer = self.summarize(&doc, resolved, sched, trace).await;
            return (
                question,
                Outcome::DirectAnswer {
                    answer,
                    document_id: doc.id,
                },
            );
        }

        let question = if resolved.question.is_empty() {
            format!("Open: {}", doc.title)
        } else {
            resolved.question.clone()
        };
        let answer = self
            .direct_answer(&doc, &question, "natural", 1.0, sched, trace)
            .await;
        trace.actions.push(SuggestedAction::summarize(doc.id));

        (
            question,
            Outcome::DirectAnswer {
                answer,
                document_id: doc.id,
            },
        )
    }

    /// Generated summary when possible, local extractive summary otherwise.
    async fn summarize(
        &self,
        doc: &Document,
        resolved: &ResolvedQuery,
        sched: &mut BudgetScheduler,
        trace: &mut Trace,
    ) -> String {
        trace.llm.prompt_mode = Some(if resolved.action_prompt.is_some() {
            "custom".to_string()
        } else {
            "summary".to_string()
        });

        let mut generated_text = None;
        if self.augmenter.is_enabled() {
            if let StageDecision::Attempt { timeout } = sched.plan(Stage::Summary) {
                let question = if resolved.question.is_empty() {
                    "Summarize the article"
                } else {
                    resolved.question.as_str()
                };
                let generated = self
                    .augmenter
                    .summarize(
                        doc,
                        question,
                        resolved.action_prompt.as_deref(),
                        timeout.min(self.llm_ceiling),
                    )
                    .await;
                generated_text = self.record_generation(Stage::Summary, &generated, sched, trace);
            }
        }

        let used = generated_text.is_some();
        let text = generated_text.unwrap_or_else(|| summarize_locally(&doc.content));
        let mut text = enforce_summary_lines(&text);
        if text.is_empty() {
            text = build_snippet(&doc.title, self.config.search.snippet_chars);
        }

        let mark = if used {
            &self.config.llm.mark
        } else {
            &self.config.llm.fallback_mark
        };
        format!("{}{}", text, mark)
    }

    /// Probe the embedding service and report corpus counts. Never fails.
    pub async fn health(&self) -> HealthReport {
        let timeout = HEALTH_PROBE_TIMEOUT.min(self.embed_ceiling);
        let probe =
            tokio::time::timeout(timeout, self.embedder.embed(HEALTH_PROBE_TEXT, timeout)).await;

        let error = match probe {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("embed timeout".to_string()),
        };
        if let Some(e) = &error {
            tracing::warn!("Health probe failed: {}", e);
        }

        let stats = self.corpus.stats();
        HealthReport {
            embed_ok: error.is_none(),
            embed_url: self.embedder.endpoint().to_string(),
            error,
            documents: stats.documents,
            vectorized: stats.vectorized,
            generation: stats.generation,
            llm_enabled: self.augmenter.is_enabled(),
            llm_url: self.augmenter.endpoint().map(str::to_string),
        }
    }

    pub fn stats(&self) -> CorpusStats {
        self.corpus.stats()
    }

    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.corpus.timeline()
    }

    /// Swap in a fresh corpus; in-flight queries finish on their own snapshot.
    pub async fn reload(&self, source: &dyn CorpusSource) -> AppResult<CorpusStats> {
        self.corpus.reload(source).await
    }
}
