//! End-to-end query processing: classify, retrieve, gate, reply, persist.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use rag_core::{
    NO_EVIDENCE_SCORE, QualityTier, RagConfig, RetrievalDeps, RetrievalMode, gate,
    retrieve_context,
};
use services::{ConversationMemory, NewTicket, TicketService};

use crate::cfg::{AgentConfig, STAGE_QUALITY_GATE, STAGE_ROUTER};
use crate::llm::TextGeneration;
use crate::reply::{generate_reply, handoff_reply};
use crate::router::{RouteMode, UnifiedDecision, classify};

/// One inbound customer message, already normalized by the channel layer.
#[derive(Debug, Clone)]
pub struct IncomingQuery {
    /// Channel-prefixed session id (`web_…`, `tg_private_…`).
    pub session_id: String,
    /// Channel short name for ticketing (`web`, `tg`).
    pub channel: String,
    /// Channel message id; memory appends are idempotent per session on it.
    pub message_id: String,
    pub text: String,
    /// Channel-level user identity, carried onto escalation tickets.
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub chat_id: Option<String>,
}

/// Everything a channel needs to respond and report.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedReply {
    pub reply: String,
    pub routing_decision: String,
    pub escalated: bool,
    pub reformulated_query: Option<String>,
    pub quality_score: Option<f32>,
    pub flagged_for_review: Option<bool>,
    pub escalation_reason: Option<String>,
    pub escalation_stage: Option<String>,
    pub ticket_id: Option<String>,
}

/// The pipeline with all collaborators. Construct once, share via `Arc`.
pub struct AgentPipeline {
    llm: Arc<dyn TextGeneration>,
    retrieval: RetrievalDeps,
    rag_cfg: RagConfig,
    memory: Arc<ConversationMemory>,
    tickets: Arc<TicketService>,
    cfg: AgentConfig,
}

impl AgentPipeline {
    pub fn new(
        llm: Arc<dyn TextGeneration>,
        retrieval: RetrievalDeps,
        rag_cfg: RagConfig,
        memory: Arc<ConversationMemory>,
        tickets: Arc<TicketService>,
        cfg: AgentConfig,
    ) -> Self {
        Self {
            llm,
            retrieval,
            rag_cfg,
            memory,
            tickets,
            cfg,
        }
    }

    /// Process one message end to end. Total: collaborator failures degrade
    /// (router fallback, empty context, apology reply) and ticket/memory
    /// write failures are logged without affecting the returned reply.
    pub async fn process(&self, query: IncomingQuery) -> ProcessedReply {
        let history = self
            .memory
            .format_history(&query.session_id, self.cfg.memory_window)
            .unwrap_or_else(|e| {
                warn!(target: "agent_core::pipeline", error = %e, "history load failed, continuing without history");
                String::new()
            });

        let decision = classify(self.llm.as_ref(), &query.text, &history).await;
        info!(
            target: "agent_core::pipeline",
            session_id = %query.session_id,
            mode = decision.mode.as_str(),
            escalate = decision.escalate,
            "query classified"
        );

        let result = if decision.escalate {
            self.escalate(&query, &decision, &history, STAGE_ROUTER, None)
        } else {
            match decision.mode {
                RouteMode::Direct => {
                    let reply =
                        generate_reply(self.llm.as_ref(), &query.text, "", &history, false).await;
                    ProcessedReply {
                        reply,
                        routing_decision: decision.mode.as_str().to_string(),
                        escalated: false,
                        reformulated_query: None,
                        quality_score: None,
                        flagged_for_review: None,
                        escalation_reason: None,
                        escalation_stage: None,
                        ticket_id: None,
                    }
                }
                RouteMode::Docs | RouteMode::Web | RouteMode::All => {
                    self.answer_with_retrieval(&query, &decision, &history).await
                }
            }
        };

        if let Err(e) = self.memory.append(
            &query.session_id,
            &query.message_id,
            &query.text,
            &result.reply,
        ) {
            warn!(target: "agent_core::pipeline", error = %e, "memory append failed");
        }
        result
    }

    async fn answer_with_retrieval(
        &self,
        query: &IncomingQuery,
        decision: &UnifiedDecision,
        history: &str,
    ) -> ProcessedReply {
        let mode = match decision.mode {
            RouteMode::Web => RetrievalMode::Web,
            RouteMode::All => RetrievalMode::All,
            _ => RetrievalMode::Docs,
        };
        let retrieved = retrieve_context(
            &decision.reformulated_query,
            mode,
            &self.retrieval,
            &self.rag_cfg,
        )
        .await;
        let verdict = gate(
            retrieved.top_score,
            self.rag_cfg.threshold_good,
            self.rag_cfg.threshold_medium,
        );
        info!(
            target: "agent_core::pipeline",
            session_id = %query.session_id,
            tier = ?verdict.tier,
            top_score = verdict.top_score,
            docs = retrieved.documents_used,
            "retrieval gated"
        );

        match verdict.tier {
            QualityTier::Poor => {
                let score = if verdict.top_score == NO_EVIDENCE_SCORE {
                    None
                } else {
                    Some(verdict.top_score)
                };
                self.escalate(query, decision, history, STAGE_QUALITY_GATE, score)
            }
            tier => {
                let hedge = tier == QualityTier::Medium;
                let reply = generate_reply(
                    self.llm.as_ref(),
                    &query.text,
                    &retrieved.context,
                    history,
                    hedge,
                )
                .await;
                ProcessedReply {
                    reply,
                    routing_decision: decision.mode.as_str().to_string(),
                    escalated: false,
                    reformulated_query: Some(decision.reformulated_query.clone()),
                    quality_score: Some(verdict.top_score),
                    flagged_for_review: Some(hedge),
                    escalation_reason: None,
                    escalation_stage: None,
                    ticket_id: None,
                }
            }
        }
    }

    /// Open a ticket and hand the conversation off. Ticket failures are
    /// logged; the customer still gets the handoff reply.
    fn escalate(
        &self,
        query: &IncomingQuery,
        decision: &UnifiedDecision,
        history: &str,
        stage: &str,
        quality_score: Option<f32>,
    ) -> ProcessedReply {
        let reason = if decision.escalation_reason.is_empty() {
            match stage {
                STAGE_QUALITY_GATE => "Retrieval confidence below threshold".to_string(),
                _ => "Escalation requested".to_string(),
            }
        } else {
            decision.escalation_reason.clone()
        };

        let ticket_id = match self.tickets.create(NewTicket {
            session_id: query.session_id.clone(),
            channel: query.channel.clone(),
            user_id: query.user_id.clone(),
            username: query.username.clone(),
            chat_id: query.chat_id.clone(),
            escalation_stage: stage.to_string(),
            escalation_reason: reason.clone(),
            original_query: query.text.clone(),
            history_snippet: history.to_string(),
            quality_score: quality_score.map(f64::from),
        }) {
            Ok(t) => Some(t.id),
            Err(e) => {
                warn!(target: "agent_core::pipeline", error = %e, "ticket creation failed");
                None
            }
        };

        ProcessedReply {
            reply: handoff_reply(),
            routing_decision: decision.mode.as_str().to_string(),
            escalated: true,
            reformulated_query: Some(decision.reformulated_query.clone()),
            quality_score,
            flagged_for_review: None,
            escalation_reason: Some(reason),
            escalation_stage: Some(stage.to_string()),
            ticket_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use llm_service::Result as LlmResult;
    use rag_core::{CandidateDocument, KnowledgeRetriever, RagCoreError, Reranker, WebSearch};
    use services::TicketStatus;

    struct ScriptedLlm {
        router_output: String,
        reply_output: String,
    }

    #[async_trait]
    impl TextGeneration for ScriptedLlm {
        async fn router_json(&self, _prompt: &str) -> LlmResult<String> {
            Ok(self.router_output.clone())
        }

        async fn reply_text(&self, _prompt: &str) -> LlmResult<String> {
            Ok(self.reply_output.clone())
        }
    }

    struct CountingKnowledge {
        calls: Arc<AtomicUsize>,
        docs: Vec<String>,
    }

    #[async_trait]
    impl KnowledgeRetriever for CountingKnowledge {
        async fn retrieve(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<CandidateDocument>, RagCoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .docs
                .iter()
                .map(|d| CandidateDocument::knowledge(d.clone(), Some(0.5)))
                .collect())
        }
    }

    struct NoWeb;

    #[async_trait]
    impl WebSearch for NoWeb {
        async fn search(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<CandidateDocument>, RagCoreError> {
            Ok(Vec::new())
        }
    }

    struct FixedReranker(Vec<f32>);

    #[async_trait]
    impl Reranker for FixedReranker {
        async fn score(
            &self,
            _query: &str,
            candidates: &[CandidateDocument],
        ) -> Result<Vec<f32>, RagCoreError> {
            Ok(self.0.iter().copied().take(candidates.len()).collect())
        }
    }

    fn router_json(mode: &str, escalate: bool, reason: &str) -> String {
        format!(
            r#"{{"routing_decision": "{mode}", "resolved_query": "q", "reformulated_query": "q optimal",
                "escalate": {escalate}, "escalation_reason": "{reason}", "reasoning": "test"}}"#
        )
    }

    struct Setup {
        pipeline: AgentPipeline,
        knowledge_calls: Arc<AtomicUsize>,
        tickets: Arc<TicketService>,
        memory: Arc<ConversationMemory>,
    }

    fn setup(
        router_output: String,
        docs: Vec<String>,
        scores: Vec<f32>,
        adaptive_fallback: bool,
    ) -> Setup {
        let knowledge_calls = Arc::new(AtomicUsize::new(0));
        let tickets = Arc::new(TicketService::open_in_memory(false).unwrap());
        let memory = Arc::new(ConversationMemory::open_in_memory().unwrap());
        let retrieval = RetrievalDeps {
            knowledge: Arc::new(CountingKnowledge {
                calls: Arc::clone(&knowledge_calls),
                docs,
            }),
            web: Arc::new(NoWeb),
            reranker: Arc::new(FixedReranker(scores)),
        };
        let rag_cfg = RagConfig {
            enable_adaptive_fallback: adaptive_fallback,
            ..RagConfig::default()
        };
        let pipeline = AgentPipeline::new(
            Arc::new(ScriptedLlm {
                router_output,
                reply_output: "Siap, sudah saya bantu ya!".to_string(),
            }),
            retrieval,
            rag_cfg,
            Arc::clone(&memory),
            Arc::clone(&tickets),
            AgentConfig::default(),
        );
        Setup {
            pipeline,
            knowledge_calls,
            tickets,
            memory,
        }
    }

    fn msg(session: &str, id: &str, text: &str) -> IncomingQuery {
        IncomingQuery {
            session_id: format!("web_{session}"),
            channel: "web".to_string(),
            message_id: id.to_string(),
            text: text.to_string(),
            user_id: None,
            username: None,
            chat_id: None,
        }
    }

    #[tokio::test]
    async fn direct_greeting_skips_retrieval() {
        let s = setup(router_json("direct", false, ""), vec![], vec![], true);
        let out = s.pipeline.process(msg("s1", "m1", "Halo")).await;
        assert_eq!(out.routing_decision, "direct");
        assert!(!out.escalated);
        assert_eq!(s.knowledge_calls.load(Ordering::SeqCst), 0);
        assert!(out.ticket_id.is_none());
        assert_eq!(out.reply, "Siap, sudah saya bantu ya!");
    }

    #[tokio::test]
    async fn docs_query_with_good_evidence_answers_without_ticket() {
        let s = setup(
            router_json("docs", false, ""),
            vec!["panduan return barang rusak".to_string()],
            vec![1.5],
            true,
        );
        let out = s
            .pipeline
            .process(msg("s1", "m1", "Bagaimana cara return barang rusak?"))
            .await;
        assert!(!out.escalated);
        assert_eq!(out.quality_score, Some(1.5));
        assert_eq!(out.flagged_for_review, Some(false));
        assert_eq!(s.tickets.list(None, 10, 0).unwrap().total, 0);
    }

    #[tokio::test]
    async fn poor_evidence_escalates_with_quality_gate_stage() {
        // All scores far below medium, fallback disabled: no usable context.
        let s = setup(
            router_json("docs", false, ""),
            vec!["promo tidak relevan".to_string()],
            vec![-5.0],
            false,
        );
        let out = s
            .pipeline
            .process(msg("s1", "m1", "Bagaimana cara return barang rusak?"))
            .await;
        assert!(out.escalated);
        assert_eq!(out.escalation_stage.as_deref(), Some(STAGE_QUALITY_GATE));
        let ticket_id = out.ticket_id.expect("ticket created");
        let t = s.tickets.get(&ticket_id).unwrap();
        assert_eq!(t.status, TicketStatus::Open);
        assert_eq!(t.escalation_stage, STAGE_QUALITY_GATE);
    }

    #[tokio::test]
    async fn router_escalation_creates_router_stage_ticket() {
        let s = setup(
            router_json("direct", true, "User minta CS manusia"),
            vec![],
            vec![],
            true,
        );
        let out = s
            .pipeline
            .process(IncomingQuery {
                username: Some("budi".to_string()),
                ..msg("s1", "m1", "sambungkan saya ke CS")
            })
            .await;
        assert!(out.escalated);
        assert_eq!(out.escalation_stage.as_deref(), Some(STAGE_ROUTER));
        assert_eq!(out.escalation_reason.as_deref(), Some("User minta CS manusia"));
        assert_eq!(s.knowledge_calls.load(Ordering::SeqCst), 0);
        let ticket = s.tickets.get(&out.ticket_id.expect("ticket created")).unwrap();
        assert_eq!(ticket.username.as_deref(), Some("budi"));
    }

    #[tokio::test]
    async fn medium_evidence_is_flagged_for_review() {
        let s = setup(
            router_json("docs", false, ""),
            vec!["info samar".to_string()],
            vec![0.25],
            true,
        );
        let out = s.pipeline.process(msg("s1", "m1", "pertanyaan")).await;
        assert!(!out.escalated);
        assert_eq!(out.flagged_for_review, Some(true));
        assert_eq!(out.quality_score, Some(0.25));
    }

    #[tokio::test]
    async fn exchanges_are_recorded_per_session() {
        let s = setup(router_json("direct", false, ""), vec![], vec![], true);
        s.pipeline.process(msg("s1", "m1", "Halo")).await;
        let h = s.memory.history("web_s1", 10).unwrap();
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].user_message, "Halo");
        assert_eq!(h[0].bot_reply, "Siap, sudah saya bantu ya!");
    }

    #[tokio::test]
    async fn concurrent_sessions_do_not_leak_history() {
        let s = Arc::new(setup(router_json("direct", false, ""), vec![], vec![], true));
        let a = {
            let s = Arc::clone(&s);
            tokio::spawn(async move {
                for i in 0..10 {
                    s.pipeline
                        .process(msg("alpha", &format!("a{i}"), &format!("pesan alpha {i}")))
                        .await;
                }
            })
        };
        let b = {
            let s = Arc::clone(&s);
            tokio::spawn(async move {
                for i in 0..10 {
                    s.pipeline
                        .process(msg("beta", &format!("b{i}"), &format!("pesan beta {i}")))
                        .await;
                }
            })
        };
        a.await.unwrap();
        b.await.unwrap();

        let ha = s.memory.history("web_alpha", 100).unwrap();
        let hb = s.memory.history("web_beta", 100).unwrap();
        assert_eq!(ha.len(), 10);
        assert_eq!(hb.len(), 10);
        assert!(ha.iter().all(|m| m.user_message.contains("alpha")));
        assert!(hb.iter().all(|m| m.user_message.contains("beta")));
    }
}
