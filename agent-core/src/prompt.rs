//! Prompt builders for the unified processor and reply generation.
//!
//! Prompts are Indonesian: the agent serves an Indonesian e-commerce
//! audience and the models are instructed in the customers' language.

/// Placeholder injected when a session has no prior exchanges.
const NO_HISTORY: &str = "Tidak ada history percakapan sebelumnya";

/// Extra instruction appended to the reply prompt when evidence confidence
/// is medium: answer, but hedge and invite escalation.
pub const HEDGE_INSTRUCTION: &str = "Catatan: informasi pendukung kurang meyakinkan. \
Jawab dengan hati-hati, akui jika ada kemungkinan informasi kurang lengkap, \
dan tawarkan bantuan CS manusia bila user membutuhkan kepastian.";

/// Single-call classification prompt: routing, context resolution, query
/// reformulation, and escalation check in one JSON-only response.
pub fn unified_processor_prompt(query: &str, history: &str) -> String {
    let history = if history.trim().is_empty() {
        NO_HISTORY
    } else {
        history
    };
    format!(
        r#"Kamu adalah Query Processor untuk asisten AI Customer Service TokoLapak (e-commerce Indonesia).

=== TUJUANMU ===
Analisis query user dan tentukan strategi respons:
- routing="direct" → langsung generate respons tanpa cari referensi
- routing="docs" → cari informasi di knowledge base dulu
- routing="web" → cari informasi terbaru di web
- routing="all" → gabungkan knowledge base dan web
- escalate=true → teruskan ke CS manusia

=== INPUT ===
Query: {query}
History: {history}

=== ANALISIS (3 STEP) ===

STEP 1 - ROUTING:
Tentukan routing berdasarkan intent user (gunakan history jika relevan).
- "direct": greeting, acknowledgment, terima kasih, chitchat ringan
- "docs": pertanyaan produk, kebijakan, prosedur, return/refund, garansi, komplain
- "web": info terkini di luar knowledge base (kurs, berita, status layanan pihak ketiga)
- "all": butuh kebijakan internal sekaligus info terkini

STEP 2 - REFORMULATION (jika routing bukan "direct"):
Selesaikan referensi dari history (misal "iya", "yang tadi") lalu optimalkan query untuk pencarian.

STEP 3 - ESCALATION CHECK:
Escalate=true jika user minta CS/manusia, komplain serius, atau di luar kapabilitas bot.

=== OUTPUT FORMAT (JSON ONLY) ===
{{
  "routing_decision": "direct|docs|web|all",
  "resolved_query": "intent user yang dipahami",
  "reformulated_query": "query optimal untuk search",
  "escalate": true|false,
  "escalation_reason": "alasan jika escalate",
  "reasoning": "penjelasan singkat"
}}

=== CONTOH ===

Query: "iya" | History: "bot: Mau tahu prosedur return?"
{{"routing_decision": "docs", "resolved_query": "prosedur return", "reformulated_query": "prosedur pengembalian barang", "escalate": false, "escalation_reason": "", "reasoning": "User konfirmasi tanya return"}}

Query: "halo" | History: ""
{{"routing_decision": "direct", "resolved_query": "sapaan", "reformulated_query": "sapaan", "escalate": false, "escalation_reason": "", "reasoning": "Greeting sederhana"}}

Query: "sambungkan saya ke CS" | History: ""
{{"routing_decision": "direct", "resolved_query": "minta CS manusia", "reformulated_query": "minta CS manusia", "escalate": true, "escalation_reason": "User minta CS manusia", "reasoning": "Permintaan eksplisit"}}

=== PROSES SEKARANG ==="#
    )
}

/// Customer-facing reply prompt: persona, service guidelines, retrieved
/// context, and recent history.
pub fn reply_prompt(message: &str, context: &str, history: &str, hedge: bool) -> String {
    let context = if context.trim().is_empty() {
        "Tidak ada informasi tambahan."
    } else {
        context
    };
    let history = if history.trim().is_empty() {
        "Belum ada interaksi sebelumnya."
    } else {
        history
    };
    let hedge_block = if hedge {
        format!("\n{HEDGE_INSTRUCTION}\n")
    } else {
        String::new()
    };
    format!(
        r#"Kamu adalah z3, admin AI Customer Service TokoLapak (e-commerce Indonesia).

Guidelines:
- Jawab dalam Bahasa Indonesia yang ramah dan profesional
- Jawab singkat dan langsung ke inti, maksimal 3-4 kalimat
- Gunakan informasi tambahan di bawah sebagai sumber kebenaran
- Jika informasi tidak cukup, akui dengan jujur dan tawarkan bantuan lanjutan
- Jangan mengarang kebijakan, harga, atau prosedur
{hedge_block}
History percakapan:
{history}

User: "{message}"

Informasi tambahan (bisa internal docs atau web):
{context}

Jawaban Admin AI:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_prompt_carries_query_and_history() {
        let p = unified_processor_prompt("dimana pesanan saya", "user: halo\nbot: Halo!");
        assert!(p.contains("Query: dimana pesanan saya"));
        assert!(p.contains("History: user: halo"));
        assert!(p.contains("JSON ONLY"));
    }

    #[test]
    fn empty_history_gets_placeholder() {
        let p = unified_processor_prompt("halo", "");
        assert!(p.contains(NO_HISTORY));
    }

    #[test]
    fn reply_prompt_hedges_only_on_medium() {
        let plain = reply_prompt("q", "[Docs] a", "", false);
        let hedged = reply_prompt("q", "[Docs] a", "", true);
        assert!(!plain.contains("hati-hati"));
        assert!(hedged.contains("hati-hati"));
        assert!(hedged.contains("[Docs] a"));
    }
}
